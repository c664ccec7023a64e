use chrono::{DateTime, Utc};
use deadpool_postgres::Object;
use tokio_postgres::{Error as PgError};

use taskbook_api::users::LoginUser;

use crate::error::api::{ApiError, AuthKind};
use crate::sec::state::Sec;
use crate::user::User;

pub mod password;
pub mod totp;
pub mod enrollment;
pub mod session;
pub mod initiator;

#[derive(Debug)]
pub struct Attempt {
    pub email: String,
    pub password: String,
    pub totp_code: Option<String>,
}

impl From<LoginUser> for Attempt {
    fn from(login: LoginUser) -> Self {
        Attempt {
            email: login.email,
            password: login.password,
            totp_code: login.totp_code,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthorizeError {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("totp code required")]
    TotpRequired,

    #[error("totp marked enabled but no secret on record")]
    TotpNotSetup,

    #[error("invalid totp code")]
    InvalidTotp,

    #[error("totp enrollment required before login")]
    TotpSetupRequired,

    #[error(transparent)]
    Password(#[from] password::PasswordError),

    #[error(transparent)]
    Totp(#[from] totp::TotpError),

    #[error(transparent)]
    Db(#[from] PgError),
}

impl From<AuthorizeError> for ApiError {
    fn from(err: AuthorizeError) -> Self {
        match err {
            AuthorizeError::MissingCredentials => ApiError::api(AuthKind::MissingCredentials),
            AuthorizeError::InvalidCredentials => ApiError::api(AuthKind::InvalidCredentials),
            AuthorizeError::TotpRequired => ApiError::api(AuthKind::TotpRequired),
            AuthorizeError::TotpNotSetup => ApiError::api(AuthKind::TotpNotSetup),
            AuthorizeError::InvalidTotp => ApiError::api(AuthKind::InvalidTotp),
            AuthorizeError::TotpSetupRequired => ApiError::api(AuthKind::TotpSetupRequired),

            AuthorizeError::Password(err) => err.into(),
            AuthorizeError::Totp(err) => err.into(),
            AuthorizeError::Db(err) => err.into(),
        }
    }
}

/// Outcome of the flag branch of one login attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    Authenticated,
    VerifyCode,
    SetupRequired {
        flip: bool,
    },
}

/// Pure branch over the account flags. Database effects and the actual
/// code check stay with the caller.
pub fn evaluate(
    user: &User,
    has_code: bool,
    now: DateTime<Utc>,
    grace: chrono::Duration,
) -> Result<Decision, AuthorizeError> {
    if user.totp_enabled {
        if !has_code {
            return Err(AuthorizeError::TotpRequired);
        }

        if user.totp_secret.is_none() {
            return Err(AuthorizeError::TotpNotSetup);
        }

        return Ok(Decision::VerifyCode);
    }

    if user.requires_totp {
        return Ok(Decision::SetupRequired { flip: false });
    }

    if now - user.created >= grace {
        return Ok(Decision::SetupRequired { flip: true });
    }

    Ok(Decision::Authenticated)
}

pub async fn authenticate(
    conn: &mut Object,
    sec: &Sec,
    attempt: Attempt,
) -> Result<User, AuthorizeError> {
    if attempt.email.is_empty() || attempt.password.is_empty() {
        return Err(AuthorizeError::MissingCredentials);
    }

    // unknown account and wrong password are reported identically
    let Some(user) = User::query_with_email(&*conn, &attempt.email).await? else {
        return Err(AuthorizeError::InvalidCredentials);
    };

    let Some(stored) = password::Password::retrieve(&*conn, &user.id).await? else {
        return Err(AuthorizeError::InvalidCredentials);
    };

    if !stored.verify(&attempt.password)? {
        return Err(AuthorizeError::InvalidCredentials);
    }

    let now = Utc::now();

    match evaluate(&user, attempt.totp_code.is_some(), now, *sec.totp().grace())? {
        Decision::Authenticated => Ok(user),
        Decision::VerifyCode => {
            let code = attempt.totp_code
                .as_deref()
                .unwrap_or_default();
            let secret = user.totp_secret
                .as_deref()
                .unwrap_or_default();

            if !totp::verify(code, secret, sec.totp().issuer(), &user.email)? {
                return Err(AuthorizeError::InvalidTotp);
            }

            Ok(user)
        }
        Decision::SetupRequired { flip } => {
            if flip {
                // the account flag and its open-session copies move together
                let transaction = conn.transaction().await?;

                if User::flip_requires_totp(&transaction, &user.id).await? {
                    let _ = session::refresh_requires_totp(&transaction, &user.id, true).await?;
                }

                transaction.commit().await?;
            }

            Err(AuthorizeError::TotpSetupRequired)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn account(totp_enabled: bool, requires_totp: bool, age: chrono::Duration) -> User {
        User {
            id: 1,
            name: None,
            email: String::from("book@example.com"),
            created: Utc::now() - age,
            totp_enabled,
            totp_secret: totp_enabled.then(totp::create_secret),
            requires_totp,
        }
    }

    fn grace() -> chrono::Duration {
        chrono::Duration::hours(1)
    }

    #[test]
    fn fresh_account_authenticates_without_flip() {
        let user = account(false, false, chrono::Duration::minutes(30));

        let decision = evaluate(&user, false, Utc::now(), grace()).unwrap();

        assert_eq!(decision, Decision::Authenticated);
    }

    #[test]
    fn lapsed_grace_window_requires_setup_with_flip() {
        let user = account(false, false, chrono::Duration::hours(2));

        let decision = evaluate(&user, false, Utc::now(), grace()).unwrap();

        assert_eq!(decision, Decision::SetupRequired { flip: true });
    }

    #[test]
    fn flagged_account_requires_setup_without_flip() {
        let user = account(false, true, chrono::Duration::minutes(5));

        let decision = evaluate(&user, false, Utc::now(), grace()).unwrap();

        assert_eq!(decision, Decision::SetupRequired { flip: false });
    }

    #[test]
    fn enabled_account_without_code_is_challenged() {
        let user = account(true, false, chrono::Duration::days(30));

        let err = evaluate(&user, false, Utc::now(), grace()).unwrap_err();

        assert!(matches!(err, AuthorizeError::TotpRequired));
    }

    #[test]
    fn enabled_account_with_code_proceeds_to_verify() {
        let user = account(true, false, chrono::Duration::days(30));

        let decision = evaluate(&user, true, Utc::now(), grace()).unwrap();

        assert_eq!(decision, Decision::VerifyCode);
    }

    #[test]
    fn enabled_account_missing_secret_is_an_inconsistency() {
        let mut user = account(true, false, chrono::Duration::days(30));
        user.totp_secret = None;

        let err = evaluate(&user, true, Utc::now(), grace()).unwrap_err();

        assert!(matches!(err, AuthorizeError::TotpNotSetup));
    }

    #[test]
    fn enabled_account_skips_grace_branches() {
        // an old enabled account must never be asked to enroll again
        let user = account(true, false, chrono::Duration::days(365));

        let decision = evaluate(&user, true, Utc::now(), grace()).unwrap();

        assert_eq!(decision, Decision::VerifyCode);
    }
}
