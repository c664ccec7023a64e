use chrono::{DateTime, Utc};
use base64::{Engine, engine::general_purpose::URL_SAFE};
use tokio_postgres::{Error as PgError};
use deadpool_postgres::GenericClient;

use crate::error::api::ApiError;
use crate::net::cookie::{SameSite, SetCookie};
use crate::sec::state::Sec;

pub mod token;

pub const SESSION_COOKIE: &str = "session_id";

pub const TOKEN_ATTEMPTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("ran out of token attempts")]
    TokenAttempts,

    #[error("date time value overflowed")]
    UtcOverflow,

    #[error(transparent)]
    Pg(#[from] PgError),

    #[error(transparent)]
    Rand(#[from] rand::Error),
}

impl From<token::UniqueError> for BuilderError {
    fn from(err: token::UniqueError) -> Self {
        match err {
            token::UniqueError::Rand(err) => BuilderError::Rand(err),
            token::UniqueError::Pg(err) => BuilderError::Pg(err)
        }
    }
}

impl From<BuilderError> for ApiError {
    fn from(err: BuilderError) -> ApiError {
        match err {
            BuilderError::Pg(err) => err.into(),
            BuilderError::Rand(err) => err.into(),
            err => ApiError::new().source(err),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub token: token::SessionToken,
    pub user_id: i64,
    pub issued_on: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    pub requires_totp: bool,
}

impl Session {
    pub async fn create(
        conn: &impl GenericClient,
        user_id: i64,
        requires_totp: bool,
    ) -> Result<Session, BuilderError> {
        let issued_on = Utc::now();
        let duration = chrono::Duration::days(7);

        let Some(token) = token::SessionToken::unique(conn, TOKEN_ATTEMPTS).await? else {
            return Err(BuilderError::TokenAttempts);
        };

        let Some(expires) = issued_on.checked_add_signed(duration) else {
            return Err(BuilderError::UtcOverflow);
        };

        let _ = conn.execute(
            "\
            insert into auth_session (token, user_id, issued_on, expires, requires_totp) values \
            ($1, $2, $3, $4, $5)",
            &[
                &token.as_slice(),
                &user_id,
                &issued_on,
                &expires,
                &requires_totp,
            ]
        ).await?;

        Ok(Session {
            token,
            user_id,
            issued_on,
            expires,
            requires_totp,
        })
    }

    pub async fn retrieve_token(
        conn: &impl GenericClient,
        token: &token::SessionToken
    ) -> Result<Option<Session>, PgError> {
        if let Some(row) = conn.query_opt(
            "\
            select auth_session.token, \
                   auth_session.user_id, \
                   auth_session.issued_on, \
                   auth_session.expires, \
                   auth_session.requires_totp \
            from auth_session \
            where auth_session.token = $1",
            &[&token.as_slice()]
        ).await? {
            Ok(Some(Session {
                token: token::SessionToken::from_vec(row.get(0)),
                user_id: row.get(1),
                issued_on: row.get(2),
                expires: row.get(3),
                requires_totp: row.get(4),
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn delete(&self, conn: &impl GenericClient) -> Result<(), PgError> {
        let _ = conn.execute(
            "delete from auth_session where token = $1",
            &[&self.token.as_slice()]
        ).await?;

        Ok(())
    }
}

/// Keeps the setup flag on live sessions in step with the account row so
/// an open session learns about enrollment without a fresh login.
pub async fn refresh_requires_totp(
    conn: &impl GenericClient,
    user_id: &i64,
    requires_totp: bool,
) -> Result<u64, PgError> {
    conn.execute(
        "update auth_session set requires_totp = $2 where user_id = $1",
        &[user_id, &requires_totp]
    ).await
}

pub type Hash = blake3::Hash;

pub fn create_hash<T>(sec: &Sec, token: T) -> Hash
where
    T: AsRef<[u8]>
{
    blake3::keyed_hash(sec.session_info().key(), token.as_ref())
}

pub fn encode_base64<T>(token: T, hash: Hash) -> String
where
    T: AsRef<[u8]>
{
    let token_ref = token.as_ref();

    let slice = hash.as_bytes();

    let mut joined = Vec::with_capacity(token_ref.len() + slice.len());
    joined.extend_from_slice(token_ref);
    joined.extend_from_slice(slice);

    URL_SAFE.encode(joined)
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("session id is not valid base64")]
    InvalidString,

    #[error("session id does not have the expected length")]
    InvalidLength,

    #[error("session id mac does not match")]
    InvalidHash,
}

pub fn decode_base64<S>(
    sec: &Sec,
    session_id: S
) -> Result<(token::SessionToken, Hash), DecodeError>
where
    S: AsRef<[u8]>
{
    let Ok(mut bytes) = URL_SAFE.decode(session_id) else {
        return Err(DecodeError::InvalidString);
    };

    if bytes.len() != token::SESSION_ID_BYTES + blake3::OUT_LEN {
        return Err(DecodeError::InvalidLength);
    };

    let token = token::SessionToken::drain_vec(&mut bytes);

    let Ok(hash) = <[u8; blake3::OUT_LEN]>::try_from(bytes) else {
        return Err(DecodeError::InvalidLength);
    };
    let given = blake3::Hash::from(hash);

    let expected = blake3::keyed_hash(sec.session_info().key(), token.as_slice());

    if given != expected {
        Err(DecodeError::InvalidHash)
    } else {
        Ok((token, given))
    }
}

pub fn create_session_cookie(sec: &Sec, session: &Session) -> SetCookie {
    let hash = create_hash(sec, &session.token);
    let encoded_token = encode_base64(&session.token, hash);

    let mut cookie = SetCookie::new(SESSION_COOKIE, encoded_token)
        .with_expires(session.expires)
        .with_path("/")
        .with_http_only(true)
        .with_secure(*sec.session_info().secure())
        .with_same_site(SameSite::Strict);

    if let Some(domain) = sec.session_info().domain() {
        cookie.set_domain(domain);
    }

    cookie
}

pub fn expire_session_cookie(sec: &Sec) -> SetCookie {
    let mut cookie = SetCookie::new(SESSION_COOKIE, "")
        .with_max_age(std::time::Duration::new(0, 0))
        .with_path("/")
        .with_http_only(true)
        .with_secure(*sec.session_info().secure())
        .with_same_site(SameSite::Strict);

    if let Some(domain) = sec.session_info().domain() {
        cookie.set_domain(domain);
    }

    cookie
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sec::state::test_sec;

    #[test]
    fn encode_decode_round_trip() {
        let sec = test_sec("session test key");
        let token = token::SessionToken::from([7; token::SESSION_ID_BYTES]);

        let hash = create_hash(&sec, &token);
        let encoded = encode_base64(&token, hash);

        let (decoded_token, decoded_hash) = decode_base64(&sec, &encoded)
            .expect("failed to decode session id");

        assert_eq!(decoded_token, token);
        assert_eq!(decoded_hash, hash);
    }

    #[test]
    fn rejects_foreign_key_session_id() {
        let sec = test_sec("session test key");
        let other = test_sec("a different master key");
        let token = token::SessionToken::from([7; token::SESSION_ID_BYTES]);

        let hash = create_hash(&other, &token);
        let encoded = encode_base64(&token, hash);

        assert!(matches!(
            decode_base64(&sec, &encoded),
            Err(DecodeError::InvalidHash)
        ));
    }

    #[test]
    fn rejects_wrong_length_session_id() {
        let sec = test_sec("session test key");

        assert!(matches!(
            decode_base64(&sec, URL_SAFE.encode([1u8; 16])),
            Err(DecodeError::InvalidLength)
        ));
        assert!(matches!(
            decode_base64(&sec, "%%%"),
            Err(DecodeError::InvalidString)
        ));
    }
}
