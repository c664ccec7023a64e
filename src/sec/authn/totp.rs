use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::api::{ApiError, AuthKind};

pub const DIGITS: usize = 6;
pub const STEP: u64 = 30;
pub const SKEW: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    #[error("invalid totp secret: {0}")]
    InvalidSecret(String),

    #[error("failed building otpauth uri: {0}")]
    Uri(String),

    #[error("failed rendering qr code: {0}")]
    QrEncoding(String),
}

impl From<TotpError> for ApiError {
    fn from(err: TotpError) -> Self {
        match err {
            TotpError::QrEncoding(_) => ApiError::new()
                .kind(AuthKind::QrEncodingFailed)
                .source(err),
            err => ApiError::new().source(err)
        }
    }
}

fn build(secret: &str, issuer: &str, account: &str) -> Result<TOTP, TotpError> {
    let bytes = Secret::Encoded(secret.to_owned())
        .to_bytes()
        .map_err(|err| TotpError::InvalidSecret(format!("{err:?}")))?;

    TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW,
        STEP,
        bytes,
        Some(issuer.to_owned()),
        account.to_owned()
    ).map_err(|err| TotpError::Uri(format!("{err:?}")))
}

/// Fresh base32 encoded secret. Only the enrollment cookie ever carries
/// this before the account is updated.
pub fn create_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

pub fn provisioning_uri(secret: &str, issuer: &str, account: &str) -> Result<String, TotpError> {
    Ok(build(secret, issuer, account)?.get_url())
}

pub fn render_qr(secret: &str, issuer: &str, account: &str) -> Result<String, TotpError> {
    let encoded = build(secret, issuer, account)?
        .get_qr_base64()
        .map_err(TotpError::QrEncoding)?;

    Ok(format!("data:image/png;base64,{encoded}"))
}

fn well_formed(code: &str) -> bool {
    code.len() == DIGITS && code.chars().all(|c| c.is_ascii_digit())
}

/// Checks a code against the current time step and one step of skew on
/// either side. Malformed codes report as invalid rather than failing.
pub fn verify(code: &str, secret: &str, issuer: &str, account: &str) -> Result<bool, TotpError> {
    if !well_formed(code) {
        return Ok(false);
    }

    let totp = build(secret, issuer, account)?;

    match totp.check_current(code) {
        Ok(valid) => Ok(valid),
        Err(err) => {
            tracing::warn!("system clock is before the unix epoch: {err}");

            Ok(false)
        }
    }
}

pub fn verify_at(code: &str, secret: &str, issuer: &str, account: &str, time: u64) -> Result<bool, TotpError> {
    if !well_formed(code) {
        return Ok(false);
    }

    Ok(build(secret, issuer, account)?.check(code, time))
}

#[cfg(test)]
mod test {
    use super::*;

    const ISSUER: &str = "TaskBook";
    const ACCOUNT: &str = "book@example.com";

    fn code_at(secret: &str, time: u64) -> String {
        build(secret, ISSUER, ACCOUNT)
            .unwrap()
            .generate(time)
    }

    #[test]
    fn accepts_adjacent_steps_rejects_beyond() {
        let secret = create_secret();
        let now = 1_700_000_000u64;

        for offset in [-1i64, 0, 1] {
            let code = code_at(&secret, (now as i64 + offset * STEP as i64) as u64);

            assert!(
                verify_at(&code, &secret, ISSUER, ACCOUNT, now).unwrap(),
                "code at offset {offset} was rejected"
            );
        }

        for offset in [-2i64, 2] {
            let code = code_at(&secret, (now as i64 + offset * STEP as i64) as u64);

            assert!(
                !verify_at(&code, &secret, ISSUER, ACCOUNT, now).unwrap(),
                "code at offset {offset} was accepted"
            );
        }
    }

    #[test]
    fn malformed_codes_report_invalid() {
        let secret = create_secret();
        let now = 1_700_000_000u64;

        for code in ["", "12345", "1234567", "12345a", "banana"] {
            assert!(!verify_at(code, &secret, ISSUER, ACCOUNT, now).unwrap());
        }
    }

    #[test]
    fn codes_are_secret_specific() {
        let now = 1_700_000_000u64;
        let first = create_secret();
        let second = create_secret();

        let code = code_at(&first, now);

        assert!(verify_at(&code, &first, ISSUER, ACCOUNT, now).unwrap());
        assert!(!verify_at(&code, &second, ISSUER, ACCOUNT, now).unwrap());
    }

    #[test]
    fn provisioning_uri_carries_issuer_and_account() {
        let secret = create_secret();
        let uri = provisioning_uri(&secret, ISSUER, ACCOUNT).unwrap();

        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("TaskBook"));
        assert!(uri.contains("book%40example.com") || uri.contains("book@example.com"));
    }

    #[test]
    fn garbage_secret_is_an_error() {
        assert!(build("not base32 !!!", ISSUER, ACCOUNT).is_err());
    }
}
