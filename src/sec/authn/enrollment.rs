use base64::{Engine, engine::general_purpose::URL_SAFE};
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::net::cookie::{SameSite, SetCookie};
use crate::sec::state::{MacKey, Sec};

pub const PENDING_COOKIE: &str = "totp_pending";
pub const VERIFIED_COOKIE: &str = "totp_verified";

pub const TOKEN_MAX_AGE_SECS: i64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Verified,
}

impl Phase {
    fn key<'a>(&self, sec: &'a Sec) -> &'a MacKey {
        match self {
            Phase::Pending => sec.enrollment_info().pending_key(),
            Phase::Verified => sec.enrollment_info().verified_key(),
        }
    }

    pub fn cookie_name(&self) -> &'static str {
        match self {
            Phase::Pending => PENDING_COOKIE,
            Phase::Verified => VERIFIED_COOKIE,
        }
    }
}

/// Self contained enrollment state. Nothing is persisted server side
/// until the account row is updated, so the token carries everything
/// needed to resume the flow.
#[derive(Debug, Serialize, Deserialize)]
pub struct Enrollment {
    pub email: String,
    pub secret: String,
    pub expires: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(email: String, secret: String, issued_on: DateTime<Utc>) -> Self {
        Enrollment {
            email,
            secret,
            expires: issued_on + chrono::Duration::seconds(TOKEN_MAX_AGE_SECS),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("token is not valid base64")]
    InvalidString,

    #[error("token is too short to carry a mac")]
    InvalidLength,

    #[error("token mac does not match")]
    InvalidHash,

    #[error("token payload is malformed")]
    Malformed(#[from] bincode::Error),

    #[error("token has expired")]
    Expired,
}

#[derive(Debug, thiserror::Error)]
#[error("failed serializing enrollment payload")]
pub struct EncodeError(#[from] bincode::Error);

pub fn encode(sec: &Sec, phase: Phase, enrollment: &Enrollment) -> Result<String, EncodeError> {
    let payload = bincode::serialize(enrollment)?;
    let mac = blake3::keyed_hash(phase.key(sec), &payload);

    let mut joined = Vec::with_capacity(payload.len() + blake3::OUT_LEN);
    joined.extend_from_slice(&payload);
    joined.extend_from_slice(mac.as_bytes());

    Ok(URL_SAFE.encode(joined))
}

pub fn decode<V>(
    sec: &Sec,
    phase: Phase,
    value: V,
    now: DateTime<Utc>
) -> Result<Enrollment, DecodeError>
where
    V: AsRef<[u8]>
{
    let Ok(bytes) = URL_SAFE.decode(value) else {
        return Err(DecodeError::InvalidString);
    };

    let Some(split_at) = bytes.len().checked_sub(blake3::OUT_LEN) else {
        return Err(DecodeError::InvalidLength);
    };

    let (payload, mac_bytes) = bytes.split_at(split_at);

    let Ok(mac) = <[u8; blake3::OUT_LEN]>::try_from(mac_bytes) else {
        return Err(DecodeError::InvalidLength);
    };
    let given = blake3::Hash::from(mac);
    let expected = blake3::keyed_hash(phase.key(sec), payload);

    // constant time comparison via blake3::Hash PartialEq
    if given != expected {
        return Err(DecodeError::InvalidHash);
    }

    let enrollment: Enrollment = bincode::deserialize(payload)?;

    if enrollment.expires < now {
        return Err(DecodeError::Expired);
    }

    Ok(enrollment)
}

fn phase_cookie(sec: &Sec, phase: Phase, value: String, max_age: std::time::Duration) -> SetCookie {
    let mut cookie = SetCookie::new(phase.cookie_name(), value)
        .with_max_age(max_age)
        .with_path("/")
        .with_http_only(true)
        .with_secure(*sec.enrollment_info().secure())
        .with_same_site(SameSite::Strict);

    if let Some(domain) = sec.enrollment_info().domain() {
        cookie.set_domain(domain);
    }

    cookie
}

pub fn create_cookie(sec: &Sec, phase: Phase, enrollment: &Enrollment) -> Result<SetCookie, EncodeError> {
    let encoded = encode(sec, phase, enrollment)?;

    Ok(phase_cookie(
        sec,
        phase,
        encoded,
        std::time::Duration::from_secs(TOKEN_MAX_AGE_SECS as u64)
    ))
}

pub fn expire_cookie(sec: &Sec, phase: Phase) -> SetCookie {
    phase_cookie(sec, phase, String::new(), std::time::Duration::new(0, 0))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sec::state::test_sec;

    fn enrollment(now: DateTime<Utc>) -> Enrollment {
        Enrollment::new(
            String::from("book@example.com"),
            String::from("JBSWY3DPEHPK3PXP"),
            now
        )
    }

    #[test]
    fn round_trips_within_expiry() {
        let sec = test_sec("enrollment test key");
        let now = Utc::now();

        let encoded = encode(&sec, Phase::Pending, &enrollment(now)).unwrap();
        let decoded = decode(&sec, Phase::Pending, &encoded, now).unwrap();

        assert_eq!(decoded.email, "book@example.com");
        assert_eq!(decoded.secret, "JBSWY3DPEHPK3PXP");
    }

    #[test]
    fn rejects_after_ten_minutes() {
        let sec = test_sec("enrollment test key");
        let now = Utc::now();

        let encoded = encode(&sec, Phase::Pending, &enrollment(now)).unwrap();
        let later = now + chrono::Duration::seconds(TOKEN_MAX_AGE_SECS + 1);

        assert!(matches!(
            decode(&sec, Phase::Pending, &encoded, later),
            Err(DecodeError::Expired)
        ));
    }

    #[test]
    fn rejects_tampered_payload() {
        let sec = test_sec("enrollment test key");
        let now = Utc::now();

        let encoded = encode(&sec, Phase::Pending, &enrollment(now)).unwrap();
        let mut bytes = URL_SAFE.decode(&encoded).unwrap();
        bytes[0] ^= 0x01;
        let tampered = URL_SAFE.encode(bytes);

        assert!(matches!(
            decode(&sec, Phase::Pending, &tampered, now),
            Err(DecodeError::InvalidHash)
        ));
    }

    #[test]
    fn pending_token_never_passes_as_verified() {
        let sec = test_sec("enrollment test key");
        let now = Utc::now();

        let encoded = encode(&sec, Phase::Pending, &enrollment(now)).unwrap();

        assert!(matches!(
            decode(&sec, Phase::Verified, &encoded, now),
            Err(DecodeError::InvalidHash)
        ));
    }

    #[test]
    fn rejects_short_and_garbage_tokens() {
        let sec = test_sec("enrollment test key");
        let now = Utc::now();

        assert!(matches!(
            decode(&sec, Phase::Pending, "not base64 !!!", now),
            Err(DecodeError::InvalidString)
        ));
        assert!(matches!(
            decode(&sec, Phase::Pending, URL_SAFE.encode([0u8; 8]), now),
            Err(DecodeError::InvalidLength)
        ));
    }
}
