use crate::error;
use crate::config;

pub type MacKey = [u8; 32];

const SESSION_KEY_INFO: &[u8] = b"taskbook/session-cookie";
const PENDING_KEY_INFO: &[u8] = b"taskbook/totp-enrollment-pending";
const VERIFIED_KEY_INFO: &[u8] = b"taskbook/totp-enrollment-verified";

#[derive(Debug)]
pub struct SessionInfo {
    key: MacKey,
    domain: Option<String>,
    secure: bool,
}

impl SessionInfo {
    pub fn key(&self) -> &MacKey {
        &self.key
    }

    pub fn domain(&self) -> Option<&String> {
        self.domain.as_ref()
    }

    pub fn secure(&self) -> &bool {
        &self.secure
    }
}

/// Keys for the two phases of totp enrollment. Separate derivations so a
/// pending token can never pass for a verified one.
#[derive(Debug)]
pub struct EnrollmentInfo {
    pending_key: MacKey,
    verified_key: MacKey,
    domain: Option<String>,
    secure: bool,
}

impl EnrollmentInfo {
    pub fn pending_key(&self) -> &MacKey {
        &self.pending_key
    }

    pub fn verified_key(&self) -> &MacKey {
        &self.verified_key
    }

    pub fn domain(&self) -> Option<&String> {
        self.domain.as_ref()
    }

    pub fn secure(&self) -> &bool {
        &self.secure
    }
}

#[derive(Debug)]
pub struct TotpInfo {
    issuer: String,
    grace: chrono::Duration,
}

impl TotpInfo {
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn grace(&self) -> &chrono::Duration {
        &self.grace
    }
}

#[derive(Debug)]
pub struct Sec {
    session_info: SessionInfo,
    enrollment_info: EnrollmentInfo,
    totp_info: TotpInfo,
}

impl Sec {
    pub fn from_config(config: &config::Config) -> error::Result<Sec> {
        tracing::debug!("creating Sec state");

        let mut session_key: MacKey = [0; 32];
        let mut pending_key: MacKey = [0; 32];
        let mut verified_key: MacKey = [0; 32];

        config.kdf.expand(SESSION_KEY_INFO, &mut session_key)?;
        config.kdf.expand(PENDING_KEY_INFO, &mut pending_key)?;
        config.kdf.expand(VERIFIED_KEY_INFO, &mut verified_key)?;

        let session = &config.settings.sec.session;
        let totp = &config.settings.sec.totp;

        Ok(Sec {
            session_info: SessionInfo {
                key: session_key,
                domain: session.domain.clone(),
                secure: session.secure,
            },
            enrollment_info: EnrollmentInfo {
                pending_key,
                verified_key,
                domain: session.domain.clone(),
                secure: session.secure,
            },
            totp_info: TotpInfo {
                issuer: totp.issuer.clone(),
                grace: chrono::Duration::hours(totp.grace_hours as i64),
            },
        })
    }

    pub fn session_info(&self) -> &SessionInfo {
        &self.session_info
    }

    pub fn enrollment_info(&self) -> &EnrollmentInfo {
        &self.enrollment_info
    }

    pub fn totp(&self) -> &TotpInfo {
        &self.totp_info
    }
}

#[cfg(test)]
pub fn test_sec(master_key: &str) -> Sec {
    let kdf: config::Kdf = hkdf::Hkdf::new(None, master_key.as_bytes());

    let mut session_key: MacKey = [0; 32];
    let mut pending_key: MacKey = [0; 32];
    let mut verified_key: MacKey = [0; 32];

    kdf.expand(SESSION_KEY_INFO, &mut session_key).unwrap();
    kdf.expand(PENDING_KEY_INFO, &mut pending_key).unwrap();
    kdf.expand(VERIFIED_KEY_INFO, &mut verified_key).unwrap();

    Sec {
        session_info: SessionInfo {
            key: session_key,
            domain: None,
            secure: false,
        },
        enrollment_info: EnrollmentInfo {
            pending_key,
            verified_key,
            domain: None,
            secure: false,
        },
        totp_info: TotpInfo {
            issuer: "TaskBook".into(),
            grace: chrono::Duration::hours(24),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derived_keys_are_distinct_per_context() {
        let sec = test_sec("test master key");

        assert_ne!(
            sec.session_info().key(),
            sec.enrollment_info().pending_key()
        );
        assert_ne!(
            sec.enrollment_info().pending_key(),
            sec.enrollment_info().verified_key()
        );
    }

    #[test]
    fn derived_keys_depend_on_master_key() {
        let a = test_sec("master key a");
        let b = test_sec("master key b");

        assert_ne!(a.session_info().key(), b.session_info().key());
    }
}
