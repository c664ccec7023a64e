use serde::{Serialize, Deserialize};

use crate::{Validator, ApiError, Detail};
use crate::error::GeneralKind;
use crate::users::email_valid;

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub requires_totp: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestTotp {
    pub email: String,
}

impl Validator for RequestTotp {
    fn validate(&self) -> Result<(), ApiError> {
        if !email_valid(&self.email) {
            Err(ApiError::from((
                GeneralKind::ValidationFailed,
                Detail::with_key("email")
            )))
        } else {
            Ok(())
        }
    }
}

/// QR provisioning artifact returned when enrollment begins. The secret
/// itself only travels in the pending cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct TotpEnrollment {
    pub qr_code: String,
    pub uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTotp {
    pub code: String,
}

impl Validator for SubmitTotp {
    fn validate(&self) -> Result<(), ApiError> {
        if self.code.is_empty() {
            Err(ApiError::from((
                GeneralKind::MissingData,
                Detail::with_key("code")
            )))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TotpVerified {
    pub verified: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnableTotp {
    pub email: String,
    pub code: String,
}

impl Validator for EnableTotp {
    fn validate(&self) -> Result<(), ApiError> {
        let mut invalid = Vec::new();

        if !email_valid(&self.email) {
            invalid.push("email");
        }

        if self.code.is_empty() {
            invalid.push("code");
        }

        if !invalid.is_empty() {
            Err(ApiError::from((
                GeneralKind::ValidationFailed,
                Detail::mult_keys(invalid)
            )))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TotpStatus {
    pub required: bool,
}
