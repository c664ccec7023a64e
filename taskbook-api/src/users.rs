use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::{Validator, ApiError, Detail};
use crate::error::{AuthKind, GeneralKind};

pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 512;

pub fn email_valid(given: &str) -> bool {
    email_address::EmailAddress::is_valid(given)
}

pub fn password_valid(given: &str) -> bool {
    let len = given.chars().count();

    len >= PASSWORD_MIN && len <= PASSWORD_MAX
}

#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub created: DateTime<Utc>,
    pub totp_enabled: bool,
    pub requires_totp: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
    pub password: String,

    #[serde(default)]
    pub totp_enabled: bool,
}

impl Validator for RegisterUser {
    fn validate(&self) -> Result<(), ApiError> {
        let mut invalid = Vec::new();

        if !email_valid(&self.email) {
            invalid.push("email");
        }

        if !password_valid(&self.password) {
            invalid.push("password");
        }

        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                invalid.push("name");
            }
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
pub struct LoginUser {
    pub email: String,
    pub password: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totp_code: Option<String>,
}

impl Validator for LoginUser {
    fn validate(&self) -> Result<(), ApiError> {
        let mut missing = Vec::new();

        if self.email.is_empty() {
            missing.push("email");
        }

        if self.password.is_empty() {
            missing.push("password");
        }

        if !missing.is_empty() {
            Err(ApiError::from((
                AuthKind::MissingCredentials,
                Detail::mult_keys(missing)
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ApiErrorKind;

    #[test]
    fn register_rejects_bad_email_and_short_password() {
        let given = RegisterUser {
            name: None,
            email: String::from("not an email"),
            password: String::from("short"),
            totp_enabled: false,
        };

        let err = given.validate().unwrap_err();

        assert_eq!(
            *err.kind(),
            ApiErrorKind::General(GeneralKind::ValidationFailed)
        );
        assert_eq!(
            err.detail(),
            Some(&Detail::mult_keys(["email", "password"]))
        );
    }

    #[test]
    fn login_missing_fields_report_missing_credentials() {
        let given = LoginUser {
            email: String::new(),
            password: String::new(),
            totp_code: None,
        };

        let err = given.validate().unwrap_err();

        assert_eq!(
            *err.kind(),
            ApiErrorKind::Auth(AuthKind::MissingCredentials)
        );
    }

    #[test]
    fn login_with_credentials_is_valid() {
        let given = LoginUser {
            email: String::from("book@example.com"),
            password: String::from("hunter2hunter2"),
            totp_code: Some(String::from("123456")),
        };

        assert!(given.validate().is_ok());
    }
}
