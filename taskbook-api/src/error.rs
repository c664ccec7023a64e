use http::StatusCode;
use axum_core::response::{Response, IntoResponse};
use serde::{Serialize, Deserialize};
use strum::AsRefStr as StrumAsRefStr;

use crate::response::{serialize_json, error_json};

#[derive(
    Debug, Clone, PartialEq, Eq,
    StrumAsRefStr,
    Serialize, Deserialize
)]
pub enum AuthKind {
    PermissionDenied,
    Unauthenticated,
    AlreadyAuthenticated,

    MissingCredentials,
    InvalidCredentials,

    TotpRequired,
    InvalidTotp,
    TotpNotSetup,
    TotpSetupRequired,

    EnrollmentExpired,
    VerificationMissing,
    QrEncodingFailed,

    InvalidSession,
    SessionExpired,
    SessionNotFound,

    MechanismNotFound,
}

impl std::fmt::Display for AuthKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_ref(), f)
    }
}

impl From<&AuthKind> for StatusCode {
    fn from(kind: &AuthKind) -> Self {
        match kind {
            AuthKind::PermissionDenied |
            AuthKind::TotpSetupRequired => StatusCode::FORBIDDEN,
            AuthKind::Unauthenticated |
            AuthKind::InvalidCredentials |
            AuthKind::TotpRequired |
            AuthKind::InvalidTotp |
            AuthKind::InvalidSession |
            AuthKind::SessionExpired |
            AuthKind::SessionNotFound |
            AuthKind::MechanismNotFound => StatusCode::UNAUTHORIZED,
            AuthKind::AlreadyAuthenticated |
            AuthKind::MissingCredentials |
            AuthKind::EnrollmentExpired |
            AuthKind::VerificationMissing => StatusCode::BAD_REQUEST,
            AuthKind::TotpNotSetup |
            AuthKind::QrEncodingFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq,
    StrumAsRefStr,
    Serialize, Deserialize
)]
pub enum UserKind {
    NotFound,
    EmailInUse,
}

impl std::fmt::Display for UserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_ref(), f)
    }
}

impl From<&UserKind> for StatusCode {
    fn from(kind: &UserKind) -> Self {
        match kind {
            UserKind::NotFound => StatusCode::NOT_FOUND,
            UserKind::EmailInUse => StatusCode::CONFLICT,
        }
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq,
    StrumAsRefStr,
    Serialize, Deserialize
)]
pub enum TaskKind {
    NotFound,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_ref(), f)
    }
}

impl From<&TaskKind> for StatusCode {
    fn from(kind: &TaskKind) -> Self {
        match kind {
            TaskKind::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq,
    StrumAsRefStr,
    Serialize, Deserialize
)]
pub enum GeneralKind {
    InternalFailure,
    Timeout,

    AlreadyExists,
    NotFound,

    NoWork,

    ValidationFailed,
    InvalidData,
    MissingData,

    InvalidUri,
    InvalidHeaderValue,
    InvalidMethod,
    InvalidRequest,
}

impl std::fmt::Display for GeneralKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_ref(), f)
    }
}

impl From<&GeneralKind> for StatusCode {
    fn from(kind: &GeneralKind) -> StatusCode {
        match kind {
            GeneralKind::InternalFailure => StatusCode::INTERNAL_SERVER_ERROR,
            GeneralKind::Timeout => StatusCode::REQUEST_TIMEOUT,
            GeneralKind::AlreadyExists => StatusCode::CONFLICT,
            GeneralKind::NotFound => StatusCode::NOT_FOUND,
            GeneralKind::NoWork |
            GeneralKind::ValidationFailed |
            GeneralKind::InvalidData |
            GeneralKind::MissingData |
            GeneralKind::InvalidUri |
            GeneralKind::InvalidHeaderValue |
            GeneralKind::InvalidRequest => StatusCode::BAD_REQUEST,
            GeneralKind::InvalidMethod => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq,
    Serialize, Deserialize
)]
pub enum ApiErrorKind {
    General(GeneralKind),
    Auth(AuthKind),
    User(UserKind),
    Task(TaskKind),
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiErrorKind::General(v) => std::fmt::Display::fmt(v, f),
            ApiErrorKind::Auth(v) => std::fmt::Display::fmt(v, f),
            ApiErrorKind::User(v) => std::fmt::Display::fmt(v, f),
            ApiErrorKind::Task(v) => std::fmt::Display::fmt(v, f),
        }
    }
}

impl From<GeneralKind> for ApiErrorKind {
    fn from(v: GeneralKind) -> Self {
        ApiErrorKind::General(v)
    }
}

impl From<AuthKind> for ApiErrorKind {
    fn from(v: AuthKind) -> Self {
        ApiErrorKind::Auth(v)
    }
}

impl From<UserKind> for ApiErrorKind {
    fn from(v: UserKind) -> Self {
        ApiErrorKind::User(v)
    }
}

impl From<TaskKind> for ApiErrorKind {
    fn from(v: TaskKind) -> Self {
        ApiErrorKind::Task(v)
    }
}

impl From<&ApiErrorKind> for StatusCode {
    fn from(kind: &ApiErrorKind) -> Self {
        match kind {
            ApiErrorKind::General(v) => v.into(),
            ApiErrorKind::Auth(v) => v.into(),
            ApiErrorKind::User(v) => v.into(),
            ApiErrorKind::Task(v) => v.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Detail {
    Keys(Vec<String>),
}

impl Detail {
    pub fn with_key(key: impl Into<String>) -> Self {
        Detail::Keys(vec![key.into()])
    }

    pub fn mult_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>
    {
        Detail::Keys(keys.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Display for Detail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Detail::Keys(list) => {
                let mut iter = list.iter();

                if let Some(first) = iter.next() {
                    write!(f, "{}", first)?;

                    while let Some(key) = iter.next() {
                        write!(f, ",{}", key)?;
                    }
                }
            },
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    kind: ApiErrorKind,
    detail: Option<Detail>,
    msg: Option<String>,
}

impl ApiError {
    pub fn new() -> Self {
        ApiError {
            kind: ApiErrorKind::General(GeneralKind::InternalFailure),
            detail: None,
            msg: None
        }
    }

    pub fn with_kind<K>(mut self, kind: K) -> Self
    where
        K: Into<ApiErrorKind>
    {
        self.kind = kind.into();
        self
    }

    pub fn with_detail(mut self, detail: Detail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_message<M>(mut self, msg: M) -> Self
    where
        M: Into<String>
    {
        self.msg = Some(msg.into());
        self
    }

    pub fn kind(&self) -> &ApiErrorKind {
        &self.kind
    }

    pub fn detail(&self) -> Option<&Detail> {
        self.detail.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.msg.as_ref().map(|v| v.as_str())
    }
}

impl std::default::Default for ApiError {
    fn default() -> Self {
        ApiError::new()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }

        if let Some(msg) = &self.msg {
            write!(f, ": {}", msg)?;
        }

        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self.kind);

        match serialize_json(status, &self) {
            Ok(res) => res,
            Err(err) => {
                tracing::error!("ApiError serialization error {:?}", err);
                error_json()
            }
        }
    }
}

impl<K> From<K> for ApiError
where
    K: Into<ApiErrorKind>
{
    fn from(kind: K) -> Self {
        ApiError {
            kind: kind.into(),
            detail: None,
            msg: None
        }
    }
}

impl<K, M> From<(K, M)> for ApiError
where
    K: Into<ApiErrorKind>,
    M: Into<String>,
{
    fn from((kind, msg): (K, M)) -> Self {
        ApiError {
            kind: kind.into(),
            detail: None,
            msg: Some(msg.into())
        }
    }
}

impl<K> From<(K, Detail)> for ApiError
where
    K: Into<ApiErrorKind>
{
    fn from((kind, detail): (K, Detail)) -> Self {
        ApiError {
            kind: kind.into(),
            detail: Some(detail),
            msg: None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn soft_auth_kinds_do_not_map_to_server_faults() {
        let soft = [
            AuthKind::TotpRequired,
            AuthKind::InvalidTotp,
            AuthKind::TotpSetupRequired,
            AuthKind::EnrollmentExpired,
            AuthKind::VerificationMissing,
        ];

        for kind in soft {
            let status = StatusCode::from(&kind);

            assert!(status.is_client_error(), "{kind} mapped to {status}");
        }
    }

    #[test]
    fn inconsistency_kinds_map_to_server_faults() {
        assert_eq!(
            StatusCode::from(&AuthKind::TotpNotSetup),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            StatusCode::from(&AuthKind::QrEncodingFailed),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn display_includes_detail_keys() {
        let err = ApiError::from((
            ApiErrorKind::General(GeneralKind::ValidationFailed),
            Detail::mult_keys(["email", "password"])
        ));

        assert_eq!(err.to_string(), "ValidationFailed: email,password");
    }
}
