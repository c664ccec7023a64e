use std::ops::Deref;
use std::pin::Pin;
use std::future::Future;

use axum::http::header::HeaderMap;
use axum::http::request::Parts;
use axum::extract::FromRequestParts;
use deadpool_postgres::{Pool, GenericClient};

use crate::error::api::{ApiError, AuthKind, UserKind};
use crate::net::cookie;
use crate::sec::state;
use crate::user;

use super::session;

#[derive(Debug)]
pub enum Mechanism {
    Session(session::Session),
}

pub struct Initiator {
    pub user: user::User,
    pub mechanism: Mechanism,
}

impl Initiator {
    pub fn user(&self) -> &user::User {
        &self.user
    }

    pub fn session(&self) -> &session::Session {
        match &self.mechanism {
            Mechanism::Session(session) => session,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("session was not found")]
    SessionNotFound,

    #[error("session has expired")]
    SessionExpired(session::Session),

    #[error("user was not found")]
    UserNotFound(Mechanism),

    #[error("no authentication mechanism was found")]
    MechanismNotFound,

    #[error(transparent)]
    SessionDecode(#[from] session::DecodeError),

    #[error(transparent)]
    Database(#[from] tokio_postgres::Error),

    #[error(transparent)]
    HeaderToStr(#[from] axum::http::header::ToStrError),
}

impl From<LookupError> for ApiError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::SessionNotFound => ApiError::api(AuthKind::SessionNotFound),
            LookupError::SessionExpired(_session) => ApiError::api(AuthKind::SessionExpired),

            LookupError::UserNotFound(_mechanism) => ApiError::api(UserKind::NotFound),

            LookupError::MechanismNotFound => ApiError::api(AuthKind::MechanismNotFound),

            LookupError::Database(e) => e.into(),
            LookupError::HeaderToStr(e) => e.into(),

            LookupError::SessionDecode(err) => match err {
                session::DecodeError::InvalidString |
                session::DecodeError::InvalidLength |
                session::DecodeError::InvalidHash => ApiError::api(AuthKind::InvalidSession),
            }
        }
    }
}

pub async fn lookup_session_id<S>(
    sec: &state::Sec,
    conn: &impl GenericClient,
    session_id: S
) -> Result<Initiator, LookupError>
where
    S: AsRef<[u8]>
{
    let (token, _hash) = session::decode_base64(sec, session_id)?;

    if let Some(session) = session::Session::retrieve_token(conn, &token).await? {
        let now = chrono::Utc::now();

        if session.expires < now {
            return Err(LookupError::SessionExpired(session));
        }

        if let Some(user) = user::User::retrieve(conn, &session.user_id).await? {
            Ok(Initiator {
                user,
                mechanism: Mechanism::Session(session),
            })
        } else {
            Err(LookupError::UserNotFound(Mechanism::Session(session)))
        }
    } else {
        Err(LookupError::SessionNotFound)
    }
}

pub async fn lookup_header_map(
    sec: &state::Sec,
    conn: &impl GenericClient,
    headers: &HeaderMap
) -> Result<Initiator, LookupError> {
    if let Some(found) = cookie::find_cookie_value(headers, session::SESSION_COOKIE)? {
        return lookup_session_id(sec, conn, found.as_bytes()).await;
    }

    Err(LookupError::MechanismNotFound)
}

impl<A, S> FromRequestParts<A> for Initiator
where
    A: Deref<Target = S> + Sync,
    S: AsRef<state::Sec> + AsRef<Pool> + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 A,
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait
    {
        Box::pin(async move {
            // Deref instead of requiring crate::state::Shared keeps this
            // usable with any state that exposes the pool and sec structs
            let state_deref = state.deref();

            let sec: &state::Sec = state_deref.as_ref();
            let pool: &Pool = state_deref.as_ref();
            let conn = pool.get().await?;

            Ok(lookup_header_map(sec, &conn, &parts.headers).await?)
        })
    }
}
