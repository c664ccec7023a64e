use axum::debug_handler;
use axum::http::{StatusCode, HeaderMap};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;

use taskbook_api::{Payload, Validator};
use taskbook_api::auth::SessionUser;
use taskbook_api::users::{LoginUser, RegisterUser};

use crate::error::{ApiError, ApiResult};
use crate::error::api::{AuthKind, UserKind};
use crate::net::cookie;
use crate::sql;
use crate::state::ArcShared;
use crate::user;
use crate::sec::authn::{self, enrollment, password, session};
use crate::sec::authn::initiator::{self, Mechanism, LookupError};

pub mod totp;

#[debug_handler]
pub async fn register(
    State(state): State<ArcShared>,
    headers: HeaderMap,
    axum::Json(json): axum::Json<RegisterUser>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.pool().get().await?;

    json.validate()?;

    if user::User::query_with_email(&conn, &json.email).await?.is_some() {
        return Err(ApiError::api(UserKind::EmailInUse));
    }

    // opting into totp at registration requires a completed enrollment
    let totp_secret = if json.totp_enabled {
        let Some(value) = cookie::find_cookie_value(&headers, enrollment::VERIFIED_COOKIE)? else {
            return Err(ApiError::api(AuthKind::VerificationMissing));
        };

        let verified = enrollment::decode(
            state.sec(),
            enrollment::Phase::Verified,
            value.as_bytes(),
            Utc::now()
        ).map_err(|err| match err {
            enrollment::DecodeError::Expired => ApiError::api(AuthKind::EnrollmentExpired),
            err => ApiError::api(AuthKind::VerificationMissing).source(err)
        })?;

        if verified.email != json.email {
            return Err(ApiError::api(AuthKind::VerificationMissing));
        }

        Some(verified.secret)
    } else {
        None
    };

    let hash = password::create_hash(&json.password)?;

    let transaction = conn.transaction().await?;

    let created = user::User::create(&transaction, user::CreateParams {
        name: json.name,
        email: json.email,
        hash,
        totp_secret,
    }).await;

    let user = match created {
        Ok(user) => user,
        Err(err) => {
            return Err(if sql::unique_constraint_error(&err).is_some() {
                ApiError::api(UserKind::EmailInUse).source(err)
            } else {
                err.into()
            });
        }
    };

    transaction.commit().await?;

    let expire_verified = user.totp_enabled
        .then(|| enrollment::expire_cookie(state.sec(), enrollment::Phase::Verified));

    Ok((
        StatusCode::CREATED,
        expire_verified,
        Payload::new(user.into_api())
    ))
}

#[debug_handler]
pub async fn login(
    State(state): State<ArcShared>,
    headers: HeaderMap,
    axum::Json(json): axum::Json<LoginUser>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.pool().get().await?;

    json.validate()?;

    match initiator::lookup_header_map(state.sec(), &conn, &headers).await {
        Ok(_) => {
            return Err(ApiError::from(AuthKind::AlreadyAuthenticated));
        },
        Err(err) => match err {
            LookupError::MechanismNotFound |
            LookupError::SessionNotFound |
            LookupError::SessionExpired(_) |
            LookupError::SessionDecode(_) => {},
            _ => {
                return Err(err.into());
            }
        }
    }

    // outside the session transaction so a grace window flip survives a
    // rejected attempt
    let user = authn::authenticate(&mut conn, state.sec(), json.into()).await?;

    let transaction = conn.transaction().await?;

    let session = session::Session::create(&transaction, user.id, user.requires_totp).await?;

    transaction.commit().await?;

    tracing::debug!(
        "session created for user {}: issued {} expires {}",
        user.id,
        session.issued_on,
        session.expires
    );

    let session_cookie = session::create_session_cookie(state.sec(), &session);

    Ok((
        StatusCode::OK,
        session_cookie,
        Payload::new(SessionUser {
            id: user.id,
            name: user.name,
            email: user.email,
            requires_totp: session.requires_totp,
        })
    ))
}

#[debug_handler]
pub async fn logout(
    State(state): State<ArcShared>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.pool().get().await?;

    let session = match initiator::lookup_header_map(state.sec(), &conn, &headers).await {
        Ok(initiator) => match initiator.mechanism {
            Mechanism::Session(session) => session,
        }
        Err(err) => match err {
            LookupError::SessionNotFound |
            LookupError::MechanismNotFound => {
                return Ok((
                    StatusCode::NO_CONTENT,
                    session::expire_session_cookie(state.sec()),
                    ()
                ));
            }
            LookupError::SessionExpired(session) => session,
            LookupError::UserNotFound(mechanism) => match mechanism {
                Mechanism::Session(session) => session
            }
            err => {
                return Err(err.into());
            }
        }
    };

    let transaction = conn.transaction().await?;

    session.delete(&transaction).await?;

    transaction.commit().await?;

    Ok((
        StatusCode::NO_CONTENT,
        session::expire_session_cookie(state.sec()),
        ()
    ))
}

pub async fn session(
    initiator: initiator::Initiator,
) -> ApiResult<impl IntoResponse> {
    let requires_totp = initiator.session().requires_totp;
    let user = initiator.user;

    Ok(Payload::new(SessionUser {
        id: user.id,
        name: user.name,
        email: user.email,
        requires_totp,
    }))
}
