use axum::debug_handler;
use axum::http::{StatusCode, HeaderMap};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;

use taskbook_api::{Payload, Validator};
use taskbook_api::auth::{
    EnableTotp,
    RequestTotp,
    SubmitTotp,
    TotpEnrollment,
    TotpStatus,
    TotpVerified,
};

use crate::error::{ApiError, ApiResult};
use crate::error::api::{AuthKind, Context, UserKind};
use crate::net::cookie;
use crate::state::ArcShared;
use crate::user;
use crate::sec::authn::{enrollment, session, totp};
use crate::sec::authn::enrollment::Phase;
use crate::sec::authn::initiator::Initiator;

fn enrollment_api_error(err: enrollment::DecodeError) -> ApiError {
    match err {
        enrollment::DecodeError::Expired => ApiError::api(AuthKind::EnrollmentExpired),
        err => {
            tracing::debug!("discarding unusable enrollment token: {err}");

            ApiError::api(AuthKind::EnrollmentExpired).source(err)
        }
    }
}

/// Starts (or restarts) enrollment. Nothing durable happens here; the
/// freshly generated secret only lives in the pending cookie, and any
/// previously issued pending cookie is overwritten.
#[debug_handler]
pub async fn request(
    State(state): State<ArcShared>,
    axum::Json(json): axum::Json<RequestTotp>,
) -> ApiResult<impl IntoResponse> {
    json.validate()?;

    let issuer = state.sec().totp().issuer();

    let secret = totp::create_secret();
    let uri = totp::provisioning_uri(&secret, issuer, &json.email)?;
    let qr_code = totp::render_qr(&secret, issuer, &json.email)?;

    let pending = enrollment::Enrollment::new(json.email, secret, Utc::now());
    let pending_cookie = enrollment::create_cookie(state.sec(), Phase::Pending, &pending)
        .context("failed to encode pending enrollment token")?;

    Ok((
        StatusCode::OK,
        pending_cookie,
        Payload::new(TotpEnrollment {
            qr_code,
            uri,
        })
    ))
}

/// Proves possession of the pending secret. A valid code upgrades the
/// pending cookie to a verified one with a fresh ten minute window.
#[debug_handler]
pub async fn verify(
    State(state): State<ArcShared>,
    headers: HeaderMap,
    axum::Json(json): axum::Json<SubmitTotp>,
) -> ApiResult<impl IntoResponse> {
    json.validate()?;

    let Some(value) = cookie::find_cookie_value(&headers, enrollment::PENDING_COOKIE)? else {
        return Err(ApiError::api(AuthKind::EnrollmentExpired));
    };

    let now = Utc::now();
    let pending = enrollment::decode(state.sec(), Phase::Pending, value.as_bytes(), now)
        .map_err(enrollment_api_error)?;

    let issuer = state.sec().totp().issuer();

    if !totp::verify(&json.code, &pending.secret, issuer, &pending.email)? {
        return Err(ApiError::api(AuthKind::InvalidTotp));
    }

    let verified = enrollment::Enrollment::new(pending.email, pending.secret, now);
    let verified_cookie = enrollment::create_cookie(state.sec(), Phase::Verified, &verified)
        .context("failed to encode verified enrollment token")?;

    Ok((
        StatusCode::OK,
        verified_cookie,
        enrollment::expire_cookie(state.sec(), Phase::Pending),
        Payload::new(TotpVerified {
            verified: true,
        })
    ))
}

/// Post-login mandatory setup for an existing account. The caller must
/// hold a session for the account being enrolled.
pub async fn enable(
    State(state): State<ArcShared>,
    initiator: Initiator,
    headers: HeaderMap,
    axum::Json(json): axum::Json<EnableTotp>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.pool().get().await?;

    json.validate()?;

    let target = user::User::query_with_email(&conn, &json.email)
        .await?
        .kind(UserKind::NotFound)?;

    if initiator.user.id != target.id {
        return Err(ApiError::api(AuthKind::PermissionDenied));
    }

    let Some(value) = cookie::find_cookie_value(&headers, enrollment::PENDING_COOKIE)? else {
        return Err(ApiError::api(AuthKind::EnrollmentExpired));
    };

    let now = Utc::now();
    let pending = enrollment::decode(state.sec(), Phase::Pending, value.as_bytes(), now)
        .map_err(enrollment_api_error)?;

    if pending.email != target.email {
        return Err(ApiError::api(AuthKind::EnrollmentExpired));
    }

    let issuer = state.sec().totp().issuer();

    if !totp::verify(&json.code, &pending.secret, issuer, &pending.email)? {
        return Err(ApiError::api(AuthKind::InvalidTotp));
    }

    let transaction = conn.transaction().await?;

    if !user::User::enable_totp(&transaction, &target.id, &pending.secret).await? {
        return Err(ApiError::new()
            .context("failed to store totp secret for user"));
    }

    let _ = session::refresh_requires_totp(&transaction, &target.id, false).await?;

    transaction.commit().await?;

    Ok((
        StatusCode::OK,
        enrollment::expire_cookie(state.sec(), Phase::Pending),
        enrollment::expire_cookie(state.sec(), Phase::Verified),
        Payload::new(TotpVerified {
            verified: true,
        })
    ))
}

/// Reports whether the account must enroll before continuing, flipping
/// the stored flag the first time the grace window is seen to have
/// lapsed.
pub async fn status(
    State(state): State<ArcShared>,
    initiator: Initiator,
) -> ApiResult<impl IntoResponse> {
    let user = initiator.user();

    if user.totp_enabled {
        return Ok(Payload::new(TotpStatus { required: false }));
    }

    if user.requires_totp {
        return Ok(Payload::new(TotpStatus { required: true }));
    }

    let now = Utc::now();

    if now - user.created >= *state.sec().totp().grace() {
        let mut conn = state.pool().get().await?;
        let transaction = conn.transaction().await?;

        // the predicate makes concurrent checks settle on one flip
        let _ = user::User::flip_requires_totp(&transaction, &user.id).await?;
        let _ = session::refresh_requires_totp(&transaction, &user.id, true).await?;

        transaction.commit().await?;

        return Ok(Payload::new(TotpStatus { required: true }));
    }

    Ok(Payload::new(TotpStatus { required: false }))
}
