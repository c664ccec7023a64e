use axum::Router;
use axum::routing::{get, post, delete};

use crate::state::ArcShared;

mod auth;
mod tasks;

pub fn routes() -> Router<ArcShared> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", delete(auth::logout))
        .route("/auth/session", get(auth::session))
        .route(
            "/auth/totp",
            get(auth::totp::status)
        )
        .route("/auth/totp/request", post(auth::totp::request))
        .route("/auth/totp/verify", post(auth::totp::verify))
        .route("/auth/totp/enable", post(auth::totp::enable))
        .route(
            "/tasks",
            get(tasks::search)
                .post(tasks::create)
        )
        .route(
            "/tasks/:task_id",
            get(tasks::retrieve)
                .patch(tasks::update)
                .delete(tasks::delete)
        )
}
