use std::future::Future;
use std::pin::Pin;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

pub use deadpool_postgres::Object;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;

use crate::config;
use crate::error;
use crate::error::api::{ApiError, Context};
use crate::state::ArcShared;

pub fn from_config(config: &config::Config) -> error::Result<Pool> {
    let mut pg_config = tokio_postgres::Config::new();
    pg_config.user(&config.settings.db.user);
    pg_config.host(&config.settings.db.host);
    pg_config.port(config.settings.db.port);
    pg_config.dbname(&config.settings.db.dbname);

    if let Some(password) = &config.settings.db.password {
        pg_config.password(password);
    }

    let manager_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };
    let manager = Manager::from_config(pg_config, NoTls, manager_config);

    Ok(Pool::builder(manager)
        .max_size(16)
        .build()?)
}

pub struct Conn(pub Object);

impl FromRequestParts<ArcShared> for Conn {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        _parts: &'life0 mut Parts,
        state: &'life1 ArcShared
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait
    {
        let fut = state.pool().get();

        Box::pin(async move {
            fut.await
                .context("failed to retrieve database connection")
                .map(Conn)
        })
    }
}
