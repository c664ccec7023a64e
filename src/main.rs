use std::sync::Arc;

use tracing_subscriber::{FmtSubscriber, EnvFilter};

mod error;
mod path;
mod sql;
mod db;
mod net;
mod user;
mod tasks;
mod sec;
mod state;
mod routing;
mod config;

fn main() {
    use tokio::runtime::Builder;

    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .expect("failed to initialize global tracing subscriber");

    let rt = match Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .max_blocking_threads(4)
        .build() {
        Ok(rt) => rt,
        Err(err) => {
            panic!("failed to start tokio runtime. {}", err);
        }
    };

    tracing::event!(
        tracing::Level::INFO,
        "started tokio runtime"
    );

    if let Err(err) = rt.block_on(init()) {
        tracing::error!("{err}");
    }
}

async fn init() -> error::Result<()> {
    let config = config::get_config()?;
    let state = Arc::new(state::Shared::from_config(&config)?);

    let router = routing::routes(&state);

    let tcp_listener = std::net::TcpListener::bind(config.settings.listener)?;
    tcp_listener.set_nonblocking(true)?;

    match tcp_listener.local_addr() {
        Ok(addr) => {
            tracing::info!("tcp socket listener: {addr}");
        }
        Err(err) => {
            tracing::error!("failed to retrieve tcp listener address: {err}");
        }
    }

    axum_server::from_tcp(tcp_listener)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}
