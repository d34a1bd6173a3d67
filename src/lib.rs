//! REST backend for a small polling site.
//!
//! Users create polls with at least two options, vote once per poll (one vote
//! per client address) and read live tallies. Everything is stored in SQLite;
//! the schema lives in `migrations/` and is applied on startup.
//!
//! | Method & path                  | Purpose                     |
//! |--------------------------------|-----------------------------|
//! | `GET  /api/polls`              | list polls, newest first    |
//! | `POST /api/polls`              | create a poll and options   |
//! | `GET  /api/polls/{id}`         | poll detail with options    |
//! | `POST /api/polls/{id}/vote`    | cast a vote                 |
//! | `GET  /api/polls/{id}/results` | per-option tallies          |
use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal::ctrl_c;
use tracing::info;

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod poll;
pub mod routes;
pub mod vote;

use config::Config;

/// Serve until Ctrl+C or SIGTERM, then close the pool.
pub async fn start_server(config: Config) -> anyhow::Result<()> {
    info!("Opening database...");
    let pool = db::create_pool(&config).await?;

    let app = routes::create_routes(pool.clone(), config.static_dir.as_deref());

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    info!("Server running on {address}");
    axum_server::bind(address)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    pool.close().await;
    info!("Closed the database connection");

    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        ctrl_c().await.ok();
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
