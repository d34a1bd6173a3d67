// routes.rs
use std::{path::Path, time::Duration};

use axum::{
    routing::{get, post},
    Router,
};
use http::{header::CONTENT_TYPE, Method};
use sqlx::SqlitePool;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
}

pub fn create_routes(pool: SqlitePool, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/polls", get(handlers::list_polls).post(handlers::create_poll))
        .route("/polls/{id}", get(handlers::get_poll))
        .route("/polls/{id}/vote", post(handlers::submit_vote))
        .route("/polls/{id}/results", get(handlers::get_results));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let mut app = Router::new()
        .nest("/api", api)
        .with_state(AppState { pool });

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}
