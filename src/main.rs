// src/main.rs
use poll_server::{config::Config, start_server};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // Load environment variables from .env file

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("poll_server=info,tower_http=info"));
    fmt().with_env_filter(filter).init();

    let config = Config::load()?;
    start_server(config).await
}
