// src/config.rs
use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Result};
use tracing::info;

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Directory with the browser client, served at `/` when set.
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("PORT", "3000")?,
            database_url: try_load("DATABASE_URL", "sqlite://votes.db?mode=rwc")?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
            static_dir: env::var("STATIC_DIR").ok().map(PathBuf::from),
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}
