use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::Level;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    /// No URL means the in-memory store
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_bootstrap_schema: bool,

    pub api_prefix: String,
    /// Requests per minute per peer IP on the API scope; 0 disables limiting
    pub rate_limit_per_min: u32,

    pub log_dir: String,
    pub log_level: Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            server_addr: var("SERVER_ADDR", "127.0.0.1:8080"),
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            db_max_connections: parse("DB_MAX_CONNECTIONS", &var("DB_MAX_CONNECTIONS", "5"))?,
            db_bootstrap_schema: parse(
                "DB_BOOTSTRAP_SCHEMA",
                &var("DB_BOOTSTRAP_SCHEMA", "true"),
            )?,

            api_prefix: var("API_PREFIX", "/api"),
            rate_limit_per_min: parse("RATE_LIMIT_PER_MIN", &var("RATE_LIMIT_PER_MIN", "600"))?,

            log_dir: var("LOG_DIR", "logs"),
            log_level: parse("LOG_LEVEL", &var("LOG_LEVEL", "info"))?,
        })
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value: {raw:?}"))
}
