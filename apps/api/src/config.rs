use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Directory holding stored résumés.
    pub uploads_dir: PathBuf,
    /// `production` hides error details from responses.
    pub app_env: String,
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_source(|key| std::env::var(key).ok())
    }

    fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            get(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            port: get("PORT")
                .unwrap_or_else(|| "3010".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            uploads_dir: get("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads/cvs")),
            app_env: get("APP_ENV").unwrap_or_else(|| "development".to_string()),
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}
