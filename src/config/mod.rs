//! Configuration module for the Recipe Hub backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Directory uploaded images are written to
    pub upload_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Secret used to sign bearer tokens
    pub jwt_secret: String,
    /// Bearer token lifetime in hours
    pub token_ttl_hours: u64,
    /// Public frontend URL used in share and password-reset links
    pub public_url: String,
    /// Window in seconds during which identical notifications are suppressed
    pub dedupe_window_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let db_path = env::var("RECIPES_DB_PATH")
            .unwrap_or_else(|_| "./data/recipes.sqlite".to_string())
            .into();

        let index_path = env::var("RECIPES_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let upload_dir = env::var("RECIPES_UPLOAD_DIR")
            .unwrap_or_else(|_| "./data/uploads".to_string())
            .into();

        let bind_addr = env::var("RECIPES_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| format!("Invalid RECIPES_BIND_ADDR format: {}", e))?;

        let log_level = env::var("RECIPES_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let jwt_secret = match env::var("RECIPES_JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => ephemeral_secret(),
        };

        let token_ttl_hours = parse_number("RECIPES_TOKEN_TTL_HOURS", 24)?;
        let dedupe_window_secs = parse_number("RECIPES_DEDUPE_WINDOW_SECS", 300)?;

        let public_url = env::var("RECIPES_PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:4200".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            db_path,
            index_path,
            upload_dir,
            bind_addr,
            log_level,
            jwt_secret,
            token_ttl_hours,
            public_url,
            dedupe_window_secs,
        })
    }

    /// Whether the signing secret was generated for this process only.
    pub fn has_ephemeral_secret(&self) -> bool {
        env::var("RECIPES_JWT_SECRET")
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
    }
}

fn parse_number(key: &str, default: u64) -> Result<u64, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {} value {:?}: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

/// Tokens signed with this secret stop verifying once the process exits.
fn ephemeral_secret() -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..48).map(|_| rng.random::<u8>()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}
