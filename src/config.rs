//! Configuration management

use anyhow::{Context, Result};
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub github_api_url: String,
    pub github_token: Option<String>,
    pub record_store_url: Option<String>,
    pub record_store_token: Option<String>,
    pub session_secret: String,
    pub session_ttl_seconds: u64,
    pub nonce_ttl_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8091".to_string())
                .parse()
                .context("Invalid PORT")?,

            github_api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),

            github_token: env::var("GITHUB_TOKEN").ok(),

            // Absent means the in-memory account store (standalone mode)
            record_store_url: env::var("RECORD_STORE_URL").ok(),

            record_store_token: env::var("RECORD_STORE_TOKEN").ok(),

            session_secret: env::var("SESSION_SECRET")
                .unwrap_or_else(|_| "dev-session-secret".to_string()),

            session_ttl_seconds: env::var("SESSION_TTL_SECONDS")
                .unwrap_or_else(|_| "604800".to_string()) // 7 days
                .parse()
                .context("Invalid SESSION_TTL_SECONDS")?,

            nonce_ttl_seconds: env::var("NONCE_TTL_SECONDS")
                .unwrap_or_else(|_| "300".to_string()) // 5 minutes
                .parse()
                .context("Invalid NONCE_TTL_SECONDS")?,
        })
    }
}
