use anyhow::Result;
use serde::Deserialize;
use std::env;

use crate::service::DEFAULT_DATASET_NAME;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Unset means datasets are kept in memory only
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: usize,
    pub default_dataset_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: parse_origins(
                    &env::var("ALLOWED_ORIGINS")
                        .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                ),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
            },
            upload: UploadConfig {
                max_bytes: env::var("UPLOAD_MAX_BYTES")
                    .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
                    .parse()?,
                default_dataset_name: env::var("DEFAULT_DATASET_NAME")
                    .unwrap_or_else(|_| DEFAULT_DATASET_NAME.to_string()),
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 8000,
                host: "0.0.0.0".to_string(),
                cors_allowed_origins: parse_origins("http://localhost:3000"),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                min_connections: 1,
            },
            upload: UploadConfig {
                max_bytes: 10 * 1024 * 1024,
                default_dataset_name: DEFAULT_DATASET_NAME.to_string(),
            },
        }
    }
}

/// Comma-separated origin list; `*` allows any origin.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
