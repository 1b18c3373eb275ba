use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::HeaderValue;
use thiserror::Error;

const DEFAULT_UPLOAD_MAX_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid HOST/PORT: {0}")]
    InvalidAddr(String),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("DATABASE_URL not set")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_pool_size: u32,
    pub upload_dir: PathBuf,
    pub upload_max_bytes: usize,
    /// 为空时使用本地开发来源
    pub allowed_origins: Vec<HeaderValue>,
    pub log_to_file: bool,
    pub log_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源读取配置，便于测试
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = parse_or(var("PORT"), "PORT", 3000)?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(format!("{}:{}", host, port)))?;

        let backend = var("STORE_BACKEND").map(|v| v.to_ascii_lowercase());
        let store_backend = match backend.as_deref() {
            None | Some("postgres") | Some("pg") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let database_url = var("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        Ok(Self {
            addr,
            store_backend,
            database_url,
            db_pool_size: parse_or(var("DB_POOL_SIZE"), "DB_POOL_SIZE", 10)?,
            upload_dir: PathBuf::from(var("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string())),
            upload_max_bytes: parse_or(var("UPLOAD_MAX_BYTES"), "UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES)?,
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .transpose()?
                .unwrap_or_default(),
            log_to_file: parse_flag(var("LOG_TO_FILE"), "LOG_TO_FILE")?,
            log_dir: PathBuf::from(var("LOG_DIR").unwrap_or_else(|| "./logs".to_string())),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue { name, value: v }),
    }
}

fn parse_flag(value: Option<String>, name: &'static str) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::InvalidValue {
            name,
            value: value.unwrap_or_default(),
        }),
    }
}

/// 逗号分隔的来源列表，每项必须是 http(s) 来源，空项忽略
fn parse_origins(raw: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| {
            let is_http = o.starts_with("http://") || o.starts_with("https://");
            HeaderValue::from_str(o)
                .ok()
                .filter(|_| is_http)
                .ok_or_else(|| ConfigError::InvalidValue {
                    name: "ALLOWED_ORIGINS",
                    value: o.to_string(),
                })
        })
        .collect()
}
