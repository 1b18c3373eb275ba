use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use tracing::Level;

use crate::repositories::{MemoryStockStore, PgStockStore, StockStore, StoreError};
use crate::routes;
use crate::utils::config::{ConfigError, ServerConfig, StoreBackend};
use crate::utils::middleware;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StockStore>,
    /// 上传文件的临时目录
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(store: Arc<dyn StockStore>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            upload_dir: upload_dir.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 按配置创建存储句柄
pub fn build_store(cfg: &ServerConfig) -> Result<Arc<dyn StockStore>, StartupError> {
    match cfg.store_backend {
        StoreBackend::Postgres => {
            let url = cfg
                .database_url
                .as_deref()
                .ok_or(ConfigError::MissingDatabaseUrl)?;
            let store = PgStockStore::connect(url, cfg.db_pool_size)?;
            tracing::info!("Using PostgreSQL store (pool size {})", cfg.db_pool_size);
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, records are lost on restart");
            Ok(Arc::new(MemoryStockStore::new()))
        }
    }
}

pub fn build_app(
    state: AppState,
    upload_max_bytes: usize,
    allowed_origins: &[HeaderValue],
) -> Router {
    routes::build_routes()
        .with_state(state)
        .layer(DefaultBodyLimit::max(upload_max_bytes))
        .layer(middleware::cors_layer(allowed_origins))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
