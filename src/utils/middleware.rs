use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];

/// 未配置 ALLOWED_ORIGINS 时退回本地前端开发地址
fn effective_origins(configured: &[HeaderValue]) -> Vec<HeaderValue> {
    if configured.is_empty() {
        DEV_ORIGINS.into_iter().map(HeaderValue::from_static).collect()
    } else {
        configured.to_vec()
    }
}

pub fn cors_layer(allowed_origins: &[HeaderValue]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(effective_origins(allowed_origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
