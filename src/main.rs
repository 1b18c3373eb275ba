use stock_ingest_backend::app::{self, AppState};
use stock_ingest_backend::utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cfg = utils::config::ServerConfig::from_env()?;
    let _log_guard = utils::logging::init_logging(&cfg);

    let store = app::build_store(&cfg)?;
    let state = AppState::new(store, cfg.upload_dir.clone());
    let app = app::build_app(state, cfg.upload_max_bytes, &cfg.allowed_origins);

    let listener = tokio::net::TcpListener::bind(cfg.addr).await?;
    tracing::info!("Axum listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
