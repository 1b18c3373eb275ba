use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use crate::api_models::stock_query::{
    AverageCloseResponse, AverageVwapResponse, RangeQuery, StockRecordResponse,
};
use crate::app::AppState;
use crate::handler::error::AppError;
use crate::models::StockRecord;
use crate::repositories::{StockStore, StoreError};
use crate::services::stock_query::build_filter;

impl From<StockRecord> for StockRecordResponse {
    fn from(r: StockRecord) -> Self {
        Self {
            date: r.trade_date,
            symbol: r.symbol,
            series: r.series,
            prev_close: r.prev_close,
            open: r.open_price,
            high: r.high_price,
            low: r.low_price,
            last: r.last_price,
            close: r.close_price,
            vwap: r.vwap,
            volume: r.volume,
            turnover: r.turnover,
            trades: r.trades,
            deliverable: r.deliverable,
            percent_deliverable: r.percent_deliverable,
        }
    }
}

/// 区间内成交量最大的记录，返回 0 或 1 个元素的数组
pub async fn highest_volume(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> Result<Json<Vec<StockRecordResponse>>, AppError> {
    let filter = build_filter(&q)?;
    let found = run_query(state.store.clone(), move |store| store.max_volume(&filter))
        .await
        .map_err(|e| {
            tracing::error!("Failed to query highest volume: {}", e);
            AppError::QueryError("Error retrieving data")
        })?;

    Ok(Json(found.into_iter().map(Into::into).collect()))
}

/// 收盘价均值，无匹配记录时为 0
pub async fn average_close(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> Result<Json<AverageCloseResponse>, AppError> {
    let filter = build_filter(&q)?;
    let avg = run_query(state.store.clone(), move |store| store.average_close(&filter))
        .await
        .map_err(|e| {
            tracing::error!("Failed to calculate average close: {}", e);
            AppError::QueryError("Error calculating average close")
        })?;

    Ok(Json(AverageCloseResponse {
        average_close: avg.value.unwrap_or(0.0),
        matched_records: avg.matched,
    }))
}

/// VWAP 均值，无匹配记录时为 0
pub async fn average_vwap(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> Result<Json<AverageVwapResponse>, AppError> {
    let filter = build_filter(&q)?;
    let avg = run_query(state.store.clone(), move |store| store.average_vwap(&filter))
        .await
        .map_err(|e| {
            tracing::error!("Failed to calculate average VWAP: {}", e);
            AppError::QueryError("Error calculating average VWAP")
        })?;

    Ok(Json(AverageVwapResponse {
        average_vwap: avg.value.unwrap_or(0.0),
        matched_records: avg.matched,
    }))
}

/// 数据库调用是阻塞的，放到阻塞线程池执行
async fn run_query<T, F>(store: Arc<dyn StockStore>, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&dyn StockStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| StoreError::Unavailable(format!("query task failed: {e}")))?
}
