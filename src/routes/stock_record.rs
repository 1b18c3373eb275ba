use axum::{
    routing::{get, post},
    Router,
};

use crate::app::AppState;
use crate::handler::stock_query::{average_close, average_vwap, highest_volume};
use crate::handler::stock_upload::upload_stock_csv;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_stock_csv))
        .route("/highest_volume", get(highest_volume))
        .route("/average_close", get(average_close))
        .route("/average_vwap", get(average_vwap))
}
