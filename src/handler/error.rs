use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::ingest_service::IngestError;
use crate::services::stock_query::FilterError;

const UPLOAD_CSV_MESSAGE: &str = "Please upload a CSV file";
const PERSISTENCE_MESSAGE: &str = "Error saving data to database";
const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Uploaded file exceeds the size limit";

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// 上传字段缺失或不是 text/csv
    UnsupportedMediaType,
    /// 请求体超过 UPLOAD_MAX_BYTES
    PayloadTooLarge,
    /// 批量写入失败，整次上传视为失败
    PersistenceError,
    /// 查询或聚合失败，携带对外提示信息
    QueryError(&'static str),
    InternalServerError,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "bad request", "message": msg})),
            )
                .into_response(),
            AppError::UnsupportedMediaType => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "bad request", "message": UPLOAD_CSV_MESSAGE})),
            )
                .into_response(),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({"error": "payload too large", "message": PAYLOAD_TOO_LARGE_MESSAGE})),
            )
                .into_response(),
            AppError::PersistenceError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal server error", "message": PERSISTENCE_MESSAGE})),
            )
                .into_response(),
            AppError::QueryError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal server error", "message": msg})),
            )
                .into_response(),
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal server error"})),
            )
                .into_response(),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedMediaType(_) => AppError::UnsupportedMediaType,
            IngestError::Persistence(_) => AppError::PersistenceError,
            IngestError::Read(e) => {
                tracing::error!("Failed to read uploaded file: {}", e);
                AppError::InternalServerError
            }
            IngestError::Csv(e) => {
                tracing::error!("Failed to parse uploaded CSV: {}", e);
                AppError::InternalServerError
            }
        }
    }
}

impl From<FilterError> for AppError {
    fn from(err: FilterError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
