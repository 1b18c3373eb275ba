use std::path::Path;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};

use crate::api_models::stock_upload::UploadResponse;
use crate::app::AppState;
use crate::handler::error::AppError;
use crate::services::ingest_service::{self, IngestError};
use crate::utils::temp_upload::TempUpload;

/// multipart 中承载 CSV 的字段名
pub const UPLOAD_FIELD: &str = "file";

/// 上传 CSV 并导入股票日线记录
pub async fn upload_stock_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    // 1. 校验类型并落盘到临时文件
    let (upload, content_type) = receive_csv_upload(&mut multipart, &state.upload_dir).await?;

    // 2. 在阻塞线程池中解析并批量写入，结束后删除临时文件
    let store = state.store.clone();
    let report = tokio::task::spawn_blocking(move || {
        let result = upload
            .reopen()
            .map_err(IngestError::from)
            .and_then(|file| ingest_service::ingest(file, Some(content_type.as_str()), store.as_ref()));
        upload.discard();
        result
    })
    .await
    .map_err(|e| {
        tracing::error!("CSV ingest task failed: {}", e);
        AppError::InternalServerError
    })??;

    Ok(Json(report.into()))
}

/// 读取第一个 `file` 字段，类型不是 text/csv 时在写盘前拒绝
async fn receive_csv_upload(
    multipart: &mut Multipart,
    upload_dir: &Path,
) -> Result<(TempUpload, String), AppError> {
    while let Some(mut field) = multipart.next_field().await.map_err(map_multipart_err)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        ingest_service::ensure_csv(content_type.as_deref())?;

        let file_name = field.file_name().unwrap_or("-").to_string();
        let mut upload = TempUpload::create_in(upload_dir).await.map_err(|e| {
            tracing::error!("Failed to create upload file in {}: {}", upload_dir.display(), e);
            AppError::InternalServerError
        })?;

        while let Some(chunk) = field.chunk().await.map_err(map_multipart_err)? {
            upload.write_chunk(&chunk).await.map_err(write_err)?;
        }
        upload.finish().await.map_err(write_err)?;

        tracing::info!("Received CSV upload {} ({} bytes)", file_name, upload.len());
        return Ok((upload, content_type.unwrap_or_default()));
    }

    Err(AppError::UnsupportedMediaType)
}

fn write_err(err: std::io::Error) -> AppError {
    tracing::error!("Failed to write upload file: {}", err);
    AppError::InternalServerError
}

fn map_multipart_err(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("Upload rejected: {}", err.body_text());
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(err.body_text())
    }
}
