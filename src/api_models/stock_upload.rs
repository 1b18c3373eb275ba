use serde::Serialize;

use crate::services::ingest_service::{IngestionReport, RawRow};

/// CSV 上传响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub total_records: usize,
    pub successful_records: usize,
    pub failed_records: usize,
    /// 未通过校验的原始行
    pub failed_details: Vec<RawRow>,
}

impl From<IngestionReport> for UploadResponse {
    fn from(report: IngestionReport) -> Self {
        Self {
            total_records: report.total,
            successful_records: report.accepted,
            failed_records: report.rejected,
            failed_details: report.rejected_rows.into_iter().map(|r| r.raw).collect(),
        }
    }
}
