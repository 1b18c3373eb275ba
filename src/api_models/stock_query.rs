use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 区间查询参数，日期格式与 CSV 导入一致
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockRecordResponse {
    pub date: NaiveDate,
    pub symbol: String,
    pub series: String,
    pub prev_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub last: f64,
    pub close: f64,
    pub vwap: f64,
    pub volume: i64,
    pub turnover: f64,
    pub trades: i64,
    pub deliverable: i64,
    pub percent_deliverable: f64,
}

/// 没有匹配记录时 average_close 为 0，matched_records 为 0
#[derive(Debug, Serialize)]
pub struct AverageCloseResponse {
    pub average_close: f64,
    pub matched_records: i64,
}

#[derive(Debug, Serialize)]
pub struct AverageVwapResponse {
    pub average_vwap: f64,
    pub matched_records: i64,
}
