use chrono::NaiveDate;
use thiserror::Error;

use crate::api_models::stock_query::RangeQuery;
use crate::repositories::RecordFilter;
use crate::utils::date_parser::parse_date;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} is not a valid date: {value}")]
    InvalidDate { field: &'static str, value: String },
}

/// 将查询参数转换为存储层过滤条件
///
/// - start_date / end_date 必填，解析规则与 CSV 导入相同
/// - symbol 为空字符串时视为未提供
/// - start_date 晚于 end_date 时不报错，结果为空
pub fn build_filter(q: &RangeQuery) -> Result<RecordFilter, FilterError> {
    let start_date = required_date(q.start_date.as_deref(), "start_date")?;
    let end_date = required_date(q.end_date.as_deref(), "end_date")?;
    let symbol = q
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(RecordFilter {
        start_date,
        end_date,
        symbol,
    })
}

fn required_date(value: Option<&str>, field: &'static str) -> Result<NaiveDate, FilterError> {
    let value = value
        .filter(|v| !v.trim().is_empty())
        .ok_or(FilterError::Missing(field))?;
    parse_date(value).ok_or_else(|| FilterError::InvalidDate {
        field,
        value: value.to_string(),
    })
}
