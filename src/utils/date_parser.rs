use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// 支持的日期格式，按顺序尝试
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%b %d, %Y",
];

/// 带时间的写法（pandas 默认导出 `2023-01-02 00:00:00`），只取日期部分
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// 解析日期字符串为 NaiveDate
///
/// CSV 行和查询参数共用同一套规则：
/// - 去除首尾空白，空字符串返回 None
/// - 依次尝试 `DATE_FORMATS` 中的格式（`02-Jan-2023` 为 NSE bhavcopy 格式）
/// - 再尝试 `DATETIME_FORMATS` 和 RFC 3339 时间戳，只取日期部分
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}
