use std::io::Read;

use chrono::NaiveDate;
use csv::{ByteRecord, ReaderBuilder};
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

use crate::models::NewStockRecord;
use crate::repositories::{BatchAtomicity, StockStore, StoreError};
use crate::utils::date_parser::parse_date;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// CSV 表头列名（需完全一致）
pub mod columns {
    pub const DATE: &str = "Date";
    pub const SYMBOL: &str = "Symbol";
    pub const SERIES: &str = "Series";
    pub const PREV_CLOSE: &str = "PrevClose";
    pub const OPEN: &str = "Open";
    pub const HIGH: &str = "High";
    pub const LOW: &str = "Low";
    pub const LAST: &str = "Last";
    pub const CLOSE: &str = "Close";
    pub const VWAP: &str = "VWAP";
    pub const VOLUME: &str = "Volume";
    pub const TURNOVER: &str = "Turnover";
    pub const TRADES: &str = "Trades";
    pub const DELIVERABLE: &str = "Deliverable";
    pub const PERCENT_DELIVERABLE: &str = "%Deliverable";

    pub const EXPECTED: [&str; 15] = [
        DATE,
        SYMBOL,
        SERIES,
        PREV_CLOSE,
        OPEN,
        HIGH,
        LOW,
        LAST,
        CLOSE,
        VWAP,
        VOLUME,
        TURNOVER,
        TRADES,
        DELIVERABLE,
        PERCENT_DELIVERABLE,
    ];
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

/// 单行校验失败原因，只记入报告，不会中断整批导入
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowValidationFailure {
    #[error("missing field {0}")]
    Missing(&'static str),
    #[error("{field} is not a valid date: {value:?}")]
    InvalidDate { field: &'static str, value: String },
    #[error("{field} is not a finite number: {value:?}")]
    InvalidDecimal { field: &'static str, value: String },
    #[error("{field} is not an integer: {value:?}")]
    InvalidInteger { field: &'static str, value: String },
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// 原始 CSV 行：按列顺序保存 表头 -> 原始值，序列化为 JSON 对象
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow(Vec<(String, String)>);

impl RawRow {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self(fields)
    }

    /// 超出表头宽度的字段以 `_<下标>` 命名
    fn from_record(headers: &[String], record: &ByteRecord) -> Self {
        let fields = record
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let key = headers.get(i).cloned().unwrap_or_else(|| format!("_{i}"));
                (key, String::from_utf8_lossy(value).into_owned())
            })
            .collect();
        Self(fields)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    /// CSV 中的行号（表头为第 1 行）
    pub line: u64,
    pub raw: RawRow,
    pub reason: RowValidationFailure,
}

#[derive(Debug, Default)]
pub struct ParsedUpload {
    pub accepted: Vec<NewStockRecord>,
    pub rejected: Vec<RejectedRow>,
}

/// 单次上传的导入结果，total == accepted + rejected
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionReport {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub rejected_rows: Vec<RejectedRow>,
}

/// 校验上传内容类型，只接受 text/csv（忽略 charset 等参数）
pub fn ensure_csv(content_type: Option<&str>) -> Result<(), IngestError> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .unwrap_or_default();

    if essence.eq_ignore_ascii_case(CSV_CONTENT_TYPE) {
        Ok(())
    } else {
        Err(IngestError::UnsupportedMediaType(essence.to_string()))
    }
}

/// 导入流程：类型校验 -> 逐行解析校验 -> 一次性批量写入 -> 生成报告
pub fn ingest<R: Read>(
    reader: R,
    content_type: Option<&str>,
    store: &dyn StockStore,
) -> Result<IngestionReport, IngestError> {
    ensure_csv(content_type)?;

    let parsed = parse_rows(reader)?;
    let accepted = parsed.accepted.len();
    let rejected = parsed.rejected.len();

    if accepted > 0 {
        if store.batch_atomicity() == BatchAtomicity::BestEffort {
            tracing::warn!("store does not guarantee all-or-nothing batches, a failure may leave partial rows");
        }
        let written = store.insert_batch(&parsed.accepted).map_err(|e| {
            tracing::error!("Failed to persist {} stock records: {}", accepted, e);
            IngestError::Persistence(e)
        })?;
        tracing::info!("Persisted {} stock records", written);
    }

    tracing::info!(
        "CSV ingest finished, total: {}, accepted: {}, rejected: {}",
        accepted + rejected,
        accepted,
        rejected
    );

    Ok(IngestionReport {
        total: accepted + rejected,
        accepted,
        rejected,
        rejected_rows: parsed.rejected,
    })
}

/// 按表头解析 CSV，拆分为通过/未通过校验两组
pub fn parse_rows<R: Read>(reader: R) -> Result<ParsedUpload, IngestError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .byte_headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let name = String::from_utf8_lossy(h);
            if i == 0 {
                name.trim_start_matches('\u{feff}').to_string()
            } else {
                name.into_owned()
            }
        })
        .collect();

    let missing: Vec<&str> = columns::EXPECTED
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == col))
        .collect();
    if !missing.is_empty() {
        tracing::warn!("CSV header is missing columns {:?}, affected rows will be rejected", missing);
    }

    let mut parsed = ParsedUpload::default();
    let mut record = ByteRecord::new();

    while csv_reader.read_byte_record(&mut record)? {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let raw = RawRow::from_record(&headers, &record);

        match validate_row(&raw) {
            Ok(rec) => parsed.accepted.push(rec),
            Err(reason) => {
                tracing::debug!("Rejected CSV line {}: {}", line, reason);
                parsed.rejected.push(RejectedRow { line, raw, reason });
            }
        }
    }

    Ok(parsed)
}

/// 校验单行并转换为待写入记录，遇到第一个不合法字段即返回
pub fn validate_row(raw: &RawRow) -> Result<NewStockRecord, RowValidationFailure> {
    let trade_date = date_field(raw, columns::DATE)?;

    let prev_close = decimal_field(raw, columns::PREV_CLOSE)?;
    let open_price = decimal_field(raw, columns::OPEN)?;
    let high_price = decimal_field(raw, columns::HIGH)?;
    let low_price = decimal_field(raw, columns::LOW)?;
    let last_price = decimal_field(raw, columns::LAST)?;
    let close_price = decimal_field(raw, columns::CLOSE)?;
    let vwap = decimal_field(raw, columns::VWAP)?;
    let turnover = decimal_field(raw, columns::TURNOVER)?;
    let percent_deliverable = decimal_field(raw, columns::PERCENT_DELIVERABLE)?;

    // 不校验符号，负数同样接受
    let volume = integer_field(raw, columns::VOLUME)?;
    let trades = integer_field(raw, columns::TRADES)?;
    let deliverable = integer_field(raw, columns::DELIVERABLE)?;

    let symbol = text_field(raw, columns::SYMBOL)?;
    let series = text_field(raw, columns::SERIES)?;

    Ok(NewStockRecord {
        trade_date,
        symbol,
        series,
        prev_close,
        open_price,
        high_price,
        low_price,
        last_price,
        close_price,
        vwap,
        volume,
        turnover,
        trades,
        deliverable,
        percent_deliverable,
    })
}

fn field<'a>(raw: &'a RawRow, name: &'static str) -> Result<&'a str, RowValidationFailure> {
    raw.get(name).ok_or(RowValidationFailure::Missing(name))
}

fn date_field(raw: &RawRow, name: &'static str) -> Result<NaiveDate, RowValidationFailure> {
    let value = field(raw, name)?;
    parse_date(value).ok_or_else(|| RowValidationFailure::InvalidDate {
        field: name,
        value: value.to_string(),
    })
}

fn decimal_field(raw: &RawRow, name: &'static str) -> Result<f64, RowValidationFailure> {
    let value = field(raw, name)?;
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RowValidationFailure::InvalidDecimal {
            field: name,
            value: value.to_string(),
        })
}

fn integer_field(raw: &RawRow, name: &'static str) -> Result<i64, RowValidationFailure> {
    let value = field(raw, name)?;
    parse_integer(value.trim()).ok_or_else(|| RowValidationFailure::InvalidInteger {
        field: name,
        value: value.to_string(),
    })
}

/// 整数列也接受 `1000000.0`、`1e6` 这类浮点写法，只要值本身是整数
fn parse_integer(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    // i64::MAX as f64 == 2^63，超出 i64 范围
    let v = s.parse::<f64>().ok()?;
    let in_range = v >= i64::MIN as f64 && v < i64::MAX as f64;
    (v.is_finite() && v.fract() == 0.0 && in_range).then_some(v as i64)
}

fn text_field(raw: &RawRow, name: &'static str) -> Result<String, RowValidationFailure> {
    let value = field(raw, name)?.trim();
    if value.is_empty() {
        return Err(RowValidationFailure::Empty(name));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StockRecord;
    use crate::repositories::{Average, MemoryStockStore, RecordFilter};

    const HEADER: &str =
        "Date,Symbol,Series,PrevClose,Open,High,Low,Last,Close,VWAP,Volume,Turnover,Trades,Deliverable,%Deliverable";
    const TCS_ROW: &str =
        "2023-01-02,TCS,EQ,3400.0,3410.0,3450.0,3390.0,3430.0,3425.0,3420.50,1000000,3420500000,5000,600000,60.0";
    const BAD_OPEN_ROW: &str =
        "2023-01-02,TCS,EQ,3400.0,abc,3450.0,3390.0,3430.0,3425.0,3420.50,1000000,3420500000,5000,600000,60.0";

    struct FailingStore;

    impl StockStore for FailingStore {
        fn batch_atomicity(&self) -> BatchAtomicity {
            BatchAtomicity::AllOrNothing
        }

        fn insert_batch(&self, _records: &[NewStockRecord]) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn max_volume(&self, _filter: &RecordFilter) -> Result<Option<StockRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn average_close(&self, _filter: &RecordFilter) -> Result<Average, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn average_vwap(&self, _filter: &RecordFilter) -> Result<Average, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn csv_of(rows: &[&str]) -> String {
        let mut body = String::from(HEADER);
        for row in rows {
            body.push('\n');
            body.push_str(row);
        }
        body.push('\n');
        body
    }

    fn raw_from(row: &str) -> RawRow {
        let fields = HEADER
            .split(',')
            .zip(row.split(','))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RawRow::new(fields)
    }

    #[test]
    fn valid_row_is_converted() {
        let rec = validate_row(&raw_from(TCS_ROW)).unwrap();
        assert_eq!(rec.trade_date, NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        assert_eq!(rec.symbol, "TCS");
        assert_eq!(rec.series, "EQ");
        assert_eq!(rec.open_price, 3410.0);
        assert_eq!(rec.vwap, 3420.50);
        assert_eq!(rec.volume, 1_000_000);
        assert_eq!(rec.turnover, 3_420_500_000.0);
        assert_eq!(rec.trades, 5000);
        assert_eq!(rec.deliverable, 600_000);
        assert_eq!(rec.percent_deliverable, 60.0);
    }

    #[test]
    fn decimal_text_converts_exactly() {
        let row = TCS_ROW.replace("3425.0", "223.10");
        let rec = validate_row(&raw_from(&row)).unwrap();
        assert_eq!(rec.close_price, 223.10);
    }

    #[test]
    fn non_numeric_price_is_rejected() {
        let err = validate_row(&raw_from(BAD_OPEN_ROW)).unwrap_err();
        assert_eq!(
            err,
            RowValidationFailure::InvalidDecimal {
                field: columns::OPEN,
                value: "abc".to_string()
            }
        );
    }

    #[test]
    fn first_failing_field_wins() {
        let row = BAD_OPEN_ROW.replace("2023-01-02", "yesterday");
        let err = validate_row(&raw_from(&row)).unwrap_err();
        assert!(matches!(err, RowValidationFailure::InvalidDate { field: "Date", .. }));
    }

    #[test]
    fn non_finite_and_empty_numbers_are_rejected() {
        for bad in ["inf", "NaN", "", "  "] {
            let row = TCS_ROW.replace("3420.50", bad);
            let err = validate_row(&raw_from(&row)).unwrap_err();
            assert!(
                matches!(err, RowValidationFailure::InvalidDecimal { field: "VWAP", .. }),
                "{bad:?} -> {err:?}"
            );
        }
    }

    #[test]
    fn integer_fields_reject_fractions_but_allow_negatives() {
        let row = TCS_ROW.replace(",5000,", ",50.5,");
        assert!(matches!(
            validate_row(&raw_from(&row)),
            Err(RowValidationFailure::InvalidInteger { field: "Trades", .. })
        ));

        let row = TCS_ROW.replace(",1000000,", ",-1000000,");
        assert_eq!(validate_row(&raw_from(&row)).unwrap().volume, -1_000_000);
    }

    #[test]
    fn integer_fields_accept_float_formatted_whole_numbers() {
        for text in ["1000000.0", "1e6", " 1000000.00 "] {
            let row = TCS_ROW.replace(",1000000,", &format!(",{text},"));
            let rec = validate_row(&raw_from(&row)).unwrap();
            assert_eq!(rec.volume, 1_000_000, "{text:?}");
        }

        for bad in ["1e30", "inf", "NaN", "5e-1"] {
            let row = TCS_ROW.replace(",5000,", &format!(",{bad},"));
            assert!(
                matches!(
                    validate_row(&raw_from(&row)),
                    Err(RowValidationFailure::InvalidInteger { field: "Trades", .. })
                ),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn empty_symbol_or_series_is_rejected() {
        let row = TCS_ROW.replace(",TCS,", ", ,");
        assert_eq!(
            validate_row(&raw_from(&row)).unwrap_err(),
            RowValidationFailure::Empty(columns::SYMBOL)
        );

        let row = TCS_ROW.replace(",EQ,", ",,");
        assert_eq!(
            validate_row(&raw_from(&row)).unwrap_err(),
            RowValidationFailure::Empty(columns::SERIES)
        );
    }

    #[test]
    fn validation_is_idempotent() {
        for row in [TCS_ROW, BAD_OPEN_ROW] {
            let raw = raw_from(row);
            assert_eq!(validate_row(&raw), validate_row(&raw));
        }
    }

    #[test]
    fn parse_partitions_rows_and_keeps_raw_values() {
        let body = csv_of(&[TCS_ROW, BAD_OPEN_ROW, TCS_ROW]);
        let parsed = parse_rows(body.as_bytes()).unwrap();

        assert_eq!(parsed.accepted.len(), 2);
        assert_eq!(parsed.rejected.len(), 1);

        let rejected = &parsed.rejected[0];
        assert_eq!(rejected.line, 3);
        assert_eq!(rejected.raw, raw_from(BAD_OPEN_ROW));
        assert_eq!(rejected.raw.get("Open"), Some("abc"));
    }

    #[test]
    fn missing_header_column_rejects_every_row() {
        let header = HEADER.replace(",Trades", "");
        let row = TCS_ROW.replace(",5000,", ",");
        let body = format!("{header}\n{row}\n{row}\n");

        let parsed = parse_rows(body.as_bytes()).unwrap();
        assert!(parsed.accepted.is_empty());
        assert!(parsed
            .rejected
            .iter()
            .all(|r| r.reason == RowValidationFailure::Missing(columns::TRADES)));
    }

    #[test]
    fn short_and_long_rows_are_reported() {
        let short = "2023-01-02,TCS,EQ";
        let long = format!("{TCS_ROW},extra");
        let body = csv_of(&[short, &long]);

        let parsed = parse_rows(body.as_bytes()).unwrap();
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].raw, raw_from(short));
        assert_eq!(parsed.accepted.len(), 1);
    }

    #[test]
    fn extra_fields_are_keyed_by_position() {
        let headers = vec!["A".to_string()];
        let record = ByteRecord::from(vec!["1", "2"]);
        let raw = RawRow::from_record(&headers, &record);
        assert_eq!(raw.get("A"), Some("1"));
        assert_eq!(raw.get("_1"), Some("2"));
    }

    #[test]
    fn bom_prefixed_header_is_recognised() {
        let body = format!("\u{feff}{}", csv_of(&[TCS_ROW]));
        let parsed = parse_rows(body.as_bytes()).unwrap();
        assert_eq!(parsed.accepted.len(), 1);
    }

    #[test]
    fn raw_row_serializes_in_column_order() {
        let raw = RawRow::new(vec![
            ("Date".to_string(), "x".to_string()),
            ("Open".to_string(), "abc".to_string()),
        ]);
        assert_eq!(serde_json::to_string(&raw).unwrap(), r#"{"Date":"x","Open":"abc"}"#);
    }

    #[test]
    fn ensure_csv_checks_mime_essence() {
        assert!(ensure_csv(Some("text/csv")).is_ok());
        assert!(ensure_csv(Some("Text/CSV; charset=utf-8")).is_ok());
        assert!(matches!(
            ensure_csv(Some("application/json")),
            Err(IngestError::UnsupportedMediaType(t)) if t == "application/json"
        ));
        assert!(matches!(ensure_csv(None), Err(IngestError::UnsupportedMediaType(_))));
    }

    #[test]
    fn ingest_persists_accepted_rows_and_reports_counts() {
        let store = MemoryStockStore::new();
        let body = csv_of(&[TCS_ROW, BAD_OPEN_ROW]);

        let report = ingest(body.as_bytes(), Some("text/csv"), &store).unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.total, report.accepted + report.rejected);
        assert_eq!(report.rejected_rows[0].raw, raw_from(BAD_OPEN_ROW));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn ingest_rejects_wrong_media_type_without_side_effects() {
        let store = MemoryStockStore::new();
        let body = csv_of(&[TCS_ROW]);

        let err = ingest(body.as_bytes(), Some("application/json"), &store).unwrap_err();

        assert!(matches!(err, IngestError::UnsupportedMediaType(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn ingest_surfaces_store_failure() {
        let body = csv_of(&[TCS_ROW]);
        let err = ingest(body.as_bytes(), Some("text/csv"), &FailingStore).unwrap_err();
        assert!(matches!(err, IngestError::Persistence(_)));
    }

    #[test]
    fn ingest_skips_store_when_nothing_accepted() {
        let body = csv_of(&[BAD_OPEN_ROW]);
        let report = ingest(body.as_bytes(), Some("text/csv"), &FailingStore).unwrap();
        assert_eq!(report.accepted, 0);
        assert_eq!(report.rejected, 1);
    }

    #[test]
    fn repeated_ingest_duplicates_rows() {
        let store = MemoryStockStore::new();
        let body = csv_of(&[TCS_ROW, TCS_ROW]);

        ingest(body.as_bytes(), Some("text/csv"), &store).unwrap();
        ingest(body.as_bytes(), Some("text/csv"), &store).unwrap();

        assert_eq!(store.len(), 4);
    }
}
