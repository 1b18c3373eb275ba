use diesel::dsl::{avg, count_star};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::Error as DieselError;

use crate::models::{NewStockRecord, StockRecord};
use crate::repositories::store::RecordFilter;
use crate::schema::stock_records::dsl::*;

/// PostgreSQL 单条语句最多 65535 个绑定参数，每行 15 列
const INSERT_CHUNK_ROWS: usize = 4000;

/// 批量插入，整批在同一个事务内完成（全部成功或全部回滚）
pub fn insert_batch(
    conn: &mut PgConnection,
    records: &[NewStockRecord],
) -> Result<usize, DieselError> {
    conn.transaction(|conn| {
        let mut inserted = 0;
        for chunk in records.chunks(INSERT_CHUNK_ROWS) {
            inserted += diesel::insert_into(stock_records)
                .values(chunk)
                .execute(conn)?;
        }
        Ok(inserted)
    })
}

/// 区间内成交量最大的一条记录，并列时取数据库默认顺序的第一条
pub fn find_max_volume(
    conn: &mut PgConnection,
    filter: &RecordFilter,
) -> Result<Option<StockRecord>, DieselError> {
    let mut query = stock_records
        .filter(trade_date.ge(filter.start_date))
        .filter(trade_date.le(filter.end_date))
        .into_boxed();

    if let Some(code) = filter.symbol.as_deref() {
        query = query.filter(symbol.eq(code));
    }

    query
        .order(volume.desc())
        .first::<StockRecord>(conn)
        .optional()
}

/// 收盘价均值及参与计算的行数
pub fn average_close(
    conn: &mut PgConnection,
    filter: &RecordFilter,
) -> Result<(Option<f64>, i64), DieselError> {
    let mut query = stock_records
        .select((avg(close_price), count_star()))
        .filter(trade_date.ge(filter.start_date))
        .filter(trade_date.le(filter.end_date))
        .into_boxed();

    if let Some(code) = filter.symbol.as_deref() {
        query = query.filter(symbol.eq(code));
    }

    query.first::<(Option<f64>, i64)>(conn)
}

/// VWAP 均值及参与计算的行数
pub fn average_vwap(
    conn: &mut PgConnection,
    filter: &RecordFilter,
) -> Result<(Option<f64>, i64), DieselError> {
    let mut query = stock_records
        .select((avg(vwap), count_star()))
        .filter(trade_date.ge(filter.start_date))
        .filter(trade_date.le(filter.end_date))
        .into_boxed();

    if let Some(code) = filter.symbol.as_deref() {
        query = query.filter(symbol.eq(code));
    }

    query.first::<(Option<f64>, i64)>(conn)
}
