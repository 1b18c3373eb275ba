use chrono::NaiveDate;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use thiserror::Error;

use crate::models::{NewStockRecord, StockRecord};
use crate::repositories::stock_record;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// 查询条件：闭区间 [start_date, end_date]，symbol 可选
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub symbol: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, rec: &StockRecord) -> bool {
        rec.trade_date >= self.start_date
            && rec.trade_date <= self.end_date
            && self.symbol.as_deref().map_or(true, |code| rec.symbol == code)
    }
}

/// 均值查询结果，`value` 为 None 表示没有匹配的记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Average {
    pub value: Option<f64>,
    pub matched: i64,
}

impl Average {
    pub fn empty() -> Self {
        Self { value: None, matched: 0 }
    }
}

/// 存储层对批量写入的原子性承诺
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAtomicity {
    /// 整批写入要么全部可见，要么全部不可见
    AllOrNothing,
    /// 失败时可能已有部分记录落库
    BestEffort,
}

/// 股票记录存储句柄，通过 AppState 注入到导入流程和查询接口
pub trait StockStore: Send + Sync {
    fn batch_atomicity(&self) -> BatchAtomicity;

    /// 批量写入，返回写入条数
    fn insert_batch(&self, records: &[NewStockRecord]) -> Result<usize, StoreError>;

    fn max_volume(&self, filter: &RecordFilter) -> Result<Option<StockRecord>, StoreError>;

    fn average_close(&self, filter: &RecordFilter) -> Result<Average, StoreError>;

    fn average_vwap(&self, filter: &RecordFilter) -> Result<Average, StoreError>;
}

/// 基于 diesel + r2d2 连接池的 PostgreSQL 实现
#[derive(Clone)]
pub struct PgStockStore {
    pool: DbPool,
}

impl PgStockStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn connect(database_url: &str, pool_size: u32) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder().max_size(pool_size).build(manager)?;
        Ok(Self::new(pool))
    }
}

impl StockStore for PgStockStore {
    fn batch_atomicity(&self) -> BatchAtomicity {
        // insert_batch 在单个事务内执行
        BatchAtomicity::AllOrNothing
    }

    fn insert_batch(&self, records: &[NewStockRecord]) -> Result<usize, StoreError> {
        let mut conn = self.pool.get()?;
        Ok(stock_record::insert_batch(&mut conn, records)?)
    }

    fn max_volume(&self, filter: &RecordFilter) -> Result<Option<StockRecord>, StoreError> {
        let mut conn = self.pool.get()?;
        Ok(stock_record::find_max_volume(&mut conn, filter)?)
    }

    fn average_close(&self, filter: &RecordFilter) -> Result<Average, StoreError> {
        let mut conn = self.pool.get()?;
        let (value, matched) = stock_record::average_close(&mut conn, filter)?;
        Ok(Average { value, matched })
    }

    fn average_vwap(&self, filter: &RecordFilter) -> Result<Average, StoreError> {
        let mut conn = self.pool.get()?;
        let (value, matched) = stock_record::average_vwap(&mut conn, filter)?;
        Ok(Average { value, matched })
    }
}
