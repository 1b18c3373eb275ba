use std::sync::{Mutex, MutexGuard};

use crate::models::{NewStockRecord, StockRecord};
use crate::repositories::store::{Average, BatchAtomicity, RecordFilter, StockStore, StoreError};

#[derive(Default)]
struct Inner {
    next_id: i64,
    records: Vec<StockRecord>,
}

/// 进程内存储，`STORE_BACKEND=memory` 时使用，也用于测试
#[derive(Default)]
pub struct MemoryStockStore {
    inner: Mutex<Inner>,
}

impl MemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按写入顺序返回全部记录的副本
    pub fn snapshot(&self) -> Vec<StockRecord> {
        self.lock()
            .map(|inner| inner.records.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn average_by<F>(&self, filter: &RecordFilter, field: F) -> Result<Average, StoreError>
    where
        F: Fn(&StockRecord) -> f64,
    {
        let inner = self.lock()?;
        let (sum, matched) = inner
            .records
            .iter()
            .filter(|rec| filter.matches(rec))
            .fold((0.0, 0i64), |(sum, n), rec| (sum + field(rec), n + 1));

        if matched == 0 {
            return Ok(Average::empty());
        }
        Ok(Average {
            value: Some(sum / matched as f64),
            matched,
        })
    }
}

impl StockStore for MemoryStockStore {
    fn batch_atomicity(&self) -> BatchAtomicity {
        // 整批在持锁期间追加
        BatchAtomicity::AllOrNothing
    }

    fn insert_batch(&self, records: &[NewStockRecord]) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        for rec in records {
            inner.next_id += 1;
            let id = inner.next_id;
            inner.records.push(rec.clone().with_id(id));
        }
        Ok(records.len())
    }

    fn max_volume(&self, filter: &RecordFilter) -> Result<Option<StockRecord>, StoreError> {
        let inner = self.lock()?;
        // 并列时保留最先写入的一条
        let best = inner
            .records
            .iter()
            .filter(|rec| filter.matches(rec))
            .fold(None::<&StockRecord>, |best, rec| match best {
                Some(cur) if cur.volume >= rec.volume => Some(cur),
                _ => Some(rec),
            });
        Ok(best.cloned())
    }

    fn average_close(&self, filter: &RecordFilter) -> Result<Average, StoreError> {
        self.average_by(filter, |rec| rec.close_price)
    }

    fn average_vwap(&self, filter: &RecordFilter) -> Result<Average, StoreError> {
        self.average_by(filter, |rec| rec.vwap)
    }
}
