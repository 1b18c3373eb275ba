pub mod memory;
pub mod stock_record;
pub mod store;

pub use memory::MemoryStockStore;
pub use store::{
    Average, BatchAtomicity, DbPool, PgStockStore, RecordFilter, StockStore, StoreError,
};
