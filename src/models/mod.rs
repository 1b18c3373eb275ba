pub mod stock_records;

pub use stock_records::{NewStockRecord, StockRecord};
