pub mod error;
pub mod stock_query;
pub mod stock_upload;
