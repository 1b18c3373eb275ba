pub mod stock_query;
pub mod stock_upload;

#[allow(unused_imports)]
pub use stock_query::{AverageCloseResponse, AverageVwapResponse, RangeQuery, StockRecordResponse};
#[allow(unused_imports)]
pub use stock_upload::UploadResponse;
