pub mod ingest_service;
pub mod stock_query;
