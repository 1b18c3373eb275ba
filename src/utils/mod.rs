pub mod config;
pub mod date_parser;
pub mod logging;
pub mod middleware;
pub mod temp_upload;
