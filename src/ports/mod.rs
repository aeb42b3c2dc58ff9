//! Port traits for the I/O seams of the pipeline.

pub mod cache_port;
pub mod config_port;
pub mod market_data_port;
pub mod report_port;
