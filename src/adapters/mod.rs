//! Concrete adapter implementations for ports.

#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
pub mod chart_svg;
pub mod csv_adapter;
pub mod csv_report;
pub mod file_config_adapter;
pub mod yahoo_adapter;
