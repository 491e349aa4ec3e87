pub mod logging;
pub mod screener;
pub mod utility;

// Re-exports for convenience
pub use screener::{FundamentalFilters, ProcessedStock, ScanReport, ScreenerClient, StockRecord};
