pub mod charts;
pub mod config;
pub mod error;
pub mod export;
pub mod filters;
pub mod models;
pub mod processor;
pub mod query;
pub mod report;
pub mod screener_api_server;
pub mod screener_client;
pub mod screener_commands;

// Re-exports (public API)
pub use error::ScreenerError;
pub use filters::{build_base_query, build_enrichment_query, FundamentalFilters, Preset};
pub use models::{ScanResponse, ScanRow, StockRecord};
pub use processor::{
    calculate_roce,
    composite_score,
    from_crore,
    percentile_rank,
    process_records,
    sort_stocks,
    to_crore,
    ProcessedStock,
    RankOrder,
    SortDirection,
    SortKey,
};
pub use query::{col, Column, Filter, FilterOp, Query};
pub use report::{render_table, ScanReport};
pub use screener_client::{FetchedRecords, ScreenerClient};
pub use screener_commands::ScreenerCommands;
