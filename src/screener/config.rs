use std::time::Duration;

// -----------------------------------------------
// SCANNER API ENDPOINTS
// -----------------------------------------------
pub const SCANNER_BASE_URL: &str = "https://scanner.tradingview.com";
pub const MARKET_INDIA: &str = "india";

pub fn scanner_url(base_url: &str, market: &str) -> String {
    format!(
        "{}/{}/scan",
        base_url.trim_end_matches('/'),
        urlencoding::encode(market)
    )
}

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                               AppleWebKit/537.36 (KHTML, like Gecko) \
                               Chrome/131.0.0.0 Safari/537.36";

pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.8",
    "en-IN,en;q=0.9",
];

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

pub const HEADER_ORIGIN: &str = "https://www.tradingview.com";
pub const HEADER_REFERER: &str = "https://www.tradingview.com/";

// -----------------------------------------------
// RETRY CONFIG (429 / 5xx / transport errors)
// -----------------------------------------------
pub const RETRY_BASE_DELAY_MS: u64 = 100;
pub const RETRY_FACTOR: u64 = 2;
pub const RETRY_MAX_DELAY_SECS: u64 = 3;
/// Total requests per query, first attempt included
pub const RETRY_MAX_ATTEMPTS: usize = 3;

// -----------------------------------------------
// BASE / ENRICH PACING
// -----------------------------------------------
// Pause between the base query and the enrichment query.
pub const ENRICH_DELAY_MS: u64 = 1000;

// -----------------------------------------------
// UNITS
// -----------------------------------------------
pub const CRORE: f64 = 1e7;

// -----------------------------------------------
// DEFAULT FILTERS
// -----------------------------------------------
pub const DEFAULT_MIN_MCAP_CR: f64 = 500.0;
pub const DEFAULT_MAX_PE: f64 = 40.0;
pub const DEFAULT_MIN_ROE: f64 = 10.0;
pub const DEFAULT_MIN_ROA: f64 = 5.0;
pub const DEFAULT_MIN_DIVIDEND: f64 = 0.0;
pub const DEFAULT_MIN_REVENUE_CR: f64 = 1000.0;

pub const MIN_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 500;
pub const DEFAULT_LIMIT: usize = 100;

// -----------------------------------------------
// FUNDAMENTAL SCORE WEIGHTS
// -----------------------------------------------
pub const SCORE_WEIGHT_ROE: f64 = 0.30;
pub const SCORE_WEIGHT_ROCE: f64 = 0.30;
pub const SCORE_WEIGHT_PE: f64 = 0.20;
pub const SCORE_WEIGHT_DEBT: f64 = 0.20;

// -----------------------------------------------
// OUTPUT
// -----------------------------------------------
pub const EXPORT_FILE_NAME: &str = "india_fundamental_screener.xlsx";
pub const EXPORT_SHEET_NAME: &str = "Fundamentals";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const SNAPSHOT_FILE_NAME: &str = "scan_snapshot.json";

pub const NO_MATCH_MESSAGE: &str = "No stocks matched the criteria.";

// -----------------------------------------------
// SERVER
// -----------------------------------------------
pub const DEFAULT_PORT: u16 = 3002;
pub const CACHE_DURATION: Duration = Duration::from_secs(300);

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// Get the execution mode from environment or default to scan
pub fn get_execution_mode() -> String {
    std::env::var("SCREENER_MODE").unwrap_or_else(|_| "scan".to_string())
}

pub fn get_port() -> u16 {
    std::env::var("SCREENER_PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Scanner base URL, overridable for staging or local fakes
pub fn get_base_url() -> String {
    std::env::var("SCREENER_BASE_URL").unwrap_or_else(|_| SCANNER_BASE_URL.to_string())
}

pub fn get_enrich_delay() -> Duration {
    let ms = std::env::var("SCREENER_ENRICH_DELAY_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(ENRICH_DELAY_MS);
    Duration::from_millis(ms)
}

pub fn get_output_path() -> String {
    std::env::var("SCREENER_OUTPUT").unwrap_or_else(|_| EXPORT_FILE_NAME.to_string())
}

/// Check if running in CI/automated environment
pub fn is_ci_environment() -> bool {
    std::env::var("CI").is_ok() || std::env::var("GITHUB_ACTIONS").is_ok()
}

/// Clamp a requested row limit into the supported range
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(MIN_LIMIT, MAX_LIMIT)
}
