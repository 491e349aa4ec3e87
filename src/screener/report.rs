use super::config;
use super::filters::FundamentalFilters;
use super::processor::ProcessedStock;
use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};
use serde::{Deserialize, Serialize};

/// Everything one screener run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub fetched_at: DateTime<Utc>,
    pub filters: FundamentalFilters,
    pub total_count: usize,
    pub stocks: Vec<ProcessedStock>,
    /// User-facing notice: empty result, partial enrichment, ...
    pub message: Option<String>,
    pub error: Option<String>,
    /// Balance-sheet enrichment failed; ROCE, debt and score inputs are missing
    #[serde(default)]
    pub partial: bool,
}

impl ScanReport {
    pub fn new(filters: FundamentalFilters, total_count: usize, stocks: Vec<ProcessedStock>) -> Self {
        let message = stocks.is_empty().then(|| config::NO_MATCH_MESSAGE.to_string());
        Self {
            fetched_at: Utc::now(),
            filters,
            total_count,
            stocks,
            message,
            error: None,
            partial: false,
        }
    }

    /// The flagged empty state shown when nothing matched or the fetch failed
    pub fn empty(filters: FundamentalFilters, error: Option<String>) -> Self {
        Self {
            fetched_at: Utc::now(),
            filters,
            total_count: 0,
            stocks: Vec::new(),
            message: Some(config::NO_MATCH_MESSAGE.to_string()),
            error,
            partial: false,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.message = Some(warning.into());
        self
    }

    /// Base rows only, with a warning for the reader
    pub fn into_partial(mut self, warning: impl Into<String>) -> Self {
        self.partial = true;
        self.with_warning(warning)
    }

    /// Complete, successful reports only
    pub fn is_cacheable(&self) -> bool {
        self.error.is_none() && !self.partial
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    pub fn headline(&self) -> String {
        if self.is_empty() {
            config::NO_MATCH_MESSAGE.to_string()
        } else {
            format!("Screener Results ({} stocks)", self.stocks.len())
        }
    }
}

// -----------------------------------------------
// TABLE RENDERING
// -----------------------------------------------

pub const DISPLAY_HEADERS: [&str; 14] = [
    "Name",
    "Sector",
    "Market Cap (₹ Cr)",
    "Revenue (₹ Cr)",
    "Net Income",
    "PE",
    "ROE %",
    "ROA %",
    "ROCE %",
    "Div Yield %",
    "Close",
    "Change %",
    "Volume",
    "Score",
];

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "-".to_string(),
    }
}

/// One display row, matching DISPLAY_HEADERS
pub fn display_row(stock: &ProcessedStock) -> Vec<String> {
    let base = &stock.base;
    vec![
        base.display_name().to_string(),
        base.sector.clone().unwrap_or_else(|| "-".to_string()),
        fmt_opt(stock.market_cap_cr, 0),
        fmt_opt(stock.revenue_cr, 0),
        fmt_opt(base.net_income, 0),
        fmt_opt(base.price_earnings, 2),
        fmt_opt(base.return_on_equity, 2),
        fmt_opt(base.return_on_assets, 2),
        fmt_opt(stock.roce, 2),
        fmt_opt(base.dividend_yield, 2),
        fmt_opt(base.close, 2),
        fmt_opt(base.change, 2),
        fmt_opt(base.volume, 0),
        format!("{:.1}", stock.fundamental_score),
    ]
}

pub fn render_table(stocks: &[ProcessedStock]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(DISPLAY_HEADERS.iter().map(|h| Cell::new(h)).collect::<Vec<_>>());

    for stock in stocks {
        let cells: Vec<Cell> = display_row(stock)
            .into_iter()
            .enumerate()
            .map(|(idx, text)| {
                // name and sector stay left aligned
                if idx < 2 {
                    Cell::new(text)
                } else {
                    Cell::new(text).set_alignment(CellAlignment::Right)
                }
            })
            .collect();
        table.add_row(cells);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screener::models::StockRecord;

    #[test]
    fn test_empty_report_is_flagged() {
        let report = ScanReport::empty(FundamentalFilters::default(), Some("boom".into()));
        assert!(report.is_empty());
        assert_eq!(report.message.as_deref(), Some(config::NO_MATCH_MESSAGE));
        assert_eq!(report.headline(), config::NO_MATCH_MESSAGE);
    }

    #[test]
    fn test_partial_and_failed_reports_are_not_cacheable() {
        let filters = FundamentalFilters::default();
        assert!(ScanReport::new(filters.clone(), 0, Vec::new()).is_cacheable());
        assert!(!ScanReport::empty(filters.clone(), Some("boom".into())).is_cacheable());

        let partial = ScanReport::new(filters, 3, Vec::new()).into_partial("no balance sheet");
        assert!(partial.partial);
        assert_eq!(partial.message.as_deref(), Some("no balance sheet"));
        assert!(!partial.is_cacheable());
    }

    #[test]
    fn test_display_row_formats_missing_as_dash() {
        let stock = ProcessedStock {
            base: StockRecord::new("NSE:XYZ"),
            market_cap_cr: Some(1234.567),
            revenue_cr: None,
            debt_cr: None,
            roce: None,
            fundamental_score: 42.0,
        };
        let row = display_row(&stock);
        assert_eq!(row.len(), DISPLAY_HEADERS.len());
        assert_eq!(row[0], "NSE:XYZ");
        assert_eq!(row[2], "1235");
        assert_eq!(row[3], "-");
        assert_eq!(row[13], "42.0");
    }

    #[test]
    fn test_render_table_contains_headers() {
        let rendered = render_table(&[]);
        assert!(rendered.contains("Market Cap"));
        assert!(rendered.contains("Score"));
    }
}
