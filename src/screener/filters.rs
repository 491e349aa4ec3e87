use super::config;
use super::models::{fields, StockRecord};
use super::processor::from_crore;
use super::query::{col, Query};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// -----------------------------------------------
// PRESETS
// -----------------------------------------------

/// Named sort/filter configurations recognised by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Gainers,
    Losers,
    LargeCap,
    SmallCap,
    HighestRevenue,
    HighestNetIncome,
    HighDividend,
    MostActive,
    UnusualVolume,
    MostVolatile,
    Overbought,
    Oversold,
    AllTimeHigh,
    AllTimeLow,
}

impl Preset {
    pub const ALL: [Preset; 14] = [
        Preset::Gainers,
        Preset::Losers,
        Preset::LargeCap,
        Preset::SmallCap,
        Preset::HighestRevenue,
        Preset::HighestNetIncome,
        Preset::HighDividend,
        Preset::MostActive,
        Preset::UnusualVolume,
        Preset::MostVolatile,
        Preset::Overbought,
        Preset::Oversold,
        Preset::AllTimeHigh,
        Preset::AllTimeLow,
    ];

    /// Value sent as the `preset` property
    pub fn wire_value(&self) -> &'static str {
        match self {
            Preset::Gainers => "gainers",
            Preset::Losers => "losers",
            Preset::LargeCap => "large_cap",
            Preset::SmallCap => "small_cap",
            Preset::HighestRevenue => "highest_revenue",
            Preset::HighestNetIncome => "highest_net_income",
            Preset::HighDividend => "high_dividend",
            Preset::MostActive => "most_active",
            Preset::UnusualVolume => "unusual_volume",
            Preset::MostVolatile => "most_volatile",
            Preset::Overbought => "overbought",
            Preset::Oversold => "oversold",
            Preset::AllTimeHigh => "all_time_high",
            Preset::AllTimeLow => "all_time_low",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Preset::Gainers => "Top Gainers",
            Preset::Losers => "Biggest Losers",
            Preset::LargeCap => "Large Cap",
            Preset::SmallCap => "Small Cap",
            Preset::HighestRevenue => "Highest Revenue",
            Preset::HighestNetIncome => "Highest Net Income",
            Preset::HighDividend => "High Dividend",
            Preset::MostActive => "Most Active",
            Preset::UnusualVolume => "Unusual Volume",
            Preset::MostVolatile => "Most Volatile",
            Preset::Overbought => "Overbought",
            Preset::Oversold => "Oversold",
            Preset::AllTimeHigh => "All Time High",
            Preset::AllTimeLow => "All Time Low",
        }
    }

    /// Parse an optional preset. Empty input and "None" mean no preset.
    pub fn parse_optional(input: &str) -> Result<Option<Preset>> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl FromStr for Preset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        Preset::ALL
            .iter()
            .copied()
            .find(|p| p.wire_value().eq_ignore_ascii_case(needle) || p.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| anyhow::anyhow!("Unknown preset '{}'", needle))
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

// -----------------------------------------------
// FUNDAMENTAL FILTERS
// -----------------------------------------------

/// User-selected thresholds. Crore-denominated fields are in ₹ crore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalFilters {
    pub min_market_cap_cr: f64,
    pub max_pe: f64,
    pub min_roe: f64,
    pub min_roa: f64,
    pub min_dividend_yield: f64,
    pub min_revenue_cr: f64,
    pub limit: usize,
    pub preset: Option<Preset>,
}

impl Default for FundamentalFilters {
    fn default() -> Self {
        Self {
            min_market_cap_cr: config::DEFAULT_MIN_MCAP_CR,
            max_pe: config::DEFAULT_MAX_PE,
            min_roe: config::DEFAULT_MIN_ROE,
            min_roa: config::DEFAULT_MIN_ROA,
            min_dividend_yield: config::DEFAULT_MIN_DIVIDEND,
            min_revenue_cr: config::DEFAULT_MIN_REVENUE_CR,
            limit: config::DEFAULT_LIMIT,
            preset: None,
        }
    }
}

impl FundamentalFilters {
    /// Read filters from SCREENER_* environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let filters = Self {
            min_market_cap_cr: env_f64("SCREENER_MIN_MCAP_CR", defaults.min_market_cap_cr)?,
            max_pe: env_f64("SCREENER_MAX_PE", defaults.max_pe)?,
            min_roe: env_f64("SCREENER_MIN_ROE", defaults.min_roe)?,
            min_roa: env_f64("SCREENER_MIN_ROA", defaults.min_roa)?,
            min_dividend_yield: env_f64("SCREENER_MIN_DIVIDEND", defaults.min_dividend_yield)?,
            min_revenue_cr: env_f64("SCREENER_MIN_REVENUE_CR", defaults.min_revenue_cr)?,
            limit: match std::env::var("SCREENER_LIMIT") {
                Ok(v) => v.trim().parse::<usize>().map_err(|e| {
                    anyhow::anyhow!("SCREENER_LIMIT must be a whole number: {}", e)
                })?,
                Err(_) => defaults.limit,
            },
            preset: match std::env::var("SCREENER_PRESET") {
                Ok(v) => Preset::parse_optional(&v)?,
                Err(_) => None,
            },
        }
        .normalized();

        filters.validate()?;
        Ok(filters)
    }

    /// Clamp the row limit into the supported range
    pub fn normalized(mut self) -> Self {
        self.limit = config::clamp_limit(self.limit);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("min_market_cap_cr", self.min_market_cap_cr),
            ("max_pe", self.max_pe),
            ("min_roe", self.min_roe),
            ("min_roa", self.min_roa),
            ("min_dividend_yield", self.min_dividend_yield),
            ("min_revenue_cr", self.min_revenue_cr),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() {
                bail!("{} must be a finite number", name);
            }
            if value < 0.0 {
                bail!("{} must not be negative (got {})", name, value);
            }
        }
        Ok(())
    }

    /// Local version of the scanner-side predicate. Missing values fail.
    pub fn matches(&self, record: &StockRecord) -> bool {
        let ge = |v: Option<f64>, min: f64| v.is_some_and(|x| x >= min);
        let le = |v: Option<f64>, max: f64| v.is_some_and(|x| x <= max);

        ge(record.market_cap, from_crore(self.min_market_cap_cr))
            && ge(record.revenue, from_crore(self.min_revenue_cr))
            && le(record.price_earnings, self.max_pe)
            && ge(record.return_on_equity, self.min_roe)
            && ge(record.return_on_assets, self.min_roa)
            && ge(record.dividend_yield, self.min_dividend_yield)
    }

    /// Stable key for response caching
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.min_market_cap_cr,
            self.max_pe,
            self.min_roe,
            self.min_roa,
            self.min_dividend_yield,
            self.min_revenue_cr,
            self.limit,
            self.preset.map(|p| p.wire_value()).unwrap_or("none"),
        )
    }
}

fn env_f64(key: &str, default: f64) -> Result<f64> {
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<f64>()
            .map_err(|e| anyhow::anyhow!("{} must be a number: {}", key, e)),
        Err(_) => Ok(default),
    }
}

// -----------------------------------------------
// QUERY CONSTRUCTION
// -----------------------------------------------

/// Base query: universe restriction plus the fundamental thresholds,
/// largest companies first
pub fn build_base_query(filters: &FundamentalFilters) -> Query {
    Query::new()
        .set_markets(&[config::MARKET_INDIA])
        .select(fields::BASE_COLUMNS)
        .where_([
            col(fields::TYPE).eq("stock"),
            col(fields::TYPESPECS).has(["common"]),
            col(fields::IS_PRIMARY).eq(true),
            col(fields::MARKET_CAP).ge(from_crore(filters.min_market_cap_cr)),
            col(fields::REVENUE).ge(from_crore(filters.min_revenue_cr)),
            col(fields::PRICE_EARNINGS).le(filters.max_pe),
            col(fields::RETURN_ON_EQUITY).ge(filters.min_roe),
            col(fields::RETURN_ON_ASSETS).ge(filters.min_roa),
            col(fields::DIVIDEND_YIELD).ge(filters.min_dividend_yield),
        ])
        .order_by(fields::MARKET_CAP, false)
        .limit(filters.limit)
        .set_preset(filters.preset.map(|p| p.wire_value()))
}

/// Enrichment query: balance-sheet columns for an explicit ticker list
pub fn build_enrichment_query(tickers: &[String]) -> Query {
    Query::new()
        .set_markets(&[config::MARKET_INDIA])
        .select(fields::ENRICH_COLUMNS)
        .set_tickers(tickers.iter().cloned())
        .limit(tickers.len().max(1))
}
