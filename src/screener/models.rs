use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// -----------------------------------------------
// SCANNER COLUMN NAMES
// -----------------------------------------------
pub mod fields {
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const SECTOR: &str = "sector";
    pub const MARKET_CAP: &str = "market_cap_basic";
    pub const PRICE_EARNINGS: &str = "price_earnings_ttm";
    pub const RETURN_ON_EQUITY: &str = "return_on_equity";
    pub const RETURN_ON_ASSETS: &str = "return_on_assets";
    pub const DIVIDEND_YIELD: &str = "dividends_yield_current";
    pub const REVENUE: &str = "total_revenue_ttm";
    pub const NET_INCOME: &str = "net_income_ttm";
    pub const OPERATING_INCOME: &str = "oper_income_ttm";
    pub const TOTAL_ASSETS: &str = "total_assets";
    pub const CURRENT_LIABILITIES: &str = "total_current_liabilities";
    pub const TOTAL_LIABILITIES: &str = "total_liabilities_fy";
    pub const TOTAL_DEBT: &str = "total_debt";
    pub const DEBT_TO_EQUITY: &str = "debt_to_equity";
    pub const FREE_CASH_FLOW: &str = "free_cash_flow_ttm";
    pub const BOOK_VALUE_PER_SHARE: &str = "book_value_per_share_fq";
    pub const CLOSE: &str = "close";
    pub const CHANGE: &str = "change";
    pub const VOLUME: &str = "volume";

    // Universe predicates only, never selected
    pub const TYPE: &str = "type";
    pub const TYPESPECS: &str = "typespecs";
    pub const IS_PRIMARY: &str = "is_primary";

    pub const BASE_COLUMNS: &[&str] = &[
        NAME,
        DESCRIPTION,
        SECTOR,
        MARKET_CAP,
        REVENUE,
        NET_INCOME,
        PRICE_EARNINGS,
        RETURN_ON_EQUITY,
        RETURN_ON_ASSETS,
        DIVIDEND_YIELD,
        CLOSE,
        CHANGE,
        VOLUME,
    ];

    pub const ENRICH_COLUMNS: &[&str] = &[
        OPERATING_INCOME,
        TOTAL_ASSETS,
        CURRENT_LIABILITIES,
        TOTAL_LIABILITIES,
        TOTAL_DEBT,
        DEBT_TO_EQUITY,
        FREE_CASH_FLOW,
        BOOK_VALUE_PER_SHARE,
    ];
}

/// Raw response from the scanner endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    #[serde(rename = "totalCount", default)]
    pub total_count: usize,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<ScanRow>,

    /// Set by the scanner instead of an HTTP error for some bad requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ScanRow>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ScanRow>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One scanner row: the exchange-qualified ticker and the values of the
/// requested columns, in request order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRow {
    #[serde(rename = "s")]
    pub ticker: String,

    #[serde(rename = "d", default)]
    pub values: Vec<Value>,
}

/// Flat fundamentals record for a single listed stock
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub ticker: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub sector: Option<String>,

    pub market_cap: Option<f64>,
    pub price_earnings: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub dividend_yield: Option<f64>,

    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub operating_income: Option<f64>,

    pub total_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub total_debt: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub book_value_per_share: Option<f64>,

    pub close: Option<f64>,
    pub change: Option<f64>,
    pub volume: Option<f64>,
}

impl StockRecord {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Default::default()
        }
    }

    /// Build a record from a scanner row whose values line up with `columns`.
    /// Unknown columns are ignored; extra or missing values are tolerated.
    pub fn from_row(ticker: &str, columns: &[&str], values: &[Value]) -> Self {
        let mut record = Self::new(ticker);
        for (column, value) in columns.iter().zip(values.iter()) {
            record.set_field(column, value);
        }
        record
    }

    fn set_field(&mut self, column: &str, value: &Value) {
        match column {
            fields::NAME => self.name = as_text(value),
            fields::DESCRIPTION => self.description = as_text(value),
            fields::SECTOR => self.sector = as_text(value),
            fields::MARKET_CAP => self.market_cap = as_number(value),
            fields::PRICE_EARNINGS => self.price_earnings = as_number(value),
            fields::RETURN_ON_EQUITY => self.return_on_equity = as_number(value),
            fields::RETURN_ON_ASSETS => self.return_on_assets = as_number(value),
            fields::DIVIDEND_YIELD => self.dividend_yield = as_number(value),
            fields::REVENUE => self.revenue = as_number(value),
            fields::NET_INCOME => self.net_income = as_number(value),
            fields::OPERATING_INCOME => self.operating_income = as_number(value),
            fields::TOTAL_ASSETS => self.total_assets = as_number(value),
            fields::CURRENT_LIABILITIES => self.current_liabilities = as_number(value),
            fields::TOTAL_LIABILITIES => self.total_liabilities = as_number(value),
            fields::TOTAL_DEBT => self.total_debt = as_number(value),
            fields::DEBT_TO_EQUITY => self.debt_to_equity = as_number(value),
            fields::FREE_CASH_FLOW => self.free_cash_flow = as_number(value),
            fields::BOOK_VALUE_PER_SHARE => self.book_value_per_share = as_number(value),
            fields::CLOSE => self.close = as_number(value),
            fields::CHANGE => self.change = as_number(value),
            fields::VOLUME => self.volume = as_number(value),
            _ => {}
        }
    }

    /// Fill every field still missing here from `other`. Values already
    /// present win.
    pub fn merge(&mut self, other: StockRecord) {
        self.name = self.name.take().or(other.name);
        self.description = self.description.take().or(other.description);
        self.sector = self.sector.take().or(other.sector);

        self.market_cap = self.market_cap.or(other.market_cap);
        self.price_earnings = self.price_earnings.or(other.price_earnings);
        self.return_on_equity = self.return_on_equity.or(other.return_on_equity);
        self.return_on_assets = self.return_on_assets.or(other.return_on_assets);
        self.dividend_yield = self.dividend_yield.or(other.dividend_yield);

        self.revenue = self.revenue.or(other.revenue);
        self.net_income = self.net_income.or(other.net_income);
        self.operating_income = self.operating_income.or(other.operating_income);

        self.total_assets = self.total_assets.or(other.total_assets);
        self.current_liabilities = self.current_liabilities.or(other.current_liabilities);
        self.total_liabilities = self.total_liabilities.or(other.total_liabilities);
        self.total_debt = self.total_debt.or(other.total_debt);
        self.debt_to_equity = self.debt_to_equity.or(other.debt_to_equity);
        self.free_cash_flow = self.free_cash_flow.or(other.free_cash_flow);
        self.book_value_per_share = self.book_value_per_share.or(other.book_value_per_share);

        self.close = self.close.or(other.close);
        self.change = self.change.or(other.change);
        self.volume = self.volume.or(other.volume);
    }

    /// Short display name: company name when known, else the ticker
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.ticker)
    }
}

fn as_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

fn as_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
