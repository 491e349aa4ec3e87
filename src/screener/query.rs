use super::config;
use super::error::ScreenerError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// -----------------------------------------------
// FILTER PREDICATES
// -----------------------------------------------

/// Comparison operators understood by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "equal")]
    Equal,
    #[serde(rename = "nequal")]
    NotEqual,
    #[serde(rename = "greater")]
    Greater,
    #[serde(rename = "egreater")]
    GreaterOrEqual,
    #[serde(rename = "less")]
    Less,
    #[serde(rename = "eless")]
    LessOrEqual,
    #[serde(rename = "in_range")]
    InRange,
    #[serde(rename = "has")]
    Has,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub left: String,
    pub operation: FilterOp,
    pub right: Value,
}

/// A named scanner column used to build predicates
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn filter(&self, operation: FilterOp, right: Value) -> Filter {
        Filter {
            left: self.name.clone(),
            operation,
            right,
        }
    }

    pub fn eq(&self, value: impl Into<Value>) -> Filter {
        self.filter(FilterOp::Equal, value.into())
    }

    pub fn ne(&self, value: impl Into<Value>) -> Filter {
        self.filter(FilterOp::NotEqual, value.into())
    }

    pub fn gt(&self, value: impl Into<Value>) -> Filter {
        self.filter(FilterOp::Greater, value.into())
    }

    pub fn ge(&self, value: impl Into<Value>) -> Filter {
        self.filter(FilterOp::GreaterOrEqual, value.into())
    }

    pub fn lt(&self, value: impl Into<Value>) -> Filter {
        self.filter(FilterOp::Less, value.into())
    }

    pub fn le(&self, value: impl Into<Value>) -> Filter {
        self.filter(FilterOp::LessOrEqual, value.into())
    }

    pub fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Filter {
        self.filter(FilterOp::InRange, json!([low.into(), high.into()]))
    }

    pub fn isin<I, V>(&self, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter(FilterOp::InRange, Value::Array(list))
    }

    pub fn has<I, V>(&self, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter(FilterOp::Has, Value::Array(list))
    }
}

pub fn col(name: &str) -> Column {
    Column::new(name)
}

// -----------------------------------------------
// QUERY BUILDER
// -----------------------------------------------

/// Scanner query: market, columns, predicates, ordering and row window
#[derive(Debug, Clone)]
pub struct Query {
    markets: Vec<String>,
    columns: Vec<String>,
    filters: Vec<Filter>,
    order_by: Option<(String, bool)>,
    offset: usize,
    limit: usize,
    tickers: Vec<String>,
    preset: Option<String>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            markets: vec![config::MARKET_INDIA.to_string()],
            columns: Vec::new(),
            filters: Vec::new(),
            order_by: None,
            offset: 0,
            limit: config::DEFAULT_LIMIT,
            tickers: Vec::new(),
            preset: None,
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_markets(mut self, markets: &[&str]) -> Self {
        self.markets = markets.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn where_(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order_by = Some((column.to_string(), ascending));
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn set_tickers<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tickers = tickers.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_preset(mut self, preset: Option<&str>) -> Self {
        self.preset = preset.map(str::to_string);
        self
    }

    /// Market the request is routed to (first one wins for the URL path)
    pub fn primary_market(&self) -> &str {
        self.markets
            .first()
            .map(String::as_str)
            .unwrap_or(config::MARKET_INDIA)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn validate(&self) -> Result<(), ScreenerError> {
        if self.columns.is_empty() {
            return Err(ScreenerError::InvalidQuery("no columns selected".to_string()));
        }
        if self.limit == 0 {
            return Err(ScreenerError::InvalidQuery("limit must be positive".to_string()));
        }
        if self.markets.is_empty() {
            return Err(ScreenerError::InvalidQuery("no market selected".to_string()));
        }
        Ok(())
    }

    /// JSON body for the scanner POST
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "markets": self.markets,
            "symbols": {
                "query": { "types": [] },
                "tickers": self.tickers,
            },
            "options": { "lang": "en" },
            "columns": self.columns,
            "filter": self.filters,
            "range": [self.offset, self.offset + self.limit],
        });

        if let Some((column, ascending)) = &self.order_by {
            payload["sort"] = json!({
                "sortBy": column,
                "sortOrder": if *ascending { "asc" } else { "desc" },
            });
        }

        if let Some(preset) = &self.preset {
            payload["preset"] = json!(preset);
        }

        payload
    }
}
