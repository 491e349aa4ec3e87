use super::config;
use super::models::StockRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Stock record with derived fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedStock {
    #[serde(flatten)]
    pub base: StockRecord,

    pub market_cap_cr: Option<f64>,
    pub revenue_cr: Option<f64>,
    pub debt_cr: Option<f64>,
    pub roce: Option<f64>, // percent
    pub fundamental_score: f64, // 0..=100
}

// -----------------------------------------------
// UNIT CONVERSION
// -----------------------------------------------

/// Rupees to ₹ crore
pub fn to_crore(value: f64) -> f64 {
    value / config::CRORE
}

/// ₹ crore to rupees
pub fn from_crore(value: f64) -> f64 {
    value * config::CRORE
}

// -----------------------------------------------
// DERIVED RATIOS
// -----------------------------------------------

/// Return on capital employed, in percent.
/// None unless capital employed (assets - current liabilities) is positive.
pub fn calculate_roce(
    operating_income: Option<f64>,
    total_assets: Option<f64>,
    current_liabilities: Option<f64>,
) -> Option<f64> {
    let capital_employed = total_assets? - current_liabilities?;
    if capital_employed <= 0.0 {
        return None;
    }
    let roce = operating_income? / capital_employed * 100.0;
    roce.is_finite().then_some(roce)
}

/// Which end of a metric ranks highest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    HigherIsBetter,
    LowerIsBetter,
}

/// Percentile rank in (0, 1] for every present value. Ties share the
/// average of their ordinal positions; missing values stay missing.
pub fn percentile_rank(values: &[Option<f64>], order: RankOrder) -> Vec<Option<f64>> {
    let mut present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(idx, v)| v.filter(|x| x.is_finite()).map(|x| (idx, x)))
        .collect();

    let mut ranks = vec![None; values.len()];
    let count = present.len();
    if count == 0 {
        return ranks;
    }

    present.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        match order {
            RankOrder::HigherIsBetter => ord,
            RankOrder::LowerIsBetter => ord.reverse(),
        }
    });

    let mut start = 0;
    while start < count {
        let mut end = start + 1;
        while end < count && present[end].1 == present[start].1 {
            end += 1;
        }
        // ordinal ranks start+1 ..= end, averaged over the tie group
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &(idx, _) in &present[start..end] {
            ranks[idx] = Some(avg_rank / count as f64);
        }
        start = end;
    }

    ranks
}

/// Weighted percentile score in 0..=100. Missing ranks contribute nothing.
pub fn composite_score(
    roe_rank: Option<f64>,
    roce_rank: Option<f64>,
    pe_rank: Option<f64>,
    debt_rank: Option<f64>,
) -> f64 {
    let part = |rank: Option<f64>, weight: f64| rank.unwrap_or(0.0).clamp(0.0, 1.0) * weight;

    let score = part(roe_rank, config::SCORE_WEIGHT_ROE)
        + part(roce_rank, config::SCORE_WEIGHT_ROCE)
        + part(pe_rank, config::SCORE_WEIGHT_PE)
        + part(debt_rank, config::SCORE_WEIGHT_DEBT);

    (score * 100.0).clamp(0.0, 100.0)
}

// -----------------------------------------------
// PIPELINE
// -----------------------------------------------

/// Derive crore columns, ROCE and the fundamental score, then order by
/// market cap, largest first
pub fn process_records(records: Vec<StockRecord>) -> Vec<ProcessedStock> {
    let roce: Vec<Option<f64>> = records
        .iter()
        .map(|r| calculate_roce(r.operating_income, r.total_assets, r.current_liabilities))
        .collect();

    let roe_values: Vec<Option<f64>> = records.iter().map(|r| r.return_on_equity).collect();
    // Loss-makers report a non-positive PE; it says nothing about cheapness
    let pe_values: Vec<Option<f64>> = records
        .iter()
        .map(|r| r.price_earnings.filter(|pe| *pe > 0.0))
        .collect();
    let debt_values: Vec<Option<f64>> = records.iter().map(|r| r.debt_to_equity).collect();

    let roe_ranks = percentile_rank(&roe_values, RankOrder::HigherIsBetter);
    let roce_ranks = percentile_rank(&roce, RankOrder::HigherIsBetter);
    let pe_ranks = percentile_rank(&pe_values, RankOrder::LowerIsBetter);
    let debt_ranks = percentile_rank(&debt_values, RankOrder::LowerIsBetter);

    let mut processed: Vec<ProcessedStock> = records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| ProcessedStock {
            market_cap_cr: record.market_cap.map(to_crore),
            revenue_cr: record.revenue.map(to_crore),
            debt_cr: record.total_debt.map(to_crore),
            roce: roce[idx],
            fundamental_score: composite_score(
                roe_ranks[idx],
                roce_ranks[idx],
                pe_ranks[idx],
                debt_ranks[idx],
            ),
            base: record,
        })
        .collect();

    sort_stocks(&mut processed, SortKey::MarketCap, SortDirection::Descending);
    processed
}

// -----------------------------------------------
// SORTING
// -----------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    MarketCap,
    Score,
    Pe,
    Roe,
    Roce,
    Change,
    Volume,
    Name,
}

impl std::str::FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "market_cap" | "mcap" => Ok(SortKey::MarketCap),
            "score" | "fundamental_score" => Ok(SortKey::Score),
            "pe" | "price_earnings" => Ok(SortKey::Pe),
            "roe" => Ok(SortKey::Roe),
            "roce" => Ok(SortKey::Roce),
            "change" => Ok(SortKey::Change),
            "volume" => Ok(SortKey::Volume),
            "name" => Ok(SortKey::Name),
            other => Err(anyhow::anyhow!("Unknown sort key '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

fn sort_value(stock: &ProcessedStock, key: SortKey) -> Option<f64> {
    match key {
        SortKey::MarketCap => stock.market_cap_cr,
        SortKey::Score => Some(stock.fundamental_score),
        SortKey::Pe => stock.base.price_earnings,
        SortKey::Roe => stock.base.return_on_equity,
        SortKey::Roce => stock.roce,
        SortKey::Change => stock.base.change,
        SortKey::Volume => stock.base.volume,
        SortKey::Name => None,
    }
}

/// Stable sort; rows missing the key always go last
pub fn sort_stocks(stocks: &mut [ProcessedStock], key: SortKey, direction: SortDirection) {
    if key == SortKey::Name {
        stocks.sort_by(|a, b| {
            let ord = a.base.display_name().cmp(b.base.display_name());
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        return;
    }

    stocks.sort_by(|a, b| match (sort_value(a, key), sort_value(b, key)) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
