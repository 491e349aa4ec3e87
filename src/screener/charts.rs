use super::processor::ProcessedStock;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DONUT_HOLE: f64 = 0.4;
pub const TOP_SCORE_BARS: usize = 15;
const UNKNOWN_SECTOR: &str = "Unclassified";

// -----------------------------------------------
// CHART DESCRIPTIONS (rendered by the dashboard front end)
// -----------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterChart {
    pub title: String,
    pub x_axis: String,
    pub y_axis: String,
    pub size_field: String,
    pub color_field: String,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarChart {
    pub title: String,
    pub x_axis: String,
    pub y_axis: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonutSlice {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonutChart {
    pub title: String,
    pub hole: f64,
    pub slices: Vec<DonutSlice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardCharts {
    pub valuation: ScatterChart,
    pub top_scores: BarChart,
    pub sectors: DonutChart,
}

/// PE vs ROE, bubble size = market cap, colour = sector.
/// Rows lacking any of PE, ROE or market cap are left out.
pub fn valuation_scatter(stocks: &[ProcessedStock]) -> ScatterChart {
    let points = stocks
        .iter()
        .filter_map(|s| {
            Some(ScatterPoint {
                label: s.base.display_name().to_string(),
                x: s.base.price_earnings?,
                y: s.base.return_on_equity?,
                size: s.market_cap_cr?,
                color: sector_of(s),
            })
        })
        .collect();

    ScatterChart {
        title: "Valuation vs Profitability".to_string(),
        x_axis: "PE (TTM)".to_string(),
        y_axis: "ROE %".to_string(),
        size_field: "Market Cap (₹ Cr)".to_string(),
        color_field: "Sector".to_string(),
        points,
    }
}

/// Highest fundamental scores first
pub fn top_score_bars(stocks: &[ProcessedStock], top_n: usize) -> BarChart {
    let mut ranked: Vec<&ProcessedStock> = stocks.iter().collect();
    ranked.sort_by(|a, b| b.fundamental_score.total_cmp(&a.fundamental_score));
    ranked.truncate(top_n);

    BarChart {
        title: format!("Top {} by Fundamental Score", ranked.len()),
        x_axis: "Stock".to_string(),
        y_axis: "Score".to_string(),
        labels: ranked.iter().map(|s| s.base.display_name().to_string()).collect(),
        values: ranked.iter().map(|s| s.fundamental_score).collect(),
    }
}

/// Stock count per sector, largest slice first
pub fn sector_donut(stocks: &[ProcessedStock]) -> DonutChart {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for stock in stocks {
        *counts.entry(sector_of(stock)).or_insert(0) += 1;
    }

    let mut slices: Vec<DonutSlice> = counts
        .into_iter()
        .map(|(label, count)| DonutSlice { label, value: count as f64 })
        .collect();
    slices.sort_by(|a, b| b.value.total_cmp(&a.value));

    DonutChart {
        title: "Sector Distribution".to_string(),
        hole: DONUT_HOLE,
        slices,
    }
}

pub fn build_dashboard_charts(stocks: &[ProcessedStock]) -> DashboardCharts {
    DashboardCharts {
        valuation: valuation_scatter(stocks),
        top_scores: top_score_bars(stocks, TOP_SCORE_BARS),
        sectors: sector_donut(stocks),
    }
}

fn sector_of(stock: &ProcessedStock) -> String {
    stock
        .base
        .sector
        .clone()
        .unwrap_or_else(|| UNKNOWN_SECTOR.to_string())
}

// -----------------------------------------------
// TERMINAL RENDERING
// -----------------------------------------------

/// Horizontal text bar chart of the top scores for the CLI
pub fn render_score_bars(chart: &BarChart, width: usize) -> String {
    let label_width = chart.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let mut out = String::new();

    for (label, value) in chart.labels.iter().zip(chart.values.iter()) {
        // scores are on a 0..=100 scale
        let filled = ((value / 100.0) * width as f64).round().clamp(0.0, width as f64) as usize;
        let bar = "█".repeat(filled);
        let colored_bar = if *value >= 70.0 {
            bar.green()
        } else if *value >= 40.0 {
            bar.yellow()
        } else {
            bar.red()
        };
        out.push_str(&format!(
            "{:<label_width$} │ {} {:.1}\n",
            label,
            colored_bar,
            value,
            label_width = label_width
        ));
    }

    out
}
