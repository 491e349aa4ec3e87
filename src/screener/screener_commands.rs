use super::charts;
use super::config;
use super::export;
use super::filters::FundamentalFilters;
use super::report::{self, ScanReport};
use super::screener_api_server;
use super::ScreenerClient;
use crate::utility::timing::Timer;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

/// Screener command handler: one-shot scans and the API server
pub struct ScreenerCommands;

impl ScreenerCommands {
    /// Run one scan with filters from the environment, print it and save the workbook
    pub async fn run_scan() -> Result<()> {
        Self::banner("India Fundamental Screener");

        let filters = FundamentalFilters::from_env()?;
        Self::display_filters(&filters);

        let client = ScreenerClient::new()?;

        println!("{}", "Step 1: Querying the scanner (base + enrichment)...".cyan());
        let timer = Timer::silent("scan");
        let report = client.scan(&filters).await;
        let elapsed = timer.elapsed();
        println!();

        if let Some(error) = &report.error {
            println!("{} {}", "✗".red(), error.red());
        }
        if let Some(message) = &report.message {
            println!("{} {}", "ℹ".blue(), message);
        }

        if report.is_empty() {
            Self::save_snapshot(&report)?;
            Self::banner_done();
            return Ok(());
        }

        println!("{}", "Step 2: Results".cyan());
        println!("{}", report.headline().green().bold());
        println!("{}", report::render_table(&report.stocks));
        println!();

        let bars = charts::top_score_bars(&report.stocks, charts::TOP_SCORE_BARS);
        println!("{}", bars.title.cyan().bold());
        println!("{}", charts::render_score_bars(&bars, 40));
        println!();

        println!("{}", "Step 3: Saving output...".cyan());
        let output = config::get_output_path();
        let saved = export::save_workbook(&report.stocks, &output)?;
        println!(
            "{} Saved {} rows to {} ({} bytes)",
            "✓".green(),
            saved.rows,
            output.yellow(),
            saved.bytes
        );
        Self::save_snapshot(&report)?;

        Self::display_summary(&report, elapsed);
        Self::banner_done();
        Ok(())
    }

    /// Run API server mode
    pub async fn run_server(port: u16) -> Result<()> {
        Self::banner("Fundamental Screener API Server");
        screener_api_server::start_server(port).await
    }

    fn banner(title: &str) {
        println!("{}", "=".repeat(60).blue());
        println!("{}", title.green().bold());
        println!("{}", "=".repeat(60).blue());
        println!();
    }

    fn banner_done() {
        println!();
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Done!".green().bold());
        println!("{}", "=".repeat(60).blue());
    }

    fn display_filters(filters: &FundamentalFilters) {
        println!("{} Min market cap: ₹{} Cr", "→".cyan(), filters.min_market_cap_cr);
        println!("{} Max PE: {}", "→".cyan(), filters.max_pe);
        println!("{} Min ROE: {}%  Min ROA: {}%", "→".cyan(), filters.min_roe, filters.min_roa);
        println!("{} Min dividend yield: {}%", "→".cyan(), filters.min_dividend_yield);
        println!("{} Min revenue: ₹{} Cr", "→".cyan(), filters.min_revenue_cr);
        println!("{} Limit: {}", "→".cyan(), filters.limit);
        match filters.preset {
            Some(preset) => println!("{} Preset: {}", "→".cyan(), preset.label().yellow()),
            None => println!("{} Preset: None", "→".cyan()),
        }
        println!();
    }

    fn display_summary(report: &ScanReport, elapsed: std::time::Duration) {
        println!();
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Summary".cyan().bold());
        println!("{}", "=".repeat(60).blue());
        println!("{} Stocks shown: {}", "✓".green(), report.stocks.len());
        println!("{} Scanner matches: {}", "ℹ".blue(), report.total_count);

        let with_roce = report.stocks.iter().filter(|s| s.roce.is_some()).count();
        println!("{} Rows with ROCE: {}", "ℹ".blue(), with_roce);

        if let Some(best) = report.stocks.iter().max_by(|a, b| {
            a.fundamental_score.total_cmp(&b.fundamental_score)
        }) {
            println!(
                "{} Top score: {} ({:.1})",
                "★".yellow(),
                best.base.display_name().yellow(),
                best.fundamental_score
            );
        }
        println!("{} Time taken: {:.2}s", "⏱".yellow(), elapsed.as_secs_f64());
    }

    /// Write the full report as JSON alongside the workbook
    fn save_snapshot(report: &ScanReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(config::SNAPSHOT_FILE_NAME, json)
            .with_context(|| format!("Failed to write {}", config::SNAPSHOT_FILE_NAME))?;
        info!(path = config::SNAPSHOT_FILE_NAME, rows = report.stocks.len(), "snapshot written");
        println!("{} Saved snapshot to {}", "✓".green(), config::SNAPSHOT_FILE_NAME);
        Ok(())
    }

    /// Print usage instructions
    pub fn print_usage() {
        eprintln!("Set SCREENER_MODE environment variable to control execution mode");
        eprintln!("Examples:");
        eprintln!("  SCREENER_MODE=server SCREENER_PORT=3002 cargo run   # Start API server on port 3002");
        eprintln!("  SCREENER_MODE=scan SCREENER_MIN_ROE=15 cargo run    # Run one scan and save the workbook");
        eprintln!("Filters: SCREENER_MIN_MCAP_CR, SCREENER_MAX_PE, SCREENER_MIN_ROE, SCREENER_MIN_ROA,");
        eprintln!("         SCREENER_MIN_DIVIDEND, SCREENER_MIN_REVENUE_CR, SCREENER_LIMIT, SCREENER_PRESET");
        eprintln!("Note: GitHub Actions only supports 'scan' mode");
    }

    /// Handle CI environment mode switching
    pub fn handle_ci_mode_override(mode: &str) -> bool {
        if config::is_ci_environment() && mode == "server" {
            println!("{} GitHub Actions only supports scan mode, running scan instead", "ℹ".blue());
            true
        } else {
            false
        }
    }
}
