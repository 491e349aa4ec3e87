use super::config;
use super::error::ScreenerError;
use super::filters::{build_base_query, build_enrichment_query, FundamentalFilters};
use super::models::{ScanResponse, StockRecord};
use super::processor::process_records;
use super::query::Query;
use super::report::ScanReport;
use crate::utility::timing::{timed, Timer};
use anyhow::{Context, Result};
use rand::{seq::SliceRandom, thread_rng};
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::{debug, error, info, warn};

/// Records from a base + enrichment run
#[derive(Debug, Clone)]
pub struct FetchedRecords {
    pub total_count: usize,
    pub records: Vec<StockRecord>,
    /// Set when the enrichment step failed and only base columns are present
    pub enrichment_error: Option<String>,
}

// -----------------------------------------------
// CLIENT WRAPPER
// -----------------------------------------------
pub struct ScreenerClient {
    client: Client,
    base_url: String,
    enrich_delay: Duration,
}

impl ScreenerClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(config::get_base_url())
            .map(|c| c.with_enrich_delay(config::get_enrich_delay()))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.into(),
            enrich_delay: Duration::from_millis(config::ENRICH_DELAY_MS),
        })
    }

    pub fn with_enrich_delay(mut self, delay: Duration) -> Self {
        self.enrich_delay = delay;
        self
    }

    /// POST one query, retrying only on throttling and upstream failures
    async fn post_scan(&self, query: &Query) -> Result<ScanResponse, ScreenerError> {
        query.validate()?;

        let url = config::scanner_url(&self.base_url, query.primary_market());
        let payload = query.to_payload();

        let backoff = ExponentialBackoff::from_millis(config::RETRY_BASE_DELAY_MS)
            .factor(config::RETRY_FACTOR)
            .max_delay(Duration::from_secs(config::RETRY_MAX_DELAY_SECS))
            .take(config::RETRY_MAX_ATTEMPTS.saturating_sub(1));

        RetryIf::start(
            backoff,
            || self.send_scan(&url, &payload),
            |e: &ScreenerError| e.is_retryable(),
        )
        .await
    }

    async fn send_scan(&self, url: &str, payload: &Value) -> Result<ScanResponse, ScreenerError> {
        let res = self
            .client
            .post(url)
            .header(header::ORIGIN, config::HEADER_ORIGIN)
            .header(header::REFERER, config::HEADER_REFERER)
            .json(payload)
            .send()
            .await?;

        let status = res.status();
        debug!(url = %url, status = status.as_u16(), "scanner response");

        if status.is_success() {
            let text = res.text().await?;

            let trimmed = text.trim();
            if !trimmed.starts_with('{') {
                let preview: String = text.chars().take(200).collect();
                return Err(ScreenerError::NonJsonResponse(preview));
            }

            let response: ScanResponse = serde_json::from_str(trimmed)?;
            if let Some(message) = response.error.clone() {
                return Err(ScreenerError::Upstream(message));
            }
            Ok(response)
        } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            warn!(status = status.as_u16(), "scanner throttled or unavailable");
            Err(ScreenerError::RateLimited {
                status: status.as_u16(),
            })
        } else {
            let body = res.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            Err(ScreenerError::Rejected {
                status: status.as_u16(),
                body: preview,
            })
        }
    }

    /// Run a query, returning the upstream total count and decoded records
    pub async fn get_scanner_data(&self, query: &Query) -> Result<(usize, Vec<StockRecord>)> {
        let response = self.post_scan(query).await?;

        let columns: Vec<&str> = query.columns().iter().map(String::as_str).collect();
        let records = response
            .data
            .iter()
            .map(|row| StockRecord::from_row(&row.ticker, &columns, &row.values))
            .collect();

        Ok((response.total_count, records))
    }

    // -----------------------------------------------
    // STEP 1: BASE QUERY
    // -----------------------------------------------
    pub async fn fetch_base(&self, filters: &FundamentalFilters) -> Result<(usize, Vec<StockRecord>)> {
        let query = build_base_query(filters);
        self.get_scanner_data(&query)
            .await
            .context("Base screener query failed")
    }

    // -----------------------------------------------
    // STEP 2: ENRICHMENT QUERY
    // -----------------------------------------------
    pub async fn fetch_enrichment(&self, tickers: &[String]) -> Result<HashMap<String, StockRecord>> {
        if tickers.is_empty() {
            return Ok(HashMap::new());
        }

        let query = build_enrichment_query(tickers);
        let (_, records) = self
            .get_scanner_data(&query)
            .await
            .context("Enrichment query failed")?;

        Ok(records
            .into_iter()
            .map(|record| (record.ticker.clone(), record))
            .collect())
    }

    // -----------------------------------------------
    // BASE -> PAUSE -> ENRICH -> MERGE
    // -----------------------------------------------
    pub async fn run_fundamental_scan(&self, filters: &FundamentalFilters) -> Result<FetchedRecords> {
        let (total_count, mut records) = {
            let _timer = Timer::start("base query");
            self.fetch_base(filters).await?
        };
        info!(rows = records.len(), total_count, "base query complete");

        if records.is_empty() {
            return Ok(FetchedRecords {
                total_count,
                records,
                enrichment_error: None,
            });
        }

        if !self.enrich_delay.is_zero() {
            tokio::time::sleep(self.enrich_delay).await;
        }

        let tickers: Vec<String> = records.iter().map(|r| r.ticker.clone()).collect();
        let enrichment = {
            let _timer = Timer::start("enrichment query");
            self.fetch_enrichment(&tickers).await
        };

        let enrichment_error = match enrichment {
            Ok(mut extra) => {
                for record in records.iter_mut() {
                    if let Some(more) = extra.remove(&record.ticker) {
                        record.merge(more);
                    }
                }
                None
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "enrichment failed, keeping base columns only");
                Some(format!("{:#}", e))
            }
        };

        // Scanner-side thresholds are re-checked locally
        records.retain(|r| filters.matches(r));

        Ok(FetchedRecords {
            total_count,
            records,
            enrichment_error,
        })
    }

    /// Full screener run with the user-facing error policy: any failure
    /// becomes an empty, flagged report instead of an error.
    pub async fn scan(&self, filters: &FundamentalFilters) -> ScanReport {
        match self.run_fundamental_scan(filters).await {
            Ok(fetched) => {
                let stocks = timed("derive columns", || process_records(fetched.records));
                let report = ScanReport::new(filters.clone(), fetched.total_count, stocks);
                match fetched.enrichment_error {
                    Some(_) if !report.is_empty() => report.into_partial(
                        "Balance-sheet data is unavailable right now; ROCE, debt and score are partial.",
                    ),
                    _ => report,
                }
            }
            Err(e) => {
                error!(error = %format!("{:#}", e), "screener run failed");
                ScanReport::empty(filters.clone(), Some(user_message(&e)))
            }
        }
    }
}

/// Generic failure text, with the one special case for a rejected request
pub fn user_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ScreenerError>() {
        Some(ScreenerError::Rejected { status, .. }) => format!(
            "The screener rejected the request (HTTP {}). Try fewer stocks or looser filters.",
            status
        ),
        Some(ScreenerError::Upstream(_)) => {
            "The screener could not process these filters. Try looser filters or another preset.".to_string()
        }
        _ => "Could not fetch data from the screener. Please try again later.".to_string(),
    }
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client() -> Result<Client> {
    let mut headers = header::HeaderMap::new();

    let lang = config::ACCEPT_LANGUAGES
        .choose(&mut thread_rng())
        .copied()
        .unwrap_or(config::ACCEPT_LANGUAGES[0]);
    headers.insert(header::ACCEPT_LANGUAGE, header::HeaderValue::from_str(lang)?);
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

    Client::builder()
        .default_headers(headers)
        .gzip(true)
        .user_agent(config::USER_AGENT)
        .timeout(config::HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_special_cases_rejection() {
        let rejected = anyhow::Error::new(ScreenerError::Rejected {
            status: 400,
            body: "too many rows".into(),
        });
        assert!(user_message(&rejected).contains("HTTP 400"));

        let timeout = anyhow::Error::new(ScreenerError::Request("timed out".into()));
        assert!(!user_message(&timeout).contains("HTTP"));
    }

    #[test]
    fn test_user_message_sees_through_context() {
        let err = anyhow::Error::new(ScreenerError::Rejected { status: 422, body: String::new() })
            .context("Base screener query failed");
        assert!(user_message(&err).contains("HTTP 422"));
    }

    #[test]
    fn test_user_message_for_error_body_has_no_status() {
        let err = anyhow::Error::new(ScreenerError::Upstream("Unknown field".into()));
        let message = user_message(&err);
        assert!(!message.contains("HTTP"));
        assert!(message.contains("could not process"));
    }
}
