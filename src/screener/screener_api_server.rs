use super::charts::{self, DashboardCharts};
use super::config;
use super::export;
use super::filters::{FundamentalFilters, Preset};
use super::processor::{sort_stocks, SortDirection, SortKey};
use super::report::ScanReport;
use super::screener_client::ScreenerClient;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

// -----------------------------------------------
// API REQUEST/RESPONSE MODELS
// -----------------------------------------------

/// Query string for /api/scan and /api/export. Missing fields use defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ScanParams {
    pub min_market_cap_cr: Option<f64>,
    pub max_pe: Option<f64>,
    pub min_roe: Option<f64>,
    pub min_roa: Option<f64>,
    pub min_dividend_yield: Option<f64>,
    pub min_revenue_cr: Option<f64>,
    pub limit: Option<usize>,
    pub preset: Option<String>,
    pub sort: Option<String>,
    pub ascending: Option<bool>,
}

impl ScanParams {
    pub fn to_filters(&self) -> Result<FundamentalFilters> {
        let defaults = FundamentalFilters::default();
        let filters = FundamentalFilters {
            min_market_cap_cr: self.min_market_cap_cr.unwrap_or(defaults.min_market_cap_cr),
            max_pe: self.max_pe.unwrap_or(defaults.max_pe),
            min_roe: self.min_roe.unwrap_or(defaults.min_roe),
            min_roa: self.min_roa.unwrap_or(defaults.min_roa),
            min_dividend_yield: self.min_dividend_yield.unwrap_or(defaults.min_dividend_yield),
            min_revenue_cr: self.min_revenue_cr.unwrap_or(defaults.min_revenue_cr),
            limit: self.limit.unwrap_or(defaults.limit),
            preset: match self.preset.as_deref() {
                Some(p) => Preset::parse_optional(p)?,
                None => None,
            },
        }
        .normalized();

        filters.validate()?;
        Ok(filters)
    }

    pub fn sort_order(&self) -> Result<Option<(SortKey, SortDirection)>> {
        let Some(sort) = self.sort.as_deref() else {
            return Ok(None);
        };
        let key: SortKey = sort.parse()?;
        let direction = if self.ascending.unwrap_or(false) {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        };
        Ok(Some((key, direction)))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub processing_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, start_time: Instant) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }

    fn failed(error: impl Into<String>, start_time: Instant) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct PresetInfo {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct ScanResponseBody {
    pub headline: String,
    pub report: ScanReport,
    pub charts: DashboardCharts,
}

// -----------------------------------------------
// APPLICATION STATE
// -----------------------------------------------

#[derive(Clone)]
pub struct AppState {
    client: Arc<ScreenerClient>,
    cache: Arc<RwLock<HashMap<String, (ScanReport, Instant)>>>,
}

impl AppState {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(ScreenerClient::new()?))
    }

    pub fn with_client(client: ScreenerClient) -> Self {
        Self {
            client: Arc::new(client),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Cached report for these filters, or a fresh scan. Failed and partial
    /// scans are not cached.
    async fn report_for(&self, filters: &FundamentalFilters) -> ScanReport {
        let key = filters.cache_key();
        {
            let cache = self.cache.read().await;
            if let Some((report, cached_at)) = cache.get(&key) {
                if cached_at.elapsed() < config::CACHE_DURATION {
                    return report.clone();
                }
            }
        }

        let report = self.client.scan(filters).await;
        if report.is_cacheable() {
            let mut cache = self.cache.write().await;
            cache.retain(|_, (_, cached_at)| cached_at.elapsed() < config::CACHE_DURATION);
            cache.insert(key, (report.clone(), Instant::now()));
        }
        report
    }
}

// -----------------------------------------------
// API HANDLERS
// -----------------------------------------------

/// GET /api/health
async fn health() -> &'static str {
    "ok"
}

/// GET /api/presets - Preset labels and wire values
async fn get_presets() -> Json<ApiResponse<Vec<PresetInfo>>> {
    let start_time = Instant::now();
    let mut presets = vec![PresetInfo {
        label: "None".to_string(),
        value: String::new(),
    }];
    presets.extend(Preset::ALL.iter().map(|p| PresetInfo {
        label: p.label().to_string(),
        value: p.wire_value().to_string(),
    }));
    Json(ApiResponse::ok(presets, start_time))
}

/// GET /api/scan?min_roe=15&preset=gainers - Run the screener
async fn get_scan(
    Query(params): Query<ScanParams>,
    State(app_state): State<AppState>,
) -> Json<ApiResponse<ScanResponseBody>> {
    let start_time = Instant::now();

    let (filters, sort) = match params.to_filters().and_then(|f| Ok((f, params.sort_order()?))) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "rejected scan parameters");
            return Json(ApiResponse::failed(e.to_string(), start_time));
        }
    };

    let mut report = app_state.report_for(&filters).await;
    if let Some((key, direction)) = sort {
        sort_stocks(&mut report.stocks, key, direction);
    }

    info!(rows = report.stocks.len(), "scan served");
    let charts = charts::build_dashboard_charts(&report.stocks);
    Json(ApiResponse::ok(
        ScanResponseBody {
            headline: report.headline(),
            report,
            charts,
        },
        start_time,
    ))
}

/// GET /api/export?... - Download the current result as .xlsx
async fn get_export(
    Query(params): Query<ScanParams>,
    State(app_state): State<AppState>,
) -> Response {
    let start_time = Instant::now();

    let filters = match params.to_filters() {
        Ok(filters) => filters,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::failed(e.to_string(), start_time)),
            )
                .into_response();
        }
    };

    let report = app_state.report_for(&filters).await;
    match export::write_workbook(&report.stocks) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, config::XLSX_MIME.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", config::EXPORT_FILE_NAME),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::failed(format!("{:#}", e), start_time)),
        )
            .into_response(),
    }
}

// -----------------------------------------------
// SERVER SETUP
// -----------------------------------------------

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/presets", get(get_presets))
        .route("/api/scan", get(get_scan))
        .route("/api/export", get(get_export))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn start_server(port: u16) -> Result<()> {
    let app = build_router(AppState::new()?);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, "screener API listening");
    println!("🚀 Screener API Server running on http://{}", addr);
    println!("📋 Available endpoints:");
    println!("   GET  /api/health");
    println!("   GET  /api/presets");
    println!("   GET  /api/scan?min_market_cap_cr=500&max_pe=40&min_roe=10&limit=100&preset=gainers&sort=score");
    println!("   GET  /api/export?min_market_cap_cr=500&max_pe=40");
    println!();

    axum::serve(listener, app).await?;
    Ok(())
}
