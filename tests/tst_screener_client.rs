use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use fundamental_screener::screener::screener_api_server::{build_router, AppState};
use fundamental_screener::screener::{FundamentalFilters, ScreenerClient};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy, PartialEq)]
enum Behaviour {
    Healthy,
    EnrichFails,
    BaseRejected,
    Empty,
    ThrottledOnce,
    AlwaysThrottled,
    EnrichFailsOnce,
    ErrorInBody,
}

struct FakeScanner {
    behaviour: Behaviour,
    calls: AtomicUsize,
    stocks: Vec<(String, Map<String, Value>)>,
}

fn fake_stock(ticker: &str, name: &str, mcap_cr: f64, roa: f64, sector: &str) -> (String, Map<String, Value>) {
    let crore = 1e7;
    let fields = json!({
        "name": name,
        "description": format!("{} Ltd", name),
        "sector": sector,
        "market_cap_basic": mcap_cr * crore,
        "total_revenue_ttm": 5_000.0 * crore,
        "net_income_ttm": 600.0 * crore,
        "price_earnings_ttm": 22.0,
        "return_on_equity": 18.0,
        "return_on_assets": roa,
        "dividends_yield_current": 1.1,
        "close": 1_520.5,
        "change": 0.8,
        "volume": 250_000.0,
        "oper_income_ttm": 900.0 * crore,
        "total_assets": 8_000.0 * crore,
        "total_current_liabilities": 2_000.0 * crore,
        "total_liabilities_fy": 4_000.0 * crore,
        "total_debt": 1_000.0 * crore,
        "debt_to_equity": 0.25,
        "free_cash_flow_ttm": 400.0 * crore,
        "book_value_per_share_fq": 310.0,
    });
    let fields = match fields {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    (ticker.to_string(), fields)
}

/// Answers with the requested columns, in request order
async fn fake_scan(State(fake): State<Arc<FakeScanner>>, Json(body): Json<Value>) -> impl IntoResponse {
    let call = fake.calls.fetch_add(1, Ordering::SeqCst);

    let tickers: Vec<String> = body["symbols"]["tickers"]
        .as_array()
        .map(|t| t.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let is_enrichment = !tickers.is_empty();

    match fake.behaviour {
        Behaviour::BaseRejected => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "bad filter"}))).into_response();
        }
        Behaviour::EnrichFails if is_enrichment => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "unknown column"}))).into_response();
        }
        Behaviour::ThrottledOnce if call == 0 => {
            return StatusCode::TOO_MANY_REQUESTS.into_response();
        }
        Behaviour::AlwaysThrottled => {
            return StatusCode::TOO_MANY_REQUESTS.into_response();
        }
        Behaviour::EnrichFailsOnce if is_enrichment && call == 1 => {
            return StatusCode::BAD_REQUEST.into_response();
        }
        Behaviour::ErrorInBody => {
            return Json(json!({"totalCount": 0, "data": null, "error": "Unknown field \"foo\""})).into_response();
        }
        Behaviour::Empty => {
            return Json(json!({"totalCount": 0, "data": null})).into_response();
        }
        _ => {}
    }

    let columns: Vec<String> = body["columns"]
        .as_array()
        .map(|c| c.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    let rows: Vec<Value> = fake
        .stocks
        .iter()
        .filter(|(ticker, _)| !is_enrichment || tickers.contains(ticker))
        .map(|(ticker, fields)| {
            let values: Vec<Value> = columns
                .iter()
                .map(|c| fields.get(c).cloned().unwrap_or(Value::Null))
                .collect();
            json!({"s": ticker, "d": values})
        })
        .collect();

    Json(json!({"totalCount": rows.len(), "data": rows})).into_response()
}

async fn spawn_fake(behaviour: Behaviour) -> (String, Arc<FakeScanner>) {
    let fake = Arc::new(FakeScanner {
        behaviour,
        calls: AtomicUsize::new(0),
        stocks: vec![
            fake_stock("NSE:MIDCO", "MIDCO", 8_000.0, 9.0, "Finance"),
            fake_stock("NSE:BIGCO", "BIGCO", 120_000.0, 11.0, "Technology Services"),
            fake_stock("NSE:LOWROA", "LOWROA", 60_000.0, 2.0, "Utilities"),
        ],
    });

    let app = Router::new()
        .route("/india/scan", post(fake_scan))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), fake)
}

fn client_for(base_url: &str) -> ScreenerClient {
    ScreenerClient::with_base_url(base_url)
        .unwrap()
        .with_enrich_delay(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_scan_merges_base_and_enrichment() {
        let (url, fake) = spawn_fake(Behaviour::Healthy).await;
        let report = client_for(&url).scan(&FundamentalFilters::default()).await;

        assert_eq!(report.error, None);
        assert_eq!(report.message, None);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);

        // LOWROA fails the local ROA >= 5 re-check
        let tickers: Vec<&str> = report.stocks.iter().map(|s| s.base.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["NSE:BIGCO", "NSE:MIDCO"]);

        let big = &report.stocks[0];
        assert_eq!(big.base.sector.as_deref(), Some("Technology Services"));
        assert!((big.market_cap_cr.unwrap() - 120_000.0).abs() < 1e-6);
        assert!((big.debt_cr.unwrap() - 1_000.0).abs() < 1e-6);
        assert!((big.roce.unwrap() - 15.0).abs() < 1e-9);
        assert!((0.0..=100.0).contains(&big.fundamental_score));
    }

    #[tokio::test]
    async fn test_enrichment_failure_keeps_base_rows() {
        let (url, _) = spawn_fake(Behaviour::EnrichFails).await;
        let report = client_for(&url).scan(&FundamentalFilters::default()).await;

        assert_eq!(report.error, None);
        assert_eq!(report.stocks.len(), 2);
        assert!(report.message.is_some());
        assert!(report.partial);
        assert!(report.stocks.iter().all(|s| s.roce.is_none()));
    }

    #[tokio::test]
    async fn test_rejected_request_becomes_flagged_empty_report() {
        let (url, fake) = spawn_fake(Behaviour::BaseRejected).await;
        let report = client_for(&url).scan(&FundamentalFilters::default()).await;

        assert!(report.is_empty());
        assert!(report.error.as_deref().unwrap().contains("HTTP 400"));
        assert_eq!(report.message.as_deref(), Some("No stocks matched the criteria."));
        // 400 is not retried
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_result_reports_no_match() {
        let (url, fake) = spawn_fake(Behaviour::Empty).await;
        let report = client_for(&url).scan(&FundamentalFilters::default()).await;

        assert!(report.is_empty());
        assert_eq!(report.error, None);
        assert_eq!(report.headline(), "No stocks matched the criteria.");
        // no enrichment call for an empty base
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_throttled_request_is_retried() {
        let (url, fake) = spawn_fake(Behaviour::ThrottledOnce).await;
        let report = client_for(&url).scan(&FundamentalFilters::default()).await;

        assert_eq!(report.error, None);
        assert_eq!(report.stocks.len(), 2);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_persistent_throttling_stops_after_three_attempts() {
        let (url, fake) = spawn_fake(Behaviour::AlwaysThrottled).await;
        let report = client_for(&url).scan(&FundamentalFilters::default()).await;

        assert!(report.is_empty());
        assert!(report.error.is_some());
        assert_eq!(fake.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_field_with_http_200_is_not_reported_as_rejection() {
        let (url, fake) = spawn_fake(Behaviour::ErrorInBody).await;
        let report = client_for(&url).scan(&FundamentalFilters::default()).await;

        assert!(report.is_empty());
        let error = report.error.unwrap();
        assert!(!error.contains("HTTP"), "unexpected message: {}", error);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    async fn get_json(app: Router, uri: &str) -> Value {
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri(uri)
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_api_does_not_cache_partial_reports() {
        let (url, fake) = spawn_fake(Behaviour::EnrichFailsOnce).await;
        let app = build_router(AppState::with_client(client_for(&url)));

        let first = get_json(app.clone(), "/api/scan").await;
        assert_eq!(first["data"]["report"]["partial"], true);
        assert!(first["data"]["report"]["stocks"][0]["roce"].is_null());
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);

        // partial result was not cached, so this goes upstream again
        let second = get_json(app.clone(), "/api/scan").await;
        assert_eq!(second["data"]["report"]["partial"], false);
        assert!(second["data"]["report"]["stocks"][0]["roce"].is_number());
        assert_eq!(fake.calls.load(Ordering::SeqCst), 4);

        // complete result is cached
        let third = get_json(app, "/api/scan").await;
        assert_eq!(third["data"]["report"]["partial"], false);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_api_scan_endpoint_returns_envelope() {
        let (url, _) = spawn_fake(Behaviour::Healthy).await;
        let app = build_router(AppState::with_client(client_for(&url)));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/scan?min_roa=10&sort=score")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["headline"], "Screener Results (1 stocks)");
        assert_eq!(body["data"]["report"]["stocks"][0]["ticker"], "NSE:BIGCO");
        assert_eq!(body["data"]["charts"]["sectors"]["slices"][0]["label"], "Technology Services");
    }

    #[tokio::test]
    async fn test_api_rejects_bad_parameters() {
        let app = build_router(AppState::with_client(client_for("http://127.0.0.1:9")));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/scan?max_pe=-3")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("max_pe"));
    }

    #[tokio::test]
    async fn test_api_export_returns_workbook() {
        let (url, _) = spawn_fake(Behaviour::Healthy).await;
        let app = build_router(AppState::with_client(client_for(&url)));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/export")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[axum::http::header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("india_fundamental_screener.xlsx"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
