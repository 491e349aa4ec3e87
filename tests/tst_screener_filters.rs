use fundamental_screener::screener::{
    build_base_query,
    build_enrichment_query,
    col,
    FundamentalFilters,
    Preset,
    Query,
    StockRecord,
};
use serde_json::{json, Value};

#[cfg(test)]
mod tests {
    use super::*;

    fn find_filter<'a>(payload: &'a Value, left: &str) -> &'a Value {
        payload["filter"]
            .as_array()
            .and_then(|filters| filters.iter().find(|f| f["left"] == left))
            .unwrap_or_else(|| panic!("no filter on {}", left))
    }

    fn passing_record() -> StockRecord {
        StockRecord {
            market_cap: Some(2_000.0 * 1e7),
            revenue: Some(5_000.0 * 1e7),
            price_earnings: Some(18.0),
            return_on_equity: Some(16.0),
            return_on_assets: Some(8.0),
            dividend_yield: Some(1.2),
            ..StockRecord::new("NSE:TEST")
        }
    }

    #[test]
    fn test_base_query_scales_crore_thresholds_to_rupees() {
        let filters = FundamentalFilters {
            min_market_cap_cr: 500.0,
            min_revenue_cr: 1_000.0,
            ..Default::default()
        };
        let payload = build_base_query(&filters).to_payload();

        let mcap = find_filter(&payload, "market_cap_basic");
        assert_eq!(mcap["operation"], "egreater");
        assert_eq!(mcap["right"].as_f64(), Some(5e9));

        let revenue = find_filter(&payload, "total_revenue_ttm");
        assert_eq!(revenue["right"].as_f64(), Some(1e10));

        let pe = find_filter(&payload, "price_earnings_ttm");
        assert_eq!(pe["operation"], "eless");
        assert_eq!(pe["right"].as_f64(), Some(40.0));
    }

    #[test]
    fn test_base_query_restricts_universe_and_sorts_by_mcap() {
        let payload = build_base_query(&FundamentalFilters::default()).to_payload();

        assert_eq!(payload["markets"], json!(["india"]));
        assert_eq!(find_filter(&payload, "type")["right"], "stock");
        assert_eq!(find_filter(&payload, "typespecs")["right"], json!(["common"]));
        assert_eq!(find_filter(&payload, "is_primary")["right"], true);

        assert_eq!(payload["sort"]["sortBy"], "market_cap_basic");
        assert_eq!(payload["sort"]["sortOrder"], "desc");
        assert_eq!(payload["range"], json!([0, 100]));
        assert!(payload.get("preset").is_none());

        let columns: Vec<&str> = payload["columns"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(columns.contains(&"name"));
        assert!(columns.contains(&"sector"));
        assert!(!columns.contains(&"type"));
    }

    #[test]
    fn test_base_query_carries_preset_and_clamped_limit() {
        let filters = FundamentalFilters {
            limit: 10_000,
            preset: Some(Preset::Gainers),
            ..Default::default()
        }
        .normalized();
        let payload = build_base_query(&filters).to_payload();

        assert_eq!(payload["preset"], "gainers");
        assert_eq!(payload["range"], json!([0, 500]));
    }

    #[test]
    fn test_enrichment_query_targets_tickers() {
        let tickers = vec!["NSE:TCS".to_string(), "NSE:INFY".to_string()];
        let payload = build_enrichment_query(&tickers).to_payload();

        assert_eq!(payload["symbols"]["tickers"], json!(["NSE:TCS", "NSE:INFY"]));
        assert_eq!(payload["range"], json!([0, 2]));
        assert!(payload["filter"].as_array().unwrap().is_empty());

        let columns = payload["columns"].as_array().unwrap();
        assert!(columns.contains(&json!("oper_income_ttm")));
        assert!(columns.contains(&json!("total_current_liabilities")));
    }

    #[test]
    fn test_matches_applies_every_threshold() {
        let filters = FundamentalFilters::default();
        assert!(filters.matches(&passing_record()));

        let mut expensive = passing_record();
        expensive.price_earnings = Some(55.0);
        assert!(!filters.matches(&expensive));

        let mut tiny = passing_record();
        tiny.market_cap = Some(100.0 * 1e7);
        assert!(!filters.matches(&tiny));

        let mut unknown_roa = passing_record();
        unknown_roa.return_on_assets = None;
        assert!(!filters.matches(&unknown_roa));
    }

    #[test]
    fn test_cache_key_distinguishes_filters() {
        let a = FundamentalFilters::default();
        let b = FundamentalFilters {
            min_roe: 20.0,
            ..Default::default()
        };
        let c = FundamentalFilters {
            preset: Some(Preset::Oversold),
            ..Default::default()
        };
        assert_eq!(a.cache_key(), FundamentalFilters::default().cache_key());
        assert_ne!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_query_validation() {
        assert!(Query::new().validate().is_err());

        let query = Query::new()
            .select(&["close"])
            .where_([col("close").gt(10.0)])
            .limit(0);
        assert!(query.validate().is_err());

        let query = Query::new().select(&["close"]).limit(5).offset(20);
        assert!(query.validate().is_ok());
        assert_eq!(query.to_payload()["range"], json!([20, 25]));
    }
}
