//! HTTP surface for the search service
//!
//! Routes:
//! - `GET /api/search?q=&limit=&ts=`
//! - `GET /api/debug`
//! - `GET /health`
//!
//! Every response is sent with `Cache-Control: no-store`. Query strings are
//! read leniently: the first value of a repeated key wins and unknown keys
//! are ignored, so `/api/search` never rejects a request.

use std::sync::Arc;

use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::resolve::CACHE_BUST_PARAM;
use crate::service::{SearchRequest, SearchService, SearchStatus};

/// Build the router serving `service`
pub fn router(service: Arc<SearchService>) -> Router {
    Router::new()
        .route("/api/search", get(search))
        .route("/api/debug", get(debug_report))
        .route("/health", get(health))
        .with_state(service)
}

/// Status code for a finished search
pub fn status_for(status: SearchStatus) -> StatusCode {
    match status {
        SearchStatus::Ok => StatusCode::OK,
        SearchStatus::ConfigMissing => StatusCode::INTERNAL_SERVER_ERROR,
        SearchStatus::CatalogUnavailable => StatusCode::BAD_GATEWAY,
    }
}

/// Build a [`SearchRequest`] from a raw query string
pub fn search_request_from_query(raw: &str) -> SearchRequest {
    let mut request = SearchRequest::default();

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        let slot = match key.as_ref() {
            "q" => &mut request.q,
            "limit" => &mut request.limit,
            CACHE_BUST_PARAM => &mut request.ts,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    request
}

fn no_store<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

async fn search(
    State(service): State<Arc<SearchService>>,
    RawQuery(query): RawQuery,
) -> Response {
    let request = search_request_from_query(query.as_deref().unwrap_or_default());
    let outcome = service.search(&request).await;
    no_store(status_for(outcome.status), outcome.response)
}

async fn debug_report(State(service): State<Arc<SearchService>>) -> Response {
    no_store(StatusCode::OK, service.diagnose().await)
}

async fn health() -> Response {
    no_store(StatusCode::OK, serde_json::json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::fetch::mock::MockFetcher;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const CATALOG: &str = "https://h/x/modules/catalog.json";

    fn app(config: SearchConfig) -> Router {
        let fetcher = MockFetcher::new()
            .json(CATALOG, json!({"groups": [{"id": "g1", "path": "g1.json"}]}))
            .json(
                "https://h/x/modules/g1.json",
                json!({"modules": [
                    {"id": "m1", "name": "Alpha", "tags": ["x"]},
                    {"id": "m2", "name": "Beta", "tags": ["y"]}
                ]}),
            );
        router(Arc::new(SearchService::with_fetcher(config, Arc::new(fetcher))))
    }

    fn configured() -> SearchConfig {
        SearchConfig {
            catalog_url: Some(CATALOG.to_string()),
            ..Default::default()
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Option<String>, Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let cache = resp
            .headers()
            .get(header::CACHE_CONTROL)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, cache, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_search_route() {
        let (status, cache, body) = get_json(app(configured()), "/api/search?q=alpha&limit=10").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("no-store"));
        assert_eq!(body, json!({"items": [{"id": "m1", "name": "Alpha", "tags": ["x"]}]}));
    }

    #[tokio::test]
    async fn test_non_numeric_limit_uses_default() {
        let (status, _, body) = get_json(app(configured()), "/api/search?limit=lots").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_config_missing_is_server_error() {
        let (status, cache, body) = get_json(app(SearchConfig::default()), "/api/search").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(cache.as_deref(), Some("no-store"));
        assert_eq!(body["items"], json!([]));
        assert_eq!(body["error"], json!("CATALOG_URL not set"));
    }

    #[tokio::test]
    async fn test_debug_and_health_routes() {
        let (status, _, body) = get_json(app(configured()), "/api/debug").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["catalog_ok"], json!(true));
        assert_eq!(body["loaded"][0]["count"], json!(2));

        let (status, cache, body) = get_json(app(configured()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("no-store"));
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_repeated_parameters_take_first_value() {
        let (status, cache, body) = get_json(
            app(configured()),
            "/api/search?q=alpha&q=beta&limit=1&limit=50",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("no-store"));
        assert_eq!(body, json!({"items": [{"id": "m1", "name": "Alpha", "tags": ["x"]}]}));
    }

    #[tokio::test]
    async fn test_odd_query_strings_still_answer_json() {
        for uri in ["/api/search?q=%E2%28&&=&limit", "/api/search?q", "/api/search?unknown=1"] {
            let (status, cache, body) = get_json(app(configured()), uri).await;

            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(cache.as_deref(), Some("no-store"), "{uri}");
            assert!(body["items"].is_array(), "{uri}");
        }
    }

    #[test]
    fn test_search_request_from_query() {
        assert_eq!(
            search_request_from_query("q=Net+Tools&limit=5&ts=abc&q=ignored&x=1"),
            SearchRequest {
                q: Some("Net Tools".to_string()),
                limit: Some("5".to_string()),
                ts: Some("abc".to_string()),
            }
        );
        assert_eq!(search_request_from_query(""), SearchRequest::default());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(SearchStatus::Ok), StatusCode::OK);
        assert_eq!(status_for(SearchStatus::ConfigMissing), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(SearchStatus::CatalogUnavailable), StatusCode::BAD_GATEWAY);
    }
}
