mod geocode;
mod options;
mod visits;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use canvass_capture::{CompressionOptions, JpegCompressor};
use canvass_core::AppConfig;
use canvass_geo::GeocoderChain;
use canvass_submit::{GoogleClient, OptionLists, Submitter};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub geocoder: Arc<GeocoderChain>,
    pub submitter: Arc<Submitter>,
    pub options: Arc<OptionLists>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wires the provider chain, the Google stores and the JPEG compressor
    /// from configuration.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let geocoder = GeocoderChain::from_config(config)?;
        let (drive, sheets) = GoogleClient::from_config(config)?;
        let sheets = Arc::new(sheets);
        let compressor = JpegCompressor::new(CompressionOptions::from_config(config));

        Ok(Self {
            geocoder: Arc::new(geocoder),
            submitter: Arc::new(Submitter::new(
                Arc::new(drive),
                sheets.clone(),
                Arc::new(compressor),
            )),
            options: Arc::new(OptionLists::from_config(sheets, config)),
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

impl ResponseMeta {
    pub(crate) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) fn new(request_id: String, data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" | "invalid_coordinate" => StatusCode::BAD_REQUEST,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "geocode_failed" | "upload_failed" | "persist_failed" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn limited_router(rate_limit: RateLimitState, max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/v1/geocode/reverse", get(geocode::reverse))
        .route("/api/v1/geocode/ip", get(geocode::ip))
        .route("/api/v1/options/sales", get(options::list_sales))
        .route("/api/v1/options/statuses", get(options::list_statuses))
        .route(
            "/api/v1/visits",
            post(visits::create_visit).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(limited_router(rate_limit, state.max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    Json(ApiResponse::new(req_id.0, HealthData { status: "ok" }))
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}


#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::test_support::{get, send, TestAppBuilder};
    use super::*;

    #[test]
    fn validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "missing").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_failures_map_to_bad_gateway() {
        for code in ["upload_failed", "persist_failed", "geocode_failed"] {
            let response = ApiError::new("req-1", code, "failed").into_response();
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY, "{code}");
        }
    }

    #[test]
    fn unknown_code_maps_to_internal_error() {
        let response = ApiError::new("req-1", "something_else", "boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_returns_ok_envelope() {
        let app = TestAppBuilder::default().build().await;
        let (status, body) = send(&app.router, get("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
        assert!(body["meta"]["request_id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(body["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn incoming_request_id_is_echoed() {
        let app = TestAppBuilder::default().build().await;
        let request = Request::builder()
            .uri("/api/v1/health")
            .header("x-request-id", "field-42")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "field-42");
    }

    #[tokio::test]
    async fn missing_request_id_is_generated() {
        let app = TestAppBuilder::default().build().await;
        let response = app.router.clone().oneshot(get("/api/v1/health")).await.unwrap();
        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert_eq!(id.len(), 36);
    }

    #[tokio::test]
    async fn rate_limit_guards_api_but_not_health() {
        let app = TestAppBuilder {
            rate_limit: RateLimitState::new(1, Duration::from_secs(60)),
            ..TestAppBuilder::default()
        }
        .build()
        .await;

        let (first, _) = send(&app.router, get("/api/v1/options/statuses")).await;
        assert_eq!(first, StatusCode::OK);

        let (second, body) = send(&app.router, get("/api/v1/options/statuses")).await;
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "rate_limited");
        assert!(body["meta"]["request_id"].is_string());

        let (health, _) = send(&app.router, get("/api/v1/health")).await;
        assert_eq!(health, StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let app = TestAppBuilder::default().build().await;
        let request = Request::builder()
            .uri("/api/v1/health")
            .header("origin", "https://field.example")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
