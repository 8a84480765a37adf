use axum::{extract::State, Extension, Json};

use super::{ApiResponse, AppState};
use crate::middleware::RequestId;

// Option lists never fail: the store falls back to its sample lists.

pub(super) async fn list_sales(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::new(req_id.0, state.options.salespeople().await))
}

pub(super) async fn list_statuses(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::new(req_id.0, state.options.visit_statuses().await))
}
