use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use canvass_core::{Coordinate, ResolvedAddress};
use canvass_geo::IpLocation;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResponse, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct ReverseQuery {
    lat: Option<f64>,
    lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ReverseGeocodeData {
    pub address: ResolvedAddress,
    pub provider: String,
}

/// One pass over the provider chain. The tracker's displacement throttle
/// does not apply here: each call is a fresh lookup.
pub(super) async fn reverse(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<ReverseQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|e| {
        ApiError::new(
            req_id.0.clone(),
            "invalid_coordinate",
            format!("lat and lng must be decimal degrees: {e}"),
        )
    })?;
    let (Some(lat), Some(lng)) = (query.lat, query.lng) else {
        return Err(ApiError::new(
            req_id.0,
            "invalid_coordinate",
            "lat and lng are required",
        ));
    };
    let coord = Coordinate::new(lat, lng)
        .map_err(|e| ApiError::new(req_id.0.clone(), "invalid_coordinate", e.to_string()))?;

    let resolution = state.geocoder.reverse_geocode(coord).await.map_err(|e| {
        tracing::warn!(request_id = %req_id.0, lat, lng, error = %e, "reverse geocode failed");
        ApiError::new(req_id.0.clone(), "geocode_failed", e.to_string())
    })?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        ReverseGeocodeData {
            address: resolution.address,
            provider: resolution.provider,
        },
    )))
}

/// Coarse location estimate from the IP lookup service.
///
/// The lookup runs from this server, so the estimate describes the server's
/// public address, not the canvasser's. It is only meaningful when the server
/// runs on the canvasser's device or network; remote clients should fall back
/// to their own device-side tracker instead.
pub(super) async fn ip(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<IpLocation>>, ApiError> {
    match state.geocoder.ip_locate().await {
        Ok(location) => Ok(Json(ApiResponse::new(req_id.0, location))),
        Err(e) => {
            tracing::warn!(request_id = %req_id.0, error = %e, "IP location failed");
            Err(ApiError::new(req_id.0, "geocode_failed", e.to_string()))
        }
    }
}
