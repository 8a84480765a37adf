//! Reverse-geocoding provider adapters.
//!
//! Each adapter targets exactly one HTTP service, applies a short request
//! timeout, and never retries. Falling back across providers is the job of
//! [`crate::GeocoderChain`].

mod bigdatacloud;
mod nominatim;

use std::time::Duration;

use canvass_core::{Coordinate, ResolvedAddress};
use futures::future::BoxFuture;
use reqwest::Client;
use serde::Serialize;

use crate::error::GeoError;

pub use bigdatacloud::BigDataCloudProvider;
pub use nominatim::NominatimProvider;

/// A service that turns a coordinate into an address.
pub trait GeoProvider: Send + Sync {
    /// Short identifier used in logs and status messages.
    fn name(&self) -> &str;

    /// Resolves `coord` with a single request.
    fn reverse_geocode(&self, coord: Coordinate) -> BoxFuture<'_, Result<ResolvedAddress, GeoError>>;
}

/// A service that estimates the caller's position from its network address.
pub trait IpLocator: Send + Sync {
    fn name(&self) -> &str;

    fn ip_locate(&self) -> BoxFuture<'_, Result<IpLocation, GeoError>>;
}

/// Best-effort position and address derived from IP heuristics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpLocation {
    pub coordinate: Coordinate,
    pub address: ResolvedAddress,
}

/// Request settings shared by all provider adapters.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub timeout: Duration,
    pub user_agent: String,
    /// Preferred language for place names (`Accept-Language` / `localityLanguage`).
    pub language: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            user_agent: "CanvasserApp/1.0".to_string(),
            language: "id".to_string(),
        }
    }
}

impl ProviderSettings {
    fn build_client(&self, provider: &str) -> Result<Client, GeoError> {
        Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| GeoError::from_reqwest(provider, e))
    }
}

/// Sends `request` and decodes a JSON body, mapping every failure mode to a
/// provider-tagged [`GeoError`].
async fn fetch_json(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, GeoError> {
    let response = request
        .send()
        .await
        .map_err(|e| GeoError::from_reqwest(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(GeoError::UnexpectedStatus {
            provider: provider.to_owned(),
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| GeoError::from_reqwest(provider, e))?;

    serde_json::from_str(&body).map_err(|e| GeoError::Malformed {
        provider: provider.to_owned(),
        reason: e.to_string(),
    })
}

/// Returns the first key in `keys` whose value is a non-blank string.
fn first_text(object: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key).and_then(serde_json::Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_owned()
}
