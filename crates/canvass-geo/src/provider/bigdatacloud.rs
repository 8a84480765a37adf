//! BigDataCloud `reverse-geocode-client` adapter.
//!
//! The same endpoint serves both roles: with `latitude`/`longitude` it
//! reverse-geocodes, without them it estimates the caller's location from
//! the request's IP address.

use canvass_core::{Coordinate, ResolvedAddress};
use futures::future::BoxFuture;
use reqwest::Client;

use super::{fetch_json, first_text, trim_base, GeoProvider, IpLocation, IpLocator, ProviderSettings};
use crate::error::GeoError;

const NAME: &str = "bigdatacloud";
const IP_NAME: &str = "bigdatacloud-ip";

/// Fallback reverse-geocoding provider and IP locator.
pub struct BigDataCloudProvider {
    client: Client,
    base_url: String,
    language: String,
}

impl BigDataCloudProvider {
    /// # Errors
    ///
    /// Returns [`GeoError::Http`] if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, settings: &ProviderSettings) -> Result<Self, GeoError> {
        Ok(Self {
            client: settings.build_client(NAME)?,
            base_url: trim_base(base_url),
            language: settings.language.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/data/reverse-geocode-client", self.base_url)
    }

    async fn lookup(&self, coord: Coordinate) -> Result<ResolvedAddress, GeoError> {
        let request = self.client.get(self.endpoint()).query(&[
            ("latitude", coord.lat.to_string()),
            ("longitude", coord.lng.to_string()),
            ("localityLanguage", self.language.clone()),
        ]);

        let body = fetch_json(NAME, request).await?;
        let address = parse_address(&body);
        if address.is_empty() {
            return Err(GeoError::EmptyAddress {
                provider: NAME.to_owned(),
            });
        }
        Ok(address)
    }

    async fn locate(&self) -> Result<IpLocation, GeoError> {
        let request = self
            .client
            .get(self.endpoint())
            .query(&[("localityLanguage", self.language.as_str())]);

        let body = fetch_json(IP_NAME, request).await?;
        let coordinate = parse_coordinate(&body)?;
        Ok(IpLocation {
            coordinate,
            address: parse_address(&body),
        })
    }
}

impl GeoProvider for BigDataCloudProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn reverse_geocode(&self, coord: Coordinate) -> BoxFuture<'_, Result<ResolvedAddress, GeoError>> {
        Box::pin(self.lookup(coord))
    }
}

impl IpLocator for BigDataCloudProvider {
    fn name(&self) -> &str {
        IP_NAME
    }

    fn ip_locate(&self) -> BoxFuture<'_, Result<IpLocation, GeoError>> {
        Box::pin(self.locate())
    }
}

/// `city` falls back to `locality`; when both are present and differ, the
/// finer-grained `locality` is the district.
fn parse_address(body: &serde_json::Value) -> ResolvedAddress {
    let city = first_text(body, &["city"]);
    let locality = first_text(body, &["locality"]);

    let (city, district) = match (city, locality) {
        (Some(city), Some(locality)) if !city.eq_ignore_ascii_case(&locality) => {
            (Some(city), Some(locality))
        }
        (Some(city), _) => (Some(city), None),
        (None, locality) => (locality, None),
    };

    ResolvedAddress {
        city,
        district,
        province: first_text(body, &["principalSubdivision"]),
    }
}

fn parse_coordinate(body: &serde_json::Value) -> Result<Coordinate, GeoError> {
    let axis = |key: &str| {
        body.get(key)
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| GeoError::Malformed {
                provider: IP_NAME.to_owned(),
                reason: format!("missing numeric `{key}`"),
            })
    };
    let (lat, lng) = (axis("latitude")?, axis("longitude")?);
    Coordinate::new(lat, lng).map_err(|e| GeoError::Malformed {
        provider: IP_NAME.to_owned(),
        reason: e.to_string(),
    })
}
