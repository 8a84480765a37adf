//! OpenStreetMap Nominatim `/reverse` adapter.

use canvass_core::{Coordinate, ResolvedAddress};
use futures::future::BoxFuture;
use reqwest::Client;

use super::{fetch_json, first_text, trim_base, GeoProvider, ProviderSettings};
use crate::error::GeoError;

const NAME: &str = "nominatim";

const CITY_KEYS: &[&str] = &["city", "municipality", "town", "county", "regency"];
const DISTRICT_KEYS: &[&str] = &[
    "subdistrict",
    "city_district",
    "district",
    "suburb",
    "village",
    "neighbourhood",
];
const PROVINCE_KEYS: &[&str] = &["state", "province", "region"];

/// Primary reverse-geocoding provider.
pub struct NominatimProvider {
    client: Client,
    base_url: String,
    language: String,
}

impl NominatimProvider {
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

    async fn lookup(&self, coord: Coordinate) -> Result<ResolvedAddress, GeoError> {
        let request = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "json".to_string()),
                ("lat", coord.lat.to_string()),
                ("lon", coord.lng.to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .header(reqwest::header::ACCEPT_LANGUAGE, &self.language);

        let body = fetch_json(NAME, request).await?;
        parse_reverse(&body)
    }
}

impl GeoProvider for NominatimProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn reverse_geocode(&self, coord: Coordinate) -> BoxFuture<'_, Result<ResolvedAddress, GeoError>> {
        Box::pin(self.lookup(coord))
    }
}

fn parse_reverse(body: &serde_json::Value) -> Result<ResolvedAddress, GeoError> {
    // Nominatim reports "Unable to geocode" with a 200 and an `error` field.
    if let Some(message) = body.get("error").and_then(serde_json::Value::as_str) {
        return Err(GeoError::Malformed {
            provider: NAME.to_owned(),
            reason: message.to_owned(),
        });
    }

    let address = body.get("address").ok_or_else(|| GeoError::Malformed {
        provider: NAME.to_owned(),
        reason: "missing `address` object".to_owned(),
    })?;

    let resolved = ResolvedAddress {
        city: first_text(address, CITY_KEYS),
        district: first_text(address, DISTRICT_KEYS),
        province: first_text(address, PROVINCE_KEYS),
    };

    if resolved.is_empty() {
        return Err(GeoError::EmptyAddress {
            provider: NAME.to_owned(),
        });
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reverse_prefers_city_then_municipality() {
        let body = serde_json::json!({
            "address": {
                "municipality": "Kota Bogor",
                "suburb": "Bogor Tengah",
                "state": "Jawa Barat"
            }
        });
        let addr = parse_reverse(&body).expect("address");
        assert_eq!(addr.city.as_deref(), Some("Kota Bogor"));
        assert_eq!(addr.district.as_deref(), Some("Bogor Tengah"));
        assert_eq!(addr.province.as_deref(), Some("Jawa Barat"));
    }

    #[test]
    fn parse_reverse_error_field_is_malformed() {
        let body = serde_json::json!({ "error": "Unable to geocode" });
        assert!(matches!(
            parse_reverse(&body),
            Err(GeoError::Malformed { ref reason, .. }) if reason == "Unable to geocode"
        ));
    }

    #[test]
    fn parse_reverse_without_known_keys_is_empty() {
        let body = serde_json::json!({ "address": { "country": "Indonesia", "postcode": "10110" } });
        assert!(matches!(
            parse_reverse(&body),
            Err(GeoError::EmptyAddress { .. })
        ));
    }
}
