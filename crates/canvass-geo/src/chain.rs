//! Ordered fallback across reverse-geocoding providers.

use std::sync::Arc;
use std::time::Duration;

use canvass_core::{AppConfig, Coordinate, ResolvedAddress};
use serde::Serialize;

use crate::error::GeoError;
use crate::provider::{
    BigDataCloudProvider, GeoProvider, IpLocation, IpLocator, NominatimProvider, ProviderSettings,
};

/// A successful resolution and the provider that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub address: ResolvedAddress,
    pub provider: String,
}

/// Providers tried in order until one yields a non-empty address, plus an
/// optional IP locator for devices without positioning.
#[derive(Clone)]
pub struct GeocoderChain {
    providers: Vec<Arc<dyn GeoProvider>>,
    ip_locator: Option<Arc<dyn IpLocator>>,
}

impl GeocoderChain {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn GeoProvider>>, ip_locator: Option<Arc<dyn IpLocator>>) -> Self {
        Self {
            providers,
            ip_locator,
        }
    }

    /// Builds the production chain: Nominatim, then BigDataCloud, with
    /// BigDataCloud's IP estimate as the last resort.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Http`] if an HTTP client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, GeoError> {
        let settings = ProviderSettings {
            timeout: Duration::from_secs(config.geocode_timeout_secs),
            user_agent: config.user_agent.clone(),
            language: config.geocode_language.clone(),
        };

        let nominatim = Arc::new(NominatimProvider::new(&config.nominatim_base_url, &settings)?);
        let bigdatacloud = Arc::new(BigDataCloudProvider::new(
            &config.bigdatacloud_base_url,
            &settings,
        )?);

        Ok(Self::new(
            vec![nominatim, bigdatacloud.clone()],
            Some(bigdatacloud),
        ))
    }

    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Tries each provider in order and returns the first non-empty,
    /// de-duplicated address.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::AllProvidersFailed`] listing every attempt when no
    /// provider produced a usable address.
    pub async fn reverse_geocode(&self, coord: Coordinate) -> Result<Resolution, GeoError> {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let name = provider.name();
            tracing::debug!(provider = name, lat = coord.lat, lng = coord.lng, "reverse geocoding");

            match provider.reverse_geocode(coord).await {
                Ok(address) => {
                    let address = address.deduplicated();
                    // An all-blank address counts as a miss.
                    if address.is_empty() {
                        tracing::warn!(provider = name, "provider returned no usable address fields");
                        attempts.push(format!("{name}: no usable address fields"));
                        continue;
                    }
                    tracing::info!(
                        provider = name,
                        city = address.city.as_deref(),
                        district = address.district.as_deref(),
                        province = address.province.as_deref(),
                        "address resolved"
                    );
                    return Ok(Resolution {
                        address,
                        provider: name.to_owned(),
                    });
                }
                Err(e) => {
                    tracing::warn!(provider = name, error = %e, "reverse geocoding failed, trying next provider");
                    attempts.push(format!("{name}: {e}"));
                }
            }
        }

        Err(GeoError::AllProvidersFailed { attempts })
    }

    /// Estimates position and address from the network address.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::NoIpLocator`] when none is configured, or the
    /// locator's own error.
    pub async fn ip_locate(&self) -> Result<IpLocation, GeoError> {
        let locator = self.ip_locator.as_ref().ok_or(GeoError::NoIpLocator)?;
        let mut location = locator.ip_locate().await.map_err(|e| {
            tracing::warn!(provider = locator.name(), error = %e, "IP location failed");
            e
        })?;
        location.address = location.address.deduplicated();
        tracing::info!(
            provider = locator.name(),
            lat = location.coordinate.lat,
            lng = location.coordinate.lng,
            "IP location estimated"
        );
        Ok(location)
    }
}
