use thiserror::Error;

/// Failure of a single reverse-geocoding or IP-location call, or of the
/// whole provider chain.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error from {provider}: {source}")]
    Http {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} did not answer within the request timeout")]
    Timeout { provider: String },

    #[error("unexpected HTTP status {status} from {provider}")]
    UnexpectedStatus { provider: String, status: u16 },

    #[error("malformed payload from {provider}: {reason}")]
    Malformed { provider: String, reason: String },

    /// The payload parsed but carried none of city, district or province.
    #[error("{provider} returned no address fields")]
    EmptyAddress { provider: String },

    #[error("every reverse-geocoding provider failed: [{}]", attempts.join("; "))]
    AllProvidersFailed { attempts: Vec<String> },

    #[error("no IP-location provider is configured")]
    NoIpLocator,
}

impl GeoError {
    /// Classifies a `reqwest` error, separating timeouts from other failures.
    pub(crate) fn from_reqwest(provider: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            GeoError::Timeout {
                provider: provider.to_owned(),
            }
        } else {
            GeoError::Http {
                provider: provider.to_owned(),
                source,
            }
        }
    }
}

/// Failure reported by the platform positioning capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("positioning is not available on this device")]
    Unavailable,

    #[error("positioning permission denied: {0}")]
    Denied(String),

    #[error("position could not be determined: {0}")]
    Lost(String),

    #[error("timed out waiting for a position fix")]
    Timeout,
}

#[derive(Debug, Error, PartialEq)]
pub enum TrackerError {
    #[error("coordinates can only be entered by hand in manual mode")]
    NotInManualMode,

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] canvass_core::CoreError),
}
