pub mod app_config;
pub mod config;
pub mod types;

pub use app_config::{AppConfig, Environment, GoogleConfig};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use types::{
    normalize_label, normalize_phone, AddressField, Coordinate, FormState, ResolvedAddress,
    VisitRecord,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("latitude {0} is outside -90..=90")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside -180..=180")]
    LongitudeOutOfRange(f64),
}
