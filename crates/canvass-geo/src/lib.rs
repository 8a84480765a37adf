//! Location resolution for the canvasser form: great-circle distance,
//! reverse-geocoding provider adapters and their fallback chain, address
//! reconciliation, and the continuous [`LocationTracker`].

pub mod chain;
pub mod distance;
pub mod error;
pub mod provider;
pub mod reconcile;
pub mod tracker;

pub use chain::{GeocoderChain, Resolution};
pub use distance::{distance_meters, EARTH_RADIUS_METERS};
pub use error::{GeoError, PositionError, TrackerError};
pub use provider::{
    BigDataCloudProvider, GeoProvider, IpLocation, IpLocator, NominatimProvider, ProviderSettings,
};
pub use reconcile::{FieldOrigin, LocationFields};
pub use tracker::{
    LocationSnapshot, LocationTracker, PositionEvent, PositionSource, PositionWatch, StatusLog,
    TrackerState, WatchOptions, MIN_DISPLACEMENT_METERS, SIMULATED_COORDINATE, STATUS_CAPACITY,
};
