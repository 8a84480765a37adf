//! Continuous location tracking with distance-throttled reverse geocoding.
//!
//! The tracker owns at most one [`PositionWatch`]. Every observed
//! coordinate becomes the current coordinate immediately; a reverse
//! geocode is only issued when the observation is more than
//! [`MIN_DISPLACEMENT_METERS`] from the last one geocoded. Geocoding
//! failures never escape: they are recorded in the status log and the
//! already-populated fields are kept.
//!
//! While a lookup is in flight the watch keeps being drained, so new fixes
//! land in the current coordinate without waiting for the provider. Every
//! transition is published as a [`LocationSnapshot`] on a `watch` channel.

mod position;
mod status;

use std::sync::Arc;

use canvass_core::{AddressField, Coordinate, ResolvedAddress};
use serde::Serialize;
use tokio::sync::watch;

use crate::chain::{GeocoderChain, Resolution};
use crate::distance::distance_meters;
use crate::error::{GeoError, PositionError, TrackerError};
use crate::reconcile::LocationFields;

pub use position::{PositionEvent, PositionSource, PositionWatch, WatchOptions};
pub use status::{StatusLog, STATUS_CAPACITY};

/// Displacement a new observation must exceed before it is geocoded again.
pub const MIN_DISPLACEMENT_METERS: f64 = 30.0;

/// Fixed test location (Monas, Jakarta) injected by [`LocationTracker::simulate`].
pub const SIMULATED_COORDINATE: Coordinate = Coordinate {
    lat: -6.175_392,
    lng: 106.827_153,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    Idle,
    Watching,
    Resolving,
    Stopped,
    /// Positioning failed before any fix was obtained.
    Degraded,
}

/// Point-in-time view of the tracker for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSnapshot {
    pub state: TrackerState,
    pub coordinate: Option<Coordinate>,
    pub address: ResolvedAddress,
    pub manual_mode: bool,
    pub status: Option<String>,
}

pub struct LocationTracker {
    source: Arc<dyn PositionSource>,
    chain: Arc<GeocoderChain>,
    options: WatchOptions,
    state: TrackerState,
    watch: Option<PositionWatch>,
    current: Option<Coordinate>,
    /// Last coordinate a resolution was attempted for; anchors the throttle.
    last_attempted: Option<Coordinate>,
    last_geocoded: Option<Coordinate>,
    fields: LocationFields,
    manual_mode: bool,
    ip_fallback_used: bool,
    status: StatusLog,
    snapshots: watch::Sender<LocationSnapshot>,
}

/// What woke the tracker while a lookup was in flight.
enum LookupStep {
    Finished(Result<Resolution, GeoError>),
    Event(Option<PositionEvent>),
}

impl LocationTracker {
    #[must_use]
    pub fn new(source: Arc<dyn PositionSource>, chain: Arc<GeocoderChain>) -> Self {
        Self {
            source,
            chain,
            options: WatchOptions::default(),
            state: TrackerState::Idle,
            watch: None,
            current: None,
            last_attempted: None,
            last_geocoded: None,
            fields: LocationFields::new(),
            manual_mode: false,
            ip_fallback_used: false,
            status: StatusLog::default(),
            snapshots: watch::channel(LocationSnapshot {
                state: TrackerState::Idle,
                coordinate: None,
                address: ResolvedAddress::default(),
                manual_mode: false,
                status: None,
            })
            .0,
        }
    }

    #[must_use]
    pub fn with_watch_options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Begins observation. Without a positioning capability the tracker
    /// makes a single IP-based estimate and stops.
    pub async fn start(&mut self) {
        if self.manual_mode {
            tracing::debug!("start ignored in manual mode");
            return;
        }
        if self.watch.as_ref().is_some_and(PositionWatch::is_active) {
            tracing::debug!("start ignored, watch already active");
            return;
        }

        if !self.source.is_available() {
            self.status
                .push("Positioning unavailable on this device, estimating from network");
            self.ip_fallback().await;
            self.state = TrackerState::Stopped;
            self.publish();
            return;
        }

        self.watch = Some(self.source.watch(self.options));
        self.state = TrackerState::Watching;
        self.status.push("Searching for GPS position");
        self.publish();
    }

    /// Handles one event from the watch. Returns `false` once there is no
    /// open watch or the source hung up.
    pub async fn process_next(&mut self) -> bool {
        let Some(watch) = self.watch.as_mut() else {
            return false;
        };
        match watch.next().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            }
            None => {
                self.on_hang_up();
                self.publish();
                false
            }
        }
    }

    /// Processes events until the watch ends.
    pub async fn run(&mut self) {
        while self.process_next().await {}
    }

    pub async fn handle_event(&mut self, event: PositionEvent) {
        match event {
            PositionEvent::Update(coord) => self.on_position(coord).await,
            PositionEvent::Error(error) => self.on_position_error(error).await,
        }
    }

    /// Forces one reverse geocode of the current coordinate, bypassing the
    /// displacement throttle. Returns `false` in manual mode or when there
    /// is no coordinate.
    pub async fn refresh(&mut self) -> bool {
        if self.manual_mode {
            tracing::debug!("refresh ignored in manual mode");
            return false;
        }
        let Some(coord) = self.current else {
            self.status.push("No coordinate to refresh yet");
            return false;
        };
        self.resolve(coord).await;
        true
    }

    /// Injects the fixed test coordinate as if the device had observed it.
    /// Returns `false` in manual mode, where nothing is observed.
    pub async fn simulate(&mut self) -> bool {
        if self.manual_mode {
            tracing::debug!("simulate ignored in manual mode");
            return false;
        }
        self.status
            .push(format!("Using simulated location {SIMULATED_COORDINATE}"));
        self.on_position(SIMULATED_COORDINATE).await;
        true
    }

    /// Cancels the position watch. Safe to call any number of times.
    pub fn stop(&mut self) -> bool {
        let released = self.watch.take().is_some_and(|mut watch| watch.cancel());
        if released {
            self.state = TrackerState::Stopped;
            self.status.push("Location tracking stopped");
            self.publish();
        }
        released
    }

    /// Entering manual mode stops observation and automatic resolution;
    /// leaving it restarts observation from `Idle`.
    pub async fn set_manual_mode(&mut self, enabled: bool) {
        if enabled == self.manual_mode {
            return;
        }
        self.manual_mode = enabled;
        if enabled {
            if let Some(mut watch) = self.watch.take() {
                watch.cancel();
            }
            self.state = TrackerState::Idle;
            self.status.push("Manual mode on, enter coordinates by hand");
            self.publish();
        } else {
            self.state = TrackerState::Idle;
            self.last_attempted = None;
            self.status.push("Manual mode off, resuming GPS");
            self.start().await;
        }
    }

    /// Stores a hand-entered coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotInManualMode`] outside manual mode and
    /// [`TrackerError::InvalidCoordinate`] for out-of-range input.
    pub fn set_manual_coordinate(&mut self, lat: f64, lng: f64) -> Result<Coordinate, TrackerError> {
        if !self.manual_mode {
            return Err(TrackerError::NotInManualMode);
        }
        let coord = Coordinate::new(lat, lng)?;
        self.current = Some(coord);
        self.status.push(format!("Manual coordinate set to {coord}"));
        self.publish();
        Ok(coord)
    }

    /// Records an operator edit to a location field.
    pub fn edit_field(&mut self, field: AddressField, value: &str) {
        self.fields.edit(field, value);
        self.publish();
    }

    /// Clears the location fields after a successful submission. The
    /// current coordinate and the watch are kept.
    pub fn reset_fields(&mut self) {
        self.fields.clear();
        self.publish();
    }

    #[must_use]
    pub fn state(&self) -> TrackerState {
        self.state
    }

    #[must_use]
    pub fn is_resolving(&self) -> bool {
        self.state == TrackerState::Resolving
    }

    #[must_use]
    pub fn current(&self) -> Option<Coordinate> {
        self.current
    }

    #[must_use]
    pub fn last_geocoded(&self) -> Option<Coordinate> {
        self.last_geocoded
    }

    #[must_use]
    pub fn fields(&self) -> &LocationFields {
        &self.fields
    }

    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.manual_mode
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watch.as_ref().is_some_and(PositionWatch::is_active)
    }

    /// Latest status line.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.latest()
    }

    #[must_use]
    pub fn status_log(&self) -> &StatusLog {
        &self.status
    }

    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<Option<String>> {
        self.status.subscribe()
    }

    /// Receiver that observes a fresh [`LocationSnapshot`] after every
    /// transition, including while a lookup is in flight.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LocationSnapshot> {
        self.snapshots.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> LocationSnapshot {
        LocationSnapshot {
            state: self.state,
            coordinate: self.current,
            address: self.fields.to_address(),
            manual_mode: self.manual_mode,
            status: self.status.latest().map(ToOwned::to_owned),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    async fn on_position(&mut self, coord: Coordinate) {
        if self.manual_mode {
            tracing::debug!(%coord, "ignoring position update in manual mode");
            return;
        }
        self.store_fix(coord);

        if self.should_geocode(coord) {
            self.resolve(coord).await;
        } else {
            tracing::trace!(%coord, "within displacement threshold, not geocoding");
        }
    }

    /// Makes `coord` the current coordinate and leaves `Degraded`.
    fn store_fix(&mut self, coord: Coordinate) {
        self.current = Some(coord);
        if self.state == TrackerState::Degraded {
            self.state = TrackerState::Watching;
            self.status.push("GPS position recovered");
        }
        self.publish();
    }

    fn should_geocode(&self, coord: Coordinate) -> bool {
        self.last_attempted
            .is_none_or(|previous| distance_meters(previous, coord) > MIN_DISPLACEMENT_METERS)
    }

    fn on_hang_up(&mut self) {
        self.watch = None;
        if !self.manual_mode {
            self.state = TrackerState::Stopped;
            self.status.push("Position watch ended");
        }
    }

    async fn on_position_error(&mut self, error: PositionError) {
        tracing::warn!(error = %error, "position watch reported an error");
        if self.current.is_some() {
            self.status
                .push(format!("GPS signal problem ({error}), keeping last position"));
            self.publish();
            return;
        }

        self.state = TrackerState::Degraded;
        self.status.push(format!("GPS failed: {error}"));
        if !self.ip_fallback_used {
            self.ip_fallback().await;
        }
        if self.current.is_none() {
            self.status.push("Location unknown, please enter it manually");
        }
        self.publish();
    }

    /// Resolves `coord`, then keeps resolving the newest fix for as long as
    /// fixes that arrived during the previous lookup moved past the
    /// displacement threshold.
    async fn resolve(&mut self, coord: Coordinate) {
        let mut next = Some(coord);
        while let Some(coord) = next.take() {
            self.resolve_once(coord).await;
            next = self
                .current
                .filter(|newest| *newest != coord && self.should_geocode(*newest));
        }
    }

    async fn resolve_once(&mut self, coord: Coordinate) {
        let mut restore = std::mem::replace(&mut self.state, TrackerState::Resolving);
        self.last_attempted = Some(coord);
        self.status.push(format!("Looking up address for {coord}"));
        self.publish();

        let chain = Arc::clone(&self.chain);
        let lookup = async move { chain.reverse_geocode(coord).await };
        tokio::pin!(lookup);

        let outcome = loop {
            let Some(watch) = self.watch.as_mut().filter(|w| w.is_active()) else {
                break (&mut lookup).await;
            };
            let step = tokio::select! {
                outcome = &mut lookup => LookupStep::Finished(outcome),
                event = watch.next() => LookupStep::Event(event),
            };
            match step {
                LookupStep::Finished(outcome) => break outcome,
                LookupStep::Event(Some(PositionEvent::Update(fix))) => {
                    self.current = Some(fix);
                    if restore == TrackerState::Degraded {
                        restore = TrackerState::Watching;
                        self.status.push("GPS position recovered");
                    }
                    self.publish();
                }
                LookupStep::Event(Some(PositionEvent::Error(error))) => {
                    tracing::warn!(error = %error, "position watch reported an error during lookup");
                    self.status
                        .push(format!("GPS signal problem ({error}), keeping last position"));
                    self.publish();
                }
                LookupStep::Event(None) => {
                    self.on_hang_up();
                    restore = self.state;
                    self.state = TrackerState::Resolving;
                    self.publish();
                }
            }
        };

        match outcome {
            Ok(resolution) => {
                let changed = self.fields.apply_resolved(&resolution.address);
                self.last_geocoded = Some(coord);
                self.status.push(format!(
                    "Address found via {} ({} field(s) updated)",
                    resolution.provider,
                    changed.len()
                ));
            }
            Err(error) => {
                tracing::warn!(error = %error, %coord, "address lookup failed");
                self.status
                    .push("Address lookup failed, keeping current fields");
            }
        }

        self.state = restore;
        self.publish();
    }

    async fn ip_fallback(&mut self) {
        self.ip_fallback_used = true;
        match self.chain.ip_locate().await {
            Ok(location) => {
                self.current = Some(location.coordinate);
                self.fields.apply_resolved(&location.address);
                self.status.push(format!(
                    "Approximate location from network: {}",
                    location.coordinate
                ));
                self.publish();
            }
            Err(error) => {
                tracing::warn!(error = %error, "IP location fallback failed");
                self.status.push(format!("Network location failed: {error}"));
            }
        }
    }
}

#[cfg(test)]
#[path = "tracker_test.rs"]
mod tests;
