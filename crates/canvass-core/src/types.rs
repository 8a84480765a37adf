//! Data model shared by the tracker, the capture pipeline and the
//! submission orchestrator.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A WGS84 position in decimal degrees.
///
/// Coordinates are values: a newer observation supersedes an older one, it
/// never mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Placeholder recorded when a manual-mode visit has no coordinate at all.
    pub const ORIGIN: Coordinate = Coordinate { lat: 0.0, lng: 0.0 };

    /// Builds a coordinate after checking both axes are finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LatitudeOutOfRange`] or
    /// [`CoreError::LongitudeOutOfRange`] for non-finite or out-of-range input.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoreError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(CoreError::LatitudeOutOfRange(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(CoreError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// One of the three administrative levels the form records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressField {
    City,
    District,
    Province,
}

impl AddressField {
    pub const ALL: [AddressField; 3] = [
        AddressField::City,
        AddressField::District,
        AddressField::Province,
    ];
}

/// Address derived from a coordinate by a reverse-geocoding provider.
///
/// Every level is optional because providers omit them freely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub city: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
}

impl ResolvedAddress {
    /// `true` when no level carries a non-blank value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        AddressField::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// Returns the trimmed value of `field`, treating blank strings as absent.
    #[must_use]
    pub fn get(&self, field: AddressField) -> Option<&str> {
        let raw = match field {
            AddressField::City => self.city.as_deref(),
            AddressField::District => self.district.as_deref(),
            AddressField::Province => self.province.as_deref(),
        };
        raw.map(str::trim).filter(|s| !s.is_empty())
    }

    /// Drops blank values and any city or district that only repeats the
    /// province (compared case- and whitespace-insensitively).
    #[must_use]
    pub fn deduplicated(self) -> Self {
        let province = self.get(AddressField::Province).map(ToOwned::to_owned);
        let province_key = province.as_deref().map(normalize_label);
        let keep = |value: Option<&str>| -> Option<String> {
            let value = value?;
            match &province_key {
                Some(key) if normalize_label(value) == *key => None,
                _ => Some(value.to_owned()),
            }
        };

        Self {
            city: keep(self.get(AddressField::City)),
            district: keep(self.get(AddressField::District)),
            province,
        }
    }
}

/// Comparison key for place names: lowercased, with every whitespace run
/// collapsed to a single space.
#[must_use]
pub fn normalize_label(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Keeps only ASCII digits, the way the phone input filters keystrokes.
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Operator-entered text fields of the visit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    pub salesperson: String,
    pub store_name: String,
    pub contact_name: String,
    pub phone: String,
    pub visit_status: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub province: String,
}

/// The unit of work persisted once per successful submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitRecord {
    pub salesperson: String,
    pub store_name: String,
    pub contact_name: String,
    pub phone: String,
    pub city: String,
    pub district: String,
    pub province: String,
    pub visit_status: String,
    pub notes: String,
    pub photo_link: String,
    pub coordinate: Coordinate,
}

impl VisitRecord {
    /// Combines the validated form with the uploaded photo link and the
    /// coordinate snapshotted at validation time.
    #[must_use]
    pub fn from_form(form: &FormState, photo_link: String, coordinate: Coordinate) -> Self {
        Self {
            salesperson: form.salesperson.trim().to_owned(),
            store_name: form.store_name.trim().to_owned(),
            contact_name: form.contact_name.trim().to_owned(),
            phone: normalize_phone(&form.phone),
            city: form.city.trim().to_owned(),
            district: form.district.trim().to_owned(),
            province: form.province.trim().to_owned(),
            visit_status: form.visit_status.trim().to_owned(),
            notes: form.notes.trim().to_owned(),
            photo_link,
            coordinate,
        }
    }
}
