//! Pre-flight checks run before any network call.

use canvass_capture::RawImage;
use canvass_core::{normalize_phone, Coordinate, FormState};

use crate::error::ValidationError;

pub const LABEL_SALESPERSON: &str = "Nama Sales";
pub const LABEL_STORE_NAME: &str = "Nama Toko";
pub const LABEL_CONTACT_NAME: &str = "Nama PIC";
pub const LABEL_VISIT_STATUS: &str = "Status Kunjungan";
pub const LABEL_PHONE: &str = "Nomor Telepon";
pub const LABEL_PHOTO: &str = "Foto Toko";
pub const LABEL_LOCATION: &str = "Lokasi";

/// Checks every required input and reports all missing ones together.
///
/// Returns the coordinate to record: the tracked one, or
/// [`Coordinate::ORIGIN`] in manual mode when none was entered.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming every missing field by its form
/// label, in form order.
pub fn validate(
    form: &FormState,
    photo: Option<&RawImage>,
    coordinate: Option<Coordinate>,
    manual_mode: bool,
) -> Result<Coordinate, ValidationError> {
    let blank = |value: &str| value.trim().is_empty();

    let checks = [
        (LABEL_SALESPERSON, blank(&form.salesperson)),
        (LABEL_STORE_NAME, blank(&form.store_name)),
        (LABEL_CONTACT_NAME, blank(&form.contact_name)),
        (LABEL_VISIT_STATUS, blank(&form.visit_status)),
        (LABEL_PHONE, normalize_phone(&form.phone).is_empty()),
        (LABEL_PHOTO, photo.is_none_or(RawImage::is_empty)),
        (LABEL_LOCATION, coordinate.is_none() && !manual_mode),
    ];

    let missing: Vec<String> = checks
        .iter()
        .filter(|(_, is_missing)| *is_missing)
        .map(|(label, _)| (*label).to_owned())
        .collect();

    if missing.is_empty() {
        Ok(coordinate.unwrap_or(Coordinate::ORIGIN))
    } else {
        tracing::debug!(?missing, "submission rejected by validation");
        Err(ValidationError { missing })
    }
}
