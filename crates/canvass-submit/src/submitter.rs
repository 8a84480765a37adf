//! The two-step submission: upload the photo, then append the visit row.

use std::sync::Arc;

use canvass_capture::{compress_or_original, Compressor, RawImage};
use canvass_core::{Coordinate, FormState, VisitRecord};
use chrono::Utc;
use serde::Serialize;

use crate::error::{SubmissionError, ValidationError};
use crate::store::{PhotoStore, PhotoUpload, VisitStore};
use crate::validate::{validate, LABEL_PHOTO};

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub photo_link: String,
    pub record: VisitRecord,
}

/// Stateless across calls: no retry memory and no idempotency key. A
/// resubmission after a failure uploads a new copy of the photo.
pub struct Submitter {
    photos: Arc<dyn PhotoStore>,
    visits: Arc<dyn VisitStore>,
    compressor: Arc<dyn Compressor>,
}

impl Submitter {
    #[must_use]
    pub fn new(
        photos: Arc<dyn PhotoStore>,
        visits: Arc<dyn VisitStore>,
        compressor: Arc<dyn Compressor>,
    ) -> Self {
        Self {
            photos,
            visits,
            compressor,
        }
    }

    /// Validates, compresses, uploads and persists, strictly in that order.
    ///
    /// `coordinate` is the tracker's coordinate snapshotted by the caller;
    /// it is not re-read during the attempt.
    ///
    /// # Errors
    ///
    /// - [`SubmissionError::Validation`] before any network call, listing
    ///   every missing field.
    /// - [`SubmissionError::Upload`] when the photo could not be stored;
    ///   nothing was persisted.
    /// - [`SubmissionError::Persist`] when the row could not be written; the
    ///   uploaded photo is left in place and its link is returned.
    pub async fn submit(
        &self,
        form: &FormState,
        photo: Option<RawImage>,
        coordinate: Option<Coordinate>,
        manual_mode: bool,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let coordinate = validate(form, photo.as_ref(), coordinate, manual_mode)?;
        let photo = photo.ok_or_else(|| ValidationError {
            missing: vec![LABEL_PHOTO.to_owned()],
        })?;

        let compressed = compress_or_original(self.compressor.clone(), photo).await;
        let upload = PhotoUpload {
            filename: upload_filename(Utc::now().timestamp_millis(), &compressed.filename),
            bytes: compressed.bytes,
            mime: compressed.mime,
        };

        let photo_link = self.photos.upload(upload).await.map_err(|e| {
            tracing::error!(error = %e, store = %form.store_name, "photo upload failed");
            SubmissionError::Upload(e)
        })?;

        let record = VisitRecord::from_form(form, photo_link.clone(), coordinate);
        self.visits.append(record.clone()).await.map_err(|e| {
            tracing::error!(
                error = %e,
                photo_link = %photo_link,
                "visit row not saved, uploaded photo left orphaned"
            );
            SubmissionError::Persist {
                photo_link: photo_link.clone(),
                source: e,
            }
        })?;

        tracing::info!(
            store = %record.store_name,
            salesperson = %record.salesperson,
            status = %record.visit_status,
            manual_mode,
            "visit submitted"
        );
        Ok(SubmissionReceipt { photo_link, record })
    }
}

/// `visit_<millis>_<name>`, matching the naming of earlier uploads.
#[must_use]
pub fn upload_filename(millis: i64, original: &str) -> String {
    format!("visit_{millis}_{original}")
}

#[cfg(test)]
#[path = "submitter_test.rs"]
mod tests;
