//! `POST /api/v1/visits`: the multipart form a canvasser submits.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use canvass_capture::{capture_bytes, PhotoOrigin, RawImage};
use canvass_core::{Coordinate, FormState};
use canvass_submit::SubmissionError;
use serde::Serialize;

use super::{ApiError, ApiResponse, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct VisitCreated {
    pub photo_link: String,
}

/// A decoded multipart body before validation.
#[derive(Debug, Default)]
struct VisitForm {
    form: FormState,
    lat: Option<String>,
    lng: Option<String>,
    manual_mode: bool,
    origin: Option<PhotoOrigin>,
    photo: Option<PhotoPart>,
}

#[derive(Debug)]
struct PhotoPart {
    bytes: Vec<u8>,
    filename: String,
    mime: Option<String>,
}

pub(super) async fn create_visit(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = req_id.0;
    let multipart = multipart.map_err(|e| {
        ApiError::new(
            request_id.clone(),
            "bad_request",
            format!("expected multipart/form-data: {e}"),
        )
    })?;

    let body = read_form(multipart)
        .await
        .map_err(|e| multipart_error(&request_id, &e))?;
    let coordinate = parse_coordinate(body.lat.as_deref(), body.lng.as_deref())
        .map_err(|message| ApiError::new(request_id.clone(), "invalid_coordinate", message))?;
    let origin = body.origin.unwrap_or(PhotoOrigin::Gallery);
    // An empty file part is reported by validation as a missing photo.
    let photo: Option<RawImage> = body.photo.and_then(|part| {
        capture_bytes(part.bytes, &part.filename, part.mime.as_deref(), origin).ok()
    });

    let receipt = state
        .submitter
        .submit(&body.form, photo, coordinate, body.manual_mode)
        .await
        .map_err(|e| submission_error(request_id.clone(), e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            request_id,
            VisitCreated {
                photo_link: receipt.photo_link,
            },
        )),
    ))
}

async fn read_form(mut multipart: Multipart) -> Result<VisitForm, MultipartError> {
    let mut body = VisitForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "photo" {
            let filename = field.file_name().unwrap_or_default().to_owned();
            let mime = field.content_type().map(ToOwned::to_owned);
            let bytes = field.bytes().await?;
            body.photo = Some(PhotoPart {
                bytes: bytes.to_vec(),
                filename,
                mime,
            });
            continue;
        }

        let value = field.text().await?;
        let form = &mut body.form;
        match name.as_str() {
            "salesperson" => form.salesperson = value,
            "store_name" => form.store_name = value,
            "contact_name" => form.contact_name = value,
            "phone" => form.phone = value,
            "visit_status" => form.visit_status = value,
            "notes" => form.notes = value,
            "city" => form.city = value,
            "district" => form.district = value,
            "province" => form.province = value,
            "lat" => body.lat = Some(value),
            "lng" => body.lng = Some(value),
            "manual_mode" => body.manual_mode = parse_flag(&value),
            "photo_origin" => {
                body.origin = match value.trim() {
                    "camera" => Some(PhotoOrigin::Camera),
                    "gallery" => Some(PhotoOrigin::Gallery),
                    _ => None,
                };
            }
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(body)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

/// Both axes blank means "no coordinate"; anything else must be a valid pair.
fn parse_coordinate(lat: Option<&str>, lng: Option<&str>) -> Result<Option<Coordinate>, String> {
    let lat = lat.map(str::trim).filter(|s| !s.is_empty());
    let lng = lng.map(str::trim).filter(|s| !s.is_empty());
    match (lat, lng) {
        (None, None) => Ok(None),
        (Some(lat), Some(lng)) => {
            let lat: f64 = lat
                .parse()
                .map_err(|_| format!("latitude {lat:?} is not a number"))?;
            let lng: f64 = lng
                .parse()
                .map_err(|_| format!("longitude {lng:?} is not a number"))?;
            Coordinate::new(lat, lng).map(Some).map_err(|e| e.to_string())
        }
        _ => Err("lat and lng must be given together".to_owned()),
    }
}

fn multipart_error(request_id: &str, error: &MultipartError) -> ApiError {
    let code = if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        "payload_too_large"
    } else {
        "bad_request"
    };
    tracing::warn!(request_id, error = %error, "unreadable visit form");
    ApiError::new(request_id, code, error.body_text())
}

fn submission_error(request_id: String, error: SubmissionError) -> ApiError {
    match &error {
        SubmissionError::Validation(v) => ApiError::new(request_id, "validation_error", v.to_string()),
        SubmissionError::Upload(_) => ApiError::new(
            request_id,
            "upload_failed",
            format!("{error}; nothing was saved"),
        ),
        SubmissionError::Persist { photo_link, .. } => ApiError::new(
            request_id,
            "persist_failed",
            format!("visit was not saved, but the photo was already stored at {photo_link}"),
        ),
    }
}

#[cfg(test)]
#[path = "visits_test.rs"]
mod tests;
