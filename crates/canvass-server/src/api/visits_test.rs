use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use canvass_core::Coordinate;

use super::*;
use crate::api::test_support::{send, MemoryPhotos, MemoryVisits, TestAppBuilder};

const BOUNDARY: &str = "canvass-test-boundary";

fn complete_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("salesperson", "Citra Dewi"),
        ("store_name", "Warung Makmur"),
        ("contact_name", "Ibu Sari"),
        ("phone", "0812-345 678"),
        ("visit_status", "Follow-Up"),
        ("notes", "minta katalog"),
        ("city", "Jakarta Selatan"),
        ("district", "Tebet"),
        ("province", "DKI Jakarta"),
        ("lat", "-6.2261"),
        ("lng", "106.8532"),
    ]
}

fn multipart_body(fields: &[(&str, &str)], photo: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = photo {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"shop.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn post_visit(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/visits")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn complete_visit_is_created_with_photo_link() {
    let app = TestAppBuilder::default().build().await;

    let (status, body) = send(
        &app.router,
        post_visit(multipart_body(&complete_fields(), Some(b"store-front"))),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    let link = body["data"]["photo_link"].as_str().unwrap();
    assert!(link.starts_with("https://drive.example/visit_"));
    assert!(link.ends_with("_shop.jpg"));

    let rows = app.visits.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].photo_link, link);
    assert_eq!(rows[0].phone, "0812345678");
    assert_eq!(rows[0].district, "Tebet");
    assert_eq!(
        rows[0].coordinate,
        Coordinate {
            lat: -6.2261,
            lng: 106.8532
        }
    );
    assert_eq!(app.photos.uploads.lock().unwrap()[0].bytes, b"store-front");
}

#[tokio::test]
async fn missing_fields_are_listed_in_one_validation_error() {
    let app = TestAppBuilder::default().build().await;
    let fields: Vec<_> = complete_fields()
        .into_iter()
        .filter(|(name, _)| !matches!(*name, "store_name" | "lat" | "lng"))
        .collect();

    let (status, body) = send(&app.router, post_visit(multipart_body(&fields, None))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    let message = body["error"]["message"].as_str().unwrap();
    for label in ["Nama Toko", "Foto Toko", "Lokasi"] {
        assert!(message.contains(label), "{label} missing from {message}");
    }
    assert!(app.photos.uploads.lock().unwrap().is_empty());
    assert_eq!(app.visits.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_photo_part_counts_as_missing_photo() {
    let app = TestAppBuilder::default().build().await;
    let (status, body) = send(
        &app.router,
        post_visit(multipart_body(&complete_fields(), Some(b""))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "missing required fields: Foto Toko");
}

#[tokio::test]
async fn manual_mode_without_coordinate_records_origin() {
    let app = TestAppBuilder::default().build().await;
    let mut fields: Vec<_> = complete_fields()
        .into_iter()
        .filter(|(name, _)| !matches!(*name, "lat" | "lng"))
        .collect();
    fields.push(("manual_mode", "true"));

    let (status, _) = send(&app.router, post_visit(multipart_body(&fields, Some(b"img")))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.visits.rows.lock().unwrap()[0].coordinate, Coordinate::ORIGIN);
}

#[tokio::test]
async fn malformed_coordinate_is_rejected_before_submission() {
    let app = TestAppBuilder::default().build().await;
    let mut fields = complete_fields();
    fields.retain(|(name, _)| *name != "lng");
    fields.push(("lng", "east"));

    let (status, body) = send(&app.router, post_visit(multipart_body(&fields, Some(b"img")))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_coordinate");
    assert!(app.photos.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn upload_failure_is_bad_gateway_and_persists_nothing() {
    let app = TestAppBuilder {
        photos: MemoryPhotos {
            fail: true,
            ..MemoryPhotos::default()
        },
        ..TestAppBuilder::default()
    }
    .build()
    .await;

    let (status, body) = send(
        &app.router,
        post_visit(multipart_body(&complete_fields(), Some(b"img"))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "upload_failed");
    assert_eq!(app.visits.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn persist_failure_reports_the_stored_photo() {
    let app = TestAppBuilder {
        visits: MemoryVisits {
            fail: true,
            ..MemoryVisits::default()
        },
        ..TestAppBuilder::default()
    }
    .build()
    .await;

    let (status, body) = send(
        &app.router,
        post_visit(multipart_body(&complete_fields(), Some(b"img"))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "persist_failed");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("https://drive.example/visit_"), "{message}");
    assert_eq!(app.photos.uploads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn body_over_the_limit_is_rejected() {
    let app = TestAppBuilder {
        max_upload_bytes: 256,
        ..TestAppBuilder::default()
    }
    .build()
    .await;

    let photo = vec![b'x'; 4096];
    let (status, body) = send(
        &app.router,
        post_visit(multipart_body(&complete_fields(), Some(&photo))),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "payload_too_large");
    assert!(app.photos.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn non_multipart_body_is_bad_request() {
    let app = TestAppBuilder::default().build().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/visits")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[test]
fn coordinate_pair_parsing() {
    assert_eq!(parse_coordinate(None, None), Ok(None));
    assert_eq!(parse_coordinate(Some(" "), Some("")), Ok(None));
    assert_eq!(
        parse_coordinate(Some("-6.2"), Some("106.8")),
        Ok(Some(Coordinate {
            lat: -6.2,
            lng: 106.8
        }))
    );
    assert!(parse_coordinate(Some("-6.2"), None).is_err());
    assert!(parse_coordinate(Some("-6.2"), Some("200")).is_err());
}

#[test]
fn manual_mode_flag_accepts_common_truthy_values() {
    for value in ["true", "1", "on", "YES"] {
        assert!(parse_flag(value), "{value}");
    }
    for value in ["false", "0", "", "off"] {
        assert!(!parse_flag(value), "{value}");
    }
}
