//! Google Drive v3 photo store.
//!
//! Each upload is a single `multipart/related` request followed by a
//! permission grant making the file readable by anyone with the link.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;

use super::{trim_base, GoogleClient};
use crate::error::StorageError;
use crate::store::{PhotoStore, PhotoUpload};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: Option<String>,
    web_view_link: Option<String>,
    web_content_link: Option<String>,
}

pub struct DrivePhotoStore {
    google: Arc<GoogleClient>,
    base_url: String,
    folder_id: Option<String>,
}

impl DrivePhotoStore {
    #[must_use]
    pub fn new(google: Arc<GoogleClient>, base_url: &str, folder_id: Option<String>) -> Self {
        Self {
            google,
            base_url: trim_base(base_url),
            folder_id,
        }
    }

    async fn upload_photo(&self, photo: PhotoUpload) -> Result<String, StorageError> {
        tracing::info!(
            filename = %photo.filename,
            mime = %photo.mime,
            size = photo.bytes.len(),
            "uploading photo to Google Drive"
        );

        let mut metadata = serde_json::json!({ "name": photo.filename });
        if let Some(folder) = &self.folder_id {
            metadata["parents"] = serde_json::json!([folder]);
        }

        let boundary = format!("canvass-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, &photo.mime, &photo.bytes);

        let request = self
            .google
            .http()
            .post(format!("{}/upload/drive/v3/files", self.base_url))
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", "id,webViewLink,webContentLink"),
            ])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);

        let created = self.google.send_json("drive upload", request).await?;
        let file: DriveFile =
            serde_json::from_value(created).map_err(|e| StorageError::Deserialize {
                context: "drive upload".to_owned(),
                source: e,
            })?;
        let id = file.id.clone().ok_or_else(|| StorageError::MissingField {
            context: "drive upload".to_owned(),
            field: "id".to_owned(),
        })?;
        tracing::debug!(file_id = %id, "photo uploaded, granting public read");

        let permission = self
            .google
            .http()
            .post(format!("{}/drive/v3/files/{id}/permissions", self.base_url))
            .query(&[("supportsAllDrives", "true")])
            .json(&serde_json::json!({ "role": "reader", "type": "anyone" }));
        self.google.send_json("drive permission", permission).await?;

        let link = public_link(&id, file.web_view_link, file.web_content_link);
        tracing::info!(file_id = %id, link = %link, "photo shared");
        Ok(link)
    }
}

impl PhotoStore for DrivePhotoStore {
    fn upload(&self, photo: PhotoUpload) -> BoxFuture<'_, Result<String, StorageError>> {
        Box::pin(self.upload_photo(photo))
    }
}

fn public_link(id: &str, view: Option<String>, content: Option<String>) -> String {
    view.filter(|l| !l.is_empty())
        .or_else(|| content.filter(|l| !l.is_empty()))
        .unwrap_or_else(|| format!("https://drive.google.com/file/d/{id}/view"))
}

fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    mime: &str,
    bytes: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::google::test_support::google_client;

    fn photo() -> PhotoUpload {
        PhotoUpload {
            bytes: b"fake-jpeg-bytes".to_vec(),
            filename: "visit_1_toko.jpg".into(),
            mime: "image/jpeg".into(),
        }
    }

    #[test]
    fn public_link_prefers_view_then_content_then_id() {
        assert_eq!(
            public_link("x", Some("view".into()), Some("content".into())),
            "view"
        );
        assert_eq!(public_link("x", Some(String::new()), Some("content".into())), "content");
        assert_eq!(
            public_link("abc", None, None),
            "https://drive.google.com/file/d/abc/view"
        );
    }

    #[test]
    fn multipart_body_wraps_metadata_and_bytes() {
        let body = multipart_related("B", &serde_json::json!({"name": "a.jpg"}), "image/jpeg", b"DATA");
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with("--B\r\nContent-Type: application/json"));
        assert!(text.contains(r#"{"name":"a.jpg"}"#));
        assert!(text.contains("Content-Type: image/jpeg\r\n\r\nDATA\r\n--B--"));
    }

    #[tokio::test]
    async fn upload_creates_file_shares_it_and_returns_view_link() {
        let server = MockServer::start().await;
        let google = google_client(&server).await;

        Mock::given(method("POST"))
            .and(path("/upload/drive/v3/files"))
            .and(query_param("uploadType", "multipart"))
            .and(query_param("supportsAllDrives", "true"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_string_contains(r#""parents":["folder-9"]"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "file-1",
                "webViewLink": "https://drive.google.com/file/d/file-1/view?usp=drivesdk"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/drive/v3/files/file-1/permissions"))
            .and(body_json(serde_json::json!({ "role": "reader", "type": "anyone" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "anyoneWithLink" })))
            .expect(1)
            .mount(&server)
            .await;

        let store = DrivePhotoStore::new(google, &server.uri(), Some("folder-9".into()));
        let link = store.upload(photo()).await.expect("uploaded");
        assert_eq!(link, "https://drive.google.com/file/d/file-1/view?usp=drivesdk");
    }

    #[tokio::test]
    async fn upload_failure_is_reported_with_status() {
        let server = MockServer::start().await;
        let google = google_client(&server).await;

        Mock::given(method("POST"))
            .and(path("/upload/drive/v3/files"))
            .respond_with(ResponseTemplate::new(403).set_body_string("storageQuotaExceeded"))
            .mount(&server)
            .await;

        let store = DrivePhotoStore::new(google, &server.uri(), None);
        let err = store.upload(photo()).await.unwrap_err();
        assert!(
            matches!(err, StorageError::UnexpectedStatus { status: 403, ref body, .. } if body.contains("Quota")),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn missing_links_fall_back_to_id_url() {
        let server = MockServer::start().await;
        let google = google_client(&server).await;

        Mock::given(method("POST"))
            .and(path("/upload/drive/v3/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "abc" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/drive/v3/files/abc/permissions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let store = DrivePhotoStore::new(google, &server.uri(), None);
        assert_eq!(
            store.upload(photo()).await.unwrap(),
            "https://drive.google.com/file/d/abc/view"
        );
    }
}
