use std::path::Path;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::CaptureError;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Where the operator took the photo from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoOrigin {
    #[default]
    Camera,
    Gallery,
}

/// Photo bytes exactly as captured, before any compression.
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: String,
    pub origin: PhotoOrigin,
}

impl std::fmt::Debug for RawImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawImage")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("filename", &self.filename)
            .field("mime", &self.mime)
            .field("origin", &self.origin)
            .finish()
    }
}

impl RawImage {
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Wraps bytes received from a camera or an upload. The MIME type is
/// taken from `mime` when given, else sniffed from the content, else
/// guessed from the file name.
///
/// # Errors
///
/// Returns [`CaptureError::Empty`] for a zero-length payload.
pub fn capture_bytes(
    bytes: Vec<u8>,
    filename: &str,
    mime: Option<&str>,
    origin: PhotoOrigin,
) -> Result<RawImage, CaptureError> {
    if bytes.is_empty() {
        return Err(CaptureError::Empty);
    }

    let mime = mime
        .map(str::trim)
        .filter(|m| !m.is_empty() && *m != FALLBACK_MIME)
        .map(ToOwned::to_owned)
        .or_else(|| image::guess_format(&bytes).ok().map(|f| f.to_mime_type().to_owned()))
        .or_else(|| {
            ImageFormat::from_path(filename)
                .ok()
                .map(|f| f.to_mime_type().to_owned())
        })
        .unwrap_or_else(|| FALLBACK_MIME.to_owned());

    let filename = match filename.trim() {
        "" => "photo.jpg".to_owned(),
        name => name.to_owned(),
    };

    tracing::debug!(filename, mime, size = bytes.len(), ?origin, "photo captured");
    Ok(RawImage {
        bytes,
        filename,
        mime,
        origin,
    })
}

/// Reads a photo from disk.
///
/// # Errors
///
/// Returns [`CaptureError::Io`] when the file cannot be read and
/// [`CaptureError::Empty`] when it has no content.
pub async fn capture_file(path: impl AsRef<Path>, origin: PhotoOrigin) -> Result<RawImage, CaptureError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| CaptureError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    capture_bytes(bytes, &filename, None, origin)
}
