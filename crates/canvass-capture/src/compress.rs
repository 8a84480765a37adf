use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use canvass_core::AppConfig;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageReader};

use crate::{CaptureError, RawImage};

/// Size bounds for re-encoded photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionOptions {
    /// Longest edge, in pixels, after resizing.
    pub max_dimension: u32,
    pub target_max_bytes: usize,
    pub initial_quality: u8,
    pub min_quality: u8,
    pub quality_step: u8,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1280,
            target_max_bytes: 838_861,
            initial_quality: 85,
            min_quality: 40,
            quality_step: 10,
        }
    }
}

impl CompressionOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_dimension: config.photo_max_dimension,
            target_max_bytes: config.photo_target_max_bytes,
            ..Self::default()
        }
    }
}

/// Bytes ready for upload, plus whether they were re-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// `false` when these are the original captured bytes.
    pub reencoded: bool,
}

impl std::fmt::Debug for CompressedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressedImage")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("filename", &self.filename)
            .field("mime", &self.mime)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("reencoded", &self.reencoded)
            .finish()
    }
}

impl CompressedImage {
    /// Passes the captured bytes through untouched.
    #[must_use]
    pub fn original(raw: RawImage) -> Self {
        Self {
            bytes: raw.bytes,
            filename: raw.filename,
            mime: raw.mime,
            width: None,
            height: None,
            reencoded: false,
        }
    }
}

/// Turns a captured photo into an upload payload.
pub trait Compressor: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`CaptureError`] when the photo cannot be decoded or encoded.
    fn compress(&self, raw: &RawImage) -> Result<CompressedImage, CaptureError>;
}

/// Resize-then-JPEG compressor backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCompressor {
    pub options: CompressionOptions,
}

impl JpegCompressor {
    #[must_use]
    pub fn new(options: CompressionOptions) -> Self {
        Self { options }
    }
}

impl Compressor for JpegCompressor {
    fn compress(&self, raw: &RawImage) -> Result<CompressedImage, CaptureError> {
        if raw.is_empty() {
            return Err(CaptureError::Empty);
        }
        let opts = &self.options;

        let decoded = ImageReader::new(Cursor::new(&raw.bytes))
            .with_guessed_format()
            .map_err(|source| CaptureError::Io {
                path: raw.filename.clone(),
                source,
            })?
            .decode()?;

        let (width, height) = fit_within(decoded.width(), decoded.height(), opts.max_dimension);
        let needs_resize = (width, height) != (decoded.width(), decoded.height());
        let resized = if needs_resize {
            decoded.resize_exact(width, height, FilterType::Lanczos3)
        } else {
            decoded
        };
        let rgb = resized.to_rgb8();

        let mut quality = opts.initial_quality.clamp(1, 100);
        let floor = opts.min_quality.clamp(1, quality);
        let step = opts.quality_step.max(1);
        let bytes = loop {
            let mut buf = Vec::new();
            JpegEncoder::new_with_quality(&mut buf, quality).encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;

            if buf.len() <= opts.target_max_bytes || quality == floor {
                tracing::debug!(quality, size = buf.len(), width, height, "photo re-encoded");
                break buf;
            }
            quality = quality.saturating_sub(step).max(floor);
        };

        // A full-size re-encode that does not shrink the photo is discarded.
        if !needs_resize && bytes.len() >= raw.len() {
            tracing::debug!(
                original = raw.len(),
                reencoded = bytes.len(),
                "re-encoding did not shrink the photo, keeping original bytes"
            );
            return Ok(CompressedImage {
                width: Some(width),
                height: Some(height),
                ..CompressedImage::original(raw.clone())
            });
        }

        Ok(CompressedImage {
            bytes,
            filename: jpeg_filename(&raw.filename),
            mime: "image/jpeg".to_owned(),
            width: Some(width),
            height: Some(height),
            reencoded: true,
        })
    }
}

/// Scales `(width, height)` so the longer edge is at most `max_dimension`,
/// preserving the aspect ratio. Smaller images are returned unchanged.
#[must_use]
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if max_dimension == 0 || longest <= max_dimension {
        return (width, height);
    }
    let scale = |edge: u32| -> u32 {
        let scaled = u64::from(edge) * u64::from(max_dimension) / u64::from(longest);
        u32::try_from(scaled).unwrap_or(max_dimension).max(1)
    };
    (scale(width), scale(height))
}

fn jpeg_filename(original: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "photo".to_owned());
    format!("{stem}.jpg")
}

/// Compresses on the blocking pool and falls back to the original bytes on
/// any failure, including a panicked worker.
pub async fn compress_or_original(compressor: Arc<dyn Compressor>, raw: RawImage) -> CompressedImage {
    let input = raw.clone();
    let outcome = tokio::task::spawn_blocking(move || compressor.compress(&input))
        .await
        .map_err(|e| CaptureError::Task(e.to_string()))
        .and_then(|result| result);

    match outcome {
        Ok(compressed) => {
            tracing::info!(
                original = raw.len(),
                compressed = compressed.bytes.len(),
                "photo compressed"
            );
            compressed
        }
        Err(error) => {
            tracing::warn!(error = %error, filename = %raw.filename, "compression failed, uploading original photo");
            CompressedImage::original(raw)
        }
    }
}
