//! Field photo acquisition and compression.
//!
//! A captured [`RawImage`] is resized to fit [`CompressionOptions::max_dimension`]
//! and re-encoded as JPEG until it fits the byte target. Any compression
//! failure falls back to the original bytes so a submission is never lost
//! to an encoder problem.

pub mod capture;
pub mod compress;

pub use capture::{capture_bytes, capture_file, PhotoOrigin, RawImage};
pub use compress::{
    compress_or_original, fit_within, CompressedImage, CompressionOptions, Compressor,
    JpegCompressor,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to read photo {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("photo is empty")]
    Empty,

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("compression task failed: {0}")]
    Task(String),
}
