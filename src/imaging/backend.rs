//! Image codec/transform engine traits and shared types.
//!
//! The engine is split in two traits:
//!
//! - [`ImageBackend`] decodes raw bytes into a buffer. It is `Sync` and holds
//!   no per-image state, so one backend can serve many concurrent requests.
//! - [`ImageBuffer`] is the decoded image: queryable dimensions and
//!   colorspace, in-place geometry changes, profile attachment, and
//!   re-serialization back to bytes.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Everything above this module is backend-agnostic.

use super::calculations::calculate_fill_crop;
use super::params::{ColorProfile, Colorspace, CropRect};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// A decoded image owned by a single operation.
///
/// `Clone` yields an independent copy; the preview generator clones one
/// decoded source per requested label.
pub trait ImageBuffer: Clone {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    fn colorspace(&self) -> Colorspace;

    /// Scale to exactly `width x height`, ignoring aspect ratio.
    fn resize_to(&mut self, width: u32, height: u32) -> Result<(), BackendError>;

    /// Replace the buffer with the pixels inside `rect`.
    ///
    /// Callers validate `rect` against the bounds first.
    fn crop_to(&mut self, rect: CropRect) -> Result<(), BackendError>;

    /// Center-crop to the target aspect ratio, then scale to exactly
    /// `width x height`.
    fn crop_resize_to(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        let rect = calculate_fill_crop((self.width(), self.height()), (width, height));
        self.crop_to(rect)?;
        self.resize_to(width, height)
    }

    /// Associate a color profile with the pixel data.
    fn attach_profile(&mut self, profile: ColorProfile) -> Result<(), BackendError>;

    /// Re-encode the buffer to raw bytes.
    fn serialize(&self) -> Result<Vec<u8>, BackendError>;
}

/// Trait for image codec backends.
pub trait ImageBackend: Sync {
    type Buffer: ImageBuffer;

    /// Decode raw encoded bytes. Fails with [`BackendError::Decode`] when the
    /// bytes are not a recognized image.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Buffer, BackendError>;
}
