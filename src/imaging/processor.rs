//! The image processor: single-image transforms and preview batches.
//!
//! Every operation follows the same pipeline:
//!
//! ```text
//! preprocess → decode → geometry → ensure_rgb → serialize
//! ```
//!
//! Each call owns its decoded buffer and drops it on every exit path, so the
//! processor holds no per-image state and is safe to share across threads.
//! Parameter checks that don't depend on the source run before decode;
//! bounds checks run after decode but before any geometry call.

use super::backend::{BackendError, Dimensions, ImageBackend, ImageBuffer};
use super::calculations::resolve_size;
use super::color::{ColorNormalization, ensure_rgb};
use super::params::{CropRect, SizeSpec};
use super::preprocess::{Identity, Preprocessor};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::collections::btree_map;
use thiserror::Error;
use tracing::debug;

/// Label reserved for the source dimensions in a [`PreviewResult`].
pub const ORIGINAL_LABEL: &str = "original";

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("not a valid image: {0}")]
    Decode(String),
    #[error("invalid geometry: {0}")]
    Geometry(String),
    #[error("invalid preview request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Backend(BackendError),
}

impl From<BackendError> for ProcessError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Decode(msg) => ProcessError::Decode(msg),
            other => ProcessError::Backend(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;

/// Encoded output of one transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformResult {
    pub image: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// What color normalization did before encoding.
    #[serde(skip)]
    pub color: ColorNormalization,
}

/// Named preview sizes to produce from one source image.
///
/// Labels are unique and [`ORIGINAL_LABEL`] is reserved; both are enforced
/// on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewRequest {
    sizes: BTreeMap<String, SizeSpec>,
}

impl PreviewRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, spec: SizeSpec) -> Result<()> {
        let label = label.into();
        if label.is_empty() {
            return Err(ProcessError::InvalidRequest(
                "preview label must not be empty".into(),
            ));
        }
        if label == ORIGINAL_LABEL {
            return Err(ProcessError::InvalidRequest(format!(
                "'{ORIGINAL_LABEL}' is reserved for the source dimensions"
            )));
        }
        match self.sizes.entry(label) {
            btree_map::Entry::Occupied(e) => Err(ProcessError::InvalidRequest(format!(
                "duplicate label '{}'",
                e.key()
            ))),
            btree_map::Entry::Vacant(e) => {
                e.insert(spec);
                Ok(())
            }
        }
    }

    /// Build a request from `(label, size)` pairs, validating every label.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, SizeSpec)>) -> Result<Self> {
        let mut request = Self::new();
        for (label, spec) in pairs {
            request.insert(label, spec)?;
        }
        Ok(request)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SizeSpec)> {
        self.sizes.iter().map(|(label, spec)| (label.as_str(), *spec))
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl TryFrom<BTreeMap<String, SizeSpec>> for PreviewRequest {
    type Error = ProcessError;

    fn try_from(sizes: BTreeMap<String, SizeSpec>) -> Result<Self> {
        let mut request = PreviewRequest::new();
        for (label, spec) in sizes {
            request.insert(label, spec)?;
        }
        Ok(request)
    }
}

/// Output of [`ImageProcessor::previews`]: one entry per requested label plus
/// the source dimensions.
///
/// Serializes as `{"<label>": {"image", "width", "height"}, ..., "original": [w, h]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewResult {
    #[serde(flatten)]
    pub previews: BTreeMap<String, TransformResult>,
    #[serde(serialize_with = "dimensions_pair")]
    pub original: Dimensions,
}

fn dimensions_pair<S: Serializer>(
    dims: &Dimensions,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    [dims.width, dims.height].serialize(serializer)
}

impl PreviewResult {
    pub fn get(&self, label: &str) -> Option<&TransformResult> {
        self.previews.get(label)
    }
}

/// Composes a [`Preprocessor`] and an [`ImageBackend`] into the transform
/// operations.
///
/// The backend is chosen at construction:
///
/// ```no_run
/// # use airbrush::imaging::{ImageProcessor, RustBackend};
/// let processor = ImageProcessor::new(RustBackend::new());
/// let bytes = std::fs::read("photo.jpg").unwrap();
/// let thumb = processor.crop_resize(&bytes, 75, 75).unwrap();
/// assert_eq!((thumb.width, thumb.height), (75, 75));
/// ```
pub struct ImageProcessor<B, P = Identity> {
    backend: B,
    preprocessor: P,
}

impl<B: ImageBackend> ImageProcessor<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            preprocessor: Identity,
        }
    }
}

impl<B: ImageBackend, P: Preprocessor> ImageProcessor<B, P> {
    pub fn with_preprocessor(backend: B, preprocessor: P) -> Self {
        Self {
            backend,
            preprocessor,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Preprocess and decode, without transforming.
    pub fn decode(&self, bytes: &[u8]) -> Result<B::Buffer> {
        let bytes = self.preprocessor.preprocess(bytes)?;
        let buffer = self.backend.decode(&bytes)?;
        debug!(
            width = buffer.width(),
            height = buffer.height(),
            colorspace = %buffer.colorspace(),
            "decoded image"
        );
        Ok(buffer)
    }

    /// Resize to the given width and/or height.
    ///
    /// With a single dimension, it bounds the longer edge and the result keeps
    /// the source aspect ratio without upscaling (see
    /// [`calculate_dimensions`](super::calculate_dimensions)). With both, the
    /// output is exactly `width x height`.
    pub fn resize(
        &self,
        bytes: &[u8],
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<TransformResult> {
        if width == Some(0) || height == Some(0) {
            return Err(ProcessError::Geometry(
                "resize dimensions must be positive".into(),
            ));
        }
        let target = match (width, height) {
            (Some(w), Some(h)) => SizeSpec::Exact(w, h),
            (Some(bound), None) | (None, Some(bound)) => SizeSpec::Max(bound),
            (None, None) => {
                return Err(ProcessError::Geometry(
                    "resize needs a width, a height, or both".into(),
                ));
            }
        };

        let mut buffer = self.decode(bytes)?;
        let (w, h) = resolve_size((buffer.width(), buffer.height()), target)?;

        debug!(width = w, height = h, "resizing");
        buffer.resize_to(w, h)?;
        finish(buffer)
    }

    /// Extract the rectangle at `(x, y)` with the given extent.
    ///
    /// Rectangles reaching past the source bounds are rejected rather than
    /// clipped.
    pub fn crop(
        &self,
        bytes: &[u8],
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<TransformResult> {
        if width == 0 || height == 0 {
            return Err(ProcessError::Geometry(format!(
                "crop extent must be positive, got {width}x{height}"
            )));
        }

        let mut buffer = self.decode(bytes)?;
        let rect = CropRect {
            x,
            y,
            width,
            height,
        };
        if !rect.fits_within(buffer.width(), buffer.height()) {
            return Err(ProcessError::Geometry(format!(
                "crop {width}x{height} at ({x}, {y}) exceeds source {}x{}",
                buffer.width(),
                buffer.height()
            )));
        }

        debug!(x, y, width, height, "cropping");
        buffer.crop_to(rect)?;
        finish(buffer)
    }

    /// Center-crop to the target aspect ratio, then scale to exactly
    /// `width x height`.
    pub fn crop_resize(&self, bytes: &[u8], width: u32, height: u32) -> Result<TransformResult> {
        if width == 0 || height == 0 {
            return Err(ProcessError::Geometry(format!(
                "target dimensions must be positive, got {width}x{height}"
            )));
        }

        let mut buffer = self.decode(bytes)?;
        debug!(width, height, "crop-resizing");
        buffer.crop_resize_to(width, height)?;
        finish(buffer)
    }

    /// Produce every requested preview from a single decode.
    ///
    /// Each label is crop-resized from its own copy of the decoded source.
    /// The first failing label fails the whole batch.
    pub fn previews(&self, bytes: &[u8], request: &PreviewRequest) -> Result<PreviewResult> {
        let source = self.decode(bytes)?;
        let original = source.dimensions();

        let mut previews = BTreeMap::new();
        for (label, spec) in request.iter() {
            let (w, h) = resolve_size((original.width, original.height), spec)?;
            debug!(label, width = w, height = h, "rendering preview");

            let mut buffer = source.clone();
            buffer.crop_resize_to(w, h)?;
            previews.insert(label.to_string(), finish(buffer)?);
        }

        Ok(PreviewResult { previews, original })
    }
}

/// Normalize color and encode. Consumes the buffer.
fn finish<B: ImageBuffer>(mut buffer: B) -> Result<TransformResult> {
    let color = ensure_rgb(&mut buffer)?;
    let image = buffer.serialize()?;
    Ok(TransformResult {
        image,
        width: buffer.width(),
        height: buffer.height(),
        color,
    })
}
