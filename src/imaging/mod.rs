//! Image processing: decode, transform, normalize and re-encode.
//!
//! | Operation | Entry point |
//! |---|---|
//! | **Resize** | [`ImageProcessor::resize`] (one dimension auto-scales, two are exact) |
//! | **Crop** | [`ImageProcessor::crop`] (out-of-bounds rectangles are rejected) |
//! | **Crop-resize** | [`ImageProcessor::crop_resize`] (center-crop to aspect, then scale) |
//! | **Previews** | [`ImageProcessor::previews`] (many labelled sizes from one decode) |
//! | **Color** | [`ensure_rgb`] (CMYK → sRGB, warn on other spaces) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`]/[`ImageBuffer`] traits + [`RustBackend`]
//! - **Processor**: The pipeline combining calculations, color policy and backend

pub mod backend;
mod calculations;
pub mod color;
mod params;
pub mod preprocess;
pub mod processor;
pub mod rust_backend;
mod sniff;

pub use backend::{BackendError, Dimensions, ImageBackend, ImageBuffer};
pub use calculations::{calculate_dimensions, calculate_fill_crop, resolve_size};
pub use color::{ColorNormalization, ensure_rgb};
pub use params::{ColorProfile, Colorspace, CropRect, Quality, SizeSpec};
pub use preprocess::{Identity, Preprocessor};
pub use processor::{
    ImageProcessor, ORIGINAL_LABEL, PreviewRequest, PreviewResult, ProcessError, TransformResult,
};
pub use rust_backend::{EncodeSettings, RustBackend, RustImage, extension_for};
