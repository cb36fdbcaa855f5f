//! # Airbrush
//!
//! An image transformation pipeline: resize, crop, fill-crop and labelled
//! preview batches, with every output normalized to RGB.
//!
//! # Architecture
//!
//! Every operation is a pure function from encoded bytes to encoded bytes:
//!
//! ```text
//! bytes → preprocess → decode → geometry → color normalize → serialize → bytes
//! ```
//!
//! Geometry is validated before the engine is asked to do anything, so a bad
//! request never costs a decode-and-fail round trip further down. The engine
//! itself sits behind the [`imaging::ImageBackend`] trait; [`imaging::RustBackend`]
//! is the pure-Rust implementation used by the CLI, and the unit tests swap in a
//! recording mock.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Dimension math, engine traits, color policy, the processor itself |
//! | [`batch`] | Previews for files on disk: parallel across inputs, JSON manifest per input |
//! | [`config`] | `airbrush.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Strict Crops
//!
//! A crop rectangle reaching past the source is a [`imaging::ProcessError::Geometry`]
//! error, never silently clipped. Callers that want clipping can clamp the
//! rectangle themselves with the dimensions from `identify`.
//!
//! ## One Decode Per Preview Batch
//!
//! [`imaging::ImageProcessor::previews`] decodes once and clones the buffer per
//! label. Labels never observe each other's transforms, and a failing label
//! fails the whole batch, so callers never see partial results.
//!
//! ## Color Normalization
//!
//! CMYK sources get the generic CMYK profile attached, then sRGB. Grayscale and
//! Lab are passed through unchanged with a `tracing` warning: there is no
//! lossless conversion worth guessing at, and the caller can still inspect the
//! returned [`imaging::ColorNormalization`].

pub mod batch;
pub mod config;
pub mod imaging;
pub mod output;
