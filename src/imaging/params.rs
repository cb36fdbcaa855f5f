//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`processor`](super::processor) (which decides which
//! geometry to apply) and the [`backend`](super::backend) (which does the
//! actual pixel work). This separation allows swapping backends (e.g. for
//! testing with a mock) without changing processing logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`SizeSpec`]: A single bounding dimension or an exact `(width, height)` pair.
//! - [`CropRect`]: An axis-aligned rectangle inside the source image.
//! - [`Colorspace`]: Colorspace tag carried by a decoded buffer.
//! - [`ColorProfile`]: Named profiles the color normalizer can attach.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
///
/// Only constructible through [`Quality::new`], so the value always fits the
/// encoders' `u8` quality parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u32 {
        u32::from(self.0)
    }

    pub fn as_u8(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Requested size for one preview label.
///
/// In TOML and JSON a bare number is [`SizeSpec::Max`] and a two-element
/// array is [`SizeSpec::Exact`]:
///
/// ```toml
/// thumb = 150
/// small = [200, 100]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeSpec {
    /// Bound the longer edge; the other edge follows the source aspect ratio.
    Max(u32),
    /// Exact output dimensions.
    Exact(u32, u32),
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeSpec::Max(n) => write!(f, "{n}"),
            SizeSpec::Exact(w, h) => write!(f, "{w}x{h}"),
        }
    }
}

impl FromStr for SizeSpec {
    type Err = String;

    /// Parses `"300"` or `"200x100"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid size '{s}': {e}"))
        };
        match s.split_once(['x', 'X']) {
            Some((w, h)) => Ok(SizeSpec::Exact(parse(w)?, parse(h)?)),
            None => Ok(SizeSpec::Max(parse(s)?)),
        }
    }
}

/// Axis-aligned crop rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Whether the rectangle lies entirely within a `width x height` image.
    ///
    /// Uses `u64` sums so offsets near `u32::MAX` cannot wrap.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// Colorspace tag of a decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colorspace {
    /// Device RGB without a known profile.
    Rgb,
    /// RGB already in (or converted to) sRGB.
    Srgb,
    Cmyk,
    /// Single-channel luma.
    Gray,
    Lab,
}

impl Colorspace {
    /// RGB-family spaces need no normalization.
    pub fn is_rgb_family(self) -> bool {
        matches!(self, Colorspace::Rgb | Colorspace::Srgb)
    }
}

impl fmt::Display for Colorspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Colorspace::Rgb => "RGB",
            Colorspace::Srgb => "sRGB",
            Colorspace::Cmyk => "CMYK",
            Colorspace::Gray => "Gray",
            Colorspace::Lab => "Lab",
        };
        f.write_str(name)
    }
}

/// Color profiles the normalizer knows how to attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorProfile {
    /// Generic CMYK input profile for images tagged CMYK without one embedded.
    GenericCmyk,
    /// sRGB IEC61966-2.1 output profile.
    Srgb,
}

impl ColorProfile {
    pub fn name(self) -> &'static str {
        match self {
            ColorProfile::GenericCmyk => "U.S. Web Coated (SWOP) v2",
            ColorProfile::Srgb => "sRGB IEC61966-2.1",
        }
    }
}
