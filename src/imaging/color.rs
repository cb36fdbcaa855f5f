//! Colorspace normalization.
//!
//! Downstream consumers (browsers, print previews) assume sRGB. CMYK images
//! written by devices that omit an embedded profile otherwise render with
//! shifted colors, so every transform runs [`ensure_rgb`] after its geometry
//! change and before re-serializing.
//!
//! | Tag | Action |
//! |---|---|
//! | RGB, sRGB | nothing |
//! | CMYK | attach the generic CMYK profile, then convert via the sRGB profile |
//! | anything else | log a warning, leave the buffer as is |

use super::backend::{BackendError, ImageBuffer};
use super::params::{ColorProfile, Colorspace};
use tracing::{debug, warn};

/// What [`ensure_rgb`] did to a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorNormalization {
    AlreadyRgb,
    ConvertedFromCmyk,
    /// Left untouched; not correctable without data loss.
    Unsupported(Colorspace),
}

/// Bring a buffer into an sRGB-compatible colorspace where that is safe.
///
/// Idempotent: a converted buffer reports an RGB-family colorspace, so a
/// second call is a no-op.
pub fn ensure_rgb<B: ImageBuffer>(buffer: &mut B) -> Result<ColorNormalization, BackendError> {
    match buffer.colorspace() {
        space if space.is_rgb_family() => Ok(ColorNormalization::AlreadyRgb),
        Colorspace::Cmyk => {
            debug!("converting CMYK image to sRGB");
            buffer.attach_profile(ColorProfile::GenericCmyk)?;
            buffer.attach_profile(ColorProfile::Srgb)?;
            Ok(ColorNormalization::ConvertedFromCmyk)
        }
        other => {
            warn!(colorspace = %other, "unsupported colorspace, leaving image unconverted");
            Ok(ColorNormalization::Unsupported(other))
        }
    }
}
