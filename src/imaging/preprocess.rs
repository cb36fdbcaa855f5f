//! Byte-level hook that runs before decode.

use super::backend::BackendError;
use std::borrow::Cow;

/// Transforms raw encoded bytes before they reach the decoder.
///
/// Implementations might auto-orient from EXIF or strip metadata. The
/// processor uses [`Identity`] unless told otherwise.
pub trait Preprocessor: Sync {
    fn preprocess<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>, BackendError>;
}

/// Passes bytes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Preprocessor for Identity {
    fn preprocess<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>, BackendError> {
        Ok(Cow::Borrowed(bytes))
    }
}
