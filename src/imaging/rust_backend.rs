//! Pure Rust codec backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format detection | `image::guess_format` (magic bytes) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory_with_format` |
//! | Colorspace | [`sniff`](super::sniff) headers, then the decoded color type |
//! | Resize | `DynamicImage::resize_exact` with the configured filter (Lanczos3 default) |
//! | Crop | `DynamicImage::crop_imm` |
//! | Encode | source format (or configured override); JPEG at the configured quality |
//! | ICC profile | `moxcms::ColorProfile::new_srgb().encode()`, embedded via `ImageEncoder::set_icc_profile` |
//!
//! ## Profiles
//!
//! The JPEG and TIFF decoders already convert CMYK samples to RGB, so the
//! pixel data is RGB by the time a buffer exists. Attaching profiles records
//! them on the buffer and re-tags it: once the sRGB profile is attached the
//! buffer reports [`Colorspace::Srgb`] and the encoded output carries an
//! embedded sRGB ICC profile wherever the encoder accepts one.

use super::backend::{BackendError, ImageBackend, ImageBuffer};
use super::params::{ColorProfile, Colorspace, CropRect, Quality};
use super::sniff::sniff_colorspace;
use crate::config::{OutputFormat, ProcessorConfig, ResizeFilter};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat};
use std::borrow::Cow;
use std::io::Cursor;
use tracing::debug;

/// Formats with decoders and encoders compiled in.
const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

/// Encoding and resampling settings shared by every buffer a backend decodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeSettings {
    pub filter: FilterType,
    pub quality: Quality,
    /// Output format; `None` keeps the source format.
    pub format: Option<ImageFormat>,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
            quality: Quality::default(),
            format: None,
        }
    }
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Default)]
pub struct RustBackend {
    settings: EncodeSettings,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: EncodeSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self::with_settings(EncodeSettings {
            filter: filter_type(config.resize.filter),
            quality: Quality::new(config.encoding.quality),
            format: config.encoding.format.map(image_format),
        })
    }

    pub fn settings(&self) -> EncodeSettings {
        self.settings
    }
}

fn filter_type(filter: ResizeFilter) -> FilterType {
    match filter {
        ResizeFilter::Nearest => FilterType::Nearest,
        ResizeFilter::Triangle => FilterType::Triangle,
        ResizeFilter::CatmullRom => FilterType::CatmullRom,
        ResizeFilter::Gaussian => FilterType::Gaussian,
        ResizeFilter::Lanczos3 => FilterType::Lanczos3,
    }
}

fn image_format(format: OutputFormat) -> ImageFormat {
    match format {
        OutputFormat::Jpeg => ImageFormat::Jpeg,
        OutputFormat::Png => ImageFormat::Png,
        OutputFormat::Tiff => ImageFormat::Tiff,
        OutputFormat::Webp => ImageFormat::WebP,
    }
}

/// File extension for encoded bytes, from their magic number.
///
/// Falls back to `"bin"` for anything unrecognized.
pub fn extension_for(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("bin")
}

/// A decoded image plus everything needed to re-encode it.
#[derive(Debug, Clone)]
pub struct RustImage {
    image: DynamicImage,
    source_format: ImageFormat,
    colorspace: Colorspace,
    profiles: Vec<ColorProfile>,
    settings: EncodeSettings,
}

impl RustImage {
    /// Profiles attached so far, in attach order.
    pub fn profiles(&self) -> &[ColorProfile] {
        &self.profiles
    }

    pub fn source_format(&self) -> ImageFormat {
        self.source_format
    }

    pub fn output_format(&self) -> ImageFormat {
        self.settings.format.unwrap_or(self.source_format)
    }
}

/// Serialized sRGB IEC61966-2.1 ICC profile.
pub fn srgb_icc_profile() -> Result<Vec<u8>, BackendError> {
    moxcms::ColorProfile::new_srgb()
        .encode()
        .map_err(|e| BackendError::Encode(format!("sRGB profile: {e:?}")))
}

/// Hand `icc` to the encoder (if any), then encode `image` with it.
fn encode_with<E: ImageEncoder>(
    image: &DynamicImage,
    mut encoder: E,
    icc: Option<&[u8]>,
    format: ImageFormat,
) -> Result<(), BackendError> {
    if let Some(icc) = icc {
        if let Err(e) = encoder.set_icc_profile(icc.to_vec()) {
            debug!(?format, error = %e, "encoder cannot embed ICC profile");
        }
    }
    image
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(format!("{format:?} encode failed: {e}")))
}

fn decoded_colorspace(image: &DynamicImage) -> Colorspace {
    match image.color() {
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => Colorspace::Gray,
        _ => Colorspace::Rgb,
    }
}

/// Convert to a pixel layout the target encoder accepts.
fn encodable(image: &DynamicImage, format: ImageFormat) -> Cow<'_, DynamicImage> {
    let color = image.color();
    match format {
        ImageFormat::Jpeg => match color {
            ColorType::L8 | ColorType::Rgb8 => Cow::Borrowed(image),
            ColorType::La8 | ColorType::L16 | ColorType::La16 => {
                Cow::Owned(DynamicImage::ImageLuma8(image.to_luma8()))
            }
            _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        },
        ImageFormat::WebP => match color {
            ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => {
                Cow::Borrowed(image)
            }
            _ if color.has_alpha() => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
            _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        },
        _ => Cow::Borrowed(image),
    }
}

impl ImageBuffer for RustImage {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn colorspace(&self) -> Colorspace {
        self.colorspace
    }

    fn resize_to(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        self.image = self.image.resize_exact(width, height, self.settings.filter);
        Ok(())
    }

    fn crop_to(&mut self, rect: CropRect) -> Result<(), BackendError> {
        if !rect.fits_within(self.width(), self.height()) {
            return Err(BackendError::Unsupported(format!(
                "crop {}x{} at ({}, {}) outside {}x{} image",
                rect.width,
                rect.height,
                rect.x,
                rect.y,
                self.width(),
                self.height()
            )));
        }
        self.image = self
            .image
            .crop_imm(rect.x, rect.y, rect.width, rect.height);
        Ok(())
    }

    fn attach_profile(&mut self, profile: ColorProfile) -> Result<(), BackendError> {
        debug!(profile = profile.name(), "attaching color profile");
        self.profiles.push(profile);
        if profile == ColorProfile::Srgb
            && matches!(self.colorspace, Colorspace::Cmyk | Colorspace::Rgb)
        {
            self.colorspace = Colorspace::Srgb;
        }
        Ok(())
    }

    fn serialize(&self) -> Result<Vec<u8>, BackendError> {
        let format = self.output_format();
        let image = encodable(&self.image, format);
        let icc = if self.profiles.contains(&ColorProfile::Srgb) {
            Some(srgb_icc_profile()?)
        } else {
            None
        };
        let icc = icc.as_deref();
        let mut out = Cursor::new(Vec::new());

        match format {
            ImageFormat::Jpeg => {
                let encoder =
                    JpegEncoder::new_with_quality(&mut out, self.settings.quality.as_u8());
                encode_with(&image, encoder, icc, format)?;
            }
            ImageFormat::Png => encode_with(&image, PngEncoder::new(&mut out), icc, format)?,
            ImageFormat::WebP => {
                encode_with(&image, WebPEncoder::new_lossless(&mut out), icc, format)?
            }
            ImageFormat::Tiff => encode_with(&image, TiffEncoder::new(&mut out), icc, format)?,
            other => {
                return Err(BackendError::Unsupported(format!(
                    "output format {other:?}"
                )));
            }
        }

        Ok(out.into_inner())
    }
}

impl ImageBackend for RustBackend {
    type Buffer = RustImage;

    fn decode(&self, bytes: &[u8]) -> Result<RustImage, BackendError> {
        let format = image::guess_format(bytes)
            .map_err(|e| BackendError::Decode(format!("unrecognized image data: {e}")))?;
        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(BackendError::Decode(format!(
                "no decoder for {format:?}"
            )));
        }

        let image = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| BackendError::Decode(format!("failed to decode {format:?}: {e}")))?;
        let colorspace =
            sniff_colorspace(bytes, format).unwrap_or_else(|| decoded_colorspace(&image));

        Ok(RustImage {
            image,
            source_format: format,
            colorspace,
            profiles: Vec::new(),
            settings: self.settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageEncoder, RgbImage, RgbaImage};

    /// Encode a gradient JPEG in memory with the given dimensions.
    fn test_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut out = Vec::new();
        JpegEncoder::new(&mut out)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        out
    }

    fn test_png(img: DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decode_synthetic_jpeg() {
        let buffer = RustBackend::new().decode(&test_jpeg(200, 150)).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (200, 150));
        assert_eq!(buffer.colorspace(), Colorspace::Rgb);
        assert_eq!(buffer.source_format(), ImageFormat::Jpeg);
    }

    #[test]
    fn decode_garbage_is_decode_error() {
        let result = RustBackend::new().decode(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn grayscale_png_is_tagged_gray() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(20, 10, image::Luma([90])));
        let buffer = RustBackend::new().decode(&test_png(gray)).unwrap();
        assert_eq!(buffer.colorspace(), Colorspace::Gray);
    }

    #[test]
    fn resize_and_crop_change_dimensions() {
        let mut buffer = RustBackend::new().decode(&test_jpeg(400, 300)).unwrap();
        buffer.resize_to(200, 150).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (200, 150));

        buffer
            .crop_to(CropRect {
                x: 10,
                y: 20,
                width: 50,
                height: 40,
            })
            .unwrap();
        assert_eq!((buffer.width(), buffer.height()), (50, 40));
    }

    #[test]
    fn crop_outside_bounds_errors() {
        let mut buffer = RustBackend::new().decode(&test_jpeg(50, 50)).unwrap();
        let result = buffer.crop_to(CropRect {
            x: 10,
            y: 10,
            width: 100,
            height: 100,
        });
        assert!(result.is_err());
        assert_eq!((buffer.width(), buffer.height()), (50, 50));
    }

    #[test]
    fn crop_resize_fills_exact_size() {
        let mut buffer = RustBackend::new().decode(&test_jpeg(800, 600)).unwrap();
        buffer.crop_resize_to(400, 500).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (400, 500));
    }

    #[test]
    fn serialize_keeps_source_format() {
        let buffer = RustBackend::new().decode(&test_jpeg(64, 48)).unwrap();
        let bytes = buffer.serialize().unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        assert_eq!(extension_for(&bytes), "jpg");
    }

    #[test]
    fn serialize_honors_format_override() {
        let backend = RustBackend::with_settings(EncodeSettings {
            format: Some(ImageFormat::Png),
            ..EncodeSettings::default()
        });
        let buffer = backend.decode(&test_jpeg(64, 48)).unwrap();
        let bytes = buffer.serialize().unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        assert_eq!(image::load_from_memory(&bytes).unwrap().width(), 64);
    }

    #[test]
    fn alpha_png_to_jpeg_drops_alpha() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            16,
            16,
            image::Rgba([10, 20, 30, 128]),
        ));
        let backend = RustBackend::with_settings(EncodeSettings {
            format: Some(ImageFormat::Jpeg),
            ..EncodeSettings::default()
        });
        let bytes = backend.decode(&test_png(rgba)).unwrap().serialize().unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn lower_quality_produces_smaller_jpeg() {
        let source = test_jpeg(256, 256);
        let encode = |q| {
            RustBackend::with_settings(EncodeSettings {
                quality: Quality::new(q),
                ..EncodeSettings::default()
            })
            .decode(&source)
            .unwrap()
            .serialize()
            .unwrap()
            .len()
        };
        assert!(encode(10) < encode(95));
    }

    #[test]
    fn attaching_srgb_retags_buffer() {
        let mut buffer = RustBackend::new().decode(&test_jpeg(8, 8)).unwrap();
        buffer.attach_profile(ColorProfile::Srgb).unwrap();
        assert_eq!(buffer.colorspace(), Colorspace::Srgb);
        assert_eq!(buffer.profiles(), &[ColorProfile::Srgb]);
    }

    fn embedded_icc(bytes: &[u8]) -> Option<Vec<u8>> {
        use image::ImageDecoder;
        match image::guess_format(bytes).unwrap() {
            ImageFormat::Png => image::codecs::png::PngDecoder::new(Cursor::new(bytes))
                .unwrap()
                .icc_profile()
                .unwrap(),
            ImageFormat::Jpeg => image::codecs::jpeg::JpegDecoder::new(Cursor::new(bytes))
                .unwrap()
                .icc_profile()
                .unwrap(),
            other => panic!("unexpected format {other:?}"),
        }
    }

    #[test]
    fn srgb_profile_is_embedded_in_output() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, image::Rgb([200, 40, 10])));
        for source in [test_png(rgb), test_jpeg(16, 8)] {
            let plain = RustBackend::new().decode(&source).unwrap();
            let mut converted = plain.clone();
            converted.attach_profile(ColorProfile::GenericCmyk).unwrap();
            converted.attach_profile(ColorProfile::Srgb).unwrap();

            assert_eq!(embedded_icc(&plain.serialize().unwrap()), None);

            let icc = embedded_icc(&converted.serialize().unwrap())
                .expect("sRGB profile embedded in output");
            assert_eq!(icc, srgb_icc_profile().unwrap());
            assert!(moxcms::ColorProfile::new_from_slice(&icc).is_ok());
        }
    }

    #[test]
    fn tiff_output_without_icc_support_still_encodes() {
        let settings = EncodeSettings {
            format: Some(ImageFormat::Tiff),
            ..EncodeSettings::default()
        };
        let mut buffer = RustBackend::with_settings(settings)
            .decode(&test_jpeg(12, 12))
            .unwrap();
        buffer.attach_profile(ColorProfile::Srgb).unwrap();
        let bytes = buffer.serialize().unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Tiff);
    }

    #[test]
    fn from_config_maps_settings() {
        let mut config = ProcessorConfig::default();
        config.encoding.quality = 70;
        config.encoding.format = Some(OutputFormat::Webp);
        config.resize.filter = ResizeFilter::Nearest;

        let settings = RustBackend::from_config(&config).settings();
        assert_eq!(settings.quality, Quality::new(70));
        assert_eq!(settings.format, Some(ImageFormat::WebP));
        assert_eq!(settings.filter, FilterType::Nearest);
    }

    #[test]
    fn extension_for_unknown_bytes() {
        assert_eq!(extension_for(b"????"), "bin");
    }
}
