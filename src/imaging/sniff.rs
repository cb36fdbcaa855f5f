//! Colorspace detection from the encoded byte stream.
//!
//! Decoders convert CMYK to RGB while decoding, so the decoded pixel type
//! cannot tell a CMYK source from an RGB one. These readers look at the
//! container headers instead:
//!
//! - JPEG: component count of the first SOF frame header (1 = gray, 3 = YCbCr/RGB, 4 = CMYK/YCCK).
//! - TIFF: PhotometricInterpretation (tag 262) of the first IFD.
//!
//! Anything unrecognized returns `None` and the caller falls back to the
//! decoded color type.

use super::params::Colorspace;
use image::ImageFormat;

/// Detect the stored colorspace of an encoded image, if the format records one.
pub fn sniff_colorspace(bytes: &[u8], format: ImageFormat) -> Option<Colorspace> {
    match format {
        ImageFormat::Jpeg => jpeg_colorspace(bytes),
        ImageFormat::Tiff => tiff_colorspace(bytes),
        _ => None,
    }
}

fn is_sof(marker: u8) -> bool {
    // C4 (DHT), C8 (JPG extension) and CC (DAC) share the range but are not frames
    (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn jpeg_colorspace(data: &[u8]) -> Option<Colorspace> {
    let mut pos = 0;
    while pos + 4 < data.len() {
        if data[pos] != 0xFF || data[pos + 1] == 0x00 || data[pos + 1] == 0xFF {
            pos += 1;
            continue;
        }

        let marker = data[pos + 1];
        // SOS (0xDA) means entropy-coded data starts, so no frame header found
        if marker == 0xDA {
            return None;
        }
        // Markers without length field
        if marker == 0xD8 || marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }

        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if is_sof(marker) {
            // FF Cn | length (2) | precision (1) | height (2) | width (2) | components (1)
            let components = *data.get(pos + 9)?;
            return match components {
                1 => Some(Colorspace::Gray),
                3 => Some(Colorspace::Rgb),
                4 => Some(Colorspace::Cmyk),
                _ => None,
            };
        }
        pos += 2 + len;
    }
    None
}

fn tiff_colorspace(data: &[u8]) -> Option<Colorspace> {
    if data.len() < 8 {
        return None;
    }

    let big_endian = match &data[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => return None,
    };

    let read_u16 = |offset: usize| -> Option<u16> {
        let bytes = [*data.get(offset)?, *data.get(offset + 1)?];
        Some(if big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    };

    let read_u32 = |offset: usize| -> Option<u32> {
        let bytes = [
            *data.get(offset)?,
            *data.get(offset + 1)?,
            *data.get(offset + 2)?,
            *data.get(offset + 3)?,
        ];
        Some(if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    };

    if read_u16(2)? != 42 {
        return None;
    }

    let ifd_offset = read_u32(4)? as usize;
    let entry_count = read_u16(ifd_offset)? as usize;

    for i in 0..entry_count {
        let entry = ifd_offset + 2 + i * 12;
        if read_u16(entry)? != 262 {
            continue;
        }
        // SHORT values are stored left-justified in the 4-byte value field
        return match read_u16(entry + 8)? {
            0 | 1 => Some(Colorspace::Gray),
            2 | 3 | 6 => Some(Colorspace::Rgb),
            5 => Some(Colorspace::Cmyk),
            8..=10 => Some(Colorspace::Lab),
            _ => None,
        };
    }
    None
}
