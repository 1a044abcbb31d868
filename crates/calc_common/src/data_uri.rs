//! Data-URI decoding for canvas snapshots.
//!
//! The client posts `canvas.toDataURL()` output. We strip the header, decode
//! the base64 payload, open the bytes as an image and re-encode them as PNG,
//! which is the only format sent upstream.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use image::ImageFormat;
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

/// MIME type of every image handed to the model
pub const UPLOAD_MIME: &str = "image/png";

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum DataUriError {
    #[error("data-URI has no ',' separating header and payload")]
    MissingSeparator,

    #[error("image payload is empty")]
    EmptyPayload,

    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a readable image: {0}")]
    Image(#[from] image::ImageError),
}

/// Image ready for upload
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Media type declared in the data-URI header, if any
    pub declared_mime: Option<String>,
    pub width: u32,
    pub height: u32,
    /// PNG-encoded bytes
    pub png: Vec<u8>,
}

impl DecodedImage {
    pub fn mime_type(&self) -> &'static str {
        UPLOAD_MIME
    }
}

/// Split a data-URI into (declared mime, base64 payload).
///
/// A string without a comma is accepted as bare base64 unless it starts with
/// `data:`, in which case the payload is missing.
pub fn split_data_uri(raw: &str) -> Result<(Option<String>, &str), DataUriError> {
    let trimmed = raw.trim();
    match trimmed.split_once(',') {
        Some((header, payload)) => {
            let mime = header
                .trim()
                .strip_prefix("data:")
                .map(|rest| rest.split(';').next().unwrap_or("").trim().to_string())
                .filter(|m| !m.is_empty());
            Ok((mime, payload))
        }
        None if trimmed.starts_with("data:") => Err(DataUriError::MissingSeparator),
        None => Ok((None, trimmed)),
    }
}

/// Decode base64 text, ignoring embedded whitespace and missing padding.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, DataUriError> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(DataUriError::EmptyPayload);
    }

    match STANDARD_LENIENT.decode(compact.as_bytes()) {
        Ok(bytes) => Ok(bytes),
        Err(standard_err) => URL_SAFE_LENIENT
            .decode(compact.as_bytes())
            .map_err(|_| DataUriError::Base64(standard_err)),
    }
}

/// Full pipeline: data-URI text to a PNG ready for the model.
///
/// CPU-bound; async callers should run it on the blocking pool.
pub fn decode_data_uri(raw: &str) -> Result<DecodedImage, DataUriError> {
    let (declared_mime, payload) = split_data_uri(raw)?;
    let bytes = decode_base64(payload)?;

    let img = image::load_from_memory(&bytes)?;
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    debug!(
        "Decoded {}x{} image ({} bytes in, {} bytes png, declared {:?})",
        img.width(),
        img.height(),
        bytes.len(),
        png.len(),
        declared_mime
    );

    Ok(DecodedImage {
        declared_mime,
        width: img.width(),
        height: img.height(),
        png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use image::{Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    #[test]
    fn test_split_header_and_payload() {
        let (mime, payload) = split_data_uri("data:image/png;base64,QUJD").unwrap();
        assert_eq!(mime.as_deref(), Some("image/png"));
        assert_eq!(payload, "QUJD");
    }

    #[test]
    fn test_split_bare_payload() {
        let (mime, payload) = split_data_uri("  QUJD ").unwrap();
        assert!(mime.is_none());
        assert_eq!(payload, "QUJD");
    }

    #[test]
    fn test_split_data_prefix_without_comma() {
        assert!(matches!(
            split_data_uri("data:image/png;base64"),
            Err(DataUriError::MissingSeparator)
        ));
    }

    #[test]
    fn test_decode_base64_tolerates_whitespace_and_padding() {
        assert_eq!(decode_base64("QU\nJD\tRA").unwrap(), b"ABCD");
        assert_eq!(decode_base64("QUJDRA==").unwrap(), b"ABCD");
    }

    #[test]
    fn test_decode_base64_url_safe() {
        // 0xfb 0xff encodes to "-_8" in the URL-safe alphabet
        assert_eq!(decode_base64("-_8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_decode_base64_rejects_garbage() {
        assert!(matches!(decode_base64("@@@!!"), Err(DataUriError::Base64(_))));
        assert!(matches!(decode_base64("   "), Err(DataUriError::EmptyPayload)));
    }

    #[test]
    fn test_decode_data_uri_png() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(4, 3)));
        let decoded = decode_data_uri(&uri).unwrap();
        assert_eq!((decoded.width, decoded.height), (4, 3));
        assert_eq!(decoded.declared_mime.as_deref(), Some("image/png"));
        assert_eq!(decoded.mime_type(), "image/png");
        assert!(decoded.png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn test_decode_data_uri_not_an_image() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(b"hello world"));
        assert!(matches!(decode_data_uri(&uri), Err(DataUriError::Image(_))));
    }

    #[test]
    fn test_decode_data_uri_empty_payload() {
        assert!(matches!(
            decode_data_uri("data:image/png;base64,"),
            Err(DataUriError::EmptyPayload)
        ));
    }
}
