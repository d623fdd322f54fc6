//! Validation of inbound base64 image payloads.

use std::borrow::Cow;

use base64::Engine as _;
use thiserror::Error;

const DATA_IMAGE_PREFIX: &str = "data:image";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    /// A `data:image…` URI that is not exactly `<header>,<payload>`.
    #[error("Invalid image format")]
    InvalidFormat,

    #[error("Invalid base64 image")]
    InvalidBase64,
}

/// Strip an optional `data:image/...;base64,` header and check that what
/// remains is standard padded base64. Line breaks (`\r`, `\n`) inside the
/// payload are ignored, so MIME-wrapped encodings are accepted.
///
/// Returns the still-encoded payload; the decoded bytes are discarded and
/// never checked for being an actual image.
pub fn extract_base64_payload(encoded: &str) -> Result<&str, ImageError> {
    let payload = if encoded.starts_with(DATA_IMAGE_PREFIX) {
        let mut parts = encoded.split(',');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), None) => payload,
            _ => return Err(ImageError::InvalidFormat),
        }
    } else {
        encoded
    };

    base64::engine::general_purpose::STANDARD
        .decode(without_line_breaks(payload).as_bytes())
        .map_err(|_| ImageError::InvalidBase64)?;
    Ok(payload)
}

fn without_line_breaks(payload: &str) -> Cow<'_, str> {
    if payload.contains(['\r', '\n']) {
        Cow::Owned(payload.chars().filter(|c| !matches!(c, '\r' | '\n')).collect())
    } else {
        Cow::Borrowed(payload)
    }
}

/// Inline `payload` as a JPEG `data:` URI for the completion API.
pub fn jpeg_data_uri(payload: &str) -> String {
    format!("data:image/jpeg;base64,{payload}")
}
