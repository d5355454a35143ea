//! `data:` URL helpers for image payloads carried in form state.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;

use crate::{Error, Result};

/// Encode `bytes` as a base64 `data:` URL.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// True when `payload` is an inline `data:` URL rather than a remote reference.
pub fn is_data_url(payload: &str) -> bool {
    payload
        .get(..5)
        .map_or(false, |scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Decode the bytes of a base64 `data:` URL.
pub fn decode(payload: &str) -> Result<Vec<u8>> {
    if !is_data_url(payload) {
        return Err(Error::CaptureError("not a data: URL".into()));
    }
    let (meta, body) = payload[5..]
        .split_once(',')
        .ok_or_else(|| Error::CaptureError("data: URL has no payload".into()))?;
    if !meta.ends_with(";base64") {
        return Err(Error::CaptureError(format!("unsupported data: URL encoding '{}'", meta)));
    }
    STANDARD
        .decode(body.trim())
        .map_err(|e| Error::CaptureError(format!("invalid base64 image data: {}", e)))
}

/// Mime type of a photo the rasterizer can decode, sniffed from its leading bytes.
///
/// PNG, JPEG, GIF and WebP are accepted; anything else is `UnsupportedImage`.
pub fn image_mime(bytes: &[u8]) -> Result<&'static str> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Ok("image/png"),
        Ok(ImageFormat::Jpeg) => Ok("image/jpeg"),
        Ok(ImageFormat::Gif) => Ok("image/gif"),
        Ok(ImageFormat::WebP) => Ok("image/webp"),
        Ok(other) => Err(Error::UnsupportedImage(format!("{:?} photos are not supported", other))),
        Err(_) => Err(Error::UnsupportedImage("data is not a recognised image".into())),
    }
}
