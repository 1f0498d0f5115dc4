//! Local image file to embeddable `data:` URL conversion.
//!
//! Image fields on every entity store the picture inline as a data URL, so
//! there is no separate upload step. The size limit is enforced from file
//! metadata before any bytes are read.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::ImageFormat;

/// Conventional upper bound for an attached image (5 MiB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Errors from reading or encoding an image file.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The file is larger than the configured limit.
    #[error("Image is {size} bytes, larger than the {limit} byte limit")]
    Oversize { size: u64, limit: u64 },

    /// The bytes are not a PNG, JPEG or WebP image.
    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Could not read image file: {0}")]
    Io(#[from] std::io::Error),
}

/// Reject a file by its size alone.
pub fn check_image_size(size: u64, limit: u64) -> Result<(), ImageError> {
    if size > limit {
        Err(ImageError::Oversize { size, limit })
    } else {
        Ok(())
    }
}

/// Sniff the image format from its magic bytes and return the MIME type.
pub fn sniff_mime_type(bytes: &[u8]) -> Result<&'static str, ImageError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Ok("image/png"),
        Ok(ImageFormat::Jpeg) => Ok("image/jpeg"),
        Ok(ImageFormat::WebP) => Ok("image/webp"),
        _ => Err(ImageError::UnsupportedFormat),
    }
}

/// Encode raw image bytes as a base64 `data:` URL.
pub fn encode_data_url(bytes: &[u8]) -> Result<String, ImageError> {
    let mime = sniff_mime_type(bytes)?;
    Ok(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
}

/// `true` if `value` looks like an inline image produced by [`encode_data_url`].
pub fn is_image_data_url(value: &str) -> bool {
    value.starts_with("data:image/") && value.contains(";base64,")
}

/// Read a user-selected file into a data URL.
///
/// The size check runs against file metadata first, so an oversize file is
/// rejected without reading its contents.
pub async fn read_image_file(path: &Path, limit: u64) -> Result<String, ImageError> {
    let metadata = tokio::fs::metadata(path).await?;
    check_image_size(metadata.len(), limit)?;

    let bytes = tokio::fs::read(path).await?;
    // The file may have grown between the metadata call and the read.
    check_image_size(bytes.len() as u64, limit)?;
    encode_data_url(&bytes)
}
