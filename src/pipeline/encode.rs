//! Image loading: stored upload → base64 `ImageData` for the vision call,
//! plus the decodability check used by the report composer.
//!
//! Uploads are sent as they were received (no re-encoding) so the model sees
//! the photograph at full quality. The MIME type is sniffed from the file's
//! magic bytes; unknown formats are labelled `image/jpeg`, which is what
//! phone cameras produce in practice.

use crate::error::SmartMarksError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::ImageFormat;
use std::path::Path;
use tracing::debug;

/// Read an uploaded image and wrap it for the vision API.
pub async fn encode_image(path: &Path) -> Result<ImageData, SmartMarksError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SmartMarksError::ImageNotFound {
            path: path.to_path_buf(),
        },
        _ => SmartMarksError::ImageUnreadable {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    Ok(encode_bytes(&bytes))
}

/// Base64-encode raw image bytes with a sniffed MIME type.
pub fn encode_bytes(bytes: &[u8]) -> ImageData {
    let mime = sniff_mime(bytes);
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime, b64.len());

    ImageData::new(b64, mime).with_detail("high")
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        _ => "image/jpeg",
    }
}

/// Check that a file on disk fully decodes as an image.
///
/// Runs on the blocking pool because decoding a phone photo takes tens of
/// milliseconds of CPU.
pub async fn verify_image(path: &Path) -> Result<(), SmartMarksError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || verify_image_blocking(&owned))
        .await
        .map_err(|e| SmartMarksError::Internal(format!("Image check task panicked: {}", e)))?
}

fn verify_image_blocking(path: &Path) -> Result<(), SmartMarksError> {
    if !path.is_file() {
        return Err(SmartMarksError::ImageNotFound {
            path: path.to_path_buf(),
        });
    }
    let reader = image::ImageReader::open(path)
        .map_err(|e| SmartMarksError::ImageUnreadable {
            path: path.to_path_buf(),
            source: e,
        })?
        .with_guessed_format()
        .map_err(|e| SmartMarksError::ImageUnreadable {
            path: path.to_path_buf(),
            source: e,
        })?;

    reader
        .decode()
        .map(|_| ())
        .map_err(|e| SmartMarksError::InvalidImage {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
}
