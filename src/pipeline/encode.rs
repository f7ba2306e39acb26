//! Image encoding for the model request.
//!
//! The model API takes images inline as base64 data URIs. Everything the
//! render stage produces is re-encoded to PNG first so the pipeline only ever
//! ships one format, whatever the service rendered.

use crate::error::CrossCheckError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::DynamicImage;
use std::io::Cursor;

/// A base64-encoded image ready for the model request.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Base64 of the PNG bytes.
    pub data: String,
    /// Always `image/png` after [`encode_png`].
    pub media_type: &'static str,
}

impl EncodedImage {
    /// Render as an inline `data:` URI for the chat payload.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// PNG-encode and base64 an image.
pub fn encode_png(image: &DynamicImage) -> Result<EncodedImage, CrossCheckError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| CrossCheckError::Raster {
            detail: format!("PNG encoding failed: {e}"),
        })?;

    Ok(EncodedImage {
        data: BASE64.encode(&bytes),
        media_type: "image/png",
    })
}
