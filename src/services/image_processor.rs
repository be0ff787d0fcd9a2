// src/services/image_processor.rs
use crate::errors::ArchitectError;
use crate::models::ImageInput;
use base64::{Engine as _, engine::general_purpose};
use image::ImageFormat as ImgFormat;

const GENERIC_MEDIA_TYPE: &str = "application/octet-stream";

/// Image payload in the shape the generation service expects for inline data.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: String,
}

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Base64-encodes the image for transport. Inputs that already carry a
    /// `data:` URI (text uploads) are passed through with the prefix removed.
    pub fn encode(&self, image: &ImageInput) -> Result<EncodedImage, ArchitectError> {
        if image.data.is_empty() {
            return Err(ArchitectError::ImageProcessing("Image is empty".to_string()));
        }

        let (declared, data) = match std::str::from_utf8(&image.data) {
            Ok(text) if text.trim_start().starts_with("data:") => {
                let (header, payload) = split_data_uri(text.trim())?;
                (header.or_else(|| Some(image.media_type.clone())), payload.to_string())
            }
            _ => (
                Some(image.media_type.clone()),
                general_purpose::STANDARD.encode(&image.data),
            ),
        };

        let mime_type = match declared {
            Some(mime) if is_specific(&mime) => mime,
            _ => self.detect_media_type(&image.data),
        };

        Ok(EncodedImage { mime_type, data })
    }

    /// Falls back to magic-byte sniffing. Unknown formats are left for the remote side to reject.
    pub fn detect_media_type(&self, data: &[u8]) -> String {
        match image::guess_format(data) {
            Ok(format) => mime_for(format).to_string(),
            Err(_) => GENERIC_MEDIA_TYPE.to_string(),
        }
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the media type named in the header (if any) and the base64 payload after the comma.
pub fn split_data_uri(uri: &str) -> Result<(Option<String>, &str), ArchitectError> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| ArchitectError::ImageProcessing("Malformed data URI".to_string()))?;

    let media_type = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .filter(|m| !m.is_empty())
        .map(|m| m.to_string());

    Ok((media_type, payload))
}

fn is_specific(mime: &str) -> bool {
    !mime.trim().is_empty() && mime != GENERIC_MEDIA_TYPE
}

fn mime_for(format: ImgFormat) -> &'static str {
    match format {
        ImgFormat::Png => "image/png",
        ImgFormat::Jpeg => "image/jpeg",
        ImgFormat::Gif => "image/gif",
        ImgFormat::WebP => "image/webp",
        ImgFormat::Bmp => "image/bmp",
        ImgFormat::Tiff => "image/tiff",
        ImgFormat::Avif => "image/avif",
        ImgFormat::Ico => "image/x-icon",
        _ => GENERIC_MEDIA_TYPE,
    }
}
