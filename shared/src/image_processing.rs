use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageReader, Limits};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::PhotoConfig;
use crate::model::FormNumber;

/// Camera sensors rarely exceed this; anything larger is refused before
/// allocation.
const MAX_SOURCE_DIMENSION: u32 = 16_384;
const MAX_ALLOC_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageProcessingError {
    #[error("input bytes empty")]
    EmptyInput,

    #[error("input too large: {size} bytes, max {max_size}")]
    InputTooLarge { size: usize, max_size: usize },

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("jpeg encoding failed: width={width}, height={height}, reason={reason}")]
    Encode {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("Maximum of {max} photos per form")]
    LimitReached { max: usize },
}

/// A downsized photo ready for upload, held as a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedPhoto {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
    /// Size of the JPEG before base64 encoding.
    pub byte_len: usize,
}

/// Decodes a captured photo, shrinks its longest edge to the configured
/// maximum and re-encodes it as JPEG. Smaller photos keep their size.
#[instrument(skip(raw, config), fields(input_size = raw.len()))]
pub fn downsize(raw: &[u8], config: &PhotoConfig) -> Result<EncodedPhoto, ImageProcessingError> {
    let img = decode_image(config, raw)?;
    let (w, h) = img.dimensions();

    let img = if w.max(h) > config.max_dimension {
        img.resize(config.max_dimension, config.max_dimension, FilterType::Triangle)
    } else {
        img
    };

    let jpeg = encode_jpeg(&img, config.jpeg_quality)?;
    let (width, height) = img.dimensions();
    debug!(width, height, output_size = jpeg.len(), "photo downsized");

    Ok(EncodedPhoto {
        data_url: format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg)),
        width,
        height,
        byte_len: jpeg.len(),
    })
}

fn decode_image(config: &PhotoConfig, raw_bytes: &[u8]) -> Result<DynamicImage, ImageProcessingError> {
    if raw_bytes.is_empty() {
        return Err(ImageProcessingError::EmptyInput);
    }

    if raw_bytes.len() > config.max_input_bytes {
        return Err(ImageProcessingError::InputTooLarge {
            size: raw_bytes.len(),
            max_size: config.max_input_bytes,
        });
    }

    let mut reader = ImageReader::new(Cursor::new(raw_bytes))
        .with_guessed_format()
        .map_err(|e| ImageProcessingError::Decode(e.to_string()))?;

    if reader.format().is_none() {
        return Err(ImageProcessingError::UnsupportedFormat);
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);
    limits.max_alloc = Some(MAX_ALLOC_BYTES);
    reader.limits(limits);

    reader.decode().map_err(|e| {
        warn!(error = %e, "photo decode failed");
        ImageProcessingError::Decode(e.to_string())
    })
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageProcessingError> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    if width == 0 || height == 0 {
        return Err(ImageProcessingError::Encode {
            width,
            height,
            reason: "zero dimension".into(),
        });
    }

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| ImageProcessingError::Encode {
            width,
            height,
            reason: e.to_string(),
        })?;

    if buffer.len() < 2 || buffer[0..2] != [0xFF, 0xD8] {
        return Err(ImageProcessingError::Encode {
            width,
            height,
            reason: "missing jpeg start-of-image marker".into(),
        });
    }

    Ok(buffer)
}

/// Photos captured for one form, not yet uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingUpload {
    form_no: Option<FormNumber>,
    photos: Vec<EncodedPhoto>,
}

impl PendingUpload {
    /// Binds the upload to a form. Photos for a different form are dropped.
    pub fn attach(&mut self, form_no: FormNumber) {
        if self.form_no.as_ref() != Some(&form_no) {
            self.photos.clear();
        }
        self.form_no = Some(form_no);
    }

    #[must_use]
    pub fn form_no(&self) -> Option<&FormNumber> {
        self.form_no.as_ref()
    }

    #[must_use]
    pub fn photos(&self) -> &[EncodedPhoto] {
        &self.photos
    }

    pub fn push(&mut self, photo: EncodedPhoto, max: usize) -> Result<(), ImageProcessingError> {
        if self.photos.len() >= max {
            return Err(ImageProcessingError::LimitReached { max });
        }
        self.photos.push(photo);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<EncodedPhoto> {
        (index < self.photos.len()).then(|| self.photos.remove(index))
    }

    pub fn clear(&mut self) {
        self.form_no = None;
        self.photos.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ImageBuffer, Rgba};

    fn create_test_png(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        });
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
            .unwrap();
        buffer
    }

    fn photo(tag: &str) -> EncodedPhoto {
        EncodedPhoto {
            data_url: format!("data:image/jpeg;base64,{tag}"),
            width: 1,
            height: 1,
            byte_len: 1,
        }
    }

    #[test]
    fn downsize_caps_longest_edge() {
        let png = create_test_png(3000, 2000);
        let photo = downsize(&png, &PhotoConfig::default()).unwrap();
        assert_eq!((photo.width, photo.height), (1200, 800));
        assert!(photo.data_url.starts_with("data:image/jpeg;base64,"));

        let b64 = photo.data_url.trim_start_matches("data:image/jpeg;base64,");
        let jpeg = STANDARD.decode(b64).unwrap();
        assert_eq!(jpeg.len(), photo.byte_len);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (1200, 800));
    }

    #[test]
    fn small_photos_are_not_upscaled() {
        let png = create_test_png(200, 150);
        let photo = downsize(&png, &PhotoConfig::default()).unwrap();
        assert_eq!((photo.width, photo.height), (200, 150));
    }

    #[test]
    fn portrait_photos_cap_height() {
        let config = PhotoConfig {
            max_dimension: 100,
            ..PhotoConfig::default()
        };
        let photo = downsize(&create_test_png(150, 300), &config).unwrap();
        assert_eq!((photo.width, photo.height), (50, 100));
    }

    #[test]
    fn decode_rejects_empty() {
        assert_eq!(
            downsize(&[], &PhotoConfig::default()),
            Err(ImageProcessingError::EmptyInput)
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(downsize(&[0xFF, 0xFE, 0x00], &PhotoConfig::default()).is_err());
    }

    #[test]
    fn decode_rejects_oversized_input() {
        let config = PhotoConfig {
            max_input_bytes: 100,
            ..PhotoConfig::default()
        };
        let result = downsize(&[0u8; 101], &config);
        assert!(matches!(
            result,
            Err(ImageProcessingError::InputTooLarge { size: 101, .. })
        ));
    }

    #[test]
    fn pending_upload_enforces_limit() {
        let mut pending = PendingUpload::default();
        pending.attach(FormNumber::new("DF-0001"));
        pending.push(photo("a"), 2).unwrap();
        pending.push(photo("b"), 2).unwrap();
        assert_eq!(
            pending.push(photo("c"), 2),
            Err(ImageProcessingError::LimitReached { max: 2 })
        );
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn pending_upload_removes_by_index() {
        let mut pending = PendingUpload::default();
        pending.push(photo("a"), 5).unwrap();
        pending.push(photo("b"), 5).unwrap();
        assert_eq!(pending.remove(0), Some(photo("a")));
        assert_eq!(pending.remove(4), None);
        assert_eq!(pending.photos(), &[photo("b")]);
    }

    #[test]
    fn attaching_another_form_drops_photos() {
        let mut pending = PendingUpload::default();
        pending.attach(FormNumber::new("DF-0001"));
        pending.push(photo("a"), 5).unwrap();

        pending.attach(FormNumber::new("DF-0001"));
        assert_eq!(pending.len(), 1);

        pending.attach(FormNumber::new("RF-0002"));
        assert!(pending.is_empty());
        assert_eq!(pending.form_no(), Some(&FormNumber::new("RF-0002")));
    }
}
