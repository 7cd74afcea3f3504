use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{ApiEndpoint, EndpointError, DEFAULT_API_URL};

pub const DEFAULT_PHOTO_MAX_DIMENSION: u32 = 1200;
pub const DEFAULT_JPEG_QUALITY: u8 = 70;
pub const DEFAULT_MAX_INPUT_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_MAX_PHOTOS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(String),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("jpeg quality must be within 1..=100, got {0}")]
    JpegQuality(u8),
    #[error("photo max dimension must be non-zero")]
    ZeroDimension,
    #[error("at least one photo per form must be allowed")]
    ZeroPhotos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// Longest edge, in pixels, of an uploaded photo.
    pub max_dimension: u32,
    pub jpeg_quality: u8,
    pub max_input_bytes: usize,
    pub max_photos: usize,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_PHOTO_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_photos: DEFAULT_MAX_PHOTOS,
        }
    }
}

impl PhotoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dimension == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::JpegQuality(self.jpeg_quality));
        }
        if self.max_photos == 0 {
            return Err(ConfigError::ZeroPhotos);
        }
        Ok(())
    }
}

/// Runtime configuration supplied by the shell at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_url: String,
    pub photo: PhotoConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            photo: PhotoConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validates the whole configuration and returns the endpoint it points at.
    pub fn endpoint(&self) -> Result<ApiEndpoint, ConfigError> {
        self.photo.validate()?;
        Ok(ApiEndpoint::new(&self.api_url)?)
    }
}
