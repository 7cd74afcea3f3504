// lib.rs - SAL scanner shared core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod batch;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod gateway;
pub mod image_processing;
pub mod mode;
pub mod model;
pub mod scan;
pub mod session;
pub mod submit;
pub mod view;

use serde::{Deserialize, Serialize};

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::AppConfig;
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::Model;
pub use view::ViewModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Remote,
    Network,
    Malformed,
    CameraUnavailable,
    ImageProcessing,
    Storage,
    InvalidState,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Remote => "REMOTE_ERROR",
            Self::Network => "NETWORK_ERROR",
            Self::Malformed => "MALFORMED_RESPONSE",
            Self::CameraUnavailable => "CAMERA_UNAVAILABLE",
            Self::ImageProcessing => "IMAGE_PROCESSING_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::InvalidState => "INVALID_STATE",
        }
    }

    /// Whether the failure came back from the remote side rather than from a
    /// local precondition.
    #[must_use]
    pub const fn is_remote(self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::Remote | Self::Network | Self::Malformed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Remote => {
                self.message.clone()
            }
            ErrorKind::Network | ErrorKind::Malformed => {
                format!("Network error: {}", self.message)
            }
            ErrorKind::CameraUnavailable => {
                "Camera access denied. Use manual entry below.".into()
            }
            ErrorKind::ImageProcessing => {
                format!("Unable to process the photo: {}", self.message)
            }
            ErrorKind::Storage => "Unable to remember names on this device.".into(),
            ErrorKind::InvalidState => self.message.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<gateway::GatewayError> for AppError {
    fn from(e: gateway::GatewayError) -> Self {
        use gateway::GatewayError;
        let kind = match &e {
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::Remote(_) => ErrorKind::Remote,
            GatewayError::Network(_) => ErrorKind::Network,
            GatewayError::Malformed(_) => ErrorKind::Malformed,
        };
        AppError::new(kind, e.detail())
    }
}

impl From<submit::SubmitError> for AppError {
    fn from(e: submit::SubmitError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<scan::ScanError> for AppError {
    fn from(e: scan::ScanError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<image_processing::ImageProcessingError> for AppError {
    fn from(e: image_processing::ImageProcessingError) -> Self {
        use image_processing::ImageProcessingError;
        match e {
            ImageProcessingError::LimitReached { .. } => {
                AppError::new(ErrorKind::Validation, e.to_string())
            }
            other => AppError::new(ErrorKind::ImageProcessing, other.to_string()),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::new(ErrorKind::InvalidState, e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
