use serde::Serialize;
use shared::{domain::Algorithm, error::ErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid file type. Please upload a JPEG or PNG image.")]
    UnsupportedType { mime_type: String },
    #[error("File size too large. Please upload an image smaller than 10MB.")]
    TooLarge { size_bytes: usize, max_bytes: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessingError {
    #[error("failed to reach processing service: {0}")]
    Transport(String),
    #[error("{detail}")]
    Rejected {
        status: u16,
        kind: Option<ErrorKind>,
        detail: String,
    },
    #[error("invalid processing response: {0}")]
    Decode(String),
    #[error("processing service is unavailable")]
    Unavailable,
}

/// The single error slot surfaced through the explorer view state.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExplorerError {
    #[error("{message}")]
    InvalidInput { message: String },
    #[error("{message}")]
    Processing {
        algorithm: Algorithm,
        message: String,
    },
}

impl ExplorerError {
    pub fn message(&self) -> &str {
        match self {
            ExplorerError::InvalidInput { message } | ExplorerError::Processing { message, .. } => {
                message
            }
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, ExplorerError::Processing { .. })
    }
}

impl From<ValidationError> for ExplorerError {
    fn from(value: ValidationError) -> Self {
        ExplorerError::InvalidInput {
            message: value.to_string(),
        }
    }
}
