// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// The three coarse failures a remote call can surface to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Analyze,
    Regenerate,
    Adapt,
}

impl OperationKind {
    pub fn user_message(&self) -> &'static str {
        match self {
            OperationKind::Analyze => "Failed to analyze image. Please try again.",
            OperationKind::Regenerate => "Failed to regenerate prompts.",
            OperationKind::Adapt => "Failed to adapt prompt with new image.",
        }
    }
}

#[derive(Error, Debug)]
pub enum ArchitectError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("No response from AI")]
    NoResponse,

    #[error("Failed to parse model output: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("{}", .0.user_message())]
    Failed(OperationKind),
}

impl From<serde_json::Error> for ArchitectError {
    fn from(e: serde_json::Error) -> Self {
        ArchitectError::Serialization(e.to_string())
    }
}

impl ResponseError for ArchitectError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ArchitectError::Configuration(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Configuration error",
                    "message": self.to_string()
                }))
            }
            ArchitectError::Remote(_)
            | ArchitectError::NoResponse
            | ArchitectError::Parse(_)
            | ArchitectError::Failed(_) => {
                HttpResponse::ServiceUnavailable().json(serde_json::json!({
                    "error": "AI service error",
                    "message": self.to_string()
                }))
            }
            ArchitectError::Serialization(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Data processing error",
                    "message": self.to_string()
                }))
            }
            ArchitectError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation error",
                "message": self.to_string()
            })),
            ArchitectError::ImageProcessing(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "Image processing error",
                    "message": self.to_string()
                }))
            }
        }
    }
}
