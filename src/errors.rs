use actix_web::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid run mode: {value}")]
    InvalidRunMode { value: String },

    #[error("Invalid shutdown timeout: {value}")]
    InvalidShutdownTimeout { value: String },
}

/// Failures reported by a printer device while a session talks to it.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Printer device not found: {path}")]
    NotFound { path: String },

    #[error("Printer device busy: {0}")]
    Busy(String),

    #[error("Printer device not open")]
    NotOpen,

    #[error("{0}")]
    Open(String),

    #[error("{0}")]
    Write(String),

    #[error("{0}")]
    Close(String),
}

/// Request shapes the transport refuses before anything is rendered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid request: items array is required and must not be empty")]
    MissingItems,

    #[error("Invalid request: total is required")]
    MissingTotal,

    #[error("Invalid request: {0}")]
    Malformed(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_response(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "error_type": self.error_type()
        })
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::Validation(_) => "validation_error",
        }
    }
}
