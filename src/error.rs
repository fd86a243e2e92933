// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request to the WebDriver endpoint failed
    #[cfg(feature = "webdriver")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The render surface rejected or failed an operation
    #[error("Render surface error during {operation}: {message}")]
    Surface { operation: String, message: String },

    /// A bounded readiness wait ran out
    #[error("Timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },

    /// Durable store write/read failed in a way that must stop the run
    #[error("Persistence error for {context}: {message}")]
    Persistence { context: String, message: String },

    /// Job state machine refused a transition
    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a render surface error with the failing operation.
    pub fn surface(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Surface {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(what: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            secs,
        }
    }

    /// Create a persistence error with context.
    pub fn persistence(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Persistence {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
