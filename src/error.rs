//! Error types for vod-core
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for vod-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend command failure, carrying the backend's result code
    #[error("Backend error (code {0})")]
    Backend(i32),

    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(String),

    /// Frame queue errors
    #[error("Queue error: {0}")]
    Queue(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using the vod-core Error
pub type Result<T> = std::result::Result<T, Error>;
