//! Unified error handling for deviceprint
//!
//! This crate provides a single error type used across all deviceprint
//! components. It uses thiserror for ergonomic error definitions with proper
//! Display and Error trait impls.
//!
//! Note that most failure paths in the platform are deliberately *not*
//! expressed through this type: probe failures collapse to empty readings and
//! storage-backend failures collapse to "no value from this backend". The
//! variants below cover the places where an error is a real contract
//! violation (malformed configuration, an unusable store file) rather than an
//! expected degradation.

use std::io;
use std::path::PathBuf;

/// Result type alias using DeviceprintError
pub type Result<T> = std::result::Result<T, DeviceprintError>;

/// Unified error type for all deviceprint operations
#[derive(thiserror::Error, Debug)]
pub enum DeviceprintError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },

    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    // ============================================================================
    // Storage Backend Errors
    // ============================================================================
    #[error("Storage backend '{backend}' unavailable: {reason}")]
    BackendUnavailable {
        backend: String,
        reason: String,
    },

    #[error("Storage backend '{backend}' write failed: {reason}")]
    BackendWrite {
        backend: String,
        reason: String,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },
}

impl DeviceprintError {
    /// Helper constructor for backend write failures
    pub fn backend_write(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BackendWrite {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Helper constructor for unavailable backends
    pub fn backend_unavailable(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        let err = DeviceprintError::backend_write("cookie", "quota exceeded");
        assert_eq!(
            err.to_string(),
            "Storage backend 'cookie' write failed: quota exceeded"
        );

        let err = DeviceprintError::Config("missing layer table".to_string());
        assert!(err.to_string().contains("missing layer table"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: DeviceprintError = parse_err.into();
        assert!(matches!(err, DeviceprintError::JsonParse(_)));
    }
}
