//! Error types and exit-code constants for sharpen.
//!
//! This module provides a unified error type (`SharpenError`) that bridges
//! failures from different subsystems (argument validation, parsing,
//! write-back) into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Parse errors (a discovered source file does not lex or parse)
//! - `4`: Apply errors (failed to read or write a source file)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! ## Design
//!
//! - **Unified type**: `SharpenError` is the single error type for CLI output
//! - **Code mapping**: `OutputErrorCode` provides stable integer codes

use std::fmt;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, missing path).
    InvalidArguments = 2,
    /// A discovered source file failed to lex or parse.
    ParseError = 3,
    /// Failed to read a source file or write a rewritten one back.
    ApplyError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
///
/// This is the canonical error type that all subsystem errors are converted
/// to before being rendered as JSON output. Each variant carries enough
/// context to produce a helpful message.
#[derive(Debug, Error)]
pub enum SharpenError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The input path does not exist.
    #[error("path not found: {path}")]
    PathNotFound { path: String },

    /// A source file failed to parse.
    #[error("parse error in {file} at {line}:{col}: {message}")]
    ParseError {
        file: String,
        line: u32,
        col: u32,
        message: String,
    },

    /// Failed to read or write a source file.
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl SharpenError {
    /// Create an `InvalidArguments` error without structured details.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create an `InternalError`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Map this error to its stable output code.
    pub fn error_code(&self) -> OutputErrorCode {
        match self {
            Self::InvalidArguments { .. } | Self::PathNotFound { .. } => {
                OutputErrorCode::InvalidArguments
            }
            Self::ParseError { .. } => OutputErrorCode::ParseError,
            Self::Io { .. } => OutputErrorCode::ApplyError,
            Self::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }

    /// Stable machine-readable name for JSON output.
    pub fn error_name(&self) -> &'static str {
        match self {
            Self::InvalidArguments { .. } => "InvalidArguments",
            Self::PathNotFound { .. } => "PathNotFound",
            Self::ParseError { .. } => "ParseError",
            Self::Io { .. } => "IoError",
            Self::InternalError { .. } => "InternalError",
        }
    }
}

/// Convenience alias for results carrying a [`SharpenError`].
pub type Result<T> = std::result::Result<T, SharpenError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(OutputErrorCode::InvalidArguments.code(), 2);
        assert_eq!(OutputErrorCode::ParseError.code(), 3);
        assert_eq!(OutputErrorCode::ApplyError.code(), 4);
        assert_eq!(OutputErrorCode::InternalError.code(), 10);
    }

    #[test]
    fn path_not_found_maps_to_invalid_arguments() {
        let err = SharpenError::PathNotFound {
            path: "missing".to_string(),
        };
        assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
        assert_eq!(err.error_name(), "PathNotFound");
    }

    #[test]
    fn parse_error_display_includes_location() {
        let err = SharpenError::ParseError {
            file: "a.cs".to_string(),
            line: 3,
            col: 7,
            message: "expected ';'".to_string(),
        };
        assert_eq!(err.to_string(), "parse error in a.cs at 3:7: expected ';'");
    }
}
