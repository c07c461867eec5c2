//! Error types for acforge operations.
//!
//! This module defines [`ForgeError`], the primary error type used throughout
//! the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Fatal errors (`TemplateResolution`, `StateCorruption`) abort a run before
//!   any target file is modified
//! - Per-asset errors (`ParameterMissing`, `Substitution`) are captured into
//!   the deployment record for that asset and the run continues
//! - Use `anyhow::Error` (via `ForgeError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for acforge operations.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// No readable template set could be located.
    #[error("Template resolution failed: {message}")]
    TemplateResolution { message: String },

    /// A placeholder references a parameter with no resolved value.
    #[error("{}", format_missing(path, key, *line))]
    ParameterMissing {
        path: String,
        key: String,
        line: usize,
    },

    /// A placeholder is malformed.
    #[error("Malformed placeholder in {path} at line {line}: {message}")]
    Substitution {
        path: String,
        line: usize,
        message: String,
    },

    /// A target file needs human resolution.
    #[error("{path} needs manual resolution: {reason}")]
    MergeConflict { path: String, reason: String },

    /// The persisted state file exists but cannot be read.
    #[error(
        "State file {path} is corrupt: {message}. Fix or remove it manually before retrying"
    )]
    StateCorruption { path: PathBuf, message: String },

    /// A git subprocess failed or timed out.
    #[error(
        "git {command} failed (exit code {}): {stderr}",
        code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string())
    )]
    GitOperation {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_missing(path: &str, key: &str, line: usize) -> String {
    if path.is_empty() {
        format!("Missing parameter '{}'", key)
    } else {
        format!("Missing parameter '{}' in {} at line {}", key, path, line)
    }
}

impl ForgeError {
    /// Whether this error aborts the whole run rather than a single asset.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::TemplateResolution { .. } | Self::StateCorruption { .. }
        )
    }
}

/// Result type alias for acforge operations.
pub type Result<T> = std::result::Result<T, ForgeError>;
