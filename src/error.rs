//! Error types for schema conversion and provider document loading.

use std::path::PathBuf;
use thiserror::Error;

use crate::framework::Diagnostics;

/// Errors during conversion into the canonical schema.
///
/// Field-level variants carry the dotted path of the offending field
/// (e.g. `network.subnet.cidr`).
#[derive(Debug, Error)]
pub enum ConvertError {
    // Classification errors
    #[error("invalid element at {path}: {message}")]
    InvalidElement { path: String, message: String },

    #[error("invalid type {kind} at {path}")]
    InvalidType { path: String, kind: String },

    #[error("unrecognized nesting mode {mode} at {path}")]
    UnrecognizedNestingMode { path: String, mode: String },

    // Invariant violations
    #[error("{path}: must have Required, Optional, or Computed set")]
    MissingRequiredness { path: String },

    #[error("invalid schema, blocks and attributes cannot have the same name: {name}")]
    NameCollision { name: String },

    #[error("can't use a dynamic type inside a block type with set nesting: {name}")]
    DynamicInSet { name: String },

    #[error("invalid nesting mode {mode} for nested block {name}")]
    InvalidNesting { name: String, mode: String },

    // Value errors
    #[error("unexpected unknown value")]
    UnknownValue,

    #[error("unhandled type: {type_name}")]
    UnhandledValue { type_name: String },

    #[error("{path}: unhandled type for default value: {kind}")]
    UnhandledDefault { path: String, kind: String },

    #[error("{path}: default for {kind} attribute produced a {actual} value")]
    DefaultMismatch {
        path: String,
        kind: String,
        actual: String,
    },

    #[error("{path}: default value provider failed: {diagnostics}")]
    DefaultDiagnostics {
        path: String,
        diagnostics: Diagnostics,
    },

    #[error("{path}: lowering default value: {source}")]
    DefaultValue {
        path: String,
        #[source]
        source: Box<ConvertError>,
    },

    #[error("{path}: decoding attribute type: {source}")]
    TypeDecode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // Upstream extraction errors
    #[error("getting {kind} schema: {diagnostics}")]
    Upstream {
        kind: &'static str,
        diagnostics: Diagnostics,
    },

    #[error("converting {kind} schema ({name}): {source}")]
    Schema {
        kind: &'static str,
        name: String,
        #[source]
        source: Box<ConvertError>,
    },
}

impl ConvertError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }

    /// Wrap this error with the resource or data source it came from.
    pub(crate) fn in_schema(self, kind: &'static str, name: &str) -> Self {
        ConvertError::Schema {
            kind,
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

/// Errors while loading a provider document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid provider document at {path}: {message}")]
    InvalidDocument { path: String, message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}
