//! AGD-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, AgdError>;

/// Top-level error type for the dashboard backend.
#[derive(Debug, Error)]
pub enum AgdError {
    #[error("[AGD-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[AGD-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[AGD-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[AGD-2001] invalid document: {details}")]
    InvalidDocument { details: String },

    #[error("[AGD-2002] no document {id} in collection {collection}")]
    NotFound { collection: String, id: String },

    #[error("[AGD-2003] invalid request: {details}")]
    InvalidRequest { details: String },

    #[error("[AGD-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[AGD-2102] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[AGD-3001] unauthorized")]
    Unauthorized,

    #[error("[AGD-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[AGD-3101] upstream webhook failure for {target}: {details}")]
    Upstream { target: String, details: String },

    #[error("[AGD-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl AgdError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "AGD-1001",
            Self::MissingConfig { .. } => "AGD-1002",
            Self::ConfigParse { .. } => "AGD-1003",
            Self::InvalidDocument { .. } => "AGD-2001",
            Self::NotFound { .. } => "AGD-2002",
            Self::InvalidRequest { .. } => "AGD-2003",
            Self::Serialization { .. } => "AGD-2101",
            Self::Sql { .. } => "AGD-2102",
            Self::Unauthorized => "AGD-3001",
            Self::Io { .. } => "AGD-3002",
            Self::Upstream { .. } => "AGD-3101",
            Self::Runtime { .. } => "AGD-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Sql { .. } | Self::Upstream { .. } | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for a missing document.
    #[must_use]
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for AgdError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for AgdError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for AgdError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
