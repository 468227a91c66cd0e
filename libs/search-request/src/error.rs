//! Error types for search request compilation

use crate::query::QueryKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown search container '{container}' for catalog '{catalog}'")]
    UnknownContainer { catalog: String, container: String },

    #[error("Unknown catalog: {0}")]
    UnknownCatalog(String),

    #[error("Unknown field '{field}' in container '{container}'")]
    UnknownField { field: String, container: String },

    #[error("Field is not sortable: {0}")]
    UnsortableField(String),

    #[error("No assembler registered for query type '{0}'")]
    UnsupportedQueryType(QueryKind),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Invalid pipeline aggregation: {0}")]
    InvalidPipeline(String),

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How an error should be surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The requested catalog or container does not exist.
    NotFound,
    /// The caller supplied criteria the compiler cannot accept.
    Validation,
    /// A defect in compiler wiring or internally generated definitions.
    Internal,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnknownContainer { .. } | Error::UnknownCatalog(_) => ErrorCategory::NotFound,
            Error::UnknownField { .. } | Error::UnsortableField(_) | Error::MalformedQuery(_) => {
                ErrorCategory::Validation
            }
            Error::UnsupportedQueryType(_)
            | Error::InvalidPipeline(_)
            | Error::InvalidResponse(_)
            | Error::Config(_)
            | Error::Json(_) => ErrorCategory::Internal,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedQuery(message.into())
    }
}
