//! Error taxonomy for the gated read path.
//!
//! Policy decisions, backend lookups, and file preconditions each get a
//! distinct variant so the transport can translate them without string
//! matching. `Backend` wraps anything the backend reports that does not
//! fit the taxonomy; the message is preserved, never swallowed.

use thiserror::Error;

/// Error category for structured logging and response mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Record category is in the configured block-set
    PolicyBlocked,
    /// Backend returned a record missing required fields
    MalformedRecord,
    /// Id, path, or branch does not exist at the backend
    NotFound,
    /// Credential rejected or backend unreachable for auth reasons
    Auth,
    /// File exceeds the configured size ceiling
    FileTooLarge,
    /// Caller-imposed deadline aborted the call
    Cancelled,
    /// Wrapped backend error
    Backend,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PolicyBlocked => "POLICY_BLOCKED",
            Self::MalformedRecord => "MALFORMED_RECORD",
            Self::NotFound => "NOT_FOUND",
            Self::Auth => "AUTH",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::Cancelled => "CANCELLED",
            Self::Backend => "BACKEND_ERROR",
        }
    }
}

/// Errors surfaced by the core entry points.
///
/// Within recursive traversal these are expected partial-failure paths and
/// are caught per branch; at the top level they propagate unmodified.
#[derive(Debug, Error)]
pub enum WorkboardError {
    /// The record's category is in the block-set. Carries only the id and
    /// category; no field values of the blocked record are ever included.
    #[error("work item {id} is blocked by policy (type: {category})")]
    PolicyBlocked { id: u64, category: String },

    /// Contract violation from the backend, distinct from a policy block.
    #[error("malformed work item record: {message}")]
    MalformedRecord { message: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Size precondition failure. Content was not fetched.
    #[error("file {path} is {size} bytes, which exceeds the {limit}-byte limit")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    /// Reserved for backend implementations that abort in-flight calls
    /// on shutdown; the core never constructs it itself.
    #[error("operation cancelled")]
    Cancelled,

    #[error("backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl WorkboardError {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::PolicyBlocked { .. } => ErrorCategory::PolicyBlocked,
            Self::MalformedRecord { .. } => ErrorCategory::MalformedRecord,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Auth { .. } => ErrorCategory::Auth,
            Self::FileTooLarge { .. } => ErrorCategory::FileTooLarge,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Backend { .. } => ErrorCategory::Backend,
        }
    }

    /// Create a malformed-record error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Create a backend error with source
    pub fn backend_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, WorkboardError>;
