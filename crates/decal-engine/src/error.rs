//! Error types for rendered-page backends.

use thiserror::Error;

use crate::page::DomId;

/// Result type for page operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while querying or mutating a rendered page.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The document could not be loaded or parsed.
    #[error("failed to load document: {0}")]
    LoadFailed(String),

    /// The document has no body element to walk.
    #[error("document has no body element")]
    MissingBody,

    /// A node handle does not belong to this page (or the page was reloaded).
    #[error("stale node handle {0:?}")]
    StaleNode(DomId),

    /// The requested operation is not valid in the page's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
