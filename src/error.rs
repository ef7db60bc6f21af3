//! Error types surfaced by the sync layer.

use std::sync::Arc;

use thiserror::Error;

/// Failure of an injected loader.
///
/// `Clone` so that every caller attached to the same in-flight load receives
/// the same failure. The original `anyhow::Error` is shared behind an `Arc`,
/// keeping the full context chain available for logging and for the scope's
/// status record.
#[derive(Debug, Clone, Error)]
#[error("{inner:#}")]
pub struct FetchError {
    inner: Arc<anyhow::Error>,
}

impl FetchError {
    /// The error chain as a display string, suitable for a status record.
    pub fn message(&self) -> String {
        format!("{:#}", self.inner)
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            inner: Arc::new(err),
        }
    }
}
