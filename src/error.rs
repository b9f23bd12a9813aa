//! Error types shared by the reconciliation engine, the provider collaborators
//! and the batch orchestrator.
//!
//! Library code returns these typed errors; the CLI wraps them in `anyhow`.

use crate::models::Platform;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the pure reconciliation layer (normalizer, reconciler).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Track metadata that cannot produce an identity key. Callers skip the
    /// single track; it never aborts a whole playlist.
    #[error("malformed track on {platform}: {reason}")]
    MalformedTrack { platform: Platform, reason: String },

    /// Caller contract violation, e.g. compare with fewer than two sources.
    #[error("invalid reconciliation request: {0}")]
    InvalidRequest(String),
}

/// Errors reported by a platform collaborator (see [`crate::api::Provider`]).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{platform}: authorization expired")]
    AuthExpired { platform: Platform },

    #[error("{platform}: rate_limited (retry_after={retry_after:?})")]
    RateLimited {
        platform: Platform,
        retry_after: Option<Duration>,
    },

    #[error("{platform}: quota exceeded")]
    QuotaExceeded { platform: Platform },

    #[error("{platform}: playlist not found: {reference}")]
    PlaylistNotFound { platform: Platform, reference: String },

    /// Any other collaborator failure (transport, unexpected payload, ...).
    #[error("{platform}: {message}")]
    Unavailable { platform: Platform, message: String },
}

impl ProviderError {
    /// Only rate limiting is eligible for automatic retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }

    /// Server supplied wait hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            ProviderError::AuthExpired { platform }
            | ProviderError::RateLimited { platform, .. }
            | ProviderError::QuotaExceeded { platform }
            | ProviderError::PlaylistNotFound { platform, .. }
            | ProviderError::Unavailable { platform, .. } => *platform,
        }
    }
}

/// Error recorded on a [`crate::models::BatchOutcome`]. Collaborator errors are
/// captured here instead of propagating across batch boundaries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("operation cancelled")]
    Cancelled,

    /// The playlist was written but some tracks could not be resolved on the target.
    #[error("{unresolved} of {total} tracks could not be resolved on the target")]
    Incomplete { unresolved: usize, total: usize },

    /// The operation's task panicked or was aborted by the runtime.
    #[error("operation aborted: {0}")]
    Aborted(String),
}

impl BatchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BatchError::Timeout(_))
    }
}
