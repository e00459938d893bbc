//! Unified error type definition

use thiserror::Error;

// Re-export the gateway error type
pub use dns_registrar_provider::ProviderError;

use crate::deploy::MAX_DIFF_OPERATIONS;

/// Core layer error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Failed to read a configuration directory or file.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The computed diff tripped the operation circuit breaker. The diff is
    /// never partially applied; it must be investigated manually.
    #[error(
        "deployment diff holds {total} operations (cap {MAX_DIFF_OPERATIONS}); refusing to apply"
    )]
    DiffUnavailable { total: usize },

    /// The probe HTTP client could not be constructed.
    #[error("HTTP client initialization failed: {0}")]
    HttpClient(String),

    /// Gateway error (converted from the provider library).
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl CoreError {
    /// Whether this is expected behavior (oversized diff, user input) rather
    /// than an infrastructure fault, for log level selection.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::DiffUnavailable { .. } => true,
            Self::Provider(e) => !e.is_retryable(),
            Self::Io { .. } | Self::HttpClient(_) => false,
        }
    }
}

/// Convenience alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;
