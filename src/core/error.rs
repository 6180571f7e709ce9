use std::sync::Arc;
use thiserror::Error;

/// Failure raised anywhere in a nested middleware invocation.
///
/// Errors are `Clone` because a single failure settles every pending nested
/// continuation of the operation it aborted. The wrapped `anyhow::Error` is
/// shared, so the value the caller finally sees is the one that was raised.
#[derive(Error, Debug, Clone)]
pub enum NestedError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Middleware error: {0}")]
    Middleware(Arc<anyhow::Error>),

    #[error("Downstream error: {0}")]
    Downstream(Arc<anyhow::Error>),

    #[error("Settlement error: {0}")]
    Settlement(String),
}

pub type NestedResult<T> = std::result::Result<T, NestedError>;

impl NestedError {
    /// Wrap an error raised by user middleware.
    pub fn middleware(err: impl Into<anyhow::Error>) -> Self {
        Self::Middleware(Arc::new(err.into()))
    }

    /// Wrap an error raised by the downstream engine.
    pub fn downstream(err: impl Into<anyhow::Error>) -> Self {
        Self::Downstream(Arc::new(err.into()))
    }

    /// True when both values carry the very same underlying failure.
    pub fn same_failure(&self, other: &NestedError) -> bool {
        match (self, other) {
            (Self::Middleware(a), Self::Middleware(b)) => Arc::ptr_eq(a, b),
            (Self::Downstream(a), Self::Downstream(b)) => Arc::ptr_eq(a, b),
            (Self::Configuration(a), Self::Configuration(b)) => a == b,
            (Self::Settlement(a), Self::Settlement(b)) => a == b,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for NestedError {
    fn from(err: serde_json::Error) -> Self {
        NestedError::Configuration(err.to_string())
    }
}

impl From<tokio::task::JoinError> for NestedError {
    fn from(err: tokio::task::JoinError) -> Self {
        NestedError::middleware(anyhow::anyhow!("nested invocation aborted: {}", err))
    }
}
