//! Error types raised by the control hooks.

use thiserror::Error;

/// Failure raised while servicing a `point(...)` or `wireframe(...)` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// The script used a hook incorrectly. Reported back to the script author.
    #[error("{0}")]
    Usage(String),
    /// A host-side invariant did not hold. Indicates a bug, not a script error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HookError {
    pub fn usage(message: impl Into<String>) -> Self {
        HookError::Usage(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        HookError::Internal(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            HookError::Usage(m) | HookError::Internal(m) => m,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, HookError::Internal(_))
    }
}

pub type HookResult<T> = Result<T, HookError>;
