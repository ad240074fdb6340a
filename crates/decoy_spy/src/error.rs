//! Spy error types.

use decoy_core::{CoreError, Thrown};
use decoy_registry::RegistryError;

/// Spy result type
pub type SpyResult<T> = Result<T, SpyError>;

/// Error raised by spies, mocks and their assertions
///
/// Usage errors and assertion failures display as a blank-line-padded
/// message so they stand out in test runner output.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SpyError {
    /// The library was misused
    #[error("\n\n{message}\n\n")]
    Usage {
        /// Human-readable description
        message: String,
    },

    /// An assertion did not hold
    #[error("\n\n{message}\n\n")]
    Assertion {
        /// Expected vs. actual, followed by the call ledger
        message: String,
    },

    /// User code raised while the engine ran it
    #[error("{0}")]
    Thrown(#[from] Thrown),

    /// Configuration could not be loaded
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Why loading failed
        reason: String,
    },
}

impl SpyError {
    /// Create a usage error
    #[must_use]
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }

    /// Check if this is an assertion failure
    #[must_use]
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion { .. })
    }

    /// Check if this is a usage error
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. })
    }

    /// Message without padding
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Usage { message } | Self::Assertion { message } => message.clone(),
            Self::Thrown(thrown) => thrown.to_string(),
            Self::InvalidConfig { reason } => reason.clone(),
        }
    }
}

impl From<RegistryError> for SpyError {
    fn from(err: RegistryError) -> Self {
        Self::usage(err.to_string())
    }
}

impl From<CoreError> for SpyError {
    fn from(err: CoreError) -> Self {
        Self::usage(err.to_string())
    }
}

impl From<serde_json::Error> for SpyError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig {
            reason: err.to_string(),
        }
    }
}
