//! Core error types for DECOY.

use crate::value::Value;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Attempted to write a read-only property
    #[error("Property '{key}' is read-only")]
    ReadOnlyProperty {
        /// Property name
        key: String,
    },

    /// Value has the wrong runtime type for the operation
    #[error("Expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type tag
        expected: String,
        /// Actual type tag
        actual: String,
    },

    /// Not found
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was looked up
        kind: String,
        /// Lookup key
        id: String,
    },
}

/// A value raised by a call
///
/// Calling a [`Function`](crate::value::Function) either returns a value or
/// "throws" one; the thrown value travels as the error half of
/// [`CallResult`](crate::value::CallResult).
#[derive(Clone)]
pub struct Thrown(pub Value);

impl Thrown {
    /// Throw an error value carrying `message`
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self(Value::error(message))
    }

    /// The thrown value
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Error message when an error value was thrown
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match &self.0 {
            Value::Error(err) => Some(err.message().to_string()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Thrown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Thrown").field(&self.0).finish()
    }
}

impl std::fmt::Display for Thrown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Value::Error(err) => write!(f, "{}: {}", err.name(), err.message()),
            other => write!(f, "Uncaught {:?}", other),
        }
    }
}

impl std::error::Error for Thrown {}

impl From<CoreError> for Thrown {
    fn from(err: CoreError) -> Self {
        Self::error(err.to_string())
    }
}
