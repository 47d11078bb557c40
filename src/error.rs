//! Error type for user-supplied callbacks

use thiserror::Error;

/// Failure raised by a hook, `on_init` or `on_destroy` callback
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    /// Create a callback error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message the callback failed with
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
