//! Error types for critbit-rs

use thiserror::Error;

/// Boxed error produced by caller-supplied bodies and bindings.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Tree error type
#[derive(Error, Debug)]
pub enum Error {
    /// Lookup of a key that is not in the tree
    #[error("key \"{0}\" not known in tree")]
    NotFound(String),

    /// Malformed construction input
    #[error("{0}")]
    InvalidInput(String),

    /// A textual value could not be interpreted as a tree or treeset
    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    /// Binding the current entry before running a for-each body failed
    #[error("binding failed: {0}")]
    BindFailed(BoxError),

    /// A for-each body reported failure
    #[error("step failed: {0}")]
    StepFailed(BoxError),
}

impl Error {
    /// Create a not found error for a raw key
    pub fn not_found(key: &[u8]) -> Self {
        Error::NotFound(String::from_utf8_lossy(key).into_owned())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a conversion error
    pub fn conversion(msg: impl Into<String>) -> Self {
        Error::ConversionFailed(msg.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
