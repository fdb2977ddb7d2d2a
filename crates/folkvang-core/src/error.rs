//! Error types for folkvang-core

use thiserror::Error;

/// Core error type
///
/// Every variant is a validation failure: the request is rejected before
/// any state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Invalid floor or boss: floor={floor}, boss={boss}")]
    InvalidSlot { floor: i64, boss: String },
}

impl Error {
    /// Whether the error came from a field that was absent or empty
    pub fn is_missing(&self) -> bool {
        matches!(self, Error::MissingField(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
