//! Error types for autofit operations.

use thiserror::Error;

use crate::host::DomError;

/// Result type for autofit operations.
pub type FitResult<T> = Result<T, FitError>;

/// Errors that can occur while fitting or rectifying.
///
/// None of these are fatal to the host page. Each one is logged where it
/// happens; callers inspect the returned value when they need to branch.
#[derive(Debug, Error)]
pub enum FitError {
    /// The root selector did not resolve, or the options are out of range.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An ignore rule or rectification target selector is empty, invalid or unmatched.
    #[error("Bad selector '{selector}': {reason}")]
    Selector {
        /// The offending selector text.
        selector: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Something failed while tearing a session down.
    #[error("Failed to remove normally: {0}")]
    Teardown(String),

    /// Init options could not be parsed.
    #[error("Invalid options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    /// The host document rejected an operation.
    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

impl FitError {
    /// Build a selector error.
    pub fn selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Selector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error only skips part of a pass instead of aborting it.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Selector { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_errors_are_recoverable() {
        assert!(FitError::selector("", "empty").is_recoverable());
        assert!(!FitError::Configuration("'#app' is not exist".into()).is_recoverable());
    }

    #[test]
    fn display_includes_selector() {
        let err = FitError::selector(".missing", "found no element");
        assert_eq!(err.to_string(), "Bad selector '.missing': found no element");
    }
}
