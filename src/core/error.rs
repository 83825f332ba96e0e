// ============================================================================
// spark-observe - Errors
// Failures that can surface while notifying subscribers
// ============================================================================

use std::any::Any;

use thiserror::Error;

/// Errors produced by the tracking core.
///
/// None of these are fatal: a failing subscriber is reported and the
/// remaining subscribers of the same notify pass still run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserveError {
    /// A subscriber's `update()` returned an error.
    #[error("subscriber update failed: {message}")]
    UpdateFailed { message: String },

    /// A subscriber panicked while updating.
    #[error("subscriber panicked during update: {message}")]
    UpdatePanicked { message: String },

    /// A watcher's getter reported a failure.
    #[error("watcher getter failed: {message}")]
    Getter { message: String },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ObserveError>;

impl ObserveError {
    /// Build an `UpdateFailed` error from any message.
    pub fn update_failed(message: impl Into<String>) -> Self {
        Self::UpdateFailed {
            message: message.into(),
        }
    }

    /// Build a `Getter` error from any message.
    pub fn getter(message: impl Into<String>) -> Self {
        Self::Getter {
            message: message.into(),
        }
    }

    /// Convert a caught panic payload into an error.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::UpdatePanicked { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = ObserveError::update_failed("boom");
        assert_eq!(err.to_string(), "subscriber update failed: boom");

        let err = ObserveError::getter("bad read");
        assert_eq!(err.to_string(), "watcher getter failed: bad read");
    }

    #[test]
    fn panic_payloads() {
        let err = ObserveError::from_panic(Box::new("static str"));
        assert_eq!(
            err,
            ObserveError::UpdatePanicked {
                message: "static str".into()
            }
        );

        let err = ObserveError::from_panic(Box::new(String::from("owned")));
        assert_eq!(
            err,
            ObserveError::UpdatePanicked {
                message: "owned".into()
            }
        );

        let err = ObserveError::from_panic(Box::new(42u8));
        assert!(matches!(err, ObserveError::UpdatePanicked { .. }));
    }
}
