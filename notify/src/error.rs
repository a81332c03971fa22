//! Error types for EventDesk Notify.
//!
//! Notification delivery itself never fails from the caller's point of view:
//! subscriber failures are isolated inside [`EventBus::emit`] and malformed
//! toast messages are coerced. The errors here cover the edges of the crate:
//! configuration loading and parsing user-supplied kind names.
//!
//! # Error Types
//!
//! - [`ConfigError`] - Configuration-related errors (missing or invalid values)
//! - [`NotifyError`] - Rejected user-supplied values
//!
//! [`EventBus::emit`]: crate::bus::EventBus::emit
//!
//! # Example
//!
//! ```rust
//! use eventdesk_notify::error::NotifyError;
//! use eventdesk_notify::types::ToastKind;
//!
//! let err = "loud".parse::<ToastKind>().unwrap_err();
//! assert!(matches!(err, NotifyError::Validation(_)));
//! ```

use std::error::Error;
use std::fmt;

pub use crate::config::ConfigError;

/// Top-level error type for EventDesk Notify.
#[derive(Debug)]
pub enum NotifyError {
    /// A user-supplied value failed validation.
    ///
    /// Returned for unknown toast kinds or event kinds given as strings.
    Validation(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
        }
    }
}

impl Error for NotifyError {}

impl NotifyError {
    /// Creates a new validation error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use eventdesk_notify::error::NotifyError;
    ///
    /// let err = NotifyError::validation("unknown toast kind 'loud'");
    /// assert!(matches!(err, NotifyError::Validation(_)));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// A specialized Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventKind, ToastKind};

    #[test]
    fn validation_displays_correctly() {
        let err = NotifyError::validation("unknown toast kind 'loud'");
        assert_eq!(
            err.to_string(),
            "validation error: unknown toast kind 'loud'"
        );
    }

    #[test]
    fn validation_has_no_source() {
        assert!(NotifyError::validation("bad").source().is_none());
    }

    #[test]
    fn kind_parsing_returns_crate_result() {
        fn parse_both(toast: &str, event: &str) -> Result<(ToastKind, EventKind)> {
            Ok((toast.parse()?, event.parse()?))
        }

        let (toast, event) = parse_both("warning", "dashboard_refresh").unwrap();
        assert_eq!(toast, ToastKind::Warning);
        assert_eq!(event, EventKind::DashboardRefresh);

        let err = parse_both("info", "dashboard_reload").unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: unknown event kind 'dashboard_reload'"
        );
    }
}
