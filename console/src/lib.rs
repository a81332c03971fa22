//! EventDesk Console - terminal front-end for EventDesk notifications.
//!
//! The console wires the notification services from [`eventdesk_notify`]
//! together the way the application does at startup and shows the result:
//!
//! - [`services`]: bus, dispatcher and mounted toast container
//! - [`tui`]: interactive screen with a live toast stack
//! - [`error`]: console error types

pub mod error;
pub mod services;
pub mod tui;

pub use error::{ConsoleError, Result, TuiError};
pub use services::Services;
