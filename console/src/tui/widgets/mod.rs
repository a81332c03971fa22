//! Widgets for the console screen.
//!
//! - [`toast_stack`]: visible toasts as a right-aligned stack of cards
//! - [`help_bar`]: key bindings and the last action's status
//!
//! Widgets are stateless. They borrow what they draw from the caller.

pub mod help_bar;
pub mod toast_stack;

pub use help_bar::{HelpBarWidget, HELP_BAR_HEIGHT};
pub use toast_stack::{ToastStackWidget, TOAST_HEIGHT, TOAST_WIDTH};
