//! EventDesk Notify - in-process events and toast notifications.
//!
//! This crate provides the notification core of EventDesk, responsible for:
//! - Decoupling event producers from consumers with a typed event bus
//! - Raising toast notifications from anywhere in the application
//! - Keeping the list of visible toasts and expiring them on schedule
//!
//! # Architecture
//!
//! Every service is an explicitly constructed value that is cloned into the
//! components that need it. Nothing is global, so tests build their own
//! instances and never share state.
//!
//! # Modules
//!
//! - [`bus`]: Event bus with isolated subscriber callbacks
//! - [`toast`]: Toast dispatcher and container
//! - [`types`]: Application events and toast payloads
//! - [`config`]: Toast policy from environment variables
//! - [`error`]: Error types

pub mod bus;
pub mod config;
pub mod error;
pub mod toast;
pub mod types;

pub use bus::{EmitReport, EventBus, SubscriptionId};
pub use config::{Config, ConfigError, ToastPolicy};
pub use error::{NotifyError, Result};
pub use toast::{MountedContainer, ToastContainer, ToastDispatcher};
pub use types::{AppEvent, EventKind, ToastId, ToastKind, ToastRecord, ToastRequest};
