//! Shared types for EventDesk notifications.
//!
//! This module defines the application events carried by the
//! [`EventBus`](crate::bus::EventBus) and the toast payloads carried by the
//! [`ToastDispatcher`](crate::toast::ToastDispatcher). Values are immutable
//! once created.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::NotifyError;

/// Prefix for generated toast ids.
const TOAST_ID_PREFIX: &str = "toast_";

/// Length of the random suffix appended to toast ids.
const TOAST_ID_SUFFIX_LEN: usize = 9;

/// Text shown when a toast message cannot be extracted.
pub const FALLBACK_MESSAGE: &str = "An error occurred";

/// Severity of a toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    /// All kinds, in ascending severity.
    pub const ALL: [ToastKind; 4] = [Self::Info, Self::Success, Self::Warning, Self::Error];

    /// Returns the lowercase name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToastKind {
    type Err = NotifyError;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| NotifyError::validation(format!("unknown toast kind '{s}'")))
    }
}

/// Identifier of a toast within a container.
///
/// Formatted as `toast_<unix millis>_<9 random characters>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToastId(String);

impl ToastId {
    /// Generates an id from a creation timestamp and a random suffix.
    pub fn generate(timestamp: DateTime<Utc>) -> Self {
        const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

        let mut rng = rand::rng();
        let suffix: String = (0..TOAST_ID_SUFFIX_LEN)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect();

        Self(format!(
            "{TOAST_ID_PREFIX}{}_{suffix}",
            timestamp.timestamp_millis()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ToastId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A request to show a toast, as broadcast by the dispatcher.
///
/// Serializes as `{ "message", "type", "timestamp", "duration_ms" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastRequest {
    pub message: String,

    #[serde(rename = "type")]
    pub kind: ToastKind,

    pub timestamp: DateTime<Utc>,

    /// Overrides the container's default duration when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToastRequest {
    /// Creates a request stamped with the current time.
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            timestamp: Utc::now(),
            duration_ms: None,
        }
    }

    /// Sets an explicit display duration (builder pattern).
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    /// Returns the explicit duration, if any.
    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }
}

/// A toast held by a container for the length of its display window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastRecord {
    pub id: ToastId,

    pub message: String,

    #[serde(rename = "type")]
    pub kind: ToastKind,

    /// When the toast was requested.
    pub timestamp: DateTime<Utc>,

    /// How long the toast stays visible.
    pub duration_ms: u64,
}

impl ToastRecord {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// When the toast is due to expire.
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.duration_ms)
            .ok()
            .and_then(chrono::TimeDelta::try_milliseconds)
            .and_then(|delta| self.timestamp.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Time left before expiry at `now`, zero once due.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at() - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Extracts display text from an arbitrary JSON message.
///
/// Strings are used verbatim. Objects with a string `message` field yield
/// that field. Everything else yields [`FALLBACK_MESSAGE`].
///
/// # Example
///
/// ```rust
/// use eventdesk_notify::types::coerce_message;
/// use serde_json::json;
///
/// assert_eq!(coerce_message(&json!("Saved")), "Saved");
/// assert_eq!(coerce_message(&json!({ "message": "Upload failed" })), "Upload failed");
/// assert_eq!(coerce_message(&json!({ "not": "a string" })), "An error occurred");
/// ```
pub fn coerce_message(value: &Value) -> String {
    match value {
        Value::String(message) => message.clone(),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => FALLBACK_MESSAGE.to_string(),
        },
        _ => FALLBACK_MESSAGE.to_string(),
    }
}

/// Discriminant of [`AppEvent`], used as the bus registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InvitationAccepted,
    InvitationDeclined,
    DashboardRefresh,
    VendorUpdated,
    MediaUploaded,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::InvitationAccepted,
        Self::InvitationDeclined,
        Self::DashboardRefresh,
        Self::VendorUpdated,
        Self::MediaUploaded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvitationAccepted => "invitation_accepted",
            Self::InvitationDeclined => "invitation_declined",
            Self::DashboardRefresh => "dashboard_refresh",
            Self::VendorUpdated => "vendor_updated",
            Self::MediaUploaded => "media_uploaded",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = NotifyError;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| NotifyError::validation(format!("unknown event kind '{s}'")))
    }
}

/// Cross-component application events.
///
/// Each variant carries its own typed payload, so producers and consumers
/// agree on the shape at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// A vendor accepted an invitation.
    InvitationAccepted { invitation_id: Uuid, vendor_id: Uuid },

    /// A vendor declined an invitation.
    InvitationDeclined {
        invitation_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// The dashboard should reload its data.
    DashboardRefresh,

    /// A vendor profile changed.
    VendorUpdated { vendor_id: Uuid },

    /// A media file finished uploading to storage.
    MediaUploaded { bucket: String, path: String },
}

impl AppEvent {
    /// Returns the registry key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::InvitationAccepted { .. } => EventKind::InvitationAccepted,
            Self::InvitationDeclined { .. } => EventKind::InvitationDeclined,
            Self::DashboardRefresh => EventKind::DashboardRefresh,
            Self::VendorUpdated { .. } => EventKind::VendorUpdated,
            Self::MediaUploaded { .. } => EventKind::MediaUploaded,
        }
    }
}
