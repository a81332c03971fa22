//! Configuration module for EventDesk Notify.
//!
//! Parses the notification policy from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `EVENTDESK_TOAST_MAX_VISIBLE` | No | 5 | Toasts shown at once before the oldest is evicted |
//! | `EVENTDESK_TOAST_DURATION_MS` | No | 5000 | Default time a toast stays visible |
//! | `EVENTDESK_CHANNEL_CAPACITY` | No | 256 | Buffer size of the toast and event broadcast channels, at most 65536 |
//!
//! # Example
//!
//! ```no_run
//! use eventdesk_notify::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Showing up to {} toasts", config.toast.max_visible);
//! ```

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Default number of toasts visible at once.
pub const DEFAULT_MAX_VISIBLE: usize = 5;

/// Default toast lifetime in milliseconds.
pub const DEFAULT_TOAST_DURATION_MS: u64 = 5_000;

/// Lifetime of the single-slot toast in milliseconds.
pub const SINGLE_SLOT_DURATION_MS: u64 = 3_000;

/// Default broadcast channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Largest accepted broadcast channel capacity.
pub const MAX_CHANNEL_CAPACITY: usize = 65_536;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Display policy shared by every toast entry point.
///
/// `max_visible = 1` reproduces single-slot behaviour where each new toast
/// replaces the previous one; larger values stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastPolicy {
    /// Maximum number of toasts kept visible. Always at least 1.
    pub max_visible: usize,

    /// Lifetime applied when a toast does not carry its own duration.
    pub default_duration: Duration,
}

impl Default for ToastPolicy {
    fn default() -> Self {
        Self {
            max_visible: DEFAULT_MAX_VISIBLE,
            default_duration: Duration::from_millis(DEFAULT_TOAST_DURATION_MS),
        }
    }
}

impl ToastPolicy {
    /// Creates a policy, clamping `max_visible` to at least 1.
    pub fn new(max_visible: usize, default_duration: Duration) -> Self {
        Self {
            max_visible: max_visible.max(1),
            default_duration,
        }
    }

    /// A policy that shows one toast at a time for 3 seconds.
    pub fn single_slot() -> Self {
        Self::new(1, Duration::from_millis(SINGLE_SLOT_DURATION_MS))
    }

    /// Default duration in whole milliseconds, saturating at `u64::MAX`.
    pub fn default_duration_ms(&self) -> u64 {
        duration_millis(self.default_duration)
    }
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Notification configuration parsed from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Toast display policy.
    pub toast: ToastPolicy,

    /// Capacity of the broadcast channels used by the dispatcher and bus.
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            toast: ToastPolicy::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// Every variable is optional; unset variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set but is not
    /// a positive integer, or if the channel capacity exceeds
    /// [`MAX_CHANNEL_CAPACITY`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_visible = parse_positive("EVENTDESK_TOAST_MAX_VISIBLE", DEFAULT_MAX_VISIBLE)?;
        let duration_ms = parse_positive("EVENTDESK_TOAST_DURATION_MS", DEFAULT_TOAST_DURATION_MS)?;
        let channel_capacity = parse_positive("EVENTDESK_CHANNEL_CAPACITY", DEFAULT_CHANNEL_CAPACITY)?;
        if channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(ConfigError::InvalidValue {
                key: "EVENTDESK_CHANNEL_CAPACITY".to_string(),
                message: format!("must be at most {MAX_CHANNEL_CAPACITY}"),
            });
        }

        Ok(Self {
            toast: ToastPolicy::new(max_visible, Duration::from_millis(duration_ms)),
            channel_capacity,
        })
    }
}

/// Parses an optional positive integer variable, falling back to `default`.
fn parse_positive<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let val = match env::var(key) {
        Ok(val) => val,
        Err(_) => return Ok(default),
    };

    let parsed = val
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected positive integer, got '{val}'"),
        })?;

    if parsed == T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than 0".to_string(),
        });
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 3] = [
        "EVENTDESK_TOAST_MAX_VISIBLE",
        "EVENTDESK_TOAST_DURATION_MS",
        "EVENTDESK_CHANNEL_CAPACITY",
    ];

    /// Helper to temporarily set environment variables for testing.
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            let mut guard = Self { vars: Vec::new() };
            for key in VARS {
                guard.remove(key);
            }
            guard
        }

        fn set(&mut self, key: &str, value: &str) {
            let old_value = env::var(key).ok();
            self.vars.push((key.to_string(), old_value));
            env::set_var(key, value);
        }

        fn remove(&mut self, key: &str) {
            let old_value = env::var(key).ok();
            self.vars.push((key.to_string(), old_value));
            env::remove_var(key);
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.iter().rev() {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_when_unset() {
        let _guard = EnvGuard::new();

        let config = Config::from_env().expect("should parse config");
        assert_eq!(config, Config::default());
        assert_eq!(config.toast.max_visible, 5);
        assert_eq!(config.toast.default_duration, Duration::from_millis(5_000));
        assert_eq!(config.channel_capacity, 256);
    }

    #[test]
    #[serial]
    fn custom_values() {
        let mut guard = EnvGuard::new();
        guard.set("EVENTDESK_TOAST_MAX_VISIBLE", "1");
        guard.set("EVENTDESK_TOAST_DURATION_MS", " 3000 ");
        guard.set("EVENTDESK_CHANNEL_CAPACITY", "64");

        let config = Config::from_env().expect("should parse config");
        assert_eq!(config.toast, ToastPolicy::single_slot());
        assert_eq!(config.channel_capacity, 64);
    }

    #[test]
    #[serial]
    fn rejects_non_numeric() {
        let mut guard = EnvGuard::new();
        guard.set("EVENTDESK_TOAST_DURATION_MS", "soon");

        let err = Config::from_env().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "EVENTDESK_TOAST_DURATION_MS")
        );
        assert!(err.to_string().contains("got 'soon'"));
    }

    #[test]
    #[serial]
    fn rejects_zero() {
        let mut guard = EnvGuard::new();
        guard.set("EVENTDESK_TOAST_MAX_VISIBLE", "0");

        let err = Config::from_env().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "EVENTDESK_TOAST_MAX_VISIBLE".to_string(),
                message: "must be greater than 0".to_string(),
            }
        );
    }

    #[test]
    fn default_duration_ms_saturates() {
        assert_eq!(ToastPolicy::default().default_duration_ms(), 5_000);
        assert_eq!(ToastPolicy::single_slot().default_duration_ms(), 3_000);

        let forever = ToastPolicy::new(1, Duration::MAX);
        assert_eq!(forever.default_duration_ms(), u64::MAX);
    }

    #[test]
    #[serial]
    fn rejects_oversized_channel_capacity() {
        let mut guard = EnvGuard::new();
        guard.set("EVENTDESK_CHANNEL_CAPACITY", &usize::MAX.to_string());

        let err = Config::from_env().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "EVENTDESK_CHANNEL_CAPACITY".to_string(),
                message: format!("must be at most {MAX_CHANNEL_CAPACITY}"),
            }
        );
    }

    #[test]
    #[serial]
    fn accepts_max_channel_capacity() {
        let mut guard = EnvGuard::new();
        guard.set("EVENTDESK_CHANNEL_CAPACITY", &MAX_CHANNEL_CAPACITY.to_string());

        let config = Config::from_env().expect("should parse config");
        assert_eq!(config.channel_capacity, MAX_CHANNEL_CAPACITY);
    }

    #[test]
    #[serial]
    fn rejects_negative() {
        let mut guard = EnvGuard::new();
        guard.set("EVENTDESK_CHANNEL_CAPACITY", "-4");

        assert!(Config::from_env().is_err());
    }

    #[test]
    fn policy_new_clamps_max_visible() {
        let policy = ToastPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.max_visible, 1);
    }

    #[test]
    fn single_slot_policy() {
        let policy = ToastPolicy::single_slot();
        assert_eq!(policy.max_visible, 1);
        assert_eq!(policy.default_duration, Duration::from_secs(3));
    }
}
