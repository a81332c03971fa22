//! Notification services shared by the console front-ends.
//!
//! [`Services`] is built once at startup from the loaded [`Config`] and
//! handed to whichever front-end runs. It owns the event bus, the toast
//! dispatcher and the mounted toast container, and installs the bus
//! subscribers that turn application events into toasts.

use eventdesk_notify::bus::EventBus;
use eventdesk_notify::config::Config;
use eventdesk_notify::toast::{MountedContainer, ToastContainer, ToastDispatcher};
use eventdesk_notify::types::{AppEvent, EventKind};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

/// Loads the notification configuration from the environment.
///
/// # Errors
///
/// Returns [`ConsoleError::Config`](crate::ConsoleError::Config) if any
/// `EVENTDESK_*` variable is set to an invalid value.
pub fn load_config() -> Result<Config> {
    Ok(Config::from_env()?)
}

/// Application-wide notification services.
#[derive(Debug)]
pub struct Services {
    pub bus: EventBus,
    pub dispatcher: ToastDispatcher,
    pub toasts: MountedContainer,
}

impl Services {
    /// Builds the services and mounts the toast container.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(config: &Config) -> Self {
        let bus = EventBus::with_capacity(config.channel_capacity);
        let dispatcher = ToastDispatcher::with_capacity(config.channel_capacity);
        let toasts = ToastContainer::new(config.toast).mount(&dispatcher);

        install_toast_subscribers(&bus, &dispatcher);

        info!(
            max_visible = config.toast.max_visible,
            default_duration_ms = config.toast.default_duration_ms(),
            "Notification services started"
        );

        Self {
            bus,
            dispatcher,
            toasts,
        }
    }

    pub fn container(&self) -> &ToastContainer {
        self.toasts.container()
    }
}

/// Registers one subscriber per event kind that raises a matching toast.
pub fn install_toast_subscribers(bus: &EventBus, dispatcher: &ToastDispatcher) {
    for kind in EventKind::ALL {
        let toasts = dispatcher.clone();
        bus.on(kind, move |event| {
            match event {
                AppEvent::InvitationAccepted { .. } => {
                    toasts.success("Invitation accepted");
                }
                AppEvent::InvitationDeclined { reason, .. } => {
                    let message = match reason {
                        Some(reason) => format!("Invitation declined: {reason}"),
                        None => "Invitation declined".to_string(),
                    };
                    toasts.warning(message);
                }
                AppEvent::DashboardRefresh => {
                    toasts.info("Dashboard refreshed");
                }
                AppEvent::VendorUpdated { .. } => {
                    toasts.info("Vendor profile updated");
                }
                AppEvent::MediaUploaded { path, .. } => {
                    toasts.success(format!("Uploaded {path}"));
                }
            }
            Ok(())
        });
    }
}

/// Builds a representative event of `kind` with fresh ids.
pub fn sample_event(kind: EventKind) -> AppEvent {
    match kind {
        EventKind::InvitationAccepted => AppEvent::InvitationAccepted {
            invitation_id: Uuid::new_v4(),
            vendor_id: Uuid::new_v4(),
        },
        EventKind::InvitationDeclined => AppEvent::InvitationDeclined {
            invitation_id: Uuid::new_v4(),
            reason: Some("date unavailable".to_string()),
        },
        EventKind::DashboardRefresh => AppEvent::DashboardRefresh,
        EventKind::VendorUpdated => AppEvent::VendorUpdated {
            vendor_id: Uuid::new_v4(),
        },
        EventKind::MediaUploaded => AppEvent::MediaUploaded {
            bucket: "vendor-media".to_string(),
            path: "gallery/stage.jpg".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsoleError;
    use eventdesk_notify::types::ToastKind;
    use serial_test::serial;
    use std::env;

    const CAPACITY_VAR: &str = "EVENTDESK_CHANNEL_CAPACITY";

    /// Restores the capacity variable on drop.
    struct CapacityGuard(Option<String>);

    impl CapacityGuard {
        fn set(value: &str) -> Self {
            let guard = Self(env::var(CAPACITY_VAR).ok());
            env::set_var(CAPACITY_VAR, value);
            guard
        }
    }

    impl Drop for CapacityGuard {
        fn drop(&mut self) {
            match &self.0 {
                Some(v) => env::set_var(CAPACITY_VAR, v),
                None => env::remove_var(CAPACITY_VAR),
            }
        }
    }

    #[test]
    #[serial]
    fn load_config_wraps_invalid_env_as_config_error() {
        let _guard = CapacityGuard::set("lots");

        let err = load_config().unwrap_err();
        assert!(matches!(err, ConsoleError::Config(_)));
        assert!(err.to_string().contains(CAPACITY_VAR));
    }

    #[test]
    #[serial]
    fn load_config_reads_valid_env() {
        let _guard = CapacityGuard::set("64");

        let config = load_config().unwrap();
        assert_eq!(config.channel_capacity, 64);
    }

    #[test]
    fn sample_event_matches_kind() {
        for kind in EventKind::ALL {
            assert_eq!(sample_event(kind).kind(), kind);
        }
    }

    #[test]
    fn every_kind_has_a_toast_subscriber() {
        let bus = EventBus::new();
        let dispatcher = ToastDispatcher::new();
        install_toast_subscribers(&bus, &dispatcher);

        for kind in EventKind::ALL {
            assert_eq!(bus.subscriber_count(kind), 1);
        }
    }

    #[test]
    fn subscribers_raise_expected_toasts() {
        let bus = EventBus::new();
        let dispatcher = ToastDispatcher::new();
        let mut rx = dispatcher.subscribe();
        install_toast_subscribers(&bus, &dispatcher);

        bus.emit(sample_event(EventKind::MediaUploaded));
        bus.emit(sample_event(EventKind::InvitationDeclined));

        let uploaded = rx.try_recv().unwrap();
        assert_eq!(uploaded.kind, ToastKind::Success);
        assert_eq!(uploaded.message, "Uploaded gallery/stage.jpg");

        let declined = rx.try_recv().unwrap();
        assert_eq!(declined.kind, ToastKind::Warning);
        assert_eq!(declined.message, "Invitation declined: date unavailable");
    }

    #[test]
    fn start_mounts_container() {
        tokio_test::block_on(async {
            let services = Services::start(&Config::default());
            assert_eq!(services.dispatcher.receiver_count(), 1);

            services.bus.emit(AppEvent::DashboardRefresh);
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }

            let visible = services.container().visible();
            assert_eq!(visible.len(), 1);
            assert_eq!(visible[0].message, "Dashboard refreshed");
        });
    }
}
