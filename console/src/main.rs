//! EventDesk Console - terminal front-end for EventDesk notifications.
//!
//! # Commands
//!
//! - `eventdesk-console run`: interactive screen with a live toast stack
//! - `eventdesk-console toast <message>`: show one toast headlessly and wait
//!   for it to expire
//!
//! # Environment Variables
//!
//! See [`eventdesk_notify::config`] for the toast policy variables.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use eventdesk_console::services::load_config;
use eventdesk_console::{tui, Services};
use eventdesk_notify::config::Config;
use eventdesk_notify::types::{ToastKind, ToastRecord, ToastRequest};

/// EventDesk Console - terminal front-end for EventDesk notifications.
#[derive(Parser, Debug)]
#[command(name = "eventdesk-console")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    EVENTDESK_TOAST_MAX_VISIBLE  Toasts visible at once (default: 5)
    EVENTDESK_TOAST_DURATION_MS  Default toast lifetime (default: 5000)
    EVENTDESK_CHANNEL_CAPACITY   Event and toast channel capacity (default: 256)
    RUST_LOG                     Log filter (default: off for 'run', info for 'toast')

EXAMPLES:
    # Open the interactive screen
    eventdesk-console run

    # Single-slot behaviour: each toast replaces the previous one
    EVENTDESK_TOAST_MAX_VISIBLE=1 eventdesk-console run

    # Show one toast and print it as JSON
    eventdesk-console toast 'Vendor saved' --kind success --json
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the interactive screen.
    ///
    /// Keys raise toasts directly or emit events on the bus, and the toast
    /// stack updates live as toasts expire.
    Run,

    /// Show one toast and wait until it is removed.
    ///
    /// Prints the toast when it appears and again when it expires.
    Toast {
        /// Text to show.
        message: String,

        /// Toast kind: info, success, warning or error.
        #[arg(short, long, default_value = "info")]
        kind: ToastKind,

        /// Lifetime in milliseconds, overriding the configured default.
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        duration_ms: Option<u64>,

        /// Print records and logs as JSON lines.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Run => init_logging("off", false),
        Command::Toast { json, .. } => init_logging("info", *json),
    }

    let config = load_config().context("Failed to load configuration")?;
    debug!(?config, "Configuration loaded");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    match cli.command {
        Command::Run => runtime.block_on(async {
            let services = Services::start(&config);
            tui::run(&services).await.context("Console screen failed")
        }),
        Command::Toast {
            message,
            kind,
            duration_ms,
            json,
        } => {
            let mut request = ToastRequest::new(message, kind);
            if let Some(ms) = duration_ms {
                request = request.with_duration(Duration::from_millis(ms));
            }
            runtime.block_on(run_toast(&config, request, json))
        }
    }
}

/// Dispatches `request` and follows it until it leaves the container.
async fn run_toast(config: &Config, request: ToastRequest, json: bool) -> Result<()> {
    let services = Services::start(config);
    let container = services.container();
    let mut changes = container.subscribe_changes();
    changes.borrow_and_update();

    services.dispatcher.dispatch(request);
    changes
        .changed()
        .await
        .context("Toast container closed before the toast was shown")?;

    let record = container
        .visible()
        .pop()
        .context("Toast was not shown")?;
    print_shown(&record, json)?;

    let expiry = async {
        while container.get(&record.id).is_some() {
            changes.changed().await?;
        }
        Ok::<_, tokio::sync::watch::error::RecvError>(())
    };

    tokio::select! {
        result = expiry => result.context("Toast container closed while waiting for expiry")?,
        _ = signal::ctrl_c() => {
            info!("Interrupted, dismissing toast");
            container.dismiss(&record.id);
        }
    }

    print_removed(&record, json)
}

fn print_shown(record: &ToastRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(record)?);
    } else {
        println!(
            "[{}] {} (id {}, expires {})",
            record.kind,
            record.message,
            record.id,
            record.expires_at().to_rfc3339()
        );
    }
    Ok(())
}

fn print_removed(record: &ToastRecord, json: bool) -> Result<()> {
    if json {
        let removed = serde_json::json!({ "removed": record.id });
        println!("{}", serde_json::to_string(&removed)?);
    } else {
        println!("removed {}", record.id);
    }
    Ok(())
}

/// Installs the tracing subscriber.
///
/// `RUST_LOG` overrides `default_filter`. Logs go to stderr so stdout only
/// carries command output.
fn init_logging(default_filter: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
