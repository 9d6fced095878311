//! Headless mode runner - drives the owner context without a UI
//!
//! The runner is the owner context: it creates the dispatcher/pump pair,
//! opens one session through the [`SessionService`], and pumps events into
//! an [`NdjsonHandler`] until the session is done.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rmon_app::config::{default_config_path, load_settings, Settings};
use rmon_app::signals::cancel_on_shutdown_signal;
use rmon_app::{owner_context, SessionParameters, SessionService};
use rmon_core::prelude::{Error, Result};
use rmon_core::JsonResultSerializer;

use super::{HeadlessEvent, NdjsonHandler};

/// What the command line asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessOptions {
    /// Result file, as typed
    pub file: String,
    /// Keep running and republish on every change
    pub watch: bool,
    /// Settings file; the platform default when `None`
    pub config_path: Option<PathBuf>,
}

impl HeadlessOptions {
    /// Settings from `config_path`, the default location, or built-in defaults
    pub fn settings(&self) -> Settings {
        match self.config_path.clone().or_else(default_config_path) {
            Some(path) => load_settings(&path),
            None => Settings::default(),
        }
    }
}

/// Run in headless mode, writing NDJSON to stdout.
///
/// Returns once the initial load is out when not watching, or after
/// SIGINT/SIGTERM when watching.
pub async fn run_headless(options: HeadlessOptions) -> Result<()> {
    info!("Result Monitor starting in headless mode");
    info!("File: {} (watch: {})", options.file, options.watch);

    let settings = options.settings();
    let cancel = CancellationToken::new();
    cancel_on_shutdown_signal(cancel.clone())?;

    let mut output = NdjsonHandler::new(io::stdout());
    let result = monitor(&options, settings, &mut output, cancel).await;

    info!("Result Monitor headless mode exiting");
    result
}

/// Open `options.file` and pump its events into `output` until done or
/// `cancel` fires.
///
/// `options.watch` alone decides whether the file is watched; the
/// `auto_subscribe` setting does not apply to the command line.
pub async fn monitor<W: Write>(
    options: &HeadlessOptions,
    mut settings: Settings,
    output: &mut NdjsonHandler<W>,
    cancel: CancellationToken,
) -> Result<()> {
    if settings.session.auto_subscribe && !options.watch {
        debug!("Ignoring auto_subscribe without --watch");
    }
    settings.session.auto_subscribe = false;

    let (dispatcher, mut pump) = owner_context();
    let mut service =
        SessionService::new(dispatcher, Arc::new(JsonResultSerializer::new()), settings);

    let parameters = SessionParameters::file(options.file.clone(), options.watch);
    if let Err(e) = service.open(parameters, cancel.clone()).await {
        return match e {
            Error::Cancelled => {
                info!("Cancelled while opening {}", options.file);
                Ok(())
            }
            e => {
                output.write(HeadlessEvent::error(e.to_string(), true));
                Err(e)
            }
        };
    }
    output.write(HeadlessEvent::session_opened(&options.file, options.watch));

    let delivered = pump.dispatch_pending(output);
    debug!("Initial load delivered {} event(s)", delivered);

    if options.watch && service.is_session_subscribed() {
        watch_loop(&mut pump, output, &cancel).await;
    }

    service.shutdown_session();
    pump.dispatch_pending(output);
    output.write(HeadlessEvent::session_closed(&options.file));
    Ok(())
}

/// Deliver reload batches until cancelled
async fn watch_loop<W: Write>(
    pump: &mut rmon_app::EventPump,
    output: &mut NdjsonHandler<W>,
    cancel: &CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Stopping watch");
                break;
            }
            delivered = pump.dispatch_next(output) => {
                match delivered {
                    Some(count) => debug!("Delivered {} event(s)", count),
                    None => {
                        warn!("Event channel closed");
                        break;
                    }
                }
            }
        }
    }
}
