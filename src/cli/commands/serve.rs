//! `serve` and `validate` command handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::args::{ServeArgs, ValidateArgs};
use crate::config::Config;
use crate::error::DriftJackError;
use crate::server;
use crate::vehicle::SimConnector;

/// Runs the HTTP control surface until interrupted.
///
/// The vehicle connector is owned here, at the process entry point, and
/// handed into the control surface; the attack engine itself never holds
/// a global connection. The shipped connector targets the built-in
/// simulator; a real MAVLink transport plugs in at the same seam.
///
/// # Errors
///
/// Returns configuration or bind errors.
pub async fn run(args: &ServeArgs) -> Result<(), DriftJackError> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(bind) = &args.bind {
        config.bind_addr.clone_from(bind);
    }

    let connector = Arc::new(SimConnector::new());
    let cancel = CancellationToken::new();

    // A second Ctrl+C is handled by the signal task in main; the first
    // one lands here for a graceful drain.
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    server::serve(config, connector, cancel).await
}

/// Validates a configuration file without starting the server.
///
/// # Errors
///
/// Returns the configuration error when the file does not load or
/// validate.
pub fn validate(args: &ValidateArgs) -> Result<(), DriftJackError> {
    let config = Config::load(&args.config)?;
    info!(path = %args.config.display(), bind_addr = %config.bind_addr, "configuration valid");
    println!("{}: OK", args.config.display());
    Ok(())
}
