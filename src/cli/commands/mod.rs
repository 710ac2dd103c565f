//! CLI command dispatch and handlers.
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod serve;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::DriftJackError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), DriftJackError> {
    match cli.command {
        Commands::Serve(args) => serve::run(&args).await,
        Commands::Validate(args) => serve::validate(&args),
        Commands::Version => {
            version::run();
            Ok(())
        }
    }
}
