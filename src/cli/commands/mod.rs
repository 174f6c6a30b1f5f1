//! Command dispatch

pub mod behaviors;
pub mod replay;
pub mod validate;

use crate::cli::args::{BehaviorsSubcommand, Cli, Commands};
use crate::error::LimerenceError;

/// Dispatches a parsed CLI invocation to its handler.
///
/// # Errors
///
/// Propagates the handler's error for exit-code mapping in `main`.
pub async fn dispatch(cli: Cli) -> Result<(), LimerenceError> {
    match cli.command {
        Commands::Behaviors(cmd) => match cmd.subcommand {
            BehaviorsSubcommand::List(args) => behaviors::list(&args).await,
            BehaviorsSubcommand::Show(args) => behaviors::show(&args).await,
        },
        Commands::Validate(args) => validate::run(&args).await,
        Commands::Replay(args) => replay::run(&args).await,
    }
}
