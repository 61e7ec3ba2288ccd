//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod analyze;
pub mod config;
pub mod health;
pub mod session;
pub mod templates;
pub mod upload;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Session(args) => session::run(ctx, args),
        Commands::Health(args) => health::run(ctx, args),
        Commands::Upload(args) => upload::run(ctx, args),
        Commands::Analyze(args) => analyze::run(ctx, args),
        Commands::Templates(args) => templates::run(ctx, args),
        Commands::Config(args) => config::run(ctx, args),
    }
}
