//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;
pub mod progress;

/// MoveMint - resume dance-video minting workflows against the minting engine
#[derive(Parser, Debug)]
#[command(name = "movemint")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit JSON on stdout and JSON progress events on stderr
    #[arg(long, global = true, env = "MOVEMINT_ROBOT")]
    pub robot: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/movemint/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root holding .movemint/ (default: current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect, resume or clear the saved workflow session
    Session(commands::session::SessionArgs),

    /// Check that the minting engine is reachable
    Health(commands::health::HealthArgs),

    /// Upload a dance video and record it in the session
    Upload(commands::upload::UploadArgs),

    /// Start pose analysis for an uploaded video and wait for it
    Analyze(commands::analyze::AnalyzeArgs),

    /// List license templates offered by the engine
    Templates(commands::templates::TemplatesArgs),

    /// Show the effective configuration
    Config(commands::config::ConfigArgs),
}
