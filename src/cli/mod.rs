//! CLI module for GeoAware.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// GeoAware - chat with a model that can call local tools
///
/// The model replies in JSON, requesting tool calls that may take uploaded
/// images as arguments. Tool results are fed back on the next turn.
#[derive(Parser, Debug)]
#[command(name = "geoaware")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Model backend to use (gemini, azure)
        #[arg(short, long)]
        backend: Option<String>,

        /// Images to upload before the first message
        #[arg(short, long)]
        image: Vec<String>,

        /// Surface tool failures instead of masking them
        #[arg(long)]
        debug: bool,
    },

    /// List the tools available to the model
    Tools,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "model.backend")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}
