//! CLI interface for crankbox

pub mod play;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// A hand-cranked music box in your terminal
#[derive(Parser)]
#[command(name = "crankbox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Which tune to start on
#[derive(Args, Debug, Clone, Default)]
pub struct TuneArgs {
    /// Built-in tune name
    #[arg(short, long, conflicts_with = "file")]
    pub tune: Option<String>,

    /// Tune file (JSON)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play interactively: arrow keys crank, space plays and pauses
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = "crankbox.yaml")]
        config: PathBuf,

        #[command(flatten)]
        tune: TuneArgs,
    },

    /// Record automatic playback to a WAV file
    Record {
        /// Configuration file path
        #[arg(short, long, default_value = "crankbox.yaml")]
        config: PathBuf,

        #[command(flatten)]
        tune: TuneArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Duration in seconds
        #[arg(short, long, default_value = "30")]
        duration: u64,
    },

    /// Validate a configuration file and optionally a tune file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "crankbox.yaml")]
        config: PathBuf,

        /// Tune file to validate
        #[arg(long)]
        tune: Option<PathBuf>,
    },

    /// Write a built-in tune as a tune file
    Export {
        /// Built-in tune name
        name: String,

        /// Output file path (defaults to a name derived from the tune)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available audio devices and built-in tunes
    Devices,

    /// Generate an example configuration file
    Init,
}
