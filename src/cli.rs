use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "motionphoto")]
#[command(author, version, about = "Extract the video clip embedded in motion photos")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the embedded video from a file or every photo in a directory
    Extract {
        /// Motion photo or directory of photos
        #[arg(required = true)]
        input: PathBuf,

        /// Output file (single input only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write only the mdat payload of HEIC motion photos
        #[arg(long)]
        payload_only: bool,

        /// Overwrite existing output files
        #[arg(short, long)]
        force: bool,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Show the box layout and embedded video of a file
    Inspect {
        /// File to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
