use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mp4forge")]
#[command(author, version, about = "Progressive MP4 muxing and box serialization")]
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
    /// Serialize a JSON box description to bytes
    Encode {
        /// Box description (JSON)
        #[arg(required = true)]
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Mux a sample manifest into a progressive MP4
    Mux {
        /// Sample manifest (JSON)
        #[arg(required = true)]
        manifest: PathBuf,

        /// Output MP4 file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Read the video track tables of an MP4 file
    Inspect {
        /// File to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Output resolved samples as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        #[arg(value_name = "CONFIG")]
        path: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
