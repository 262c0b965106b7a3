use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::recognizer::model::ModelSize;

#[derive(Parser)]
#[command(
    name = "reelscribe",
    about = "Convert Instagram Reels to text using whisper.cpp",
    version,
    long_about = "Downloads the audio track of an Instagram Reel with yt-dlp, transcribes it \
                  locally with a Whisper model, and guarantees temporary files are cleaned up."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe an Instagram Reel URL
    Transcribe {
        /// The Instagram Reel URL
        #[arg(value_name = "URL")]
        url: String,

        /// Which Whisper model to use (defaults to the configured model)
        #[arg(short, long, value_enum, value_name = "MODEL")]
        model: Option<ModelSize>,

        /// Save the transcription to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Run the HTTP API server
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Bind port
        #[arg(long, default_value = "8000")]
        port: u16,
    },

    /// Show or initialize configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Pre-download a Whisper model so the first transcription does not stall
    DownloadModel {
        /// Which model to fetch
        #[arg(short, long, value_enum, default_value = "base")]
        model: ModelSize,
    },
}
