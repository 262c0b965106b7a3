//! reelscribe - transcribe Instagram Reels to text
//!
//! This library downloads the audio track of a Reel with yt-dlp, transcribes
//! it locally with a whisper.cpp model, and guarantees that every temporary
//! file created during a run is deleted when the run ends, on any exit path.

pub mod api;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod extractor;
pub mod output;
pub mod pipeline;
pub mod recognizer;
pub mod utils;
pub mod validator;

pub use cleanup::{CleanupManager, CleanupReport};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractor::{MediaExtractor, YtDlpExtractor};
pub use pipeline::{ReelPipeline, TranscriptionRequest, TranscriptionResult};
pub use recognizer::model::ModelSize;
pub use recognizer::{SpeechRecognizer, WhisperRecognizer};
pub use validator::{ReelValidator, UrlValidator};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
