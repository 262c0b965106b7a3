use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::recognizer::model::ModelSize;

/// Default Instagram Reel URL pattern. Captures the opaque reel identifier.
pub const DEFAULT_REEL_PATTERN: &str =
    r"^https?://(?:www\.)?instagram\.com/(?:reel|reels)/([A-Za-z0-9_-]+)";

/// Browser-like user agent presented to Instagram so requests are not blocked.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Whisper model used when the CLI does not override it
    pub model: ModelSize,

    /// Temporary directory for downloaded audio (defaults to the system temp dir)
    pub temp_dir: Option<PathBuf>,

    /// Audio extraction settings
    pub audio: AudioConfig,

    /// Download behaviour
    pub download: DownloadConfig,

    /// Advisory budget: transcription should finish within
    /// `video duration * multiplier` seconds. Not enforced by a watchdog.
    pub transcription_time_multiplier: u32,

    /// Regex that recognizes Instagram Reel URLs and captures the reel id
    pub reel_url_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output format handed to the downloader ("wav" works best with Whisper)
    pub format: String,

    /// Sample rate in Hz (16 kHz is the standard for speech recognition)
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Socket timeout for the downloader, in seconds
    pub timeout_secs: u64,

    /// Retry count handed to the downloader
    pub retries: u32,

    /// Advisory maximum video duration in seconds (Reels are typically < 90s)
    pub max_video_duration_secs: u64,

    /// User agent for the reachability probe and the downloader
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelSize::Base,
            temp_dir: None,
            audio: AudioConfig {
                format: "wav".to_string(),
                sample_rate: 16_000,
            },
            download: DownloadConfig {
                timeout_secs: 300,
                retries: 3,
                max_video_duration_secs: 600,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            transcription_time_multiplier: 3,
            reel_url_pattern: DEFAULT_REEL_PATTERN.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content =
                fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            let config: Config =
                serde_yaml::from_str(&content).context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("reelscribe").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        Regex::new(&self.reel_url_pattern).context("Invalid reel URL pattern")?;

        if self.audio.sample_rate == 0 {
            anyhow::bail!("Audio sample rate must be non-zero");
        }

        if self.download.timeout_secs == 0 {
            anyhow::bail!("Download timeout must be non-zero");
        }

        Ok(())
    }

    /// Resolved temp directory for downloaded audio
    pub fn resolved_temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("reelscribe"))
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Model: {}", self.model);
        println!("  Temp Dir: {}", self.resolved_temp_dir().display());
        println!(
            "  Audio: {} @ {} Hz",
            self.audio.format, self.audio.sample_rate
        );
        println!("  Download Timeout: {}s", self.download.timeout_secs);
        println!("  Download Retries: {}", self.download.retries);
        println!(
            "  Max Video Duration: {}s (advisory)",
            self.download.max_video_duration_secs
        );
    }
}
