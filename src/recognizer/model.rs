//! Whisper ggml model store and recovery downloader.
//!
//! Weight files live under the user cache directory and are fetched from the
//! whisper.cpp mirror with HTTP Range resume, so an interrupted download can
//! pick up where it left off.

use async_trait::async_trait;
use clap::ValueEnum;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// A ggml header plus any payload is far larger than this; anything smaller
/// is a truncated or corrupt download.
const MIN_PLAUSIBLE_MODEL_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }

    /// ggml weight filename as published by whisper.cpp
    pub fn filename(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "ggml-tiny.bin",
            ModelSize::Base => "ggml-base.bin",
            ModelSize::Small => "ggml-small.bin",
            ModelSize::Medium => "ggml-medium.bin",
            ModelSize::Large => "ggml-large-v3.bin",
        }
    }

    pub fn download_url(&self) -> String {
        format!("{}/{}", MODEL_BASE_URL, self.filename())
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model file not found at {}", .0.display())]
    Missing(PathBuf),

    #[error("model file at {} looks truncated ({} bytes)", .0.display(), .1)]
    Truncated(PathBuf, u64),

    #[error("model download failed: {0}")]
    Download(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Resolves and sanity-checks model weight files on disk.
pub struct ModelManager {
    root: PathBuf,
}

impl ModelManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default cache location for downloaded weights.
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("reelscribe")
            .join("models")
    }

    pub fn model_path(&self, size: ModelSize) -> PathBuf {
        self.root.join(size.filename())
    }

    /// Verify the weight file is present and plausible. This is the
    /// deterministic load-failure signal the pipeline's recovery keys on.
    pub fn ensure_model_available(&self, size: ModelSize) -> Result<PathBuf, ModelError> {
        let path = self.model_path(size);
        if !path.exists() {
            return Err(ModelError::Missing(path));
        }

        let len = path.metadata()?.len();
        if len < MIN_PLAUSIBLE_MODEL_BYTES {
            return Err(ModelError::Truncated(path, len));
        }

        Ok(path)
    }
}

/// Recovery action: fetch a model's weights so a failed load can be retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelFetcher: Send + Sync {
    async fn fetch(&self, size: ModelSize) -> Result<PathBuf, ModelError>;
}

/// Downloads ggml weights over HTTPS with resume support.
pub struct HttpModelFetcher {
    client: reqwest::Client,
    root: PathBuf,
}

impl HttpModelFetcher {
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            root: root.into(),
        })
    }

    async fn remote_size(&self, url: &str) -> Result<Option<u64>, ModelError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| ModelError::Download(e.to_string()))?;
        Ok(response.content_length())
    }

    async fn download_with_resume(&self, url: &str, dest: &Path) -> Result<(), ModelError> {
        let total = self.remote_size(url).await?;

        // Resume from a partial file when the server told us the full size
        let mut start = 0u64;
        if dest.exists() {
            let existing = dest.metadata()?.len();
            match total {
                Some(total) if existing == total => {
                    tracing::info!("Model already downloaded: {}", dest.display());
                    return Ok(());
                }
                Some(total) if existing < total => {
                    tracing::info!("Resuming download from {existing}/{total} bytes");
                    start = existing;
                }
                _ => {
                    fs_err::remove_file(dest)?;
                }
            }
        }

        let mut request = self.client.get(url);
        if start > 0 {
            request = request.header(reqwest::header::RANGE, format!("bytes={start}-"));
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ModelError::Download(e.to_string()))?;

        let progress = ProgressBar::new(total.unwrap_or(0));
        progress.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_position(start);
        progress.set_message("Downloading model...");

        let mut file = if start > 0 {
            fs_err::OpenOptions::new().append(true).open(dest)?
        } else {
            fs_err::File::create(dest)?
        };

        let mut stream = response.bytes_stream();
        let mut written = start;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ModelError::Download(e.to_string()))?;
            file.write_all(&chunk)?;
            written += chunk.len() as u64;
            progress.set_position(written);
        }

        progress.finish_with_message("Model download complete");
        Ok(())
    }
}

#[async_trait]
impl ModelFetcher for HttpModelFetcher {
    async fn fetch(&self, size: ModelSize) -> Result<PathBuf, ModelError> {
        fs_err::create_dir_all(&self.root)?;
        let dest = self.root.join(size.filename());
        let url = size.download_url();

        tracing::info!("Downloading {} model to {}", size, dest.display());
        self.download_with_resume(&url, &dest).await?;

        Ok(dest)
    }
}
