use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Video is private!")]
    PrivateContent,

    #[error("Video deleted or missing")]
    ContentUnavailable,

    #[error("Download error: {0}")]
    Download(String),

    #[error("File not found at {}", .0.display())]
    OutputMissing(PathBuf),
}

/// Contract for fetching a remote video and converting it to a local audio
/// file. The caller owns cleanup of the returned path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    async fn extract_audio(&self, url: &str, reel_id: &str) -> Result<PathBuf, ExtractionError>;
}

/// Downloads Reels and extracts audio using yt-dlp + ffmpeg.
pub struct YtDlpExtractor {
    yt_dlp_path: String,
    temp_dir: PathBuf,
    audio_format: String,
    sample_rate: u32,
    timeout_secs: u64,
    retries: u32,
    user_agent: String,
    downloaded_files: Mutex<Vec<PathBuf>>,
}

impl YtDlpExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            temp_dir: config.resolved_temp_dir(),
            audio_format: config.audio.format.clone(),
            sample_rate: config.audio.sample_rate,
            timeout_secs: config.download.timeout_secs,
            retries: config.download.retries,
            user_agent: config.download.user_agent.clone(),
            downloaded_files: Mutex::new(Vec::new()),
        }
    }

    /// Deterministic output path for a reel under the temp directory.
    pub fn audio_path_for(&self, reel_id: &str) -> PathBuf {
        self.temp_dir
            .join(format!("{}.{}", reel_id, self.audio_format))
    }

    /// Paths produced by this extractor so far. Introspection only; the
    /// extractor never deletes anything itself.
    pub async fn downloaded_files(&self) -> Vec<PathBuf> {
        self.downloaded_files.lock().await.clone()
    }

    fn classify_failure(stderr: &str) -> ExtractionError {
        if stderr.contains("Private video") {
            ExtractionError::PrivateContent
        } else if stderr.contains("Video unavailable") {
            ExtractionError::ContentUnavailable
        } else {
            ExtractionError::Download(stderr.trim().to_string())
        }
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn extract_audio(&self, url: &str, reel_id: &str) -> Result<PathBuf, ExtractionError> {
        fs_err::create_dir_all(&self.temp_dir)
            .map_err(|e| ExtractionError::Download(e.to_string()))?;

        let audio_path = self.audio_path_for(reel_id);
        let output_template = self.temp_dir.join(format!("{reel_id}.%(ext)s"));

        tracing::info!("Downloading Reel {} to {}", reel_id, audio_path.display());

        let resample_arg = format!("ffmpeg:-ar {}", self.sample_rate);
        let template_arg = output_template.to_string_lossy().to_string();
        let timeout_arg = self.timeout_secs.to_string();
        let retries_arg = self.retries.to_string();

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--format",
                "bestaudio/best",
                "--extract-audio",
                "--audio-format",
                self.audio_format.as_str(),
                "--audio-quality",
                "192K",
                "--postprocessor-args",
                resample_arg.as_str(),
                "--output",
                template_arg.as_str(),
                "--socket-timeout",
                timeout_arg.as_str(),
                "--retries",
                retries_arg.as_str(),
                "--user-agent",
                self.user_agent.as_str(),
                "--no-playlist",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractionError::Download(format!("failed to run yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Self::classify_failure(&stderr));
        }

        // yt-dlp can report success while the postprocessor produced nothing
        if !audio_path.exists() {
            return Err(ExtractionError::OutputMissing(audio_path));
        }

        self.downloaded_files.lock().await.push(audio_path.clone());

        tracing::info!("Audio ready: {}", audio_path.display());
        Ok(audio_path)
    }
}

/// Pattern for everything the extractor may have written for one reel,
/// including intermediate container files left behind by the postprocessor.
pub fn reel_artifact_glob(reel_id: &str) -> String {
    format!("{reel_id}.*")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> YtDlpExtractor {
        YtDlpExtractor::new(&Config::default())
    }

    #[test]
    fn output_path_derives_from_reel_id() {
        let path = extractor().audio_path_for("ABC123");
        assert!(path.ends_with("ABC123.wav"));
    }

    #[test]
    fn private_video_is_classified() {
        let err = YtDlpExtractor::classify_failure("ERROR: Private video. Sign in to view");
        assert!(matches!(err, ExtractionError::PrivateContent));
        assert_eq!(err.to_string(), "Video is private!");
    }

    #[test]
    fn unavailable_video_is_classified() {
        let err = YtDlpExtractor::classify_failure("ERROR: Video unavailable");
        assert!(matches!(err, ExtractionError::ContentUnavailable));
    }

    #[test]
    fn other_failures_fall_through_to_download_error() {
        let err = YtDlpExtractor::classify_failure("ERROR: HTTP Error 429: Too Many Requests");
        match err {
            ExtractionError::Download(msg) => assert!(msg.contains("429")),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn artifact_glob_covers_all_extensions() {
        assert_eq!(reel_artifact_glob("ABC123"), "ABC123.*");
    }
}
