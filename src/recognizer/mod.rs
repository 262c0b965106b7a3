use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::Mutex;

pub mod model;

use model::{ModelManager, ModelSize};

#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("Failed to load Whisper model: {0}")]
    ModelLoad(String),

    #[error("GPU error - try CPU ({0})")]
    Hardware(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    /// Inference completed but produced no non-whitespace text. A normal
    /// outcome for silent clips, kept distinct from real faults.
    #[error("No speech found")]
    EmptySpeech { elapsed_seconds: f64 },

    #[error("File missing: {}", .0.display())]
    AudioMissing(PathBuf),
}

/// A completed transcription. Elapsed time covers the inference call only,
/// not model loading.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub elapsed_seconds: f64,
}

/// Contract for converting an audio file into text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, RecognitionError>;

    /// Drop the cached model handle so the next call loads it fresh. Used by
    /// the pipeline's recovery step after re-downloading the weights.
    async fn invalidate(&self);
}

/// Model handle lifecycle. Loading happens lazily on first use; a failed
/// load is remembered until `invalidate()` resets it.
enum ModelState {
    Unloaded,
    Loaded(LoadedModel),
    LoadFailed(String),
}

#[derive(Clone)]
struct LoadedModel {
    weights: PathBuf,
}

/// Transcribes audio by invoking the whisper.cpp CLI against local ggml weights.
pub struct WhisperRecognizer {
    size: ModelSize,
    manager: ModelManager,
    binary: String,
    state: Mutex<ModelState>,
}

impl WhisperRecognizer {
    pub fn new(size: ModelSize) -> Self {
        Self::with_model_root(size, ModelManager::default_root())
    }

    pub fn with_model_root(size: ModelSize, root: impl Into<PathBuf>) -> Self {
        Self {
            size,
            manager: ModelManager::new(root),
            binary: whisper_binary(),
            state: Mutex::new(ModelState::Unloaded),
        }
    }

    /// Verify the model weights and cache the handle. Only transition that
    /// loads; repeated calls after a failure return the remembered error.
    async fn ensure_loaded(&self) -> Result<LoadedModel, RecognitionError> {
        let mut state = self.state.lock().await;

        match &*state {
            ModelState::Loaded(model) => Ok(model.clone()),
            ModelState::LoadFailed(reason) => Err(load_failure(reason.clone())),
            ModelState::Unloaded => match self.manager.ensure_model_available(self.size) {
                Ok(weights) => {
                    tracing::info!("Whisper model ready: {}", weights.display());
                    let model = LoadedModel { weights };
                    *state = ModelState::Loaded(model.clone());
                    Ok(model)
                }
                Err(e) => {
                    let reason = e.to_string();
                    *state = ModelState::LoadFailed(reason.clone());
                    Err(load_failure(reason))
                }
            },
        }
    }

    async fn run_inference(
        &self,
        model: &LoadedModel,
        audio_path: &Path,
    ) -> Result<Transcript, RecognitionError> {
        tracing::info!("Transcribing: {}", audio_path.display());
        let started = Instant::now();

        // Auto language detection, no timestamps, quiet diagnostics
        let weights_arg = model.weights.to_string_lossy().to_string();
        let audio_arg = audio_path.to_string_lossy().to_string();

        let output = Command::new(&self.binary)
            .args([
                "-m",
                weights_arg.as_str(),
                "-f",
                audio_arg.as_str(),
                "-l",
                "auto",
                "-nt",
                "-np",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RecognitionError::Transcription(format!("failed to run whisper: {e}")))?;

        let elapsed_seconds = started.elapsed().as_secs_f64();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_inference_failure(&stderr));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();

        tracing::info!("Done in {:.2} seconds", elapsed_seconds);

        if text.is_empty() {
            return Err(RecognitionError::EmptySpeech { elapsed_seconds });
        }

        Ok(Transcript {
            text,
            elapsed_seconds,
        })
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperRecognizer {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, RecognitionError> {
        let model = self.ensure_loaded().await?;

        if !audio_path.exists() {
            return Err(RecognitionError::AudioMissing(audio_path.to_path_buf()));
        }

        self.run_inference(&model, audio_path).await
    }

    async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        *state = ModelState::Unloaded;
        tracing::debug!("Whisper model handle invalidated");
    }
}

/// Locate the whisper.cpp CLI: explicit override via WHISPER_CPP_BIN, else
/// rely on PATH.
fn whisper_binary() -> String {
    std::env::var("WHISPER_CPP_BIN").unwrap_or_else(|_| "whisper-cli".to_string())
}

/// Load failures mentioning accelerator hardware are surfaced as hardware
/// faults so the pipeline does not try to fix them with a re-download.
fn load_failure(reason: String) -> RecognitionError {
    if mentions_accelerator(&reason) {
        RecognitionError::Hardware(reason)
    } else {
        RecognitionError::ModelLoad(reason)
    }
}

fn classify_inference_failure(stderr: &str) -> RecognitionError {
    let message = stderr.trim().to_string();
    if mentions_accelerator(&message) {
        RecognitionError::Hardware(message)
    } else if message.contains("error") || message.contains("failed") {
        RecognitionError::Runtime(message)
    } else {
        RecognitionError::Transcription(message)
    }
}

fn mentions_accelerator(message: &str) -> bool {
    message.contains("CUDA") || message.contains("GPU")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::model::ModelError;

    fn plausible_model(dir: &Path, size: ModelSize) {
        let manager = ModelManager::new(dir);
        let bytes = vec![0u8; 2 * 1024 * 1024];
        fs_err::write(manager.model_path(size), bytes).unwrap();
    }

    #[tokio::test]
    async fn missing_weights_fail_as_model_load() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = WhisperRecognizer::with_model_root(ModelSize::Base, dir.path());

        let err = recognizer
            .transcribe(Path::new("/nonexistent/audio.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecognitionError::ModelLoad(_)));
        assert!(err.to_string().contains("Failed to load Whisper model"));
    }

    #[tokio::test]
    async fn load_failure_is_remembered_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = WhisperRecognizer::with_model_root(ModelSize::Base, dir.path());

        assert!(recognizer.ensure_loaded().await.is_err());

        // Weights appear on disk, but the cached failure still wins
        plausible_model(dir.path(), ModelSize::Base);
        assert!(recognizer.ensure_loaded().await.is_err());

        // After invalidation the fresh load succeeds
        recognizer.invalidate().await;
        assert!(recognizer.ensure_loaded().await.is_ok());
    }

    #[tokio::test]
    async fn missing_audio_is_reported_after_load() {
        let dir = tempfile::tempdir().unwrap();
        plausible_model(dir.path(), ModelSize::Tiny);
        let recognizer = WhisperRecognizer::with_model_root(ModelSize::Tiny, dir.path());

        let err = recognizer
            .transcribe(Path::new("/nonexistent/audio.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecognitionError::AudioMissing(_)));
    }

    #[test]
    fn accelerator_messages_map_to_hardware() {
        let err = classify_inference_failure("whisper_init: CUDA out of memory");
        assert!(matches!(err, RecognitionError::Hardware(_)));

        let err = load_failure("no GPU backend available".to_string());
        assert!(matches!(err, RecognitionError::Hardware(_)));
    }

    #[test]
    fn plain_errors_map_to_runtime() {
        let err = classify_inference_failure("error: failed to decode audio");
        assert!(matches!(err, RecognitionError::Runtime(_)));
    }

    #[test]
    fn empty_speech_displays_no_speech_found() {
        let err = RecognitionError::EmptySpeech {
            elapsed_seconds: 1.5,
        };
        assert_eq!(err.to_string(), "No speech found");
    }

    #[test]
    fn truncated_weights_surface_in_load_reason() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path());
        fs_err::write(manager.model_path(ModelSize::Base), b"tiny").unwrap();

        let err = manager.ensure_model_available(ModelSize::Base).unwrap_err();
        assert!(matches!(err, ModelError::Truncated(_, 4)));
    }
}
