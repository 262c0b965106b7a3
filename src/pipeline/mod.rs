//! The transcription pipeline: validate URL, extract audio, transcribe,
//! clean up. Sequences three fallible external operations and guarantees
//! that no temporary file survives the run, whatever the exit path.

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Instant;

use crate::cleanup::CleanupManager;
use crate::config::Config;
use crate::extractor::{reel_artifact_glob, MediaExtractor, YtDlpExtractor};
use crate::recognizer::model::{HttpModelFetcher, ModelFetcher, ModelManager, ModelSize};
use crate::recognizer::{RecognitionError, SpeechRecognizer, WhisperRecognizer};
use crate::validator::{ReelValidator, UrlValidator};

/// Immutable input for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionRequest {
    pub url: String,
    pub model: ModelSize,
}

impl TranscriptionRequest {
    pub fn new(url: impl Into<String>, model: ModelSize) -> Self {
        Self {
            url: url.into(),
            model,
        }
    }
}

/// Outcome of a pipeline run. Exactly one of `transcription` / `error` is
/// non-empty, matching `success`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub success: bool,
    pub transcription: String,
    pub reel_id: String,
    pub processing_time: f64,
    pub error: String,
}

impl TranscriptionResult {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::default()
        }
    }
}

/// Composes validator, extractor and recognizer into one request/response
/// operation. Serves requests for the model it was built with; the caller
/// never sees an error from `transcribe_reel`, only a populated result.
pub struct ReelPipeline {
    validator: Box<dyn UrlValidator>,
    extractor: Box<dyn MediaExtractor>,
    recognizer: Box<dyn SpeechRecognizer>,
    fetcher: Box<dyn ModelFetcher>,
    temp_dir: PathBuf,
}

impl ReelPipeline {
    /// Production wiring for a given model size.
    pub fn for_model(config: &Config, model: ModelSize) -> anyhow::Result<Self> {
        let model_root = ModelManager::default_root();
        Ok(Self {
            validator: Box::new(ReelValidator::new(config)?),
            extractor: Box::new(YtDlpExtractor::new(config)),
            recognizer: Box::new(WhisperRecognizer::with_model_root(model, &model_root)),
            fetcher: Box::new(HttpModelFetcher::new(model_root)?),
            temp_dir: config.resolved_temp_dir(),
        })
    }

    /// Explicit wiring, used by tests and embedders.
    pub fn with_components(
        validator: Box<dyn UrlValidator>,
        extractor: Box<dyn MediaExtractor>,
        recognizer: Box<dyn SpeechRecognizer>,
        fetcher: Box<dyn ModelFetcher>,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            validator,
            extractor,
            recognizer,
            fetcher,
            temp_dir,
        }
    }

    /// Run the whole pipeline for one request. Always returns a fully
    /// populated result; panics and Ctrl-C are absorbed here, and cleanup
    /// teardown runs before this returns on every path.
    pub async fn transcribe_reel(&self, request: &TranscriptionRequest) -> TranscriptionResult {
        let started = Instant::now();
        let mut cleanup = CleanupManager::new();

        let result = {
            let stages =
                AssertUnwindSafe(self.run_stages(request, &mut cleanup, started)).catch_unwind();
            tokio::pin!(stages);

            tokio::select! {
                outcome = &mut stages => match outcome {
                    Ok(result) => result,
                    Err(payload) => {
                        TranscriptionResult::failure(format!(
                            "Unexpected error: {}",
                            panic_message(payload.as_ref())
                        ))
                    }
                },
                _ = tokio::signal::ctrl_c() => TranscriptionResult::failure("Stopped by user"),
            }
        };

        let report = cleanup.run_cleanup();
        if report.deleted > 0 {
            tracing::info!("Cleanup complete: {} file(s) deleted", report.deleted);
        }
        if report.failed > 0 {
            tracing::warn!("Warning: {} file(s) could not be deleted", report.failed);
        }

        result
    }

    async fn run_stages(
        &self,
        request: &TranscriptionRequest,
        cleanup: &mut CleanupManager,
        started: Instant,
    ) -> TranscriptionResult {
        let mut result = TranscriptionResult::default();

        tracing::info!("Step 1: checking URL");
        let reel_id = match self.validator.validate(&request.url).await {
            Ok(reel_id) => reel_id,
            Err(e) => {
                result.error = format!("Bad URL: {e}");
                return result;
            }
        };
        result.reel_id = reel_id.clone();
        tracing::info!("URL is good, reel id: {}", reel_id);

        tracing::info!("Step 2: getting audio");
        let audio_path = match self.extractor.extract_audio(&request.url, &reel_id).await {
            Ok(path) => path,
            Err(e) => {
                result.error = format!("Could not get audio: {e}");
                return result;
            }
        };

        // Register before any further fallible step so the file is cleaned
        // even if transcription blows up
        cleanup.register(&audio_path);
        if let Err(e) = cleanup.register_directory(&self.temp_dir, &reel_artifact_glob(&reel_id)) {
            tracing::warn!("Could not scan temp dir for leftovers: {e}");
        }

        tracing::info!("Step 3: converting speech to text");
        let mut outcome = self.recognizer.transcribe(&audio_path).await;

        // A model-load failure gets exactly one recovery cycle: re-download
        // the weights, reset the handle, transcribe once more
        if let Err(RecognitionError::ModelLoad(reason)) = &outcome {
            tracing::warn!("Model load failed ({reason}); re-downloading weights");

            match self.fetcher.fetch(request.model).await {
                Ok(_) => {
                    self.recognizer.invalidate().await;
                    outcome = self.recognizer.transcribe(&audio_path).await;
                }
                Err(e) => {
                    tracing::error!("Model re-download failed: {e}");
                    result.error = "Model download failed.".to_string();
                    return result;
                }
            }
        }

        match outcome {
            Ok(transcript) => {
                result.success = true;
                result.transcription = transcript.text;
                result.processing_time = started.elapsed().as_secs_f64();
                result
            }
            Err(e) => {
                result.error = format!("Transcription broke: {e}");
                result
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "pipeline stage panicked".to_string()
    }
}
