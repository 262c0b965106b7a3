//! HTTP API driver: a thin actix-web layer over the pipeline. Domain
//! failures come back as structured error payloads, not transport errors.

use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::pipeline::{ReelPipeline, TranscriptionRequest, TranscriptionResult};
use crate::recognizer::model::ModelSize;

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    pub reel_url: String,
    #[serde(default = "default_model")]
    pub model: ModelSize,
}

fn default_model() -> ModelSize {
    ModelSize::Base
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
}

impl TranscribeResponse {
    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            transcription: None,
            message: Some(message.into()),
            reel_id: None,
            processing_time: None,
        }
    }

    fn from_result(result: TranscriptionResult) -> Self {
        if result.success {
            Self {
                status: "success".to_string(),
                transcription: Some(result.transcription),
                message: None,
                reel_id: Some(result.reel_id),
                processing_time: Some(result.processing_time),
            }
        } else {
            Self::error(result.error)
        }
    }
}

async fn transcribe(
    config: web::Data<Config>,
    payload: web::Json<TranscribeRequest>,
) -> impl Responder {
    tracing::info!("API transcription request for {}", payload.reel_url);

    let pipeline = match ReelPipeline::for_model(&config, payload.model) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("Pipeline construction failed: {e}");
            return HttpResponse::InternalServerError()
                .json(TranscribeResponse::error(format!("Server error: {e}")));
        }
    };

    let request = TranscriptionRequest::new(payload.reel_url.clone(), payload.model);
    let result = pipeline.transcribe_reel(&request).await;

    HttpResponse::Ok().json(TranscribeResponse::from_result(result))
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "healthy" }))
}

/// Run the API server until shutdown.
pub async fn serve(config: Config, host: &str, port: u16) -> anyhow::Result<()> {
    let data = web::Data::new(config);

    tracing::info!("API listening on {}:{}", host, port);

    HttpServer::new(move || {
        // Local frontend origin only
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allow_any_method()
            .allow_any_header();

        App::new()
            .app_data(data.clone())
            .wrap(cors)
            .route("/api/transcribe", web::post().to(transcribe))
            .route("/health", web::get().to(health))
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}
