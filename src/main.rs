use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod cleanup;
mod cli;
mod config;
mod extractor;
mod output;
mod pipeline;
mod recognizer;
mod utils;
mod validator;

use cli::{Cli, Commands};
use config::Config;
use pipeline::{ReelPipeline, TranscriptionRequest};
use recognizer::model::{HttpModelFetcher, ModelFetcher, ModelManager};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "reelscribe=debug"
    } else {
        "reelscribe=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Transcribe { url, model, output } => {
            // Missing tools are warnings, not errors; yt-dlp may still be
            // installed under a name the probe does not see
            let missing = utils::check_dependencies().await;
            if !missing.is_empty() && !cli.quiet {
                eprintln!("⚠️  Dependency check warnings:");
                for dep in missing {
                    eprintln!("   • {}", dep);
                }
                eprintln!("   (Continuing anyway - tools may be available)");
            }

            let model = model.unwrap_or(config.model);

            if !cli.quiet {
                output::print_banner();
                println!("Using Model: {}", model);
                println!("Processing: {}", url);
            }

            let pipeline = ReelPipeline::for_model(&config, model)?;
            let request = TranscriptionRequest::new(url, model);
            let result = pipeline.transcribe_reel(&request).await;

            output::print_result(&result);

            if result.success {
                if let Some(path) = output {
                    output::save_transcription(&result, &path)?;
                    println!("Saved to: {}", path.display());
                }
            }

            if !result.success {
                std::process::exit(1);
            }
        }
        Commands::Serve { host, port } => {
            api::serve(config, &host, port).await?;
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.save().await?;
                println!("Configuration written");
            }
        }
        Commands::DownloadModel { model } => {
            let fetcher = HttpModelFetcher::new(ModelManager::default_root())?;
            let path = fetcher.fetch(model).await?;
            println!("Model ready: {}", path.display());
        }
    }

    Ok(())
}
