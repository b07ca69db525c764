//! `quill-worker` -- turns one event description into themed copy and
//! illustrations.
//!
//! The event description is taken from the command-line arguments, or
//! read from stdin when none are given. Configuration comes from the
//! environment (see `AppConfig::from_env`); a `.env` file is honoured.
//!
//! | Variable                    | Required | Default | Description                        |
//! |-----------------------------|----------|---------|------------------------------------|
//! | `QUILL_EVENT_DEADLINE_SECS` | no       | --      | Cancel the run after this long     |
//! | `RUST_LOG`                  | no       | see `telemetry::DEFAULT_FILTER` | Log filter |
//!
//! Exits non-zero if configuration is invalid, theme extraction fails or
//! the run is cancelled.

use std::sync::Arc;

use anyhow::Context;
use quill_core::config::AppConfig;
use quill_core::signing::HmacSha1Signer;
use quill_imagegen::api::ImageApi;
use quill_llm::api::ChatApi;
use quill_pipeline::orchestrator::PipelineOrchestrator;
use quill_pipeline::storage::LocalImageStore;
use quill_worker::{input, output, shutdown, telemetry};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let started = chrono::Utc::now();

    // --- Configuration ---
    let config = AppConfig::from_env().context("Invalid configuration")?;

    // --- Tracing ---
    let log_path = telemetry::init(&config.output.log_dir, started)?;
    tracing::info!(log = %log_path.display(), "Run log opened");
    tracing::debug!(?config, "Loaded configuration");

    // --- Input ---
    let args: Vec<String> = std::env::args().skip(1).collect();
    let description = input::load_event_description(args, std::io::stdin()).await?;
    let deadline = shutdown::parse_deadline(std::env::var(shutdown::DEADLINE_ENV).ok())?;

    // --- Gateways ---
    let generator = Arc::new(ChatApi::new(&config.llm).context("Failed to build chat client")?);
    tracing::info!(model = generator.model(), "Chat client ready");
    let signer = Arc::new(HmacSha1Signer::new(
        config.image_api.access_key.clone(),
        config.image_api.secret_key.clone(),
    ));
    let gateway =
        Arc::new(ImageApi::new(&config.image_api, signer).context("Failed to build image client")?);
    let store = Arc::new(LocalImageStore::new(config.output.images_dir.clone()));
    tracing::info!(images = %store.root().display(), "Image store ready");

    let orchestrator = PipelineOrchestrator::new(generator, gateway, store, &config);

    // --- Run ---
    let cancel = CancellationToken::new();
    let trigger = shutdown::spawn_cancel_triggers(cancel.clone(), deadline);

    tracing::info!(chars = description.chars().count(), "Processing event");
    let result = orchestrator.process_event(&description, &cancel).await;
    trigger.abort();

    let records = result.inspect_err(|e| tracing::error!(error = %e, "Event failed"))?;

    let path = output::write_result_document(&config.output.results_dir, &records, started)
        .await
        .context("Failed to write result document")?;

    let images: usize = records.iter().map(|r| r.images.len()).sum();
    tracing::info!(
        path = %path.display(),
        records = records.len(),
        images,
        "Result document written",
    );
    Ok(())
}
