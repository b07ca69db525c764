//! Event-level fan-out across themes, copies and image batches.
//!
//! One event produces a tree: themes, then copies per theme, then prompts
//! per copy, then an image batch per (theme, copy) pair. Theme extraction
//! is the only precondition; any other branch that fails contributes an
//! empty list and its siblings carry on. Prompts are keyed by copy id and
//! every batch handle stays paired with its (theme, copy), so records come
//! out in traversal order regardless of which batch finishes first.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::future::join_all;
use quill_core::config::{
    AppConfig, ConcurrencyConfig, GenerationConfig, MAX_CONCURRENT_BATCHES_LIMIT,
};
use quill_core::content::{CopyText, Event, ImagePrompt, ResultRecord, Theme};
use quill_core::types::EntityId;
use quill_imagegen::api::{ImageJobGateway, ImageParams};
use quill_llm::api::TextGenerator;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::batch::ImageBatchRunner;
use crate::error::PipelineError;
use crate::render::{BranchIds, ImageRenderer};
use crate::stages::{CopyStage, PromptStage, ThemeStage};
use crate::storage::ImageStore;

/// Drives one event through every stage.
pub struct PipelineOrchestrator {
    themes: ThemeStage,
    copies: CopyStage,
    prompts: PromptStage,
    batches: ImageBatchRunner,
    generation: GenerationConfig,
    concurrency: ConcurrencyConfig,
}

impl PipelineOrchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        gateway: Arc<dyn ImageJobGateway>,
        store: Arc<dyn ImageStore>,
        config: &AppConfig,
    ) -> Self {
        let generation = config.generation.clone();
        let templates = Arc::new(config.templates.clone());
        let params = ImageParams::new(&config.image_api, generation.images_per_prompt);
        let renderer = ImageRenderer::new(gateway, store, params, config.poll);

        Self {
            themes: ThemeStage::new(
                Arc::clone(&generator),
                Arc::clone(&templates),
                generation.theme_temperature,
            ),
            copies: CopyStage::new(
                Arc::clone(&generator),
                Arc::clone(&templates),
                generation.copy_temperature,
            ),
            prompts: PromptStage::new(generator, templates, generation.prompt_temperature),
            batches: ImageBatchRunner::new(renderer),
            generation,
            concurrency: config.concurrency,
        }
    }

    /// Run the full pipeline for one event description.
    ///
    /// Returns one [`ResultRecord`] per (theme, copy) pair whose image
    /// batch completed, possibly with no images. Fails only when theme
    /// extraction fails or the run is cancelled.
    pub async fn process_event(
        &self,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResultRecord>, PipelineError> {
        let event = Event::new(description);
        let span = tracing::info_span!("event", event_id = %event.id);
        self.run(event, cancel).instrument(span).await
    }

    async fn run(
        &self,
        event: Event,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResultRecord>, PipelineError> {
        tracing::info!("Processing event");
        ensure_active(cancel)?;

        let themes = self
            .themes
            .extract(&event.description, self.generation.topics_per_event, event.id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Theme extraction failed");
                PipelineError::ThemeExtraction(e)
            })?;
        if themes.is_empty() {
            tracing::warn!("No themes extracted; nothing to generate");
            return Ok(Vec::new());
        }

        ensure_active(cancel)?;
        let copies = self.generate_copies(&themes, event.id).await;

        ensure_active(cancel)?;
        let mut prompts = self.generate_prompts(&themes, &copies, event.id, cancel).await?;

        ensure_active(cancel)?;
        let pairs: Vec<(&Theme, &CopyText)> = themes
            .iter()
            .zip(&copies)
            .flat_map(|(theme, copies)| copies.iter().map(move |copy| (theme, copy)))
            .collect();

        let permits = self
            .concurrency
            .max_concurrent_batches
            .clamp(1, MAX_CONCURRENT_BATCHES_LIMIT);
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut handles = Vec::with_capacity(pairs.len());

        for (theme, copy) in &pairs {
            let ids = BranchIds {
                event_id: event.id,
                topic_id: theme.id,
                copy_id: copy.id,
            };
            let selected = self.select_prompts(prompts.remove(&copy.id).unwrap_or_default(), ids);

            let runner = self.batches.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let batch_prompts = selected.clone();
            let span = tracing::info_span!("batch", topic_id = %theme.id, copy_id = %copy.id);

            let handle = tokio::spawn(
                async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return Err(PipelineError::Cancelled);
                    };
                    runner.run(batch_prompts, ids, &cancel).await
                }
                .instrument(span),
            );
            handles.push((*theme, *copy, selected, handle));
        }

        let mut records = Vec::with_capacity(handles.len());
        let mut cancelled = false;

        for (theme, copy, selected, handle) in handles {
            let (topic_id, copy_id) = (theme.id, copy.id);
            match handle.await {
                Ok(Ok(images)) => {
                    records.push(ResultRecord {
                        event_id: event.id,
                        topic: theme.clone(),
                        copy: copy.clone(),
                        prompts: selected,
                        images,
                    });
                }
                Ok(Err(PipelineError::Cancelled)) => cancelled = true,
                Ok(Err(e)) => {
                    tracing::error!(%topic_id, %copy_id, error = %e, "Image batch failed");
                }
                Err(e) => {
                    tracing::error!(
                        %topic_id,
                        %copy_id,
                        error = %e,
                        "Image batch task aborted; pair omitted",
                    );
                }
            }
        }

        if cancelled || cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let image_count: usize = records.iter().map(|r| r.images.len()).sum();
        tracing::info!(
            records = records.len(),
            images = image_count,
            "Event processed",
        );
        Ok(records)
    }

    /// One concurrent copy task per theme. The result is aligned with
    /// `themes`; a failed theme yields an empty list.
    async fn generate_copies(&self, themes: &[Theme], event_id: EntityId) -> Vec<Vec<CopyText>> {
        let count = self.generation.copies_per_topic;
        let tasks = themes.iter().map(|theme| {
            let span = tracing::info_span!("topic", topic_id = %theme.id);
            async move {
                match self.copies.generate(theme, count, event_id).await {
                    Ok(copies) => copies,
                    Err(e) => {
                        tracing::warn!(error = %e, "Copy generation failed; theme dropped");
                        Vec::new()
                    }
                }
            }
            .instrument(span)
        });
        join_all(tasks).await
    }

    /// Prompt generation for every copy, in traversal order.
    async fn generate_prompts(
        &self,
        themes: &[Theme],
        copies: &[Vec<CopyText>],
        event_id: EntityId,
        cancel: &CancellationToken,
    ) -> Result<HashMap<EntityId, VecDeque<ImagePrompt>>, PipelineError> {
        let count = self.generation.prompts_per_copy;
        let mut by_copy = HashMap::new();

        for (theme, copies) in themes.iter().zip(copies) {
            for copy in copies {
                ensure_active(cancel)?;
                let prompts = match self.prompts.generate(copy, count, theme.id, event_id).await {
                    Ok(prompts) => VecDeque::from(prompts),
                    Err(e) => {
                        tracing::warn!(
                            topic_id = %theme.id,
                            copy_id = %copy.id,
                            error = %e,
                            "Image prompt generation failed",
                        );
                        VecDeque::new()
                    }
                };
                by_copy.insert(copy.id, prompts);
            }
        }

        Ok(by_copy)
    }

    /// Take at most `images_per_copy` prompts from the front of the queue.
    fn select_prompts(&self, mut available: VecDeque<ImagePrompt>, ids: BranchIds) -> Vec<ImagePrompt> {
        let wanted = self.generation.images_per_copy;
        if available.len() < wanted {
            tracing::warn!(
                topic_id = %ids.topic_id,
                copy_id = %ids.copy_id,
                available = available.len(),
                wanted,
                "Fewer image prompts than configured",
            );
        }
        let take = wanted.min(available.len());
        available.drain(..take).collect()
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        tracing::info!("Event processing cancelled");
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}
