use quill_core::content::{GeneratedImage, ImagePrompt};
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::render::{BranchIds, ImageRenderer};

/// Runs the prompts of one (theme, copy) pair one after another.
#[derive(Clone)]
pub struct ImageBatchRunner {
    renderer: ImageRenderer,
}

impl ImageBatchRunner {
    pub fn new(renderer: ImageRenderer) -> Self {
        Self { renderer }
    }

    /// Render `prompts` in order and return the images that succeeded,
    /// in prompt order. Failed jobs are logged and skipped; only
    /// cancellation ends the batch early.
    pub async fn run(
        &self,
        prompts: Vec<ImagePrompt>,
        ids: BranchIds,
        cancel: &CancellationToken,
    ) -> Result<Vec<GeneratedImage>, PipelineError> {
        let total = prompts.len();
        let mut images = Vec::with_capacity(total);

        for prompt in &prompts {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            match self.renderer.render(prompt, ids, cancel).await {
                Ok(image) => images.push(image),
                Err(e) if e.is_cancelled() => return Err(PipelineError::Cancelled),
                Err(e) => {
                    tracing::warn!(
                        event_id = %ids.event_id,
                        topic_id = %ids.topic_id,
                        copy_id = %ids.copy_id,
                        prompt_id = %prompt.id,
                        error = %e,
                        "Image job failed",
                    );
                }
            }
        }

        tracing::info!(
            event_id = %ids.event_id,
            topic_id = %ids.topic_id,
            copy_id = %ids.copy_id,
            succeeded = images.len(),
            total,
            "Image batch finished",
        );
        Ok(images)
    }
}
