//! One image job end to end: submit, poll, download, store.

use std::sync::Arc;

use quill_core::config::PollPolicy;
use quill_core::content::{GeneratedImage, ImagePrompt};
use quill_core::naming;
use quill_core::types::{new_id, EntityId};
use quill_imagegen::api::{ImageJobGateway, ImageParams};
use quill_imagegen::job::{poll_until_terminal, JobError};
use tokio_util::sync::CancellationToken;

use crate::error::ImageTaskError;
use crate::storage::ImageStore;

/// Correlation ids of the (theme, copy) branch a job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchIds {
    pub event_id: EntityId,
    pub topic_id: EntityId,
    pub copy_id: EntityId,
}

/// Renders single prompts into stored images.
#[derive(Clone)]
pub struct ImageRenderer {
    gateway: Arc<dyn ImageJobGateway>,
    store: Arc<dyn ImageStore>,
    params: ImageParams,
    poll: PollPolicy,
}

impl ImageRenderer {
    pub fn new(
        gateway: Arc<dyn ImageJobGateway>,
        store: Arc<dyn ImageStore>,
        params: ImageParams,
        poll: PollPolicy,
    ) -> Self {
        Self {
            gateway,
            store,
            params,
            poll,
        }
    }

    /// Render one prompt. Any failure applies to this job only.
    pub async fn render(
        &self,
        prompt: &ImagePrompt,
        ids: BranchIds,
        cancel: &CancellationToken,
    ) -> Result<GeneratedImage, ImageTaskError> {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled.into());
        }

        let generate_id = self
            .gateway
            .submit(&prompt.content, &self.params)
            .await
            .map_err(ImageTaskError::Submit)?;
        tracing::info!(
            event_id = %ids.event_id,
            topic_id = %ids.topic_id,
            copy_id = %ids.copy_id,
            prompt_id = %prompt.id,
            generate_id = %generate_id,
            "Image job submitted",
        );

        let audited = poll_until_terminal(self.gateway.as_ref(), &generate_id, &self.poll, cancel).await?;

        let bytes = self
            .gateway
            .fetch_image(&audited.url)
            .await
            .map_err(ImageTaskError::Fetch)?;

        let image_id = new_id();
        let file_name = naming::image_filename(&prompt.copy_text, image_id);
        let local_path = self.store.write(&file_name, &bytes).await?;

        tracing::info!(
            prompt_id = %prompt.id,
            generate_id = %generate_id,
            path = %local_path.display(),
            "Image saved",
        );

        Ok(GeneratedImage {
            id: image_id,
            local_path,
            seed: audited.seed,
        })
    }
}
