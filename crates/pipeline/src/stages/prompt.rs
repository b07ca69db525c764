use std::sync::Arc;

use quill_core::content::{CopyText, ImagePrompt};
use quill_core::templates::PromptTemplates;
use quill_core::types::EntityId;
use quill_llm::api::TextGenerator;

use super::request_list;
use crate::error::StageError;

/// Turns one piece of copy into image prompts.
pub struct PromptStage {
    generator: Arc<dyn TextGenerator>,
    templates: Arc<PromptTemplates>,
    temperature: f32,
}

impl PromptStage {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        templates: Arc<PromptTemplates>,
        temperature: f32,
    ) -> Self {
        Self {
            generator,
            templates,
            temperature,
        }
    }

    /// Each returned prompt carries the copy text it illustrates.
    pub async fn generate(
        &self,
        copy: &CopyText,
        count: usize,
        topic_id: EntityId,
        event_id: EntityId,
    ) -> Result<Vec<ImagePrompt>, StageError> {
        let prompt = self.templates.render_image_prompt(&copy.content, count)?;
        let prompts: Vec<ImagePrompt> =
            request_list(self.generator.as_ref(), prompt, self.temperature)
                .await?
                .into_iter()
                .map(|content| ImagePrompt::new(copy.content.clone(), content))
                .collect();

        tracing::info!(
            %event_id,
            %topic_id,
            copy_id = %copy.id,
            requested = count,
            generated = prompts.len(),
            "Image prompts generated",
        );
        Ok(prompts)
    }
}
