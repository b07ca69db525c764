use std::sync::Arc;

use quill_core::content::{CopyText, Theme};
use quill_core::templates::PromptTemplates;
use quill_core::types::EntityId;
use quill_llm::api::TextGenerator;

use super::request_list;
use crate::error::StageError;

/// Writes copy for one theme.
pub struct CopyStage {
    generator: Arc<dyn TextGenerator>,
    templates: Arc<PromptTemplates>,
    temperature: f32,
}

impl CopyStage {
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

    pub async fn generate(
        &self,
        theme: &Theme,
        count: usize,
        event_id: EntityId,
    ) -> Result<Vec<CopyText>, StageError> {
        let prompt = self.templates.render_copy(&theme.content, count)?;
        let copies: Vec<CopyText> = request_list(self.generator.as_ref(), prompt, self.temperature)
            .await?
            .into_iter()
            .map(CopyText::new)
            .collect();

        tracing::info!(
            %event_id,
            topic_id = %theme.id,
            requested = count,
            generated = copies.len(),
            "Copy generated",
        );
        Ok(copies)
    }
}
