use std::sync::Arc;

use quill_core::content::Theme;
use quill_core::templates::PromptTemplates;
use quill_core::types::EntityId;
use quill_llm::api::TextGenerator;

use super::request_list;
use crate::error::StageError;

/// Derives themes from an event description.
pub struct ThemeStage {
    generator: Arc<dyn TextGenerator>,
    templates: Arc<PromptTemplates>,
    temperature: f32,
}

impl ThemeStage {
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

    /// Ask for `count` themes. Returns one [`Theme`] per string the model
    /// answered with, which may be more or fewer than requested.
    pub async fn extract(
        &self,
        description: &str,
        count: usize,
        event_id: EntityId,
    ) -> Result<Vec<Theme>, StageError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let prompt = self.templates.render_theme(description, count)?;
        let themes: Vec<Theme> = request_list(self.generator.as_ref(), prompt, self.temperature)
            .await?
            .into_iter()
            .map(Theme::new)
            .collect();

        tracing::info!(%event_id, requested = count, extracted = themes.len(), "Themes extracted");
        Ok(themes)
    }
}
