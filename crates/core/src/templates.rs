//! Prompt templates for the three text stages.
//!
//! Templates use `{placeholder}` tokens. Substituted values are inserted
//! verbatim and never re-scanned, so braces inside an event description
//! are safe.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Regex matching `{placeholder}` tokens in prompt templates.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("valid regex"));

// ---------------------------------------------------------------------------
// Default templates
// ---------------------------------------------------------------------------

pub const DEFAULT_THEME_TEMPLATE: &str = "\
You distil background material into themes that resonate with ordinary \
people: their pressures, hopes and daily routines. Each theme must be \
short, distinct from the others, and easy to express visually.

Extract {count} themes from the following event.
Event: {event_description}

Answer with a JSON array of strings only, for example [\"theme 1\", \"theme 2\"]. \
Do not output anything besides the JSON array.";

pub const DEFAULT_COPY_TEMPLATE: &str = "\
You write sharp, clear-eyed short copy. Each piece dissects a phenomenon: \
first the surface, then the deeper mechanism, then a closing insight that \
leaves the reader with a question. No filler adjectives, no slogans.

Write {count} pieces of copy for the following theme.
Theme: {topic}

Answer with a JSON array of strings only. Do not output anything besides \
the JSON array.";

pub const DEFAULT_IMAGE_PROMPT_TEMPLATE: &str = "\
You turn copy into Stable Diffusion prompts for minimalist Chinese ink-wash \
illustrations. Translate abstract ideas into concrete, instantly readable \
visual metaphors. Prompts must be in English and contain no Chinese \
characters.

Write {count} distinct image prompts for the following copy.
Copy: {copy}

Answer with a JSON array of strings only. Do not output anything besides \
the JSON array.";

// ---------------------------------------------------------------------------
// PromptTemplates
// ---------------------------------------------------------------------------

/// The set of templates used by one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    /// Placeholders: `{count}`, `{event_description}`.
    pub theme: String,
    /// Placeholders: `{count}`, `{topic}`.
    pub copy: String,
    /// Placeholders: `{count}`, `{copy}`.
    pub image_prompt: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME_TEMPLATE.to_string(),
            copy: DEFAULT_COPY_TEMPLATE.to_string(),
            image_prompt: DEFAULT_IMAGE_PROMPT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    pub fn render_theme(&self, event_description: &str, count: usize) -> Result<String, CoreError> {
        render(
            &self.theme,
            &[
                ("count", count.to_string()),
                ("event_description", event_description.to_string()),
            ],
        )
    }

    pub fn render_copy(&self, topic: &str, count: usize) -> Result<String, CoreError> {
        render(
            &self.copy,
            &[("count", count.to_string()), ("topic", topic.to_string())],
        )
    }

    pub fn render_image_prompt(&self, copy: &str, count: usize) -> Result<String, CoreError> {
        render(
            &self.image_prompt,
            &[("count", count.to_string()), ("copy", copy.to_string())],
        )
    }

    /// Check that every template carries the placeholders its stage fills.
    pub fn validate(&self) -> Result<(), CoreError> {
        require_placeholders("theme", &self.theme, &["count", "event_description"])?;
        require_placeholders("copy", &self.copy, &["count", "topic"])?;
        require_placeholders("image_prompt", &self.image_prompt, &["count", "copy"])
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Substitute `{key}` tokens in `template`.
///
/// Fails if the template references a placeholder with no value.
pub fn render(template: &str, values: &[(&str, String)]) -> Result<String, CoreError> {
    let values: HashMap<&str, &str> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let mut unresolved = Vec::new();

    let text = PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures| {
            let key = &caps[1];
            match values.get(key) {
                Some(value) => (*value).to_string(),
                None => {
                    unresolved.push(key.to_string());
                    caps[0].to_string()
                }
            }
        })
        .to_string();

    if unresolved.is_empty() {
        Ok(text)
    } else {
        Err(CoreError::Validation(format!(
            "Unresolved template placeholders: {}",
            unresolved.join(", ")
        )))
    }
}

fn require_placeholders(name: &str, template: &str, required: &[&str]) -> Result<(), CoreError> {
    let present: Vec<String> = PLACEHOLDER_RE
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| !present.iter().any(|p| p == key))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Template '{name}' is missing placeholders: {}",
            missing.join(", ")
        )))
    }
}
