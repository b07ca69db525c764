//! The three text stages: themes from an event, copy from a theme, and
//! image prompts from a copy.
//!
//! Each stage renders its template, sends it as a single user message,
//! and turns every string of the extracted JSON array into one record
//! with a fresh id.

mod copy;
mod prompt;
mod theme;

pub use copy::CopyStage;
pub use prompt::PromptStage;
pub use theme::ThemeStage;

use quill_core::extract::parse_string_array;
use quill_llm::api::TextGenerator;
use quill_llm::messages::ChatMessage;

use crate::error::StageError;

/// Send `prompt` to the generator and decode its answer as a string list.
async fn request_list(
    generator: &dyn TextGenerator,
    prompt: String,
    temperature: f32,
) -> Result<Vec<String>, StageError> {
    let response = generator
        .complete(&[ChatMessage::user(prompt)], temperature)
        .await?;
    let items = parse_string_array(&response).inspect_err(|_| {
        tracing::debug!(response = %response, "No JSON array in model response");
    })?;
    Ok(items)
}
