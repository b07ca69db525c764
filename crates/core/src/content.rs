//! Content data model for one event run.
//!
//! An [`Event`] fans out into [`Theme`]s, each theme into [`CopyText`]s,
//! each copy into [`ImagePrompt`]s and finally [`GeneratedImage`]s. The
//! surviving (theme, copy) pairs are emitted as [`ResultRecord`]s, which
//! serialize into the per-event result document.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{new_id, EntityId};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// The free-text input of a pipeline run.
///
/// Exists only for the duration of one run. Downstream records refer to it
/// through `event_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EntityId,
    pub description: String,
}

impl Event {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            description: description.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Theme / copy / prompt
// ---------------------------------------------------------------------------

/// A short creative angle derived from the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: EntityId,
    pub content: String,
}

impl Theme {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            content: content.into(),
        }
    }
}

/// Short-form written content derived from a theme.
///
/// The parent theme id is carried alongside by the orchestrator rather
/// than embedded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyText {
    pub id: EntityId,
    pub content: String,
}

impl CopyText {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            content: content.into(),
        }
    }
}

/// An illustration instruction derived from one piece of copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePrompt {
    pub id: EntityId,
    /// Text of the copy this prompt illustrates.
    #[serde(rename = "copy")]
    pub copy_text: String,
    /// The prompt sent to the image service.
    pub content: String,
}

impl ImagePrompt {
    pub fn new(copy_text: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            copy_text: copy_text.into(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// An image that passed the service audit and was written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub id: EntityId,
    #[serde(rename = "path")]
    pub local_path: PathBuf,
    /// Seed reported by the image service, when it sends one.
    pub seed: Option<i64>,
}

/// Final output unit: one (theme, copy) pair with its prompts and images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub event_id: EntityId,
    pub topic: Theme,
    pub copy: CopyText,
    pub prompts: Vec<ImagePrompt>,
    pub images: Vec<GeneratedImage>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_assign_distinct_ids() {
        let a = Theme::new("night shift");
        let b = Theme::new("night shift");
        assert_ne!(a.id, b.id);
        assert_eq!(a.content, b.content);
    }

    #[test]
    fn prompt_serializes_copy_text_as_copy() {
        let prompt = ImagePrompt::new("the copy", "ink wash of a subway");
        let json = serde_json::to_value(&prompt).expect("serialization should succeed");

        assert_eq!(json["copy"], "the copy");
        assert_eq!(json["content"], "ink wash of a subway");
        assert!(json.get("copy_text").is_none());
    }

    #[test]
    fn result_record_uses_document_field_names() {
        let record = ResultRecord {
            event_id: new_id(),
            topic: Theme::new("t"),
            copy: CopyText::new("c"),
            prompts: vec![],
            images: vec![GeneratedImage {
                id: new_id(),
                local_path: PathBuf::from("out/c_image_1.png"),
                seed: Some(42),
            }],
        };

        let json = serde_json::to_value(&record).expect("serialization should succeed");
        assert!(json["event_id"].is_string());
        assert_eq!(json["topic"]["content"], "t");
        assert_eq!(json["copy"]["content"], "c");
        assert_eq!(json["images"][0]["path"], "out/c_image_1.png");
        assert_eq!(json["images"][0]["seed"], 42);
    }
}
