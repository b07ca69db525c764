//! File naming conventions for generated artifacts.
//!
//! Names are deterministic given their inputs so that a record in the
//! result document can always be traced back to its file on disk.

use crate::types::{EntityId, Timestamp};

/// Maximum number of characters of copy text kept in an image filename.
pub const MAX_SLUG_CHARS: usize = 32;

/// Fallback slug when the copy text has no usable characters.
const EMPTY_SLUG: &str = "copy";

/// Generate the filename for an image rendered for a piece of copy.
///
/// Convention: `{slug}_image_{image_id}.png`
///
/// - `slug` = copy text with every run of non-alphanumeric characters
///   collapsed to `_`, trimmed and cut to [`MAX_SLUG_CHARS`]
///
/// # Examples
///
/// ```
/// use quill_core::naming::image_filename;
/// use uuid::Uuid;
///
/// let id = Uuid::nil();
/// assert_eq!(
///     image_filename("Rent is due, again!", id),
///     "rent_is_due_again_image_00000000-0000-0000-0000-000000000000.png",
/// );
/// ```
pub fn image_filename(copy_text: &str, image_id: EntityId) -> String {
    format!("{}_image_{image_id}.png", slugify(copy_text))
}

/// Day folder used to group images and results, e.g. `20250301`.
pub fn day_folder(at: Timestamp) -> String {
    at.format("%Y%m%d").to_string()
}

/// Second-resolution stamp used in result and log filenames.
pub fn run_stamp(at: Timestamp) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Result document filename: `result_{YYYYMMDD_HHMMSS}.json`.
pub fn result_filename(at: Timestamp) -> String {
    format!("result_{}.json", run_stamp(at))
}

/// Run log filename: `process_{YYYYMMDD_HHMMSS}.log`.
pub fn log_filename(at: Timestamp) -> String {
    format!("process_{}.log", run_stamp(at))
}

fn slugify(text: &str) -> String {
    let joined = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    let truncated: String = joined.chars().take(MAX_SLUG_CHARS).collect();
    let slug = truncated.trim_end_matches('_');

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug.to_string()
    }
}
