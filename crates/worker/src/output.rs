//! Result document writer.

use std::path::{Path, PathBuf};

use quill_core::content::ResultRecord;
use quill_core::naming;
use quill_core::types::Timestamp;

/// Write `records` as pretty JSON to
/// `{results_dir}/{YYYYMMDD}/result_{YYYYMMDD_HHMMSS}.json`.
pub async fn write_result_document(
    results_dir: &Path,
    records: &[ResultRecord],
    at: Timestamp,
) -> std::io::Result<PathBuf> {
    let dir = results_dir.join(naming::day_folder(at));
    tokio::fs::create_dir_all(&dir).await?;

    let path = dir.join(naming::result_filename(at));
    let body = serde_json::to_vec_pretty(records)?;
    tokio::fs::write(&path, body).await?;
    Ok(path)
}
