//! Integration tests for the result document writer.

use std::path::PathBuf;

use chrono::TimeZone;
use quill_core::content::{CopyText, GeneratedImage, ImagePrompt, ResultRecord, Theme};
use quill_core::types::new_id;
use quill_worker::output::write_result_document;

fn record() -> ResultRecord {
    let copy = CopyText::new("Payday is a rumour.");
    ResultRecord {
        event_id: new_id(),
        topic: Theme::new("wages"),
        prompts: vec![ImagePrompt::new(copy.content.clone(), "an empty wallet, ink wash")],
        copy,
        images: vec![GeneratedImage {
            id: new_id(),
            local_path: PathBuf::from("output/images/20250301/payday_is_a_rumour_image_1.png"),
            seed: Some(77),
        }],
    }
}

// ---------------------------------------------------------------------------
// Test: document location and shape
// ---------------------------------------------------------------------------

/// The document lands in a day folder and is named after the run time.
#[tokio::test]
async fn document_is_written_to_dated_path() {
    let tmp = tempfile::tempdir().unwrap();
    let at = chrono::Utc.with_ymd_and_hms(2025, 3, 1, 14, 5, 9).unwrap();

    let path = write_result_document(&tmp.path().join("logs"), &[record()], at)
        .await
        .unwrap();

    assert_eq!(
        path,
        tmp.path().join("logs/20250301/result_20250301_140509.json")
    );
}

/// The file holds the full record list with the document field names.
#[tokio::test]
async fn document_contains_all_records() {
    let tmp = tempfile::tempdir().unwrap();
    let records = vec![record(), record()];

    let path = write_result_document(tmp.path(), &records, chrono::Utc::now())
        .await
        .unwrap();

    let body = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    let items = parsed.as_array().expect("top-level array");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["topic"]["content"], "wages");
    assert_eq!(items[0]["copy"]["content"], "Payday is a rumour.");
    assert_eq!(items[0]["prompts"][0]["copy"], "Payday is a rumour.");
    assert_eq!(items[0]["images"][0]["seed"], 77);
    // Pretty-printed for humans.
    assert!(body.contains('\n'));
}

/// An empty run still produces a valid (empty) document.
#[tokio::test]
async fn empty_run_writes_empty_array() {
    let tmp = tempfile::tempdir().unwrap();

    let path = write_result_document(tmp.path(), &[], chrono::Utc::now())
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(path).unwrap(), "[]");
}
