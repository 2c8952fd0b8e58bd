//! Reprocessing documents from a store dump snapshot

use crate::common::{create_test_driver, find_document, read_log, simple_score};
use cadenza::core::hasher::hash_bytes;
use cadenza::core::pipeline::DumpOptions;
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_dump(dir: &Path) -> PathBuf {
    let records = [
        json!({
            "_id": "1",
            "_source": {
                "corpus_id": "archive",
                "filename": "one.musicxml",
                "metadata": {"title": "One"},
                "key": {"key_signature": "stale"},
                "original_file": simple_score("One"),
            }
        }),
        json!({
            "_id": "2",
            "_source": {
                "corpus_id": "archive",
                "filename": "two.musicxml",
                "metadata": {"title": "Two"},
            }
        }),
        json!({
            "_id": "3",
            "_source": {
                "corpus_id": "other",
                "filename": "three.musicxml",
                "metadata": {},
                "original_file": simple_score("Three"),
            }
        }),
    ];

    let text: String = records.iter().map(|r| r.to_string() + "\n").collect();
    let path = dir.join("dump.ndjson");
    std::fs::write(&path, text).unwrap();
    path
}

fn options(dump: &Path, log: &Path) -> DumpOptions {
    DumpOptions {
        dump_path: dump.to_path_buf(),
        log_path: log.to_path_buf(),
        corpus_id: None,
        corpus_filter: None,
    }
}

#[tokio::test]
async fn test_reprocess_skips_record_without_source() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(dir.path());
    let log = dir.path().join("results.json");

    let stats = create_test_driver(None)
        .reprocess_dump(&options(&dump, &log))
        .await
        .unwrap();

    assert_eq!(stats.files_found, 2);
    assert_eq!(stats.documents_written, 2);

    let lines = read_log(&log);
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|doc| doc["filename"] != "two.musicxml"));

    let one = find_document(&lines, "one.musicxml");
    assert_eq!(one["original_file"], json!(simple_score("One")));
    assert_eq!(one["content_hash"], json!(hash_bytes(simple_score("One").as_bytes())));
    assert_eq!(one["key"]["key_signature"], "C");
    assert_eq!(one["tempo"]["metronome_mark"], 96);
    assert_eq!(one["metadata"], json!({"title": "One"}));
    assert_eq!(one["corpus_id"], "archive");

    assert_eq!(find_document(&lines, "three.musicxml")["corpus_id"], "other");
}

#[tokio::test]
async fn test_reprocess_assigns_corpus() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(dir.path());
    let log = dir.path().join("results.json");

    let mut opts = options(&dump, &log);
    opts.corpus_id = Some("merged".to_string());
    create_test_driver(None).reprocess_dump(&opts).await.unwrap();

    for doc in read_log(&log) {
        assert_eq!(doc["corpus_id"], "merged");
    }
}

#[tokio::test]
async fn test_reprocess_filters_by_corpus() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(dir.path());
    let log = dir.path().join("results.json");

    let mut opts = options(&dump, &log);
    opts.corpus_filter = Some("other".to_string());
    let stats = create_test_driver(None).reprocess_dump(&opts).await.unwrap();

    assert_eq!(stats.documents_written, 1);
    let lines = read_log(&log);
    assert_eq!(lines[0]["filename"], "three.musicxml");
}

#[tokio::test]
async fn test_reprocess_looks_up_missing_metadata() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(dir.path());
    let log = dir.path().join("results.json");
    let csv = crate::common::write_metadata_csv(dir.path(), &[("three.xml", "Three", "Ana")]);

    create_test_driver(Some(&csv))
        .reprocess_dump(&options(&dump, &log))
        .await
        .unwrap();

    let lines = read_log(&log);
    assert_eq!(find_document(&lines, "three.musicxml")["metadata"]["performer"], "Ana");
    assert_eq!(find_document(&lines, "one.musicxml")["metadata"], json!({"title": "One"}));
}

#[tokio::test]
async fn test_reprocess_missing_dump_is_config_error() {
    let dir = TempDir::new().unwrap();
    let err = create_test_driver(None)
        .reprocess_dump(&options(&dir.path().join("none.ndjson"), &dir.path().join("out.json")))
        .await
        .unwrap_err();

    assert!(err.is_config_error());
}
