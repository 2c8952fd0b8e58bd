//! Overwrite directives: partial, full, metadata and corpus reassignment

use crate::common::{
    create_test_driver, find_document, read_log, run_corpus, write_metadata_csv, TestCorpus,
};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

/// Rewrite every line of an output log in place
fn rewrite_log(path: &Path, mut edit: impl FnMut(&mut Value)) {
    let lines: Vec<String> = read_log(path)
        .into_iter()
        .map(|mut doc| {
            edit(&mut doc);
            doc.to_string()
        })
        .collect();
    std::fs::write(path, lines.join("\n") + "\n").unwrap();
}

#[tokio::test]
async fn test_partial_overwrite_changes_only_named_bucket() {
    let corpus = TestCorpus::symbolic();
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");
    let driver = create_test_driver(None);

    run_corpus(&driver, corpus.path(), &log, "folk", &[]).await;
    let fresh = read_log(&log);

    // Stale values in two buckets; only tempo is requested
    rewrite_log(&log, |doc| {
        doc["tempo"]["metronome_mark"] = json!(1);
        doc["ambitus"]["pitch_range"] = json!({"stale": true});
    });
    let tampered = read_log(&log);

    let stats = run_corpus(&driver, corpus.path(), &log, "folk", &["tempo"]).await;
    assert_eq!(stats.files_merged, 3);

    let after = read_log(&log);
    for before in &tampered {
        let filename = before["filename"].as_str().unwrap();
        let doc = find_document(&after, filename);

        assert_eq!(doc["tempo"], find_document(&fresh, filename)["tempo"]);
        assert_eq!(doc["ambitus"]["pitch_range"], json!({"stale": true}));

        for (name, bucket) in before.as_object().unwrap() {
            if name != "tempo" {
                assert_eq!(&doc[name], bucket, "Bucket {name} of {filename} changed");
            }
        }
    }
}

#[tokio::test]
async fn test_partial_overwrite_keeps_bucket_order() {
    let corpus = TestCorpus::symbolic();
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");
    let driver = create_test_driver(None);

    run_corpus(&driver, corpus.path(), &log, "folk", &[]).await;
    let first = std::fs::read_to_string(&log).unwrap();

    run_corpus(&driver, corpus.path(), &log, "folk", &["tempo", "key"]).await;
    let second = std::fs::read_to_string(&log).unwrap();

    let mut first: Vec<&str> = first.lines().collect();
    let mut second: Vec<&str> = second.lines().collect();
    first.sort();
    second.sort();
    assert_eq!(first, second, "Recomputed buckets should serialize identically");
}

#[tokio::test]
async fn test_full_overwrite_ignores_prior_values() {
    let corpus = TestCorpus::symbolic();
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");
    let driver = create_test_driver(None);

    run_corpus(&driver, corpus.path(), &log, "folk", &[]).await;
    let fresh = read_log(&log);

    rewrite_log(&log, |doc| {
        doc["key"] = json!({"key_signature": "stale"});
        doc["metadata"] = json!({"title": "stale"});
        doc["obsolete_bucket"] = json!({"old_algorithm": 1});
    });

    let stats = run_corpus(&driver, corpus.path(), &log, "folk", &["all"]).await;
    assert_eq!(stats.files_new, 3);
    assert_eq!(stats.files_merged, 0);

    let after = read_log(&log);
    for doc in &fresh {
        let filename = doc["filename"].as_str().unwrap();
        assert_eq!(find_document(&after, filename), doc);
    }
}

#[tokio::test]
async fn test_corpus_id_follows_current_run() {
    let corpus = TestCorpus::symbolic();
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");
    let driver = create_test_driver(None);

    run_corpus(&driver, corpus.path(), &log, "first", &[]).await;

    for (corpus_id, overwrite) in [
        ("second", vec![]),
        ("third", vec!["tempo"]),
        ("fourth", vec!["all"]),
    ] {
        run_corpus(&driver, corpus.path(), &log, corpus_id, &overwrite).await;
        for doc in read_log(&log) {
            assert_eq!(doc["corpus_id"], corpus_id);
        }
    }
}

#[tokio::test]
async fn test_metadata_refresh() {
    let corpus = TestCorpus::symbolic();
    let meta_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");

    let csv = write_metadata_csv(meta_dir.path(), &[("a.musicxml", "Alpha", "Ana")]);
    run_corpus(&create_test_driver(Some(&csv)), corpus.path(), &log, "folk", &[]).await;

    let first = read_log(&log);
    assert_eq!(find_document(&first, "a.musicxml")["metadata"]["performer"], "Ana");
    assert_eq!(find_document(&first, "b.xml")["metadata"], json!({}));

    // New CSV values are ignored until metadata is requested
    let csv = write_metadata_csv(meta_dir.path(), &[("a.musicxml", "Alpha", "Bor")]);
    let driver = create_test_driver(Some(&csv));

    run_corpus(&driver, corpus.path(), &log, "folk", &[]).await;
    assert_eq!(
        find_document(&read_log(&log), "a.musicxml")["metadata"]["performer"],
        "Ana"
    );

    run_corpus(&driver, corpus.path(), &log, "folk", &["metadata"]).await;
    let refreshed = read_log(&log);
    let doc = find_document(&refreshed, "a.musicxml");
    assert_eq!(doc["metadata"]["performer"], "Bor");
    assert_eq!(doc["key"], find_document(&first, "a.musicxml")["key"]);
}

#[tokio::test]
async fn test_unknown_overwrite_name_is_config_error() {
    let corpus = TestCorpus::symbolic();
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");

    let err = create_test_driver(None)
        .run(&crate::common::run_options(corpus.path(), &log, "folk", &["tempo", "bogus"]))
        .await
        .unwrap_err();

    assert!(err.is_config_error());
    assert!(err.to_string().contains("bogus"));
}

#[tokio::test]
async fn test_missing_bucket_in_prior_document_is_computed() {
    let corpus = TestCorpus::symbolic();
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");
    let driver = create_test_driver(None);

    run_corpus(&driver, corpus.path(), &log, "folk", &[]).await;
    let fresh = read_log(&log);

    rewrite_log(&log, |doc| {
        doc.as_object_mut().unwrap().remove("contour");
    });

    run_corpus(&driver, corpus.path(), &log, "folk", &[]).await;
    for doc in read_log(&log) {
        let filename = doc["filename"].as_str().unwrap();
        assert_eq!(doc["contour"], find_document(&fresh, filename)["contour"]);
    }
}
