//! Directory runs: fresh output, idempotent reruns and failure isolation

use crate::common::{
    create_test_driver, find_document, read_log, run_corpus, simple_score, TestCorpus,
};
use cadenza::core::pipeline::ExistingOutputIndex;
use cadenza::core::registry::ProcessorRegistry;
use cadenza::Domain;
use std::collections::HashSet;
use tempfile::TempDir;

fn symbolic_buckets() -> Vec<String> {
    ProcessorRegistry::builtin()
        .unwrap()
        .feature_names(Domain::Symbolic)
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_fresh_run_two_files() {
    let mut corpus = TestCorpus::new();
    corpus.add_score("a.musicxml", &simple_score("Alpha"));
    corpus.add_score("b.musicxml", &simple_score("Beta"));
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");

    let stats = run_corpus(&create_test_driver(None), corpus.path(), &log, "folk", &[]).await;

    assert_eq!(stats.files_found, 2);
    assert_eq!(stats.files_new, 2);
    assert_eq!(stats.documents_written, 2);

    let lines = read_log(&log);
    assert_eq!(lines.len(), 2);

    let hashes: HashSet<&str> = lines
        .iter()
        .map(|doc| doc["content_hash"].as_str().unwrap())
        .collect();
    assert_eq!(hashes.len(), 2, "Each file should have a distinct hash");

    for doc in &lines {
        assert_eq!(doc["corpus_id"], "folk");
        for bucket in symbolic_buckets() {
            assert!(
                doc.get(&bucket).is_some(),
                "Document {} is missing bucket {bucket}",
                doc["filename"]
            );
        }
        assert!(doc["original_file"].as_str().unwrap().contains("score-partwise"));
    }
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let corpus = TestCorpus::symbolic();
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");
    let driver = create_test_driver(None);

    run_corpus(&driver, corpus.path(), &log, "first", &[]).await;
    let first = read_log(&log);

    let stats = run_corpus(&driver, corpus.path(), &log, "second", &[]).await;
    let second = read_log(&log);

    assert_eq!(stats.files_merged, 3);
    assert_eq!(stats.files_new, 0);
    assert_eq!(first.len(), second.len());

    for before in &first {
        let filename = before["filename"].as_str().unwrap();
        let after = find_document(&second, filename);

        assert_eq!(after["corpus_id"], "second");
        assert_eq!(after["content_hash"], before["content_hash"]);

        let mut before = before.clone();
        let mut after = after.clone();
        before.as_object_mut().unwrap().remove("corpus_id");
        after.as_object_mut().unwrap().remove("corpus_id");
        assert_eq!(before, after, "Only corpus_id may change for {filename}");
    }
}

#[tokio::test]
async fn test_modified_file_is_treated_as_new() {
    let mut corpus = TestCorpus::new();
    let a = corpus.add_score("a.musicxml", &simple_score("Alpha"));
    corpus.add_score("b.musicxml", &simple_score("Beta"));
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");
    let driver = create_test_driver(None);

    run_corpus(&driver, corpus.path(), &log, "folk", &[]).await;
    let first = read_log(&log);

    std::fs::write(&a, simple_score("Alpha revised")).unwrap();
    let stats = run_corpus(&driver, corpus.path(), &log, "folk", &[]).await;
    let second = read_log(&log);

    assert_eq!(stats.files_new, 1);
    assert_eq!(stats.files_merged, 1);

    let a_before = find_document(&first, "a.musicxml");
    let a_after = find_document(&second, "a.musicxml");
    assert_ne!(a_before["content_hash"], a_after["content_hash"]);
    assert_eq!(a_after["score_metadata"]["credits"]["title"], "Alpha revised");

    assert_eq!(
        find_document(&first, "b.musicxml"),
        find_document(&second, "b.musicxml")
    );
}

#[tokio::test]
async fn test_bad_file_does_not_stop_batch() {
    let mut corpus = TestCorpus::symbolic();
    corpus.add_score("broken.musicxml", "<score-partwise><part>");
    corpus.add_score("binary.xml", "\u{0}\u{1}not xml at all");
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");

    let stats = run_corpus(&create_test_driver(None), corpus.path(), &log, "folk", &[]).await;

    assert_eq!(stats.files_found, 5);
    assert_eq!(stats.files_failed, 2);
    assert_eq!(stats.documents_written, 3);
    assert_eq!(read_log(&log).len(), 3);
}

#[tokio::test]
async fn test_backup_holds_previous_log() {
    let corpus = TestCorpus::symbolic();
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");
    let driver = create_test_driver(None);

    run_corpus(&driver, corpus.path(), &log, "folk", &[]).await;
    let first = std::fs::read_to_string(&log).unwrap();

    run_corpus(&driver, corpus.path(), &log, "folk", &[]).await;

    let backup = std::fs::read_to_string(out.path().join("results.json.backup.json")).unwrap();
    assert_eq!(backup, first);
    assert!(!out.path().join("results.json.run.json").exists());
}

#[tokio::test]
async fn test_prior_log_with_malformed_line() {
    let corpus = TestCorpus::symbolic();
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");
    let driver = create_test_driver(None);

    run_corpus(&driver, corpus.path(), &log, "folk", &[]).await;

    // Corrupt the log: one garbage line between valid ones
    let mut text = std::fs::read_to_string(&log).unwrap();
    text.insert_str(0, "{not json\n");
    std::fs::write(&log, &text).unwrap();

    let index = ExistingOutputIndex::load(&log).unwrap();
    assert_eq!(index.len(), 3);

    let stats = run_corpus(&driver, corpus.path(), &log, "folk", &[]).await;
    assert_eq!(stats.files_merged, 3);
    assert_eq!(read_log(&log).len(), 3);
}

#[tokio::test]
async fn test_interrupted_run_resumes() {
    let corpus = TestCorpus::symbolic();
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");

    run_corpus(&create_test_driver(None), corpus.path(), &log, "folk", &[]).await;
    let complete = read_log(&log);

    // A run cancelled before dispatch truncates the log and keeps its marker
    let cancelled = create_test_driver(None);
    cancelled.cancellation_token().cancel();
    let stats = run_corpus(&cancelled, corpus.path(), &log, "folk", &[]).await;
    assert!(stats.cancelled);
    assert_eq!(read_log(&log).len(), 0);
    assert!(out.path().join("results.json.run.json").exists());

    // The next run recovers prior documents from the backup
    let stats = run_corpus(&create_test_driver(None), corpus.path(), &log, "folk", &[]).await;
    assert!(stats.resumed);
    assert_eq!(stats.files_merged, 3);

    let resumed = read_log(&log);
    for doc in &complete {
        let filename = doc["filename"].as_str().unwrap();
        assert_eq!(find_document(&resumed, filename), doc);
    }
    assert!(!out.path().join("results.json.run.json").exists());
}

#[tokio::test]
async fn test_nested_directories_need_recursive() {
    let mut corpus = TestCorpus::new();
    corpus.add_score("top.musicxml", &simple_score("Top"));
    corpus.add_score("nested/deep.musicxml", &simple_score("Deep"));
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");

    let stats = run_corpus(&create_test_driver(None), corpus.path(), &log, "folk", &[]).await;

    assert_eq!(stats.files_found, 1);
    assert_eq!(find_document(&read_log(&log), "top.musicxml")["filename"], "top.musicxml");
}

#[tokio::test]
async fn test_empty_corpus_id_is_rejected() {
    let corpus = TestCorpus::symbolic();
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");

    let err = create_test_driver(None)
        .run(&crate::common::run_options(corpus.path(), &log, "  ", &[]))
        .await
        .unwrap_err();

    assert!(err.is_config_error());
    assert!(!log.exists());
}

#[tokio::test]
async fn test_missing_output_directory_is_rejected() {
    let corpus = TestCorpus::symbolic();
    let out = TempDir::new().unwrap();
    let log = out.path().join("missing").join("results.json");

    let result = create_test_driver(None)
        .run(&crate::common::run_options(corpus.path(), &log, "folk", &[]))
        .await;

    assert!(result.unwrap_err().is_config_error());
}
