//! Audio inputs: decoding, stem dependencies and mixed corpora

use crate::common::{create_test_driver, find_document, read_log, run_corpus, simple_score, TestCorpus};
use tempfile::TempDir;

#[tokio::test]
async fn test_recording_with_vocals_stem() {
    let mut corpus = TestCorpus::new();
    corpus.add_recording("song", 440.0, true);
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");

    let stats = run_corpus(&create_test_driver(None), corpus.path(), &log, "field", &[]).await;

    // The stem is a companion artifact, not an input
    assert_eq!(stats.files_found, 1);
    assert_eq!(stats.files_new, 1);

    let lines = read_log(&log);
    let doc = find_document(&lines, "song.wav");

    let info = &doc["file_info"]["stream_info"];
    assert_eq!(info["sample_rate"], 8000.0);
    assert_eq!(info["channels"], 1);
    assert!((info["duration"].as_f64().unwrap() - 2.0).abs() < 0.01);

    for bucket in ["bpm", "pitch_contour", "chords", "loudness"] {
        assert!(doc.get(bucket).is_some(), "Missing bucket {bucket}");
    }
    assert!(!doc["pitch_contour"]["autocorrelation"]["pitch_contour_hz_voice"]
        .as_array()
        .unwrap()
        .is_empty());
    assert!(doc.get("original_file").is_none());
}

#[tokio::test]
async fn test_missing_vocals_stem_fails_only_that_file() {
    let mut corpus = TestCorpus::new();
    corpus.add_recording("with_stem", 440.0, true);
    corpus.add_recording("without_stem", 330.0, false);
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");

    let stats = run_corpus(&create_test_driver(None), corpus.path(), &log, "field", &[]).await;

    assert_eq!(stats.files_found, 2);
    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.documents_written, 1);
    assert_eq!(read_log(&log)[0]["filename"], "with_stem.wav");
}

#[tokio::test]
async fn test_mixed_corpus_uses_domain_processors() {
    let mut corpus = TestCorpus::new();
    corpus.add_recording("song", 440.0, true);
    corpus.add_score("song.musicxml", &simple_score("Song"));
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");

    let stats = run_corpus(&create_test_driver(None), corpus.path(), &log, "mixed", &[]).await;
    assert_eq!(stats.documents_written, 2);

    let lines = read_log(&log);
    let audio = find_document(&lines, "song.wav");
    let score = find_document(&lines, "song.musicxml");

    assert!(audio.get("loudness").is_some());
    assert!(audio.get("tempo").is_none());
    assert!(score.get("tempo").is_some());
    assert!(score.get("loudness").is_none());
}

#[tokio::test]
async fn test_stem_needed_only_for_pitch_contour() {
    let mut corpus = TestCorpus::new();
    let path = corpus.add_recording("song", 440.0, true);
    let out = TempDir::new().unwrap();
    let log = out.path().join("results.json");
    let driver = create_test_driver(None);

    run_corpus(&driver, corpus.path(), &log, "field", &[]).await;
    let first = read_log(&log);

    // Removing the stem only matters when pitch_contour is recomputed
    std::fs::remove_file(path.with_file_name("song.vocals.wav")).unwrap();

    let stats = run_corpus(&driver, corpus.path(), &log, "field", &["loudness"]).await;
    assert_eq!(stats.files_merged, 1);
    assert_eq!(read_log(&log), first);

    let stats = run_corpus(&driver, corpus.path(), &log, "field", &["pitch_contour"]).await;
    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.documents_written, 0);
}
