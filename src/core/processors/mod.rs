//! Builtin feature processors.
//!
//! - **symbolic**: key, meter, tempo, range, length, credits, contour,
//!   rhythm and n-gram histograms of MusicXML scores
//! - **audio**: stream info, tempo, vocal pitch contour, chords and
//!   loudness of decoded audio
//! - **dsp**: small signal-processing helpers shared by the audio
//!   processors
//!
//! All processors are deterministic. Floating-point results are
//! rounded so that re-running on the same bytes reproduces the same
//! output text.

pub mod audio;
pub mod dsp;
pub mod symbolic;

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::registry::FeatureProcessor;

/// Shortest n-gram counted by the histogram processors
pub const NGRAM_MIN: usize = 3;

/// Longest n-gram counted by the histogram processors
pub const NGRAM_MAX: usize = 9;

/// Decimals kept in floating-point results
pub const FLOAT_DECIMALS: i32 = 3;

/// The builtin catalog in registration order
pub fn builtin() -> Vec<Arc<dyn FeatureProcessor>> {
    vec![
        // Symbolic
        Arc::new(symbolic::KeySignatureProcessor),
        Arc::new(symbolic::PitchProfileKeyProcessor),
        Arc::new(symbolic::TimeSignatureProcessor),
        Arc::new(symbolic::TempoProcessor),
        Arc::new(symbolic::AmbitusProcessor),
        Arc::new(symbolic::MeasureCountProcessor),
        Arc::new(symbolic::CreditsProcessor),
        Arc::new(symbolic::ContourProcessor),
        Arc::new(symbolic::RhythmProcessor),
        Arc::new(symbolic::NGramRhythmProcessor),
        Arc::new(symbolic::NGramPitchProcessor),
        // Audio
        Arc::new(audio::StreamInfoProcessor),
        Arc::new(audio::OnsetTempoProcessor),
        Arc::new(audio::PitchContourProcessor),
        Arc::new(audio::ChromaChordProcessor),
        Arc::new(audio::LoudnessProcessor),
    ]
}

/// Round to `FLOAT_DECIMALS` decimals
pub fn round(value: f64) -> f64 {
    let factor = 10f64.powi(FLOAT_DECIMALS);
    let rounded = (value * factor).round() / factor;
    // Avoid "-0.0" in the output
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Count n-grams of lengths `NGRAM_MIN..=NGRAM_MAX`
///
/// Only n-grams occurring at least twice are kept. Entries are sorted
/// by descending count; ties keep first-occurrence order.
pub fn ngram_histogram(tokens: &[String]) -> Map<String, Value> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, u64> = HashMap::new();

    for n in NGRAM_MIN..=NGRAM_MAX {
        if tokens.len() < n {
            break;
        }
        for window in tokens.windows(n) {
            let gram = window.join(" ");
            let count = counts.entry(gram.clone()).or_insert(0);
            if *count == 0 {
                order.push(gram);
            }
            *count += 1;
        }
    }

    let mut entries: Vec<(String, u64)> = order
        .into_iter()
        .filter_map(|gram| {
            let count = counts.get(&gram).copied().unwrap_or(0);
            (count >= 2).then_some((gram, count))
        })
        .collect();
    // Stable sort keeps first-occurrence order among equal counts
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    entries
        .into_iter()
        .map(|(gram, count)| (gram, Value::from(count)))
        .collect()
}
