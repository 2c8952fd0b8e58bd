//! Symbolic (MusicXML) processors.

use serde_json::{json, Map, Value};

use crate::core::error::Result;
use crate::core::input::{MelodyEvent, ParsedInput, Pitch, Score};
use crate::core::processors::{ngram_histogram, round};
use crate::core::registry::{FeatureProcessor, FieldSchema};
use crate::core::types::Domain;

/// Major keys from 7 flats to 7 sharps
const MAJOR_KEYS: [&str; 15] = [
    "C-", "G-", "D-", "A-", "E-", "B-", "F", "C", "G", "D", "A", "E", "B", "F#", "C#",
];

/// Minor keys from 7 flats to 7 sharps
const MINOR_KEYS: [&str; 15] = [
    "a-", "e-", "b-", "f", "c", "g", "d", "a", "e", "b", "f#", "c#", "g#", "d#", "a#",
];

/// Pitch-class spelling used for estimated keys
const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "E-", "E", "F", "F#", "G", "A-", "A", "B-", "B",
];

/// Krumhansl-Kessler major key profile
const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler minor key profile
const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Key from the first key signature of the first part
///
/// Major keys are upper case, minor keys lower case (`"F"`, `"d"`).
pub struct KeySignatureProcessor;

impl FeatureProcessor for KeySignatureProcessor {
    fn domain(&self) -> Domain {
        Domain::Symbolic
    }

    fn feature_name(&self) -> &str {
        "key"
    }

    fn algorithm_name(&self) -> &str {
        "key_signature"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::Keyword
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let score = input.score(&self.qualified_name())?;
        let key = score
            .first_part_measures()
            .iter()
            .find_map(|m| m.key.as_ref());

        let Some(key) = key else {
            return Ok(Value::Null);
        };

        let index = (key.fifths.clamp(-7, 7) + 7) as usize;
        let name = if key.mode.as_deref() == Some("minor") {
            MINOR_KEYS[index]
        } else {
            MAJOR_KEYS[index]
        };
        Ok(json!(name))
    }
}

/// Key estimated from the duration-weighted pitch-class histogram
/// (Krumhansl-Schmuckler correlation against major and minor profiles)
pub struct PitchProfileKeyProcessor;

impl PitchProfileKeyProcessor {
    fn histogram(score: &Score) -> [f64; 12] {
        let mut histogram = [0.0; 12];
        for (note, pitch) in score.pitched_notes() {
            // Zero-length notes still count as a sounding pitch
            let weight = note.quarter_length().max(0.25);
            histogram[pitch.midi().rem_euclid(12) as usize] += weight;
        }
        histogram
    }

    fn correlation(histogram: &[f64; 12], profile: &[f64; 12], tonic: usize) -> Option<f64> {
        let n = 12.0;
        let mean_h = histogram.iter().sum::<f64>() / n;
        let mean_p = profile.iter().sum::<f64>() / n;

        let mut cov = 0.0;
        let mut var_h = 0.0;
        let mut var_p = 0.0;
        for (pc, h) in histogram.iter().enumerate() {
            let p = profile[(pc + 12 - tonic) % 12];
            cov += (h - mean_h) * (p - mean_p);
            var_h += (h - mean_h).powi(2);
            var_p += (p - mean_p).powi(2);
        }

        if var_h == 0.0 || var_p == 0.0 {
            return None;
        }
        Some(cov / (var_h.sqrt() * var_p.sqrt()))
    }
}

impl FeatureProcessor for PitchProfileKeyProcessor {
    fn domain(&self) -> Domain {
        Domain::Symbolic
    }

    fn feature_name(&self) -> &str {
        "key"
    }

    fn algorithm_name(&self) -> &str {
        "pitch_profile"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::object([
            ("key", FieldSchema::Keyword),
            ("mode", FieldSchema::Keyword),
            ("correlation", FieldSchema::Float),
        ])
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let score = input.score(&self.qualified_name())?;
        let histogram = Self::histogram(score);

        let mut best: Option<(f64, usize, bool)> = None;
        for tonic in 0..12 {
            for (profile, minor) in [(&MAJOR_PROFILE, false), (&MINOR_PROFILE, true)] {
                if let Some(r) = Self::correlation(&histogram, profile, tonic) {
                    if best.map(|(b, _, _)| r > b).unwrap_or(true) {
                        best = Some((r, tonic, minor));
                    }
                }
            }
        }

        let Some((r, tonic, minor)) = best else {
            return Ok(Value::Null);
        };

        let name = PITCH_CLASS_NAMES[tonic];
        Ok(json!({
            "key": if minor { name.to_lowercase() } else { name.to_string() },
            "mode": if minor { "minor" } else { "major" },
            "correlation": round(r),
        }))
    }
}

/// Time signature of the first measure (`"3/4"`)
pub struct TimeSignatureProcessor;

impl FeatureProcessor for TimeSignatureProcessor {
    fn domain(&self) -> Domain {
        Domain::Symbolic
    }

    fn feature_name(&self) -> &str {
        "time_signature"
    }

    fn algorithm_name(&self) -> &str {
        "first_measure"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::KeywordWithText
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let score = input.score(&self.qualified_name())?;
        Ok(score
            .first_part_measures()
            .first()
            .and_then(|m| m.time.as_ref())
            .map(|t| json!(t.ratio_string()))
            .unwrap_or(Value::Null))
    }
}

/// First tempo mark in score order, quarter notes per minute
pub struct TempoProcessor;

impl FeatureProcessor for TempoProcessor {
    fn domain(&self) -> Domain {
        Domain::Symbolic
    }

    fn feature_name(&self) -> &str {
        "tempo"
    }

    fn algorithm_name(&self) -> &str {
        "metronome_mark"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::Long
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let score = input.score(&self.qualified_name())?;
        let tempo = score
            .parts
            .iter()
            .flat_map(|p| p.measures.iter())
            .find_map(|m| m.tempo);

        Ok(tempo
            .map(|t| json!(t.round() as i64))
            .unwrap_or(Value::Null))
    }
}

/// Lowest and highest sounding pitch over all parts
pub struct AmbitusProcessor;

impl FeatureProcessor for AmbitusProcessor {
    fn domain(&self) -> Domain {
        Domain::Symbolic
    }

    fn feature_name(&self) -> &str {
        "ambitus"
    }

    fn algorithm_name(&self) -> &str {
        "pitch_range"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::object([
            ("min_note", FieldSchema::KeywordWithText),
            ("max_note", FieldSchema::KeywordWithText),
            ("ambitus_semitones", FieldSchema::Long),
        ])
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let score = input.score(&self.qualified_name())?;

        let mut range: Option<(Pitch, Pitch)> = None;
        for (_, pitch) in score.pitched_notes() {
            range = Some(match range {
                None => (pitch, pitch),
                Some((lo, hi)) => (
                    if pitch.midi() < lo.midi() { pitch } else { lo },
                    if pitch.midi() > hi.midi() { pitch } else { hi },
                ),
            });
        }

        let Some((lo, hi)) = range else {
            return Ok(Value::Null);
        };

        Ok(json!({
            "min_note": lo.name_with_octave(),
            "max_note": hi.name_with_octave(),
            "ambitus_semitones": hi.midi() - lo.midi(),
        }))
    }
}

/// Length of the first part in measures and quarter notes
pub struct MeasureCountProcessor;

impl FeatureProcessor for MeasureCountProcessor {
    fn domain(&self) -> Domain {
        Domain::Symbolic
    }

    fn feature_name(&self) -> &str {
        "duration"
    }

    fn algorithm_name(&self) -> &str {
        "measure_count"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::object([
            ("measures", FieldSchema::Long),
            ("quarter_length", FieldSchema::Float),
        ])
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let score = input.score(&self.qualified_name())?;
        let measures = score.first_part_measures();

        let quarter_length: f64 = measures
            .iter()
            .map(|m| {
                m.notes
                    .iter()
                    .filter(|n| !n.grace)
                    .map(|n| (n.offset + n.duration) as f64 / n.divisions.max(1) as f64)
                    .fold(0.0, f64::max)
            })
            .sum();

        Ok(json!({
            "measures": measures.len(),
            "quarter_length": round(quarter_length),
        }))
    }
}

/// Title, creators, rights and part names from the score header
pub struct CreditsProcessor;

impl FeatureProcessor for CreditsProcessor {
    fn domain(&self) -> Domain {
        Domain::Symbolic
    }

    fn feature_name(&self) -> &str {
        "score_metadata"
    }

    fn algorithm_name(&self) -> &str {
        "credits"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::DynamicObject
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let score = input.score(&self.qualified_name())?;
        let mut credits = Map::new();

        let header = [
            ("title", &score.work_title),
            ("work_number", &score.work_number),
            ("movement_title", &score.movement_title),
            ("movement_number", &score.movement_number),
        ];
        for (key, value) in header {
            if let Some(value) = value {
                credits.insert(key.to_string(), json!(value));
            }
        }

        // One entry per creator role, multiple names joined
        for creator in &score.creators {
            let role = creator.kind.clone().unwrap_or_else(|| "creator".to_string());
            match credits.get_mut(&role) {
                Some(Value::String(existing)) => {
                    existing.push_str("; ");
                    existing.push_str(&creator.name);
                }
                _ => {
                    credits.insert(role, json!(creator.name));
                }
            }
        }

        if !score.rights.is_empty() {
            credits.insert("rights".to_string(), json!(score.rights.join("; ")));
        }

        let part_names: Vec<&str> = score
            .parts
            .iter()
            .filter_map(|p| p.name.as_deref())
            .collect();
        if !part_names.is_empty() {
            credits.insert("part_names".to_string(), json!(part_names));
        }

        Ok(Value::Object(credits))
    }
}

/// Indices of events that open a new measure
fn measure_starts(events: &[MelodyEvent]) -> Vec<usize> {
    events
        .iter()
        .enumerate()
        .filter(|(i, e)| *i == 0 || events[i - 1].measure_index != e.measure_index)
        .map(|(i, _)| i)
        .collect()
}

/// Pitched melody of the first part
fn pitched_melody(score: &Score) -> Vec<(MelodyEvent, Pitch)> {
    score
        .melody()
        .into_iter()
        .filter_map(|e| e.pitch.map(|p| (e, p)))
        .collect()
}

/// Melodic contour of the first part: semitone steps, `U`/`D`/`S`
/// direction letters and absolute MIDI numbers
pub struct ContourProcessor;

impl FeatureProcessor for ContourProcessor {
    fn domain(&self) -> Domain {
        Domain::Symbolic
    }

    fn feature_name(&self) -> &str {
        "contour"
    }

    fn algorithm_name(&self) -> &str {
        "melodic_contour"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::object([
            ("melodic_contour_string_relative", FieldSchema::Text),
            ("melodic_contour_string", FieldSchema::Text),
            ("melodic_contour_string_absolute", FieldSchema::Text),
            ("measure_starts", FieldSchema::Long),
        ])
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let score = input.score(&self.qualified_name())?;
        let melody = pitched_melody(score);

        let steps: Vec<i32> = melody
            .windows(2)
            .map(|w| w[1].1.midi() - w[0].1.midi())
            .collect();

        let relative: Vec<String> = steps.iter().map(|s| s.to_string()).collect();
        let directions: Vec<&str> = steps
            .iter()
            .map(|s| match s.signum() {
                1 => "U",
                -1 => "D",
                _ => "S",
            })
            .collect();
        let absolute: Vec<String> = melody.iter().map(|(_, p)| p.midi().to_string()).collect();
        let events: Vec<MelodyEvent> = melody.iter().map(|(e, _)| *e).collect();

        Ok(json!({
            "melodic_contour_string_relative": relative.join(" "),
            "melodic_contour_string": directions.join(" "),
            "melodic_contour_string_absolute": absolute.join(" "),
            "measure_starts": measure_starts(&events),
        }))
    }
}

/// Rhythm tokens (`n/d` quarter lengths) of the first part's melody,
/// rests included
fn rhythm_tokens(events: &[MelodyEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| format!("{}/{}", e.quarter_fraction.0, e.quarter_fraction.1))
        .collect()
}

/// Rhythm string of the first part
pub struct RhythmProcessor;

impl FeatureProcessor for RhythmProcessor {
    fn domain(&self) -> Domain {
        Domain::Symbolic
    }

    fn feature_name(&self) -> &str {
        "rhythm"
    }

    fn algorithm_name(&self) -> &str {
        "rhythm_string"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::object([
            ("measure_starts", FieldSchema::Long),
            (
                "rhythm_string",
                FieldSchema::TextWithKeyword { ignore_above: 8192 },
            ),
        ])
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let score = input.score(&self.qualified_name())?;
        let events = score.melody();

        Ok(json!({
            "rhythm_string": rhythm_tokens(&events).join(" "),
            "measure_starts": measure_starts(&events),
        }))
    }
}

/// Frequent rhythm n-grams of the first part
pub struct NGramRhythmProcessor;

impl FeatureProcessor for NGramRhythmProcessor {
    fn domain(&self) -> Domain {
        Domain::Symbolic
    }

    fn feature_name(&self) -> &str {
        "ngram_rhythm"
    }

    fn algorithm_name(&self) -> &str {
        "frequency_histogram"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::StoredOnly
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let score = input.score(&self.qualified_name())?;
        let tokens = rhythm_tokens(&score.melody());
        Ok(Value::Object(ngram_histogram(&tokens)))
    }
}

/// Directed interval name such as `M+2`, `m-3` or `P+8`
pub fn interval_name(from: Pitch, to: Pitch) -> String {
    const EXPECTED: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

    let steps = to.diatonic_index() - from.diatonic_index();
    let semitones = to.midi() - from.midi();
    let descending = steps < 0 || (steps == 0 && semitones < 0);
    let (steps, semitones) = if descending {
        (-steps, -semitones)
    } else {
        (steps, semitones)
    };

    let simple = (steps % 7) as usize;
    let expected = EXPECTED[simple] + 12 * (steps / 7);
    let delta = semitones - expected;
    let perfect = matches!(simple, 0 | 3 | 4);

    let quality = match (perfect, delta) {
        (true, 0) => "P".to_string(),
        (false, 0) => "M".to_string(),
        (false, -1) => "m".to_string(),
        (_, d) if d > 0 => "A".repeat(d as usize),
        (true, d) => "d".repeat((-d) as usize),
        (false, d) => "d".repeat((-d - 1) as usize),
    };

    let sign = if descending { '-' } else { '+' };
    format!("{quality}{sign}{}", steps + 1)
}

/// Frequent melodic-interval n-grams of the first part
pub struct NGramPitchProcessor;

impl FeatureProcessor for NGramPitchProcessor {
    fn domain(&self) -> Domain {
        Domain::Symbolic
    }

    fn feature_name(&self) -> &str {
        "ngram_pitch"
    }

    fn algorithm_name(&self) -> &str {
        "frequency_histogram"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::StoredOnly
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let score = input.score(&self.qualified_name())?;
        let tokens: Vec<String> = pitched_melody(score)
            .windows(2)
            .map(|w| interval_name(w[0].1, w[1].1))
            .collect();
        Ok(Value::Object(ngram_histogram(&tokens)))
    }
}
