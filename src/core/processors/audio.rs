//! Audio processors.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::core::error::{CadenzaError, Result};
use crate::core::input::{AudioClip, ParsedInput};
use crate::core::processors::dsp;
use crate::core::processors::round;
use crate::core::registry::{FeatureProcessor, FieldSchema};
use crate::core::types::Domain;

/// Stem name of the separated vocal track
pub const VOCALS_STEM: &str = "vocals";

/// Stem name of the separated accompaniment track
pub const ACCOMPANIMENT_STEM: &str = "accompaniment";

/// Path of a separation stem next to `path`: `<stem>.<kind>.<ext>`
pub fn stem_path(path: &Path, kind: &str) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    Some(path.with_file_name(format!("{stem}.{kind}.{ext}")))
}

/// Sample rate, duration, channel count and codec of the source
pub struct StreamInfoProcessor;

impl FeatureProcessor for StreamInfoProcessor {
    fn domain(&self) -> Domain {
        Domain::Audio
    }

    fn feature_name(&self) -> &str {
        "file_info"
    }

    fn algorithm_name(&self) -> &str {
        "stream_info"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::object([
            ("sample_rate", FieldSchema::Float),
            ("duration", FieldSchema::Float),
            ("channels", FieldSchema::Long),
            ("codec", FieldSchema::Keyword),
            ("bits_per_sample", FieldSchema::Long),
        ])
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let clip = input.audio(&self.qualified_name())?;
        Ok(json!({
            "sample_rate": clip.info.sample_rate as f64,
            "duration": round(clip.duration_sec()),
            "channels": clip.info.channels,
            "codec": clip.info.codec,
            "bits_per_sample": clip.info.bits_per_sample,
        }))
    }
}

/// Tempo from the autocorrelation of an onset-strength envelope
///
/// Candidate tempi between 60 and 200 BPM are weighted towards 120 BPM
/// to settle octave ambiguity. Beat ticks are the onset-aligned phase
/// of the winning period, in seconds.
pub struct OnsetTempoProcessor;

impl OnsetTempoProcessor {
    const MIN_BPM: f64 = 60.0;
    const MAX_BPM: f64 = 200.0;
    const PREFERRED_BPM: f64 = 120.0;

    fn estimate(clip: &AudioClip) -> Option<(f64, Vec<f64>)> {
        let sample_rate = clip.info.sample_rate;
        let hop = ((sample_rate as f64 / 100.0).round() as usize).max(1);
        let frame_rate = sample_rate as f64 / hop as f64;

        let energy = dsp::frame_energy(&clip.samples, hop * 2, hop);
        let onsets = dsp::onset_envelope(&energy);

        let min_lag = (60.0 * frame_rate / Self::MAX_BPM).floor().max(1.0) as usize;
        let max_lag = (60.0 * frame_rate / Self::MIN_BPM).ceil() as usize;
        if onsets.len() < max_lag * 2 {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for lag in min_lag..=max_lag {
            let bpm = 60.0 * frame_rate / lag as f64;
            let octaves = (bpm / Self::PREFERRED_BPM).log2();
            let weight = (-0.5 * octaves * octaves).exp();
            let score = dsp::autocorrelation(&onsets, lag) as f64 * weight;
            if best.map(|(_, b)| score > b).unwrap_or(true) {
                best = Some((lag, score));
            }
        }

        let (lag, score) = best?;
        if score <= 0.0 {
            return None;
        }

        // Phase with the most onset energy on the beat grid
        let phase = (0..lag)
            .map(|p| {
                let sum: f32 = onsets.iter().skip(p).step_by(lag).sum();
                (p, sum)
            })
            .fold((0, f32::MIN), |acc, x| if x.1 > acc.1 { x } else { acc })
            .0;

        let ticks = (phase..onsets.len())
            .step_by(lag)
            .map(|f| round(f as f64 / frame_rate))
            .collect();

        Some((round(60.0 * frame_rate / lag as f64), ticks))
    }
}

impl FeatureProcessor for OnsetTempoProcessor {
    fn domain(&self) -> Domain {
        Domain::Audio
    }

    fn feature_name(&self) -> &str {
        "bpm"
    }

    fn algorithm_name(&self) -> &str {
        "onset_autocorrelation"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::object([
            ("bpm", FieldSchema::Float),
            ("beat_ticks", FieldSchema::Float),
        ])
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let clip = input.audio(&self.qualified_name())?;
        Ok(match Self::estimate(clip) {
            Some((bpm, ticks)) => json!({"bpm": bpm, "beat_ticks": ticks}),
            None => json!({"bpm": null, "beat_ticks": []}),
        })
    }
}

/// Pitch contour of the separated vocal stem (and accompaniment stem
/// when present), one value per time step, 0 for unvoiced steps
///
/// The vocal stem `<stem>.vocals.<ext>` must exist next to the source.
pub struct PitchContourProcessor;

impl PitchContourProcessor {
    pub const TIME_STEP_MS: f64 = 20.0;
    const FRAME: usize = 1024;
    const MIN_HZ: f32 = 80.0;
    const MAX_HZ: f32 = 1000.0;
    const VOICING_THRESHOLD: f32 = 0.5;
    const SILENCE_RMS: f32 = 0.01;

    /// Contour of a clip in Hz
    pub fn contour(clip: &AudioClip) -> Vec<f64> {
        let (samples, rate) = dsp::decimate(&clip.samples, clip.info.sample_rate);
        let hop = ((rate as f64 * Self::TIME_STEP_MS / 1000.0).round() as usize).max(1);
        if samples.len() < Self::FRAME {
            return Vec::new();
        }

        (0..=(samples.len() - Self::FRAME) / hop)
            .map(|i| {
                let frame = &samples[i * hop..i * hop + Self::FRAME];
                if dsp::rms(frame) < Self::SILENCE_RMS {
                    return 0.0;
                }
                dsp::estimate_pitch(
                    frame,
                    rate,
                    Self::MIN_HZ,
                    Self::MAX_HZ,
                    Self::VOICING_THRESHOLD,
                )
                .map(|hz| round(hz as f64))
                .unwrap_or(0.0)
            })
            .collect()
    }

    fn decode_stem(path: &Path, source: &AudioClip) -> Result<AudioClip> {
        // Stems are cut from the source, so they share its length
        let limit = source.duration_sec().ceil() as u64 + 1;
        AudioClip::decode(path, limit)
    }
}

impl FeatureProcessor for PitchContourProcessor {
    fn domain(&self) -> Domain {
        Domain::Audio
    }

    fn feature_name(&self) -> &str {
        "pitch_contour"
    }

    fn algorithm_name(&self) -> &str {
        "autocorrelation"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::object([
            ("pitch_contour_hz_voice", FieldSchema::Float),
            ("pitch_contour_hz_instrumental", FieldSchema::Float),
            ("time_step_ms", FieldSchema::Float),
        ])
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let name = self.qualified_name();
        let clip = input.audio(&name)?;

        let vocals = stem_path(&clip.path, VOCALS_STEM)
            .ok_or_else(|| CadenzaError::processor(&name, "source path has no stem"))?;
        if !vocals.exists() {
            return Err(CadenzaError::MissingDependency {
                processor: name,
                dependency: vocals,
            });
        }

        let voice = Self::contour(&Self::decode_stem(&vocals, clip)?);

        let instrumental = match stem_path(&clip.path, ACCOMPANIMENT_STEM) {
            Some(path) if path.exists() => Self::contour(&Self::decode_stem(&path, clip)?),
            _ => Vec::new(),
        };

        Ok(json!({
            "pitch_contour_hz_voice": voice,
            "pitch_contour_hz_instrumental": instrumental,
            "time_step_ms": Self::TIME_STEP_MS,
        }))
    }
}

/// Chord labels from chroma vectors matched against major and minor
/// triad templates, one label per half-second segment
pub struct ChromaChordProcessor;

impl ChromaChordProcessor {
    pub const SEGMENT_SEC: f64 = 0.5;
    const FRAME: usize = 4096;
    const SILENCE_RMS: f32 = 0.01;
    const NAMES: [&'static str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];

    fn chroma(frame: &[f32], rate: u32) -> [f32; 12] {
        let mut chroma = [0.0f32; 12];
        // C3 to B5
        for midi in 48..84 {
            let hz = dsp::midi_to_hz(midi);
            if hz * 2.0 >= rate as f32 {
                break;
            }
            chroma[(midi % 12) as usize] += dsp::goertzel_power(frame, rate, hz);
        }
        chroma
    }

    fn label(chroma: &[f32; 12]) -> String {
        let mut best = (f32::MIN, String::new());
        for root in 0..12 {
            for (third, suffix) in [(4, ""), (3, "m")] {
                let score = chroma[root] + chroma[(root + third) % 12] + chroma[(root + 7) % 12];
                if score > best.0 {
                    best = (score, format!("{}{}", Self::NAMES[root], suffix));
                }
            }
        }
        best.1
    }

    /// Per-segment chord labels, `N` for silent segments
    pub fn segments(clip: &AudioClip) -> Vec<String> {
        let (samples, rate) = dsp::decimate(&clip.samples, clip.info.sample_rate);
        let hop = ((rate as f64 * Self::SEGMENT_SEC).round() as usize).max(1);
        let frame_len = Self::FRAME.min(hop.max(1));

        samples
            .chunks(hop)
            .filter(|segment| segment.len() >= frame_len / 2)
            .map(|segment| {
                let frame = &segment[..frame_len.min(segment.len())];
                if dsp::rms(frame) < Self::SILENCE_RMS {
                    "N".to_string()
                } else {
                    Self::label(&Self::chroma(frame, rate))
                }
            })
            .collect()
    }
}

impl FeatureProcessor for ChromaChordProcessor {
    fn domain(&self) -> Domain {
        Domain::Audio
    }

    fn feature_name(&self) -> &str {
        "chords"
    }

    fn algorithm_name(&self) -> &str {
        "chroma_template"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::object([
            ("chord_sequence", FieldSchema::Text),
            ("chord_changes", FieldSchema::StoredOnly),
        ])
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let clip = input.audio(&self.qualified_name())?;
        let segments = Self::segments(clip);

        let mut sequence: Vec<&str> = Vec::new();
        let mut changes: Vec<Value> = Vec::new();
        for (i, label) in segments.iter().enumerate() {
            if sequence.last() != Some(&label.as_str()) {
                sequence.push(label);
                changes.push(json!({
                    "time": round(i as f64 * Self::SEGMENT_SEC),
                    "chord": label,
                }));
            }
        }

        Ok(json!({
            "chord_sequence": sequence.join(" "),
            "chord_changes": changes,
        }))
    }
}

/// Overall RMS and peak level in dBFS
pub struct LoudnessProcessor;

impl FeatureProcessor for LoudnessProcessor {
    fn domain(&self) -> Domain {
        Domain::Audio
    }

    fn feature_name(&self) -> &str {
        "loudness"
    }

    fn algorithm_name(&self) -> &str {
        "rms"
    }

    fn schema_fragment(&self) -> FieldSchema {
        FieldSchema::object([
            ("rms_db", FieldSchema::Float),
            ("peak_db", FieldSchema::Float),
        ])
    }

    fn run(&self, input: &ParsedInput) -> Result<Value> {
        let clip = input.audio(&self.qualified_name())?;
        let peak = clip
            .samples
            .iter()
            .fold(0.0f32, |m, s| m.max(s.abs()));

        Ok(json!({
            "rms_db": round(dsp::to_db(dsp::rms(&clip.samples) as f64)),
            "peak_db": round(dsp::to_db(peak as f64)),
        }))
    }
}
