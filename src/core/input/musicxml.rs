//! MusicXML score model.
//!
//! Parses `score-partwise` documents with roxmltree into a small,
//! owned model: parts, measures, notes with pitch and duration, plus
//! the key, time and tempo marks the symbolic processors need.
//! Unknown elements are ignored; only malformed XML, a timewise
//! score or a score without parts fail the parse.

use roxmltree::{Node, ParsingOptions};
use std::path::Path;

use crate::core::error::{CadenzaError, Result};

/// Note letter names in diatonic order
const STEPS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];

/// Semitone offset of each step above C
const STEP_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Spelled pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pitch {
    /// Index into `C D E F G A B`
    pub step: u8,
    /// Chromatic alteration in semitones (-1 = flat)
    pub alter: i8,
    pub octave: i8,
}

impl Pitch {
    /// Build from a letter name, e.g. `Pitch::new('F', 1, 4)` for F#4
    pub fn new(step: char, alter: i8, octave: i8) -> Option<Self> {
        let step = STEPS
            .iter()
            .position(|s| *s == step.to_ascii_uppercase())? as u8;
        Some(Self {
            step,
            alter,
            octave,
        })
    }

    /// MIDI note number (C4 = 60)
    pub fn midi(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + STEP_SEMITONES[self.step as usize] + self.alter as i32
    }

    /// Position on the staff counted in diatonic steps from C0
    pub fn diatonic_index(&self) -> i32 {
        self.octave as i32 * 7 + self.step as i32
    }

    /// Pitch name without octave, flats as `-` and sharps as `#`
    pub fn name(&self) -> String {
        let mut name = STEPS[self.step as usize].to_string();
        let accidental = if self.alter < 0 { '-' } else { '#' };
        for _ in 0..self.alter.unsigned_abs() {
            name.push(accidental);
        }
        name
    }

    /// Pitch name with octave, e.g. `B-3`
    pub fn name_with_octave(&self) -> String {
        format!("{}{}", self.name(), self.octave)
    }
}

/// Key signature as written (circle-of-fifths position and mode)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySignature {
    pub fifths: i32,
    pub mode: Option<String>,
}

/// Time signature as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSignature {
    pub beats: String,
    pub beat_type: String,
}

impl TimeSignature {
    /// `beats/beat_type`, e.g. `6/8`
    pub fn ratio_string(&self) -> String {
        format!("{}/{}", self.beats, self.beat_type)
    }
}

/// One `<note>` element
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// `None` for rests and unpitched notes
    pub pitch: Option<Pitch>,
    /// Duration in divisions
    pub duration: u32,
    /// Divisions per quarter note in effect for this note
    pub divisions: u32,
    /// Offset from the start of the measure, in divisions
    pub offset: u32,
    /// Sounds together with the previous note
    pub chord: bool,
    pub grace: bool,
    pub voice: Option<String>,
}

impl Note {
    /// Duration in quarter notes as a reduced fraction
    pub fn quarter_fraction(&self) -> (u32, u32) {
        let divisions = self.divisions.max(1);
        let divisor = gcd(self.duration, divisions).max(1);
        (self.duration / divisor, divisions / divisor)
    }

    /// Duration in quarter notes
    pub fn quarter_length(&self) -> f64 {
        self.duration as f64 / self.divisions.max(1) as f64
    }
}

/// One `<measure>` element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Measure {
    pub number: String,
    pub key: Option<KeySignature>,
    pub time: Option<TimeSignature>,
    /// First tempo mark in the measure, quarter notes per minute
    pub tempo: Option<f64>,
    pub notes: Vec<Note>,
}

/// One `<part>` element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Part {
    pub id: String,
    pub name: Option<String>,
    pub measures: Vec<Measure>,
}

/// `<creator>` entry from the identification block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    /// Role such as `composer` or `lyricist`
    pub kind: Option<String>,
    pub name: String,
}

/// A note or rest on the melodic line of a part
///
/// Simultaneous onsets are collapsed to one event carrying the
/// highest pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MelodyEvent {
    pub measure_index: usize,
    pub offset: u32,
    pub pitch: Option<Pitch>,
    /// Quarter length as a reduced fraction
    pub quarter_fraction: (u32, u32),
}

/// Parsed MusicXML score
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Score {
    pub work_title: Option<String>,
    pub work_number: Option<String>,
    pub movement_title: Option<String>,
    pub movement_number: Option<String>,
    pub creators: Vec<Creator>,
    pub rights: Vec<String>,
    pub parts: Vec<Part>,
}

impl Score {
    /// Parse a MusicXML document
    ///
    /// # Arguments
    ///
    /// * `text` - The XML source
    /// * `path` - Source path, used in error messages only
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(text, options)
            .map_err(|e| CadenzaError::parse(path, format!("invalid XML: {e}")))?;

        let root = doc.root_element();
        match root.tag_name().name() {
            "score-partwise" => {}
            "score-timewise" => {
                return Err(CadenzaError::parse(
                    path,
                    "timewise scores are not supported",
                ))
            }
            other => {
                return Err(CadenzaError::parse(
                    path,
                    format!("expected <score-partwise>, found <{other}>"),
                ))
            }
        }

        let mut score = Score {
            work_title: child(root, "work").and_then(|w| child_text(w, "work-title")),
            work_number: child(root, "work").and_then(|w| child_text(w, "work-number")),
            movement_title: child_text(root, "movement-title"),
            movement_number: child_text(root, "movement-number"),
            ..Score::default()
        };

        if let Some(identification) = child(root, "identification") {
            for node in children(identification, "creator") {
                if let Some(name) = text_of(node) {
                    score.creators.push(Creator {
                        kind: node.attribute("type").map(str::to_string),
                        name,
                    });
                }
            }
            score.rights = children(identification, "rights")
                .filter_map(text_of)
                .collect();
        }

        let part_names: Vec<(String, Option<String>)> = child(root, "part-list")
            .map(|list| {
                children(list, "score-part")
                    .map(|sp| {
                        (
                            sp.attribute("id").unwrap_or_default().to_string(),
                            child_text(sp, "part-name"),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        for part_node in children(root, "part") {
            let id = part_node.attribute("id").unwrap_or_default().to_string();
            let name = part_names
                .iter()
                .find(|(pid, _)| *pid == id)
                .and_then(|(_, name)| name.clone());
            score.parts.push(Part {
                measures: parse_measures(part_node),
                id,
                name,
            });
        }

        if score.parts.is_empty() {
            return Err(CadenzaError::parse(path, "no <part> element"));
        }

        Ok(score)
    }

    /// Title preferring the work title over the movement title
    pub fn title(&self) -> Option<&str> {
        self.work_title
            .as_deref()
            .or(self.movement_title.as_deref())
    }

    /// Measures of the first part
    pub fn first_part_measures(&self) -> &[Measure] {
        self.parts
            .first()
            .map(|p| p.measures.as_slice())
            .unwrap_or(&[])
    }

    /// All pitched, non-grace notes of every part
    pub fn pitched_notes(&self) -> impl Iterator<Item = (&Note, Pitch)> {
        self.parts
            .iter()
            .flat_map(|p| p.measures.iter())
            .flat_map(|m| m.notes.iter())
            .filter(|n| !n.grace)
            .filter_map(|n| n.pitch.map(|p| (n, p)))
    }

    /// Melodic line of the first part
    ///
    /// Grace notes are dropped. A chord contributes its highest note
    /// and any other onset at an already-seen position is skipped.
    pub fn melody(&self) -> Vec<MelodyEvent> {
        let mut events: Vec<MelodyEvent> = Vec::new();

        for (measure_index, measure) in self.first_part_measures().iter().enumerate() {
            // Voices interleave through <backup>, so order onsets by offset
            let mut notes: Vec<&Note> = measure.notes.iter().filter(|n| !n.grace).collect();
            notes.sort_by_key(|n| n.offset);

            for note in notes {
                let same_onset = events
                    .last()
                    .map(|e| e.measure_index == measure_index && e.offset == note.offset)
                    .unwrap_or(false);

                if same_onset {
                    if note.chord {
                        if let Some(last) = events.last_mut() {
                            last.pitch = higher(last.pitch, note.pitch);
                        }
                    }
                    continue;
                }

                events.push(MelodyEvent {
                    measure_index,
                    offset: note.offset,
                    pitch: note.pitch,
                    quarter_fraction: note.quarter_fraction(),
                });
            }
        }

        events
    }
}

fn higher(a: Option<Pitch>, b: Option<Pitch>) -> Option<Pitch> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.midi() > a.midi() { b } else { a }),
        (a, b) => a.or(b),
    }
}

fn parse_measures(part: Node) -> Vec<Measure> {
    let mut measures = Vec::new();
    // Divisions carry over from measure to measure until redefined
    let mut divisions: u32 = 1;

    for measure_node in children(part, "measure") {
        let mut measure = Measure {
            number: measure_node
                .attribute("number")
                .unwrap_or_default()
                .to_string(),
            ..Measure::default()
        };
        let mut cursor: i64 = 0;
        let mut last_onset: u32 = 0;

        for node in measure_node.children().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "attributes" => {
                    if let Some(d) = child_text(node, "divisions").and_then(|t| parse_number(&t))
                    {
                        if d > 0.0 {
                            divisions = d.round() as u32;
                        }
                    }
                    if measure.key.is_none() {
                        measure.key = child(node, "key").and_then(parse_key);
                    }
                    if measure.time.is_none() {
                        measure.time = child(node, "time").and_then(parse_time);
                    }
                }
                "direction" => {
                    if measure.tempo.is_none() {
                        measure.tempo = parse_direction_tempo(node);
                    }
                }
                "sound" => {
                    if measure.tempo.is_none() {
                        measure.tempo = node.attribute("tempo").and_then(parse_number);
                    }
                }
                "note" => {
                    let chord = child(node, "chord").is_some();
                    let grace = child(node, "grace").is_some();
                    let duration = child_text(node, "duration")
                        .and_then(|t| parse_number(&t))
                        .map(|d| d.max(0.0).round() as u32)
                        .unwrap_or(0);

                    let offset = if chord {
                        last_onset
                    } else {
                        cursor.max(0) as u32
                    };

                    measure.notes.push(Note {
                        pitch: child(node, "pitch").and_then(parse_pitch),
                        duration,
                        divisions,
                        offset,
                        chord,
                        grace,
                        voice: child_text(node, "voice"),
                    });

                    if !chord && !grace {
                        last_onset = offset;
                        cursor += duration as i64;
                    }
                }
                "backup" => {
                    cursor -= child_duration(node);
                }
                "forward" => {
                    cursor += child_duration(node);
                }
                _ => {}
            }
        }

        measures.push(measure);
    }

    measures
}

fn child_duration(node: Node) -> i64 {
    child_text(node, "duration")
        .and_then(|t| parse_number(&t))
        .map(|d| d.round() as i64)
        .unwrap_or(0)
}

fn parse_pitch(node: Node) -> Option<Pitch> {
    let step = child_text(node, "step")?.chars().next()?;
    let alter = child_text(node, "alter")
        .and_then(|t| parse_number(&t))
        .map(|a| a.round() as i8)
        .unwrap_or(0);
    let octave = child_text(node, "octave")?.parse::<i8>().ok()?;
    Pitch::new(step, alter, octave)
}

fn parse_key(node: Node) -> Option<KeySignature> {
    let fifths = child_text(node, "fifths")?.parse::<i32>().ok()?;
    Some(KeySignature {
        fifths,
        mode: child_text(node, "mode"),
    })
}

fn parse_time(node: Node) -> Option<TimeSignature> {
    Some(TimeSignature {
        beats: child_text(node, "beats")?,
        beat_type: child_text(node, "beat-type")?,
    })
}

/// Tempo from a `<direction>`: explicit `<sound tempo>` first, then a
/// metronome mark converted to quarter notes per minute
fn parse_direction_tempo(node: Node) -> Option<f64> {
    if let Some(tempo) = child(node, "sound")
        .and_then(|s| s.attribute("tempo"))
        .and_then(parse_number)
    {
        return Some(tempo);
    }

    let metronome = node
        .descendants()
        .find(|n| n.has_tag_name("metronome"))?;
    let per_minute = child_text(metronome, "per-minute").and_then(|t| parse_number(&t))?;
    let unit = child_text(metronome, "beat-unit")?;
    let mut quarters = match unit.as_str() {
        "whole" => 4.0,
        "half" => 2.0,
        "quarter" => 1.0,
        "eighth" => 0.5,
        "16th" => 0.25,
        "32nd" => 0.125,
        _ => return None,
    };
    if children(metronome, "beat-unit-dot").next().is_some() {
        quarters *= 1.5;
    }

    Some(per_minute * quarters)
}

/// Leading numeric part of a string (`"120"`, `" 96.5 "`, `"c. 80"`)
fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if let Ok(v) = trimmed.parse::<f64>() {
        return Some(v);
    }
    let start = trimmed.find(|c: char| c.is_ascii_digit())?;
    let digits: String = trimmed[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().ok()
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| n.has_tag_name(name))
}

fn text_of(node: Node) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn child_text(node: Node, name: &str) -> Option<String> {
    child(node, name).and_then(text_of)
}
