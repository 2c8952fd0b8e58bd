// Test fixtures for integration testing

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Build a single-part MusicXML score
///
/// `notes` are `(step, octave)` quarter notes; every four notes start
/// a new measure.
#[allow(dead_code)] // Used in integration tests
pub fn score_xml(title: &str, notes: &[(char, i8)], tempo: Option<u32>) -> String {
    let mut measures = String::new();

    for (m, chunk) in notes.chunks(4).enumerate() {
        measures.push_str(&format!("    <measure number=\"{}\">\n", m + 1));
        if m == 0 {
            measures.push_str(
                "      <attributes>\n\
                 \x20       <divisions>1</divisions>\n\
                 \x20       <key><fifths>0</fifths></key>\n\
                 \x20       <time><beats>4</beats><beat-type>4</beat-type></time>\n\
                 \x20     </attributes>\n",
            );
            if let Some(bpm) = tempo {
                measures.push_str(&format!(
                    "      <direction placement=\"above\"><sound tempo=\"{bpm}\"/></direction>\n"
                ));
            }
        }
        for (step, octave) in chunk {
            measures.push_str(&format!(
                "      <note><pitch><step>{step}</step><octave>{octave}</octave></pitch>\
                 <duration>1</duration><type>quarter</type></note>\n"
            ));
        }
        measures.push_str("    </measure>\n");
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <score-partwise version=\"3.1\">\n\
         \x20 <work><work-title>{title}</work-title></work>\n\
         \x20 <part-list><score-part id=\"P1\"><part-name>Voice</part-name></score-part></part-list>\n\
         \x20 <part id=\"P1\">\n\
         {measures}\
         \x20 </part>\n\
         </score-partwise>\n"
    )
}

/// A short C major melody with a tempo mark
#[allow(dead_code)] // Used in integration tests
pub fn simple_score(title: &str) -> String {
    score_xml(
        title,
        &[
            ('C', 4),
            ('D', 4),
            ('E', 4),
            ('C', 4),
            ('E', 4),
            ('F', 4),
            ('G', 4),
            ('G', 4),
        ],
        Some(96),
    )
}

/// Write a mono 16-bit WAV with a sine tone
#[allow(dead_code)] // Used in integration tests
pub fn write_sine_wav(path: &Path, frequency: f32, seconds: f32, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();

    let total = (seconds * sample_rate as f32) as usize;
    for i in 0..total {
        let t = i as f32 / sample_rate as f32;
        // Quarter-second pulses give the onset detector something to find
        let envelope = if (t * 4.0).fract() < 0.5 { 1.0 } else { 0.2 };
        let sample = (t * frequency * 2.0 * std::f32::consts::PI).sin() * envelope * 0.5;
        writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Input directory with scores, recordings and stems
#[allow(dead_code)] // Used in integration tests
pub struct TestCorpus {
    pub dir: TempDir,
    pub files: Vec<PathBuf>,
}

impl TestCorpus {
    /// Empty corpus directory
    #[allow(dead_code)] // Used in integration tests
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            files: Vec::new(),
        }
    }

    /// Three distinct MusicXML scores
    #[allow(dead_code)] // Used in integration tests
    pub fn symbolic() -> Self {
        let mut corpus = Self::new();
        corpus.add_score("a.musicxml", &simple_score("Alpha"));
        corpus.add_score("b.xml", &simple_score("Beta"));
        corpus.add_score(
            "c.musicxml",
            &score_xml("Gamma", &[('A', 3), ('C', 4), ('E', 4), ('A', 4)], None),
        );
        corpus
    }

    /// Write a file relative to the corpus root
    #[allow(dead_code)] // Used in integration tests
    pub fn add_score(&mut self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        self.files.push(path.clone());
        path
    }

    /// Write a recording, optionally with its vocals stem
    #[allow(dead_code)] // Used in integration tests
    pub fn add_recording(&mut self, name: &str, frequency: f32, with_vocals: bool) -> PathBuf {
        let path = self.dir.path().join(format!("{name}.wav"));
        write_sine_wav(&path, frequency, 2.0, 8000);
        if with_vocals {
            let stem = self.dir.path().join(format!("{name}.vocals.wav"));
            write_sine_wav(&stem, frequency * 2.0, 2.0, 8000);
        }
        self.files.push(path.clone());
        path
    }

    #[allow(dead_code)] // Used in integration tests
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for TestCorpus {
    fn default() -> Self {
        Self::new()
    }
}
