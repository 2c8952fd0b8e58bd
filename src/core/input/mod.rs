//! Input decoding.
//!
//! Turns a source file into the parsed form handed to every processor
//! of its domain:
//!
//! - **musicxml**: MusicXML score model (roxmltree)
//! - **audio**: mono PCM decoding (symphonia)

pub mod audio;
pub mod musicxml;

pub use audio::{AudioClip, StreamInfo};
pub use musicxml::{MelodyEvent, Pitch, Score};

use crate::core::error::{CadenzaError, Result};
use crate::core::types::Domain;

/// Parsed form of one input file
#[derive(Debug, Clone)]
pub enum ParsedInput {
    Symbolic(Score),
    Audio(AudioClip),
}

impl ParsedInput {
    pub fn domain(&self) -> Domain {
        match self {
            ParsedInput::Symbolic(_) => Domain::Symbolic,
            ParsedInput::Audio(_) => Domain::Audio,
        }
    }

    /// Borrow the score, failing the named processor otherwise
    pub fn score(&self, processor: &str) -> Result<&Score> {
        match self {
            ParsedInput::Symbolic(score) => Ok(score),
            ParsedInput::Audio(_) => Err(CadenzaError::processor(
                processor,
                "expected a symbolic score, got audio",
            )),
        }
    }

    /// Borrow the audio clip, failing the named processor otherwise
    pub fn audio(&self, processor: &str) -> Result<&AudioClip> {
        match self {
            ParsedInput::Audio(clip) => Ok(clip),
            ParsedInput::Symbolic(_) => Err(CadenzaError::processor(
                processor,
                "expected audio, got a symbolic score",
            )),
        }
    }
}
