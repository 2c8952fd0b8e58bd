//! Audio decoding using symphonia
//!
//! Decodes WAV, FLAC, Ogg Vorbis and MP3 into mono f32 PCM for the
//! audio processors. The duration limit is enforced from the container
//! header when it reports a frame count, and again while decoding.

use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::core::error::{CadenzaError, Result};

/// Stream properties reported by the container and codec
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Codec short name, e.g. `pcm_s16le` or `flac`
    pub codec: String,
    pub bits_per_sample: Option<u32>,
    /// Decoded frames (samples per channel)
    pub frames: u64,
}

impl StreamInfo {
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Decoded audio file, downmixed to mono
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub path: PathBuf,
    pub info: StreamInfo,
    /// Mono samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,
}

impl AudioClip {
    /// Decode an entire audio file
    ///
    /// # Arguments
    ///
    /// * `path` - Audio file to decode
    /// * `max_duration_sec` - Longest accepted duration
    ///
    /// # Errors
    ///
    /// - `UnsupportedFile` when no demuxer recognizes the format
    /// - `ParseFailed` when the file has no audio track
    /// - `AudioTooLong` when the file exceeds `max_duration_sec`
    pub fn decode(path: &Path, max_duration_sec: u64) -> Result<Self> {
        debug!("Decoding audio file: {}", path.display());

        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                debug!("Probe failed for {}: {}", path.display(), e);
                CadenzaError::UnsupportedFile(path.to_path_buf())
            })?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| CadenzaError::parse(path, "no audio track found"))?;

        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| CadenzaError::parse(path, "sample rate not found"))?;
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(1);
        let codec = symphonia::default::get_codecs()
            .get_codec(params.codec)
            .map(|d| d.short_name.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let too_long = |frames: u64| CadenzaError::AudioTooLong {
            path: path.to_path_buf(),
            duration_sec: frames as f64 / sample_rate as f64,
            limit_sec: max_duration_sec,
        };

        // Reject from the header when possible, before decoding anything
        let max_frames = max_duration_sec.saturating_mul(sample_rate as u64);
        if let Some(n_frames) = params.n_frames {
            if n_frames > max_frames {
                return Err(too_long(n_frames));
            }
        }

        let mut decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| CadenzaError::parse(path, format!("unsupported codec: {e}")))?;

        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    warn!("Error reading packet from {}: {}", path.display(), e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let channel_count = spec.channels.count().max(1);
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);

                    for frame in buffer.samples().chunks(channel_count) {
                        samples.push(frame.iter().sum::<f32>() / channel_count as f32);
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping undecodable packet in {}: {}", path.display(), e);
                    continue;
                }
                Err(e) => {
                    return Err(CadenzaError::parse(path, format!("decode failed: {e}")));
                }
            }

            if samples.len() as u64 > max_frames {
                return Err(too_long(samples.len() as u64));
            }
        }

        debug!(
            "Decoded {} frames at {} Hz from {}",
            samples.len(),
            sample_rate,
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            info: StreamInfo {
                sample_rate,
                channels,
                codec,
                bits_per_sample: params.bits_per_sample,
                frames: samples.len() as u64,
            },
            samples,
        })
    }

    /// Build a clip from samples already in memory
    pub fn from_samples(path: impl Into<PathBuf>, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            path: path.into(),
            info: StreamInfo {
                sample_rate,
                channels: 1,
                codec: "pcm_f32".to_string(),
                bits_per_sample: Some(32),
                frames: samples.len() as u64,
            },
            samples,
        }
    }

    pub fn duration_sec(&self) -> f64 {
        self.info.duration_sec()
    }
}
