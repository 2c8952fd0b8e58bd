//! Signal-processing helpers for the audio processors.

/// Working sample rate the analysis processors decimate towards
pub const ANALYSIS_RATE: u32 = 11025;

/// Floor for decibel values of silent signals
pub const SILENCE_DB: f64 = -120.0;

/// Decimate by box-averaging towards `ANALYSIS_RATE`
///
/// # Returns
///
/// The decimated samples and their sample rate
pub fn decimate(samples: &[f32], sample_rate: u32) -> (Vec<f32>, u32) {
    let factor = (sample_rate / ANALYSIS_RATE).max(1) as usize;
    if factor == 1 {
        return (samples.to_vec(), sample_rate);
    }

    let decimated = samples
        .chunks(factor)
        .map(|c| c.iter().sum::<f32>() / c.len() as f32)
        .collect();
    (decimated, sample_rate / factor as u32)
}

/// Root-mean-square of a slice
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Amplitude to decibels full scale, floored at `SILENCE_DB`
pub fn to_db(amplitude: f64) -> f64 {
    if amplitude <= 0.0 {
        return SILENCE_DB;
    }
    (20.0 * amplitude.log10()).max(SILENCE_DB)
}

/// Per-frame RMS energy with the given frame and hop sizes
pub fn frame_energy(samples: &[f32], frame: usize, hop: usize) -> Vec<f32> {
    if frame == 0 || hop == 0 || samples.len() < frame {
        return Vec::new();
    }
    (0..=(samples.len() - frame) / hop)
        .map(|i| rms(&samples[i * hop..i * hop + frame]))
        .collect()
}

/// Onset strength: half-wave rectified difference of log energy
pub fn onset_envelope(energy: &[f32]) -> Vec<f32> {
    let log_energy: Vec<f32> = energy.iter().map(|e| (1.0 + 100.0 * e).ln()).collect();
    let mut onsets = Vec::with_capacity(log_energy.len());
    onsets.push(0.0);
    for w in log_energy.windows(2) {
        onsets.push((w[1] - w[0]).max(0.0));
    }
    onsets
}

/// Autocorrelation at `lag`, normalized by the number of terms
pub fn autocorrelation(signal: &[f32], lag: usize) -> f32 {
    if lag >= signal.len() {
        return 0.0;
    }
    let n = signal.len() - lag;
    let sum: f32 = (0..n).map(|i| signal[i] * signal[i + lag]).sum();
    sum / n as f32
}

/// Fundamental frequency of a frame by normalized autocorrelation
///
/// Returns `None` for unvoiced frames (no lag in range correlates
/// above `threshold` relative to lag zero).
pub fn estimate_pitch(
    frame: &[f32],
    sample_rate: u32,
    min_hz: f32,
    max_hz: f32,
    threshold: f32,
) -> Option<f32> {
    let min_lag = (sample_rate as f32 / max_hz).floor().max(1.0) as usize;
    let max_lag = (sample_rate as f32 / min_hz).ceil() as usize;
    if max_lag >= frame.len() {
        return None;
    }

    let energy: f32 = frame.iter().map(|s| s * s).sum();
    if energy <= f32::EPSILON {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    for lag in min_lag..=max_lag {
        let n = frame.len() - lag;
        let sum: f32 = (0..n).map(|i| frame[i] * frame[i + lag]).sum();
        let normalized = sum / energy * frame.len() as f32 / n as f32;
        if best.map(|(_, b)| normalized > b).unwrap_or(true) {
            best = Some((lag, normalized));
        }
    }

    let (lag, strength) = best?;
    if strength < threshold {
        return None;
    }

    // Parabolic interpolation around the peak for sub-sample accuracy
    let refined = if lag > min_lag && lag < max_lag {
        let at = |l: usize| -> f32 {
            let n = frame.len() - l;
            (0..n).map(|i| frame[i] * frame[i + l]).sum::<f32>() / n as f32
        };
        let (a, b, c) = (at(lag - 1), at(lag), at(lag + 1));
        let denom = a - 2.0 * b + c;
        if denom.abs() > f32::EPSILON {
            lag as f32 + 0.5 * (a - c) / denom
        } else {
            lag as f32
        }
    } else {
        lag as f32
    };

    Some(sample_rate as f32 / refined)
}

/// Signal power at one frequency (Goertzel algorithm)
pub fn goertzel_power(frame: &[f32], sample_rate: u32, frequency: f32) -> f32 {
    let omega = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    let coeff = 2.0 * omega.cos();
    let (mut s_prev, mut s_prev2) = (0.0f32, 0.0f32);
    for sample in frame {
        let s = sample + coeff * s_prev - s_prev2;
        s_prev2 = s_prev;
        s_prev = s;
    }
    (s_prev2 * s_prev2 + s_prev * s_prev - coeff * s_prev * s_prev2).max(0.0)
}

/// Frequency of a MIDI note (A4 = 440 Hz)
pub fn midi_to_hz(midi: i32) -> f32 {
    440.0 * 2f32.powf((midi - 69) as f32 / 12.0)
}
