//! # Pitch Estimation Module
//!
//! Time-domain autocorrelation pitch estimation for monophonic signals.
//! Works directly on waveform frames, without a spectral transform:
//! the fundamental period shows up as the first lag at which the frame
//! strongly resembles a shifted copy of itself.
//!
//! ## Features
//! - RMS gating to filter out silence before any correlation work
//! - Lag search restricted to a configurable frequency band
//! - Two scoring conventions: similarity peak picking and global
//!   minimum accumulated difference
//! - Defensive handling of degenerate frames (empty, too short, silent)

/// Allowed fundamental-frequency band for the lag search, in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl FrequencyBand {
    /// Wide band for generic melodic material.
    pub const WIDE: FrequencyBand = FrequencyBand {
        min_hz: 70.0,
        max_hz: 1200.0,
    };

    /// Band tuned for guitar-range fundamentals.
    pub const GUITAR: FrequencyBand = FrequencyBand {
        min_hz: 75.0,
        max_hz: 450.0,
    };

    pub fn contains(&self, hz: f32) -> bool {
        hz >= self.min_hz && hz <= self.max_hz
    }
}

/// Lag scoring convention used by the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scoring {
    /// Normalize and invert the accumulated difference into a
    /// similarity in [0, 1]; accept the first true local peak above
    /// the confidence threshold.
    #[default]
    Similarity,
    /// Pick the lag with the globally smallest accumulated absolute
    /// difference within the band.
    MinDifference,
}

/// Tunable thresholds for [`detect_pitch`].
#[derive(Debug, Clone, Copy)]
pub struct PitchConfig {
    /// Frames with RMS below this are treated as silence.
    pub silence_rms: f32,
    /// Accepted fundamental band; also bounds the lag search.
    pub band: FrequencyBand,
    /// Minimum similarity for a lag to count as a detection
    /// (similarity scoring only).
    pub confidence: f32,
    pub scoring: Scoring,
}

impl Default for PitchConfig {
    fn default() -> Self {
        PitchConfig {
            silence_rms: 0.005,
            band: FrequencyBand::GUITAR,
            confidence: 0.85,
            scoring: Scoring::default(),
        }
    }
}

/// Root-mean-square amplitude of a frame.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

/// Estimates the fundamental frequency of a monophonic frame.
///
/// The silence gate runs first: quiet frames return `None` without any
/// correlation work. The lag search then scans offsets corresponding to
/// the configured band and converts the winning lag back to a frequency
/// (`sample_rate / lag`), which is finally checked against the band to
/// reject out-of-range winners.
///
/// # Arguments
/// * `signal` - Time-domain samples, normalized to roughly [-1, 1]
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Thresholds and scoring convention
///
/// # Returns
/// * `Some(frequency)` - Detected fundamental in Hz
/// * `None` - Silence, noise, or no confident period in range
pub fn detect_pitch(signal: &[f32], sample_rate: u32, config: &PitchConfig) -> Option<f32> {
    if signal.is_empty() || sample_rate == 0 {
        return None;
    }

    // Noise gate: never correlate silence.
    if rms(signal) < config.silence_rms {
        return None;
    }

    // Frequency bounds become lag bounds. Short lags are high pitches.
    let min_lag = ((sample_rate as f32 / config.band.max_hz).floor() as usize).max(1);
    let max_lag = ((sample_rate as f32 / config.band.min_hz).ceil() as usize).min(signal.len() / 2);
    if min_lag >= max_lag {
        return None;
    }

    let lag = match config.scoring {
        Scoring::Similarity => best_lag_similarity(signal, min_lag, max_lag, config.confidence),
        Scoring::MinDifference => best_lag_min_difference(signal, min_lag, max_lag),
    }?;

    let frequency = sample_rate as f32 / lag as f32;
    config.band.contains(frequency).then_some(frequency)
}

/// Similarity scoring: mean absolute difference per lag, inverted so a
/// perfect match scores 1.0. Accepts the first rising-then-falling peak
/// above `confidence`.
fn best_lag_similarity(
    signal: &[f32],
    min_lag: usize,
    max_lag: usize,
    confidence: f32,
) -> Option<usize> {
    let window = signal.len() - max_lag;
    let mut best_lag = None;
    let mut best_score = confidence;
    let mut last_score = 0.0f32;

    for lag in min_lag..=max_lag {
        let mut diff = 0.0f32;
        for i in 0..window {
            diff += (signal[i] - signal[i + lag]).abs();
        }
        let score = 1.0 - diff / window as f32;

        if score > confidence && score > last_score {
            if score > best_score {
                best_score = score;
                best_lag = Some(lag);
            }
        } else if best_lag.is_some() {
            // Past the peak of the first confident correlation ridge.
            break;
        }
        last_score = score;
    }

    best_lag
}

/// Min-difference scoring: the lag with the smallest accumulated
/// absolute difference wins outright.
fn best_lag_min_difference(signal: &[f32], min_lag: usize, max_lag: usize) -> Option<usize> {
    let window = signal.len() - max_lag;
    let mut best: Option<(usize, f32)> = None;

    for lag in min_lag..=max_lag {
        let mut diff = 0.0f32;
        for i in 0..window {
            diff += (signal[i] - signal[i + lag]).abs();
        }
        if best.is_none_or(|(_, d)| diff < d) {
            best = Some((lag, diff));
        }
    }

    best.map(|(lag, _)| lag)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44100;
    const FRAME: usize = 4096;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE as f32).sin()
            })
            .collect()
    }

    #[test]
    fn silence_returns_none_regardless_of_content() {
        let config = PitchConfig::default();

        let zeros = vec![0.0f32; FRAME];
        assert_eq!(detect_pitch(&zeros, SAMPLE_RATE, &config), None);

        // A perfectly periodic signal still counts as silence when it
        // is quiet enough.
        let quiet = sine(220.0, 0.003, FRAME);
        assert!(rms(&quiet) < config.silence_rms);
        assert_eq!(detect_pitch(&quiet, SAMPLE_RATE, &config), None);
    }

    #[test]
    fn sine_waves_detected_within_two_percent() {
        let config = PitchConfig::default();

        for freq in [82.41f32, 110.0, 196.0, 246.94, 329.63, 440.0] {
            let frame = sine(freq, 0.8, FRAME);
            let detected = detect_pitch(&frame, SAMPLE_RATE, &config)
                .unwrap_or_else(|| panic!("no pitch for {freq} Hz"));
            let error = (detected - freq).abs() / freq;
            assert!(
                error < 0.02,
                "{freq} Hz detected as {detected} Hz ({:.2}% off)",
                error * 100.0
            );
        }
    }

    #[test]
    fn min_difference_scoring_agrees_on_clean_low_tones() {
        let config = PitchConfig {
            scoring: Scoring::MinDifference,
            ..PitchConfig::default()
        };

        // Low fundamentals: the doubled period falls outside the lag
        // range, so the global minimum cannot land on a subharmonic.
        for freq in [82.41f32, 110.0, 147.0] {
            let frame = sine(freq, 0.8, FRAME);
            let detected = detect_pitch(&frame, SAMPLE_RATE, &config)
                .unwrap_or_else(|| panic!("no pitch for {freq} Hz"));
            assert!((detected - freq).abs() / freq < 0.02);
        }
    }

    #[test]
    fn below_band_tone_rejected() {
        // 50 Hz sits below the guitar band floor of 75 Hz; its true
        // period is longer than any candidate lag.
        let frame = sine(50.0, 0.8, FRAME);
        assert_eq!(detect_pitch(&frame, SAMPLE_RATE, &PitchConfig::default()), None);
    }

    #[test]
    fn wide_band_accepts_higher_pitches() {
        let config = PitchConfig {
            band: FrequencyBand::WIDE,
            ..PitchConfig::default()
        };
        let frame = sine(880.0, 0.8, FRAME);
        let detected = detect_pitch(&frame, SAMPLE_RATE, &config).expect("no pitch for 880 Hz");
        assert!((detected - 880.0).abs() / 880.0 < 0.02);
    }

    #[test]
    fn degenerate_input_never_panics() {
        let config = PitchConfig::default();
        assert_eq!(detect_pitch(&[], SAMPLE_RATE, &config), None);
        assert_eq!(detect_pitch(&[0.5; 16], SAMPLE_RATE, &config), None);
        assert_eq!(detect_pitch(&sine(220.0, 0.8, FRAME), 0, &config), None);
    }
}
