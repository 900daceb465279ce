// FeatureExtractor - MFCC fingerprinting for engine sound classification
//
// This module turns a decoded recording into the fixed-length feature vector
// the scoring model consumes: the mean of 40 Mel-frequency cepstral
// coefficients over every frame of the recording.
//
// Module organization:
// - types: FeatureVector / FeatureBatch
// - fft: centered STFT with periodic Hann window
// - mel: Slaney mel filterbank, dB conversion
// - dct: orthonormal DCT-II
// - mod.rs: Coordinator (FeatureExtractor) and FeatureConfig
//
// Pipeline per recording:
// 1. Power spectrogram (n_fft = 2048, hop = 512)
// 2. Mel energies (128 bands, fmin = 0, fmax = sr / 2)
// 3. 10 * log10, clipped to 80 dB below the loudest mel bin
// 4. DCT-II (ortho), first 40 coefficients
// 5. Mean over frames
//
// References:
// - Davis, S. & Mermelstein, P. (1980). Comparison of parametric representations
//   for monosyllabic word recognition in continuously spoken sentences

mod dct;
mod fft;
mod mel;
mod types;

pub use types::{FeatureBatch, FeatureVector, FEATURE_LEN};

use serde::{Deserialize, Serialize};

use crate::audio::DecodedAudio;
use crate::error::ClassifyError;
use dct::DctBasis;
use fft::{StftProcessor, DEFAULT_HOP_LENGTH, DEFAULT_N_FFT};
use mel::{clip_dynamic_range, power_to_db, MelFilterbank, DEFAULT_N_MELS, DEFAULT_TOP_DB};

/// Framing and filterbank parameters for MFCC extraction
///
/// The coefficient count is not configurable: it is always `FEATURE_LEN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// FFT window size in samples
    pub n_fft: usize,
    /// Hop size between frames in samples
    pub hop_length: usize,
    /// Number of mel bands fed to the DCT
    pub n_mels: usize,
    /// Lowest filterbank frequency in Hz
    pub fmin: f32,
    /// Highest filterbank frequency in Hz (None = Nyquist)
    pub fmax: Option<f32>,
    /// Dynamic range kept below the loudest bin (None = no clipping)
    pub top_db: Option<f32>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            n_fft: DEFAULT_N_FFT,
            hop_length: DEFAULT_HOP_LENGTH,
            n_mels: DEFAULT_N_MELS,
            fmin: 0.0,
            fmax: None,
            top_db: Some(DEFAULT_TOP_DB),
        }
    }
}

impl FeatureConfig {
    /// Check parameters before building an extractor
    pub fn validate(&self) -> Result<(), String> {
        if self.n_fft < 2 {
            return Err(format!("n_fft must be at least 2 (got {})", self.n_fft));
        }
        if self.hop_length == 0 {
            return Err("hop_length must be greater than 0".to_string());
        }
        if self.n_mels < FEATURE_LEN {
            return Err(format!(
                "n_mels must be at least {} (got {})",
                FEATURE_LEN, self.n_mels
            ));
        }
        if self.fmin < 0.0 {
            return Err(format!("fmin must be non-negative (got {})", self.fmin));
        }
        if let Some(fmax) = self.fmax {
            if fmax <= self.fmin {
                return Err(format!("fmax ({}) must exceed fmin ({})", fmax, self.fmin));
            }
        }
        if let Some(top_db) = self.top_db {
            if top_db < 0.0 {
                return Err(format!("top_db must be non-negative (got {})", top_db));
            }
        }
        Ok(())
    }
}

/// FeatureExtractor coordinates the MFCC pipeline
///
/// Holds the FFT plan, window and DCT basis. The mel filterbank depends on the
/// recording's sample rate and is built per call, since inputs are never
/// resampled. The extractor is immutable and can be shared across threads.
pub struct FeatureExtractor {
    config: FeatureConfig,
    stft: StftProcessor,
    dct: DctBasis,
}

impl FeatureExtractor {
    /// Create a new FeatureExtractor
    ///
    /// `config` must have passed `FeatureConfig::validate`.
    pub fn new(config: FeatureConfig) -> Self {
        let stft = StftProcessor::new(config.n_fft, config.hop_length);
        let dct = DctBasis::new(config.n_mels, FEATURE_LEN);
        Self { config, stft, dct }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract the mean-MFCC feature vector of a decoded recording
    ///
    /// # Errors
    /// `Decode` if the audio is empty or has a zero sample rate.
    pub fn extract(&self, audio: &DecodedAudio) -> Result<FeatureVector, ClassifyError> {
        if audio.samples.is_empty() {
            return Err(ClassifyError::decode("audio contains no samples"));
        }
        if audio.sample_rate == 0 {
            return Err(ClassifyError::decode("sample rate must be greater than 0"));
        }

        let log_mel = self.log_mel_spectrogram(&audio.samples, audio.sample_rate);
        let n_mels = self.config.n_mels;
        let n_frames = log_mel.len() / n_mels;

        let mut sums = [0.0f64; FEATURE_LEN];
        for frame in log_mel.chunks(n_mels) {
            self.dct.accumulate(frame, &mut sums);
        }

        let mut mean = [0.0f32; FEATURE_LEN];
        for (m, s) in mean.iter_mut().zip(sums.iter()) {
            *m = (s / n_frames as f64) as f32;
        }

        log::debug!(
            "[FeatureExtractor] {} samples @ {} Hz -> {} frames",
            audio.samples.len(),
            audio.sample_rate,
            n_frames
        );

        Ok(FeatureVector::new(mean))
    }

    /// Log-power mel spectrogram, row-major [frames, n_mels]
    fn log_mel_spectrogram(&self, samples: &[f32], sample_rate: u32) -> Vec<f32> {
        let nyquist = sample_rate as f32 / 2.0;
        let fmax = match self.config.fmax {
            Some(fmax) if fmax <= nyquist => fmax,
            Some(fmax) => {
                log::debug!(
                    "[FeatureExtractor] fmax {} Hz above Nyquist {} Hz, clamping",
                    fmax,
                    nyquist
                );
                nyquist
            }
            None => nyquist,
        };
        let fmin = self.config.fmin.min(fmax);

        let filterbank = MelFilterbank::new(
            sample_rate,
            self.stft.n_fft(),
            self.config.n_mels,
            fmin,
            fmax,
        );

        let n_mels = self.config.n_mels;
        let mut log_mel = Vec::with_capacity(self.stft.frame_count(samples.len()) * n_mels);
        let mut energies = vec![0.0f32; n_mels];

        self.stft.for_each_power_frame(samples, |power| {
            filterbank.apply(power, &mut energies);
            log_mel.extend(energies.iter().map(|&e| power_to_db(e)));
        });

        if let Some(top_db) = self.config.top_db {
            clip_dynamic_range(&mut log_mel, top_db);
        }

        log_mel
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Generate pure sine wave for testing
    fn generate_sine_wave(sample_rate: u32, frequency: f32, duration_samples: usize) -> Vec<f32> {
        (0..duration_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * frequency * t).sin()
            })
            .collect()
    }

    /// Generate white noise for testing
    fn generate_white_noise(duration_samples: usize) -> Vec<f32> {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        (0..duration_samples)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect()
    }

    fn mono(samples: Vec<f32>, sample_rate: u32) -> DecodedAudio {
        DecodedAudio {
            samples,
            sample_rate,
            source_channels: 1,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = FeatureConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_fft, 2048);
        assert_eq!(config.hop_length, 512);
        assert_eq!(config.n_mels, 128);
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        let mut config = FeatureConfig::default();
        config.n_mels = 20;
        assert!(config.validate().unwrap_err().contains("n_mels"));

        let mut config = FeatureConfig::default();
        config.hop_length = 0;
        assert!(config.validate().is_err());

        let mut config = FeatureConfig::default();
        config.fmin = 500.0;
        config.fmax = Some(100.0);
        assert!(config.validate().unwrap_err().contains("fmax"));
    }

    #[test]
    fn test_vector_length_is_fixed_across_durations_and_rates() {
        let extractor = FeatureExtractor::default();
        for (rate, len) in [(8_000u32, 100usize), (16_000, 16_000), (44_100, 44_100 * 3), (96_000, 5)] {
            let features = extractor
                .extract(&mono(generate_sine_wave(rate, 440.0, len), rate))
                .expect("extract");
            assert_eq!(features.len(), FEATURE_LEN);
            assert_eq!(features.as_slice().len(), FEATURE_LEN);
            assert!(
                features.as_slice().iter().all(|v| v.is_finite()),
                "non-finite feature at {} Hz / {} samples",
                rate,
                len
            );
        }
    }

    #[test]
    fn test_silence_gives_floor_dc_and_no_ripple() {
        let extractor = FeatureExtractor::default();
        let features = extractor
            .extract(&mono(vec![0.0; 22_050], 22_050))
            .expect("silence must not fault");

        // Every log-mel bin sits at the -100 dB floor, so only c0 survives
        let expected_dc = -100.0 * (DEFAULT_N_MELS as f32).sqrt();
        assert!(
            (features.as_slice()[0] - expected_dc).abs() < 0.1,
            "c0 = {}",
            features.as_slice()[0]
        );
        for (k, c) in features.as_slice().iter().enumerate().skip(1) {
            assert!(c.abs() < 1e-2, "c{} = {}", k, c);
        }
    }

    #[test]
    fn test_deterministic_for_identical_input() {
        let extractor = FeatureExtractor::default();
        let audio = mono(generate_white_noise(16_000), 16_000);
        let a = extractor.extract(&audio).unwrap();
        let b = extractor.extract(&audio).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tone_and_noise_have_different_fingerprints() {
        let extractor = FeatureExtractor::default();
        let tone = extractor
            .extract(&mono(generate_sine_wave(16_000, 200.0, 16_000), 16_000))
            .unwrap();
        let noise = extractor
            .extract(&mono(generate_white_noise(16_000), 16_000))
            .unwrap();

        let distance: f32 = tone
            .as_slice()
            .iter()
            .zip(noise.as_slice())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt();
        println!("tone/noise MFCC distance: {}", distance);
        assert!(distance > 1.0);

        // Broadband noise carries more energy overall than a single tone
        assert!(noise.as_slice()[0] > tone.as_slice()[0]);
    }

    #[test]
    fn test_empty_audio_is_decode_error() {
        let extractor = FeatureExtractor::default();
        let err = extractor.extract(&mono(Vec::new(), 16_000)).unwrap_err();
        assert_eq!(err.kind(), "decode_error");
    }

    #[test]
    fn test_fmax_above_nyquist_is_clamped() {
        let config = FeatureConfig {
            fmax: Some(20_000.0),
            ..FeatureConfig::default()
        };
        let extractor = FeatureExtractor::new(config);
        let features = extractor
            .extract(&mono(generate_sine_wave(8_000, 300.0, 8_000), 8_000))
            .expect("extract");
        assert!(features.as_slice().iter().all(|v| v.is_finite()));
    }
}
