// Mel module - Slaney-style mel filterbank and log-power conversion
//
// The filterbank uses the Slaney mel scale (linear below 1 kHz, logarithmic
// above) with triangular filters normalized to unit area, matching the
// reference MFCC front-end the classifier was trained on.
//
// References:
// - Slaney, M. (1998). Auditory Toolbox, Technical Report #1998-010

/// Default number of mel bands
pub const DEFAULT_N_MELS: usize = 128;

/// Floor applied before taking the logarithm of power values
pub const AMIN: f32 = 1e-10;

/// Default dynamic range kept below the loudest bin, in dB
pub const DEFAULT_TOP_DB: f32 = 80.0;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert Hz to Slaney mels
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert Slaney mels to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filterbank for one sample rate / FFT size
pub struct MelFilterbank {
    n_mels: usize,
    n_bins: usize,
    /// Row-major weights, shape [n_mels, n_bins]
    weights: Vec<f32>,
}

impl MelFilterbank {
    /// Build the filterbank
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate of the analysed signal in Hz
    /// * `n_fft` - FFT size used for the power spectrum
    /// * `n_mels` - Number of mel bands
    /// * `fmin` / `fmax` - Frequency range covered by the bands, in Hz
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f32, fmax: f32) -> Self {
        let n_bins = n_fft / 2 + 1;
        let nyquist = sample_rate as f64 / 2.0;

        let fft_freqs: Vec<f64> = (0..n_bins)
            .map(|i| i as f64 * nyquist / (n_bins - 1).max(1) as f64)
            .collect();

        let mel_min = hz_to_mel(fmin as f64);
        let mel_max = hz_to_mel(fmax as f64);
        let mel_points: Vec<f64> = (0..n_mels + 2)
            .map(|i| {
                let mel = mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64;
                mel_to_hz(mel)
            })
            .collect();

        let mut weights = vec![0.0f32; n_mels * n_bins];
        for m in 0..n_mels {
            let lower_width = mel_points[m + 1] - mel_points[m];
            let upper_width = mel_points[m + 2] - mel_points[m + 1];
            // Slaney area normalization
            let enorm = 2.0 / (mel_points[m + 2] - mel_points[m]);

            for (k, &freq) in fft_freqs.iter().enumerate() {
                let lower = (freq - mel_points[m]) / lower_width;
                let upper = (mel_points[m + 2] - freq) / upper_width;
                let w = lower.min(upper).max(0.0);
                weights[m * n_bins + k] = (w * enorm) as f32;
            }
        }

        Self {
            n_mels,
            n_bins,
            weights,
        }
    }

    /// Project one power spectrum onto the mel bands
    pub fn apply(&self, power: &[f32], out: &mut [f32]) {
        debug_assert_eq!(power.len(), self.n_bins);
        debug_assert_eq!(out.len(), self.n_mels);

        for (m, energy) in out.iter_mut().enumerate() {
            let row = &self.weights[m * self.n_bins..(m + 1) * self.n_bins];
            *energy = row.iter().zip(power).map(|(w, p)| w * p).sum();
        }
    }

    #[cfg(test)]
    fn row(&self, m: usize) -> &[f32] {
        &self.weights[m * self.n_bins..(m + 1) * self.n_bins]
    }
}

/// Convert a power value to decibels relative to 1.0
pub fn power_to_db(power: f32) -> f32 {
    10.0 * power.max(AMIN).log10()
}

/// Clamp every value to at most `top_db` below the maximum
pub fn clip_dynamic_range(values: &mut [f32], top_db: f32) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return;
    }
    let floor = max - top_db;
    for v in values.iter_mut() {
        if *v < floor {
            *v = floor;
        }
    }
}
