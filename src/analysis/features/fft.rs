// FFT module - Short-time Fourier transform
//
// Frames are centered: the signal is zero-padded by n_fft / 2 on both sides,
// so frame t covers samples [t * hop - n_fft / 2, t * hop + n_fft / 2) and the
// frame count is 1 + len / hop. Each frame is multiplied by a periodic Hann
// window before the FFT.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Default FFT window size
pub const DEFAULT_N_FFT: usize = 2048;

/// Default hop between consecutive frames
pub const DEFAULT_HOP_LENGTH: usize = 512;

/// Pre-planned STFT that yields power spectra frame by frame
///
/// The plan and window are computed once; `for_each_power_frame` only
/// allocates per-call scratch, so one processor can be shared across threads.
pub struct StftProcessor {
    fft: Arc<dyn Fft<f32>>,
    n_fft: usize,
    hop_length: usize,
    /// Periodic Hann window (pre-computed)
    window: Vec<f32>,
}

impl StftProcessor {
    /// Create a new STFT processor
    ///
    /// # Arguments
    /// * `n_fft` - FFT window size
    /// * `hop_length` - Samples between frame starts
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(n_fft);

        let window = (0..n_fft)
            .map(|i| {
                0.5 - 0.5 * ((2.0 * std::f64::consts::PI * i as f64) / n_fft as f64).cos()
            })
            .map(|w| w as f32)
            .collect();

        Self {
            fft,
            n_fft,
            hop_length,
            window,
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Number of positive-frequency bins per frame
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of centered frames for a signal of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// Compute `|X|^2` for every frame and hand it to `visit`
    ///
    /// The slice passed to `visit` has `n_bins()` entries and is reused
    /// between frames.
    pub fn for_each_power_frame<F>(&self, signal: &[f32], mut visit: F)
    where
        F: FnMut(&[f32]),
    {
        let pad = (self.n_fft / 2) as isize;
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];
        let mut power = vec![0.0f32; self.n_bins()];

        for frame in 0..self.frame_count(signal.len()) {
            let start = (frame * self.hop_length) as isize - pad;

            for (i, slot) in buffer.iter_mut().enumerate() {
                let idx = start + i as isize;
                let sample = if idx >= 0 && (idx as usize) < signal.len() {
                    signal[idx as usize]
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (p, c) in power.iter_mut().zip(buffer.iter()) {
                *p = c.norm_sqr();
            }

            visit(&power);
        }
    }
}
