// DCT module - orthonormal DCT-II over the mel axis
//
// X[0] = sqrt(1/N) * sum(x[n])
// X[k] = sqrt(2/N) * sum(x[n] * cos(pi * k * (2n + 1) / (2N)))   for k > 0

/// Pre-computed DCT-II basis truncated to the first `n_out` coefficients
pub struct DctBasis {
    n_in: usize,
    n_out: usize,
    /// Row-major, shape [n_out, n_in]
    basis: Vec<f32>,
}

impl DctBasis {
    pub fn new(n_in: usize, n_out: usize) -> Self {
        let n = n_in as f64;
        let mut basis = Vec::with_capacity(n_out * n_in);

        for k in 0..n_out {
            let scale = if k == 0 {
                (1.0 / n).sqrt()
            } else {
                (2.0 / n).sqrt()
            };
            for i in 0..n_in {
                let angle = std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n);
                basis.push((scale * angle.cos()) as f32);
            }
        }

        Self {
            n_in,
            n_out,
            basis,
        }
    }

    /// Transform `input` (len n_in) and add the coefficients into `acc` (len n_out)
    pub fn accumulate(&self, input: &[f32], acc: &mut [f64]) {
        debug_assert_eq!(input.len(), self.n_in);
        debug_assert_eq!(acc.len(), self.n_out);

        for (k, slot) in acc.iter_mut().enumerate() {
            let row = &self.basis[k * self.n_in..(k + 1) * self.n_in];
            let coeff: f64 = row
                .iter()
                .zip(input)
                .map(|(&b, &x)| b as f64 * x as f64)
                .sum();
            *slot += coeff;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_input_only_has_dc() {
        let dct = DctBasis::new(128, 40);
        let input = vec![-100.0f32; 128];
        let mut acc = vec![0.0f64; 40];
        dct.accumulate(&input, &mut acc);

        // sqrt(1/128) * 128 * -100
        let expected_dc = -100.0 * 128f64.sqrt();
        assert!((acc[0] - expected_dc).abs() < 1e-3, "dc {}", acc[0]);
        for (k, c) in acc.iter().enumerate().skip(1) {
            assert!(c.abs() < 1e-3, "coefficient {} should vanish, got {}", k, c);
        }
    }

    #[test]
    fn test_basis_rows_are_orthonormal() {
        let n = 16;
        let dct = DctBasis::new(n, n);
        for a in 0..n {
            for b in 0..n {
                let dot: f64 = (0..n)
                    .map(|i| dct.basis[a * n + i] as f64 * dct.basis[b * n + i] as f64)
                    .sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-5, "rows {} {} dot {}", a, b, dot);
            }
        }
    }

    #[test]
    fn test_accumulate_adds_across_calls() {
        let dct = DctBasis::new(4, 2);
        let mut acc = vec![0.0f64; 2];
        dct.accumulate(&[1.0, 1.0, 1.0, 1.0], &mut acc);
        dct.accumulate(&[1.0, 1.0, 1.0, 1.0], &mut acc);
        assert!((acc[0] - 4.0).abs() < 1e-6);
    }
}
