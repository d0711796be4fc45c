//! Analysis tapers applied to the sample block before estimation.

use rustfft::num_complex::Complex;
use std::f64::consts::PI;

/// Taper shapes.
///
/// All shapes use the non-periodic convention: phase increment
/// `2π / window_length`, sample `n` at phase `n · 2π / window_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Taper {
    /// HFT90D four-term flat-top window.
    #[default]
    FlatTop,
    /// Hann window (raised cosine).
    Hann,
    /// Blackman window.
    Blackman,
}

impl Taper {
    /// Coefficient at index `n` of a `len`-sample taper.
    pub fn coefficient(self, n: usize, len: usize) -> f32 {
        let z = 2.0 * PI * n as f64 / len as f64;
        let w = match self {
            Taper::FlatTop => {
                1.0 - 1.942604 * z.cos() + 1.340318 * (2.0 * z).cos()
                    - 0.440811 * (3.0 * z).cos()
                    + 0.043097 * (4.0 * z).cos()
            }
            Taper::Hann => 0.5 * (1.0 - z.cos()),
            Taper::Blackman => 0.42 - 0.5 * z.cos() + 0.08 * (2.0 * z).cos(),
        };
        w as f32
    }

    /// Fill `out` with the taper coefficients for `out.len()` samples.
    pub fn fill(self, out: &mut [f32]) {
        let len = out.len();
        for (n, w) in out.iter_mut().enumerate() {
            *w = self.coefficient(n, len);
        }
    }

    /// Get taper coefficients.
    pub fn coefficients(self, len: usize) -> Vec<f32> {
        let mut coeffs = vec![0.0; len];
        self.fill(&mut coeffs);
        coeffs
    }
}

/// Multiply `samples` by `taper` element-wise, in place.
pub fn apply_taper(samples: &mut [Complex<f32>], taper: &[f32]) {
    debug_assert_eq!(samples.len(), taper.len());
    for (x, &w) in samples.iter_mut().zip(taper) {
        *x *= w;
    }
}
