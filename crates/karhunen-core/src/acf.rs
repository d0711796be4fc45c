//! Biased sample autocorrelation and Toeplitz matrix construction.
//!
//! # Definition
//!
//! ```text
//! r[k] = Σ_{i=0}^{N-1-k} x[i+k] · conj(x[i]),   k = 0..order-1
//! ```
//!
//! No division by `N`: only the relative eigenstructure of the resulting
//! matrix matters.
//!
//! # FFT Estimator
//!
//! For long windows the lags can also be computed through the
//! Wiener-Khinchin relation on a zero-padded transform:
//!
//! ```text
//! r = IFFT( |FFT(x)|² ) / M,   M = next_pow2(2N)
//! ```
//!
//! Padding to at least `2N − 1` keeps the circular result free of wrap-around.

use crate::buffer;
use crate::config::AutocorrelationMethod;
use crate::error::{KltError, Result};
use crate::packed::PackedHermitian;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Direct biased autocorrelation of `x` for lags `0..lags.len()`.
pub fn autocorrelation_direct(x: &[Complex<f32>], lags: &mut [Complex<f32>]) {
    let n = x.len();
    for (k, r) in lags.iter_mut().enumerate() {
        let mut acc = Complex::new(0.0, 0.0);
        for i in 0..n.saturating_sub(k) {
            acc += x[i + k] * x[i].conj();
        }
        *r = acc;
    }
}

struct FftPlan {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    work: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

/// Autocorrelation estimator writing straight into a [`PackedHermitian`].
pub struct AutocorrelationEstimator {
    window_length: usize,
    order: usize,
    fft: Option<FftPlan>,
}

impl std::fmt::Debug for AutocorrelationEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutocorrelationEstimator")
            .field("window_length", &self.window_length)
            .field("order", &self.order)
            .field("method", &self.method())
            .finish()
    }
}

impl AutocorrelationEstimator {
    /// Create an estimator for `window_length`-sample blocks and `order` lags.
    ///
    /// FFT plans and scratch are built here; [`estimate`](Self::estimate)
    /// never allocates.
    pub fn new(window_length: usize, order: usize, method: AutocorrelationMethod) -> Result<Self> {
        let fft = match method {
            AutocorrelationMethod::Direct => None,
            AutocorrelationMethod::Fft => {
                let size = window_length
                    .checked_mul(2)
                    .and_then(usize::checked_next_power_of_two)
                    .ok_or(KltError::Allocation {
                        buffer: "fft work",
                        len: usize::MAX,
                    })?;
                // Planning allocates infallibly; reserve the work buffer first.
                let work = buffer::zeroed("fft work", size)?;
                let mut planner = FftPlanner::new();
                let forward = planner.plan_fft_forward(size);
                let inverse = planner.plan_fft_inverse(size);
                let scratch_len = forward
                    .get_inplace_scratch_len()
                    .max(inverse.get_inplace_scratch_len());
                Some(FftPlan {
                    forward,
                    inverse,
                    work,
                    scratch: buffer::zeroed("fft scratch", scratch_len)?,
                })
            }
        };
        Ok(Self {
            window_length,
            order,
            fft,
        })
    }

    /// Estimation method in use.
    pub fn method(&self) -> AutocorrelationMethod {
        if self.fft.is_some() {
            AutocorrelationMethod::Fft
        } else {
            AutocorrelationMethod::Direct
        }
    }

    /// Compute the lags of `x` into column 0 of `matrix`, then expand to the
    /// full Toeplitz matrix.
    pub fn estimate(&mut self, x: &[Complex<f32>], matrix: &mut PackedHermitian) {
        debug_assert_eq!(x.len(), self.window_length);
        debug_assert_eq!(matrix.order(), self.order);
        let lags = &mut matrix.as_mut_slice()[..self.order];
        match self.fft.as_mut() {
            None => autocorrelation_direct(x, lags),
            Some(plan) => {
                let size = plan.work.len();
                plan.work[..x.len()].copy_from_slice(x);
                plan.work[x.len()..].fill(Complex::new(0.0, 0.0));
                plan.forward
                    .process_with_scratch(&mut plan.work, &mut plan.scratch);
                for v in plan.work.iter_mut() {
                    *v = Complex::new(v.norm_sqr(), 0.0);
                }
                plan.inverse
                    .process_with_scratch(&mut plan.work, &mut plan.scratch);
                let scale = 1.0 / size as f32;
                for (r, v) in lags.iter_mut().zip(&plan.work) {
                    *r = v * scale;
                }
            }
        }
        matrix.expand_toeplitz();
    }
}
