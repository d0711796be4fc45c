//! Per-block transform engine.
//!
//! [`KltEngine`] owns the sample window, every scratch array and the three
//! output buffers. All of them are sized from the [`EngineConfig`] once, at
//! construction; [`KltEngine::transform`] never allocates.
//!
//! # Pipeline
//!
//! ```text
//! samples ─► [taper] ─► autocorrelation ─► tridiagonalize ─► select ─►
//!   inverse iteration + back-transform ─► [normalize] ─► project ─► weight
//! ```
//!
//! Any decomposition failure zeroes all three outputs before the error is
//! returned, so a caller writing the outputs unconditionally keeps every
//! downstream record aligned.

use crate::acf::AutocorrelationEstimator;
use crate::buffer;
use crate::config::EngineConfig;
use crate::eigen::{HermitianEigenSolver, SelectionInfo};
use crate::error::Result;
use crate::packed::PackedHermitian;
use crate::projection::{project, weight_basis};
use crate::window::apply_taper;
use rustfft::num_complex::Complex;

/// Engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Buffers allocated, nothing processed.
    Constructed,
    /// Outputs hold the result of the last `transform()` call.
    Ready,
}

/// Divide every eigenvalue by the largest magnitude.
///
/// A zero maximum leaves the values untouched.
pub fn normalize_eigenvalues(eigenvalues: &mut [f32]) {
    let max = eigenvalues.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    if max > 0.0 {
        for v in eigenvalues.iter_mut() {
            *v /= max;
        }
    }
}

/// Streaming Karhunen-Loève transform of one block at a time.
///
/// # Example
///
/// ```rust
/// use karhunen_core::{Complex, EngineConfig, KltEngine};
///
/// let config = EngineConfig::new(16, 4, 2).unwrap();
/// let mut engine = KltEngine::new(config).unwrap();
/// for (n, x) in engine.samples_mut().iter_mut().enumerate() {
///     *x = Complex::from_polar(1.0, 0.4 * n as f32);
/// }
/// engine.transform().unwrap();
/// assert_eq!(engine.eigenvalues().len(), 2);
/// assert_eq!(engine.basis().len(), 8);
/// ```
#[derive(Debug)]
pub struct KltEngine {
    config: EngineConfig,
    state: EngineState,
    samples: Vec<Complex<f32>>,
    analysis: Vec<Complex<f32>>,
    taper: Vec<f32>,
    estimator: AutocorrelationEstimator,
    matrix: PackedHermitian,
    solver: HermitianEigenSolver,
    vectors: Vec<Complex<f32>>,
    eigenvalues: Vec<f32>,
    coefficients: Vec<Complex<f32>>,
    basis: Vec<Complex<f32>>,
}

impl KltEngine {
    /// Allocate every buffer for `config`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let (len, order, k) = (config.window_length(), config.order(), config.num_eigen());
        let basis_len = buffer::product("basis", order, k)?;
        let mut taper = Vec::new();
        if config.apply_window() {
            taper = buffer::zeroed("taper", len)?;
            config.taper().fill(&mut taper);
        }
        Ok(Self {
            config,
            state: EngineState::Constructed,
            samples: buffer::zeroed("samples", len)?,
            analysis: buffer::zeroed("analysis block", len)?,
            taper,
            estimator: AutocorrelationEstimator::new(len, order, config.autocorrelation())?,
            matrix: PackedHermitian::new(order)?,
            solver: HermitianEigenSolver::new(order, k)?,
            vectors: buffer::zeroed("eigenvectors", basis_len)?,
            eigenvalues: buffer::zeroed("eigenvalues", k)?,
            coefficients: buffer::zeroed("coefficients", k)?,
            basis: buffer::zeroed("basis", basis_len)?,
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Sample window of `window_length` entries, filled by the caller.
    pub fn samples(&self) -> &[Complex<f32>] {
        &self.samples
    }

    /// Mutable sample window.
    pub fn samples_mut(&mut self) -> &mut [Complex<f32>] {
        &mut self.samples
    }

    /// Taper coefficients, empty when windowing is off.
    pub fn taper(&self) -> &[f32] {
        &self.taper
    }

    /// Run the transform on the current sample window.
    ///
    /// The sample window is left untouched, so calling this twice on the same
    /// block reproduces the same outputs. On error the outputs are all zero.
    pub fn transform(&mut self) -> Result<SelectionInfo> {
        self.state = EngineState::Ready;
        let order = self.config.order();

        self.analysis.copy_from_slice(&self.samples);
        if self.config.apply_window() {
            apply_taper(&mut self.analysis, &self.taper);
        }

        self.estimator.estimate(&self.analysis, &mut self.matrix);
        #[cfg(feature = "tracing")]
        tracing::debug!(r0 = ?self.matrix.as_slice()[0], order, "autocorrelation estimated");

        let info = match self
            .solver
            .solve(&mut self.matrix, &mut self.eigenvalues, &mut self.vectors)
        {
            Ok(info) => info,
            Err(err) => {
                self.clear_outputs();
                #[cfg(feature = "tracing")]
                tracing::debug!(%err, "decomposition failed, outputs zeroed");
                return Err(err);
            }
        };
        #[cfg(feature = "tracing")]
        {
            tracing::debug!(found = info.found, nsplit = info.nsplit, "eigenvalues selected");
            tracing::trace!(eigenvalues = ?self.eigenvalues, "spectrum");
        }

        if self.config.normalize_eigenvalues() {
            normalize_eigenvalues(&mut self.eigenvalues);
        }

        project(&self.analysis, &self.vectors, order, &mut self.coefficients);
        weight_basis(&self.vectors, &self.coefficients, order, &mut self.basis);
        Ok(info)
    }

    fn clear_outputs(&mut self) {
        let zero = Complex::new(0.0, 0.0);
        self.eigenvalues.fill(0.0);
        self.vectors.fill(zero);
        self.coefficients.fill(zero);
        self.basis.fill(zero);
    }

    /// Eigenvalues of the last block, ascending.
    pub fn eigenvalues(&self) -> &[f32] {
        &self.eigenvalues
    }

    /// Unit eigenvectors of the last block, column-major (`order` rows).
    pub fn eigenvectors(&self) -> &[Complex<f32>] {
        &self.vectors
    }

    /// Projection coefficients of the last block.
    pub fn coefficients(&self) -> &[Complex<f32>] {
        &self.coefficients
    }

    /// Weighted basis of the last block, eigenvectors laid out contiguously.
    pub fn basis(&self) -> &[Complex<f32>] {
        &self.basis
    }

    /// Weighted basis function `c` (`order` samples).
    pub fn basis_function(&self, c: usize) -> &[Complex<f32>] {
        let order = self.config.order();
        &self.basis[c * order..(c + 1) * order]
    }
}
