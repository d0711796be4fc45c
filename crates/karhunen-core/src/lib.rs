//! Karhunen Core - streaming Karhunen-Loève transform engine
//!
//! For every block of a complex sample stream this crate estimates the
//! autocorrelation matrix, solves for its dominant eigenpairs and projects the
//! block onto them, producing energy-ranked coefficients and weighted basis
//! functions.
//!
//! # Building Blocks
//!
//! ## Estimation
//!
//! - [`AutocorrelationEstimator`] - Biased lags, direct or FFT-based
//! - [`PackedHermitian`] - Packed lower-triangular Hermitian (Toeplitz) matrix
//! - [`Taper`] - Optional analysis window (flat-top, Hann, Blackman)
//!
//! ## Eigen-decomposition
//!
//! - [`HermitianEigenSolver`] - Top-K eigenpairs of a packed Hermitian matrix
//! - [`eigen`] - The individual stages: tridiagonalization, bisection,
//!   inverse iteration, back-transformation
//!
//! ## Orchestration
//!
//! - [`EngineConfig`] - Validated, immutable sizes and flags
//! - [`KltEngine`] - Owns all buffers, runs one block per [`KltEngine::transform`]
//!
//! # Failure Model
//!
//! Decomposition failures are per-block and recoverable
//! ([`KltError::is_recoverable`]); the engine zeroes its outputs and the next
//! block starts from a clean state. Configuration and allocation errors are
//! raised at construction only.
//!
//! # Example
//!
//! ```rust
//! use karhunen_core::{Complex, EngineConfig, KltEngine};
//!
//! let config = EngineConfig::new(32, 8, 2).unwrap().with_window(true);
//! let mut engine = KltEngine::new(config).unwrap();
//! for (n, x) in engine.samples_mut().iter_mut().enumerate() {
//!     *x = Complex::from_polar(1.0, 0.3 * n as f32);
//! }
//! match engine.transform() {
//!     Ok(info) => assert_eq!(info.found, 2),
//!     Err(e) if e.is_recoverable() => { /* outputs are zero */ }
//!     Err(e) => panic!("{e}"),
//! }
//! ```

pub mod acf;
mod buffer;
pub mod config;
pub mod eigen;
pub mod engine;
pub mod error;
pub mod packed;
pub mod projection;
pub mod window;

pub use acf::{AutocorrelationEstimator, autocorrelation_direct};
pub use config::{AutocorrelationMethod, EngineConfig};
pub use eigen::{HermitianEigenSolver, SelectionInfo};
pub use engine::{EngineState, KltEngine, normalize_eigenvalues};
pub use error::{DecompositionStage, KltError, Result};
pub use packed::{PackedHermitian, packed_index};
pub use projection::{project, weight_basis};
pub use window::{Taper, apply_taper};

pub use rustfft::num_complex::Complex;
