//! Immutable engine configuration.

use crate::error::{KltError, Result};
use crate::window::Taper;

/// How the autocorrelation lags are estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutocorrelationMethod {
    /// Direct lag sums, O(order · window_length).
    #[default]
    Direct,
    /// `IFFT(|FFT(x)|²)` with zero padding, O(N log N).
    Fft,
}

/// Configuration of a [`KltEngine`](crate::KltEngine).
///
/// Fixed for the lifetime of an engine; every buffer size derives from it.
///
/// # Example
///
/// ```rust
/// use karhunen_core::EngineConfig;
///
/// let config = EngineConfig::new(64, 16, 4)
///     .unwrap()
///     .with_window(true)
///     .with_normalized_eigenvalues(true);
/// assert_eq!(config.packed_len(), 16 * 17 / 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    window_length: usize,
    order: usize,
    num_eigen: usize,
    apply_window: bool,
    taper: Taper,
    normalize_eigenvalues: bool,
    autocorrelation: AutocorrelationMethod,
}

impl EngineConfig {
    /// Create a configuration, rejecting illegal lengths.
    ///
    /// Requires `window_length >= 2`, `2 <= order <= window_length` and
    /// `1 <= num_eigen <= order`.
    pub fn new(window_length: usize, order: usize, num_eigen: usize) -> Result<Self> {
        if window_length < 2 {
            return Err(KltError::invalid_config(format!(
                "window_length {window_length} < 2"
            )));
        }
        if order < 2 || order > window_length {
            return Err(KltError::invalid_config(format!(
                "order {order} outside [2, {window_length}]"
            )));
        }
        if num_eigen < 1 || num_eigen > order {
            return Err(KltError::invalid_config(format!(
                "num_eigen {num_eigen} outside [1, {order}]"
            )));
        }
        Ok(Self {
            window_length,
            order,
            num_eigen,
            apply_window: false,
            taper: Taper::default(),
            normalize_eigenvalues: false,
            autocorrelation: AutocorrelationMethod::default(),
        })
    }

    /// Enable or disable the analysis taper.
    pub fn with_window(mut self, apply: bool) -> Self {
        self.apply_window = apply;
        self
    }

    /// Select the taper shape (only used when windowing is enabled).
    pub fn with_taper(mut self, taper: Taper) -> Self {
        self.taper = taper;
        self
    }

    /// Enable or disable eigenvalue normalization.
    pub fn with_normalized_eigenvalues(mut self, normalize: bool) -> Self {
        self.normalize_eigenvalues = normalize;
        self
    }

    /// Select the autocorrelation estimator.
    pub fn with_autocorrelation(mut self, method: AutocorrelationMethod) -> Self {
        self.autocorrelation = method;
        self
    }

    /// Samples per block.
    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Autocorrelation matrix order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of eigenpairs solved per block.
    pub fn num_eigen(&self) -> usize {
        self.num_eigen
    }

    /// Whether the taper is applied before analysis.
    pub fn apply_window(&self) -> bool {
        self.apply_window
    }

    /// Taper shape.
    pub fn taper(&self) -> Taper {
        self.taper
    }

    /// Whether eigenvalues are divided by their maximum magnitude.
    pub fn normalize_eigenvalues(&self) -> bool {
        self.normalize_eigenvalues
    }

    /// Autocorrelation estimator.
    pub fn autocorrelation(&self) -> AutocorrelationMethod {
        self.autocorrelation
    }

    /// Entries in the packed lower-triangular matrix.
    pub fn packed_len(&self) -> usize {
        self.order.saturating_mul(self.order.saturating_add(1)) / 2
    }

    /// Entries in the basis output (`order × num_eigen`).
    pub fn basis_len(&self) -> usize {
        self.order.saturating_mul(self.num_eigen)
    }
}
