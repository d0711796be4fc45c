//! User-facing transform settings and their TOML file format.

use karhunen_core::{AutocorrelationMethod, EngineConfig, Taper};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::plan::StreamPlan;

/// Largest accepted overlap fraction.
pub const MAX_OVERLAP: f64 = 0.999999;

/// Taper shape as written in settings files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowShape {
    /// HFT90D flat-top.
    #[default]
    FlatTop,
    /// Hann.
    Hann,
    /// Blackman.
    Blackman,
}

impl From<WindowShape> for Taper {
    fn from(shape: WindowShape) -> Self {
        match shape {
            WindowShape::FlatTop => Taper::FlatTop,
            WindowShape::Hann => Taper::Hann,
            WindowShape::Blackman => Taper::Blackman,
        }
    }
}

/// Autocorrelation estimator as written in settings files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    /// Direct lag sums.
    #[default]
    Direct,
    /// FFT-based lags.
    Fft,
}

impl From<Estimator> for AutocorrelationMethod {
    fn from(estimator: Estimator) -> Self {
        match estimator {
            Estimator::Direct => AutocorrelationMethod::Direct,
            Estimator::Fft => AutocorrelationMethod::Fft,
        }
    }
}

/// Transform settings.
///
/// Every field has a default, so a settings file only needs the values that
/// differ. Values are not validated here; [`plan`](Self::plan) clamps them into
/// legal ranges.
///
/// # TOML Format
///
/// ```toml
/// window_length = 256
/// input_overlap = 0.5
/// order = 32
/// num_eigen = 4
/// output_overlap = 0.0
/// apply_window = true
/// taper = "flat_top"
/// normalize_eigenvalues = true
/// autocorrelation = "fft"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KltSettings {
    /// Samples per analysis block.
    pub window_length: usize,
    /// Fraction of each block carried over from the previous one.
    pub input_overlap: f64,
    /// Autocorrelation matrix order.
    pub order: usize,
    /// Number of eigenpairs per block.
    pub num_eigen: usize,
    /// Overlap fraction used to describe the basis output spacing.
    pub output_overlap: f64,
    /// Apply the analysis taper.
    pub apply_window: bool,
    /// Taper shape.
    pub taper: WindowShape,
    /// Divide eigenvalues by their largest magnitude. On by default.
    pub normalize_eigenvalues: bool,
    /// Autocorrelation estimator.
    pub autocorrelation: Estimator,
}

impl Default for KltSettings {
    fn default() -> Self {
        Self {
            window_length: 32,
            input_overlap: 0.0,
            order: 32,
            num_eigen: 1,
            output_overlap: 0.0,
            apply_window: false,
            taper: WindowShape::default(),
            normalize_eigenvalues: true,
            autocorrelation: Estimator::default(),
        }
    }
}

fn clamp_overlap(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::invalid_value(field, format!("{value} is not finite")));
    }
    Ok(value.clamp(0.0, MAX_OVERLAP))
}

/// `floor(len · (1 − overlap))` clamped to `[1, len]`.
fn stride(len: usize, overlap: f64) -> usize {
    let raw = (len as f64 * (1.0 - overlap)).floor() as usize;
    raw.clamp(1, len)
}

impl KltSettings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Serialize settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Clamp every value into its legal range and derive the stream plan.
    ///
    /// - overlaps to `[0, 0.999999]` (non-finite values are rejected)
    /// - `window_length >= 2`
    /// - `order` to `[2, window_length]`
    /// - `num_eigen` to `[1, order]`
    pub fn plan(&self) -> Result<StreamPlan, ConfigError> {
        let input_overlap = clamp_overlap("input_overlap", self.input_overlap)?;
        let output_overlap = clamp_overlap("output_overlap", self.output_overlap)?;

        let window_length = self.window_length.max(2);
        let order = self.order.clamp(2, window_length);
        let num_eigen = self.num_eigen.clamp(1, order);

        let engine = EngineConfig::new(window_length, order, num_eigen)?
            .with_window(self.apply_window)
            .with_taper(self.taper.into())
            .with_normalized_eigenvalues(self.normalize_eigenvalues)
            .with_autocorrelation(self.autocorrelation.into());

        Ok(StreamPlan {
            engine,
            consumption_stride: stride(window_length, input_overlap),
            output_stride: stride(order, output_overlap),
        })
    }
}
