//! Settings and stream planning for the karhunen transform.
//!
//! # Features
//!
//! - **Settings**: [`KltSettings`], loaded from and saved to TOML
//! - **Clamping**: [`KltSettings::plan`] forces every value into its legal range
//! - **Planning**: [`StreamPlan`] carries the engine configuration and strides
//! - **Paths**: platform-specific location of the user settings file
//!
//! # Example
//!
//! ```rust
//! use karhunen_config::KltSettings;
//!
//! let settings = KltSettings::from_toml(
//!     "window_length = 8\ninput_overlap = 0.5\norder = 4\nnum_eigen = 2\n",
//! )
//! .unwrap();
//! let plan = settings.plan().unwrap();
//! assert_eq!(plan.consumption_stride, 4);
//! assert_eq!(plan.overlap_len(), 4);
//! ```

mod error;
mod plan;
mod settings;

/// Platform-specific configuration paths.
pub mod paths;

pub use error::ConfigError;
pub use paths::{user_config_dir, user_config_path};
pub use plan::StreamPlan;
pub use settings::{Estimator, KltSettings, MAX_OVERLAP, WindowShape};
