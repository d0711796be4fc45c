//! Streaming I/O layer for the karhunen transform.
//!
//! This crate provides:
//!
//! - **Sample sources**: the [`SampleSource`] trait, an in-memory
//!   [`VecSource`] and the streaming [`WavIqSource`]
//! - **Record sinks**: the [`RecordSink`] trait, [`MemorySink`], and
//!   [`RecordFileWriter`] / [`read_record_file`] for the text record format
//! - **WAV output**: [`write_iq_wav`] and [`read_iq_wav`] for complex I/Q audio
//! - **Streaming**: [`StreamController`], which cuts a source into overlapping
//!   blocks and keeps every enabled sink aligned block for block
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use karhunen_config::KltSettings;
//! use karhunen_io::{MemorySink, Sinks, StreamController, WavIqSource};
//!
//! let plan = KltSettings::load("klt.toml")?.plan()?;
//! let mut source = WavIqSource::open("capture.wav")?;
//! let mut controller = StreamController::new(plan)?;
//! let layouts = controller.layouts(source.timing());
//!
//! let mut coefficients = MemorySink::new(layouts.coefficients);
//! let mut sinks = Sinks { coefficients: Some(&mut coefficients), ..Sinks::default() };
//! let summary = controller.run(&mut source, &mut sinks, |_| {})?;
//! ```

mod controller;
mod record;
mod source;
mod wav;

pub use controller::{BlockReport, OutputLayouts, Sinks, StreamController, StreamSummary};
pub use record::{
    MemorySink, RECORD_MAGIC, RecordFile, RecordFileWriter, RecordKind, RecordLayout, RecordRow,
    RecordSink, ValueKind, read_record_file,
};
pub use source::{SampleSource, Timing, VecSource, WavIqSource};
pub use wav::{read_iq_wav, write_iq_wav};

use karhunen_config::ConfigError;
use karhunen_core::KltError;

/// Error types for streaming I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input cannot be interpreted as I/Q samples.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A record file is malformed.
    #[error("Record format error at line {line}: {reason}")]
    RecordFormat {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Fatal engine error (configuration or allocation).
    #[error("Engine error: {0}")]
    Engine(#[from] KltError),

    /// Settings could not be turned into a stream plan.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Convenience result type for streaming I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
