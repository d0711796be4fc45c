//! Sample sources.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader};
use karhunen_core::Complex;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Abscissa of the input stream: first sample position and sample spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    /// Position of the first sample.
    pub xstart: f64,
    /// Spacing between samples (seconds for WAV input).
    pub xdelta: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            xstart: 0.0,
            xdelta: 1.0,
        }
    }
}

/// A finite, non-restartable stream of complex samples.
pub trait SampleSource {
    /// Read up to `out.len()` samples into the front of `out`.
    ///
    /// Returns the number read; `0` means the stream is exhausted.
    fn read(&mut self, out: &mut [Complex<f32>]) -> Result<usize>;

    /// Timing of the stream.
    fn timing(&self) -> Timing {
        Timing::default()
    }
}

/// In-memory source over an owned sample vector.
#[derive(Debug, Clone)]
pub struct VecSource {
    samples: Vec<Complex<f32>>,
    pos: usize,
    timing: Timing,
}

impl VecSource {
    /// Source yielding `samples` once, with unit spacing.
    pub fn new(samples: Vec<Complex<f32>>) -> Self {
        Self {
            samples,
            pos: 0,
            timing: Timing::default(),
        }
    }

    /// Override the stream timing.
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Samples not yet read.
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.pos
    }
}

impl SampleSource for VecSource {
    fn read(&mut self, out: &mut [Complex<f32>]) -> Result<usize> {
        let n = out.len().min(self.remaining());
        out[..n].copy_from_slice(&self.samples[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn timing(&self) -> Timing {
        self.timing
    }
}

/// Streaming I/Q reader for WAV files.
///
/// Stereo files carry I on the left and Q on the right channel; mono files
/// are read as I with Q = 0. Integer PCM is scaled to ±1.
pub struct WavIqSource {
    reader: WavReader<BufReader<File>>,
    channels: usize,
    int_scale: Option<f32>,
    sample_rate: u32,
    frames: u64,
}

impl WavIqSource {
    /// Open a mono or stereo WAV file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 || channels > 2 {
            return Err(Error::UnsupportedFormat(format!(
                "{channels} channels, expected mono or stereo I/Q"
            )));
        }
        let int_scale = match spec.sample_format {
            SampleFormat::Float => None,
            SampleFormat::Int => Some(1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32),
        };
        let frames = u64::from(reader.duration());
        Ok(Self {
            reader,
            channels,
            int_scale,
            sample_rate: spec.sample_rate,
            frames,
        })
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Total I/Q frames in the file.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn next_value(&mut self) -> Result<Option<f32>> {
        let value = match self.int_scale {
            None => self.reader.samples::<f32>().next().transpose()?,
            Some(scale) => self
                .reader
                .samples::<i32>()
                .next()
                .transpose()?
                .map(|v| v as f32 * scale),
        };
        Ok(value)
    }
}

impl std::fmt::Debug for WavIqSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavIqSource")
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames)
            .finish()
    }
}

impl SampleSource for WavIqSource {
    fn read(&mut self, out: &mut [Complex<f32>]) -> Result<usize> {
        let mut n = 0;
        while n < out.len() {
            let Some(i) = self.next_value()? else {
                break;
            };
            let q = if self.channels == 2 {
                self.next_value()?.ok_or_else(|| {
                    Error::UnsupportedFormat("truncated stereo frame".to_string())
                })?
            } else {
                0.0
            };
            out[n] = Complex::new(i, q);
            n += 1;
        }
        Ok(n)
    }

    fn timing(&self) -> Timing {
        Timing {
            xstart: 0.0,
            xdelta: 1.0 / f64::from(self.sample_rate),
        }
    }
}
