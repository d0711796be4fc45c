//! Complex I/Q WAV reading and writing.

use crate::source::{SampleSource, WavIqSource};
use crate::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use karhunen_core::Complex;
use std::path::Path;

/// Write `samples` as a 32-bit float stereo WAV (I left, Q right).
pub fn write_iq_wav<P: AsRef<Path>>(path: P, samples: &[Complex<f32>], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for s in samples {
        writer.write_sample(s.re)?;
        writer.write_sample(s.im)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read a whole I/Q WAV file, returning the samples and the sample rate.
pub fn read_iq_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<Complex<f32>>, u32)> {
    let mut source = WavIqSource::open(path)?;
    let mut samples = vec![Complex::new(0.0, 0.0); source.frames() as usize];
    let mut filled = 0;
    while filled < samples.len() {
        let n = source.read(&mut samples[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    samples.truncate(filled);
    Ok((samples, source.sample_rate()))
}
