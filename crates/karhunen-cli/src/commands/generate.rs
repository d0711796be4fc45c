//! I/Q test signal generation command.

use clap::{Args, Subcommand};
use karhunen_core::Complex;
use karhunen_io::write_iq_wav;
use std::f64::consts::TAU;
use std::path::PathBuf;

#[derive(Args)]
pub struct GenerateArgs {
    #[command(subcommand)]
    command: GenerateCommand,
}

#[derive(Args)]
struct SignalOptions {
    /// Duration in seconds
    #[arg(long, default_value = "1.0")]
    duration: f64,

    /// Sample rate
    #[arg(long, default_value = "48000")]
    sample_rate: u32,

    /// Amplitude (0-1)
    #[arg(long, default_value = "0.8")]
    amplitude: f32,
}

impl SignalOptions {
    fn num_samples(&self) -> usize {
        (self.duration * f64::from(self.sample_rate)).max(0.0) as usize
    }
}

#[derive(Subcommand)]
enum GenerateCommand {
    /// Generate a complex exponential tone
    Tone {
        /// Output WAV file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Frequency in Hz (negative for clockwise rotation)
        #[arg(long, default_value = "1000.0", allow_hyphen_values = true)]
        freq: f64,

        #[command(flatten)]
        options: SignalOptions,
    },

    /// Generate a linear complex chirp
    Chirp {
        /// Output WAV file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Start frequency in Hz
        #[arg(long, default_value = "100.0", allow_hyphen_values = true)]
        start: f64,

        /// End frequency in Hz
        #[arg(long, default_value = "10000.0", allow_hyphen_values = true)]
        end: f64,

        #[command(flatten)]
        options: SignalOptions,
    },

    /// Generate uniform complex noise
    Noise {
        /// Output WAV file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Generator seed
        #[arg(long, default_value = "305419896")]
        seed: u32,

        #[command(flatten)]
        options: SignalOptions,
    },
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let (output, samples, sample_rate) = match args.command {
        GenerateCommand::Tone {
            output,
            freq,
            options,
        } => {
            println!("Generating complex tone...");
            println!("  {} Hz for {:.2}s", freq, options.duration);
            let samples = tone(freq, &options);
            (output, samples, options.sample_rate)
        }

        GenerateCommand::Chirp {
            output,
            start,
            end,
            options,
        } => {
            println!("Generating complex chirp...");
            println!("  {} Hz to {} Hz over {:.2}s", start, end, options.duration);
            let samples = chirp(start, end, &options);
            (output, samples, options.sample_rate)
        }

        GenerateCommand::Noise {
            output,
            seed,
            options,
        } => {
            println!("Generating complex noise...");
            println!("  {:.2}s at {} Hz", options.duration, options.sample_rate);
            let samples = noise(seed, &options);
            (output, samples, options.sample_rate)
        }
    };

    write_iq_wav(&output, &samples, sample_rate)?;
    println!("Wrote {} I/Q samples to {}", samples.len(), output.display());
    Ok(())
}

fn tone(freq: f64, options: &SignalOptions) -> Vec<Complex<f32>> {
    let step = TAU * freq / f64::from(options.sample_rate);
    (0..options.num_samples())
        .map(|i| Complex::from_polar(options.amplitude, (step * i as f64 % TAU) as f32))
        .collect()
}

fn chirp(start: f64, end: f64, options: &SignalOptions) -> Vec<Complex<f32>> {
    let n = options.num_samples();
    let rate = f64::from(options.sample_rate);
    let sweep = if options.duration > 0.0 {
        (end - start) / options.duration
    } else {
        0.0
    };
    (0..n)
        .map(|i| {
            let t = i as f64 / rate;
            let phase = TAU * (start * t + 0.5 * sweep * t * t);
            Complex::from_polar(options.amplitude, (phase % TAU) as f32)
        })
        .collect()
}

fn noise(seed: u32, options: &SignalOptions) -> Vec<Complex<f32>> {
    let mut state = if seed == 0 { 0x1234_5678 } else { seed };
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        (state as f32 / u32::MAX as f32) * 2.0 - 1.0
    };
    (0..options.num_samples())
        .map(|_| Complex::new(next() * options.amplitude, next() * options.amplitude))
        .collect()
}
