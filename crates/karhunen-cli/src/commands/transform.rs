//! Streaming transform command.

use anyhow::Context;
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use karhunen_config::{Estimator, KltSettings, WindowShape, user_config_path};
use karhunen_io::{RecordFileWriter, RecordLayout, RecordSink, SampleSource, Sinks, StreamController, WavIqSource};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Taper shapes for CLI
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CliTaper {
    FlatTop,
    Hann,
    Blackman,
}

impl From<CliTaper> for WindowShape {
    fn from(t: CliTaper) -> Self {
        match t {
            CliTaper::FlatTop => WindowShape::FlatTop,
            CliTaper::Hann => WindowShape::Hann,
            CliTaper::Blackman => WindowShape::Blackman,
        }
    }
}

#[derive(Args)]
pub struct TransformArgs {
    /// Input I/Q WAV file (stereo I/Q or mono I)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Settings file (defaults to the user settings file when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Samples per analysis block
    #[arg(short = 'l', long)]
    window_length: Option<usize>,

    /// Input overlap fraction (0 to 0.999999)
    #[arg(long)]
    input_overlap: Option<f64>,

    /// Autocorrelation order
    #[arg(short, long)]
    order: Option<usize>,

    /// Number of eigenvectors
    #[arg(short = 'k', long)]
    num_eigen: Option<usize>,

    /// Output overlap fraction (0 to 0.999999)
    #[arg(long)]
    output_overlap: Option<f64>,

    /// Apply the analysis taper
    #[arg(short, long)]
    window: bool,

    /// Taper shape
    #[arg(long, value_enum)]
    taper: Option<CliTaper>,

    /// Normalize eigenvalues by the largest one (the default)
    #[arg(short, long, overrides_with = "no_normalize")]
    normalize: bool,

    /// Write raw, unnormalized eigenvalues
    #[arg(long, overrides_with = "normalize")]
    no_normalize: bool,

    /// Estimate autocorrelation with FFTs
    #[arg(long)]
    fft: bool,

    /// Eigenvalue record output
    #[arg(long, value_name = "FILE")]
    eigenvalues: Option<PathBuf>,

    /// Coefficient record output
    #[arg(long, value_name = "FILE")]
    coefficients: Option<PathBuf>,

    /// Weighted basis record output
    #[arg(long, value_name = "FILE")]
    basis: Option<PathBuf>,

    /// Write the resolved settings to this file
    #[arg(long, value_name = "FILE")]
    save_settings: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

impl TransformArgs {
    /// Settings file values overridden by explicit flags.
    fn settings(&self) -> anyhow::Result<KltSettings> {
        let mut settings = match &self.config {
            Some(path) => KltSettings::load(path)?,
            None => {
                let path = user_config_path();
                if path.exists() {
                    tracing::debug!(path = %path.display(), "using user settings");
                    KltSettings::load(&path)?
                } else {
                    KltSettings::default()
                }
            }
        };

        if let Some(v) = self.window_length {
            settings.window_length = v;
        }
        if let Some(v) = self.input_overlap {
            settings.input_overlap = v;
        }
        if let Some(v) = self.order {
            settings.order = v;
        }
        if let Some(v) = self.num_eigen {
            settings.num_eigen = v;
        }
        if let Some(v) = self.output_overlap {
            settings.output_overlap = v;
        }
        if let Some(t) = self.taper {
            settings.taper = t.into();
        }
        settings.apply_window |= self.window;
        if self.normalize {
            settings.normalize_eigenvalues = true;
        } else if self.no_normalize {
            settings.normalize_eigenvalues = false;
        }
        if self.fft {
            settings.autocorrelation = Estimator::Fft;
        }
        Ok(settings)
    }
}

type FileSink = RecordFileWriter<BufWriter<File>>;

fn open_sink(path: Option<&Path>, layout: RecordLayout, opened: &mut Vec<FileSink>) -> anyhow::Result<Option<usize>> {
    let Some(path) = path else {
        return Ok(None);
    };
    match RecordFileWriter::create(path, layout) {
        Ok(writer) => {
            opened.push(writer);
            Ok(Some(opened.len() - 1))
        }
        Err(e) => {
            for sink in opened.iter_mut() {
                sink.close().ok();
            }
            Err(e).with_context(|| format!("creating {}", path.display()))
        }
    }
}

/// Block progress bar. Built before any output file is opened, so a failure
/// here leaves nothing to close.
fn progress_bar(blocks: usize, quiet: bool) -> anyhow::Result<ProgressBar> {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(blocks as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks ({eta})")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

pub fn run(args: TransformArgs) -> anyhow::Result<()> {
    let settings = args.settings()?;
    let plan = settings.plan()?;
    if let Some(path) = &args.save_settings {
        settings.save(path)?;
        println!("Saved settings to {}", path.display());
    }

    println!("Reading {}...", args.input.display());
    let mut source = WavIqSource::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    println!(
        "  {} I/Q frames at {} Hz",
        source.frames(),
        source.sample_rate()
    );
    println!(
        "  window {} (stride {}), order {}, {} eigenvector(s)",
        plan.engine.window_length(),
        plan.consumption_stride,
        plan.engine.order(),
        plan.engine.num_eigen()
    );

    let mut controller = StreamController::new(plan)?;
    let layouts = controller.layouts(source.timing());
    let pb = progress_bar(plan.blocks_for(source.frames() as usize), args.quiet)?;

    let mut opened = Vec::new();
    let eig_idx = open_sink(args.eigenvalues.as_deref(), layouts.eigenvalues, &mut opened)?;
    let coeff_idx = open_sink(args.coefficients.as_deref(), layouts.coefficients, &mut opened)?;
    let basis_idx = open_sink(args.basis.as_deref(), layouts.basis, &mut opened)?;
    if opened.is_empty() {
        tracing::warn!("no outputs requested; blocks will be transformed and discarded");
    }

    let mut sinks = Sinks::default();
    for (i, sink) in opened.iter_mut().enumerate() {
        let sink: &mut dyn RecordSink = sink;
        if Some(i) == eig_idx {
            sinks.eigenvalues = Some(sink);
        } else if Some(i) == coeff_idx {
            sinks.coefficients = Some(sink);
        } else if Some(i) == basis_idx {
            sinks.basis = Some(sink);
        }
    }

    let summary = controller.run(&mut source, &mut sinks, |report| {
        pb.set_position(report.index as u64 + 1);
    })?;
    pb.finish_and_clear();

    println!(
        "Transformed {} block(s) from {} samples",
        summary.blocks, summary.samples_read
    );
    if summary.failed_blocks > 0 {
        println!(
            "  {} block(s) failed to decompose and were written as zeros",
            summary.failed_blocks
        );
    }
    for (label, path) in [
        ("eigenvalues", &args.eigenvalues),
        ("coefficients", &args.coefficients),
        ("basis", &args.basis),
    ] {
        if let Some(path) = path {
            println!("  {label}: {}", path.display());
        }
    }
    Ok(())
}
