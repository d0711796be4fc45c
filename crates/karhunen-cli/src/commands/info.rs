//! File information command.

use anyhow::Context;
use clap::Args;
use karhunen_io::{RecordFile, ValueKind, WavIqSource, read_record_file};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct InfoArgs {
    /// I/Q WAV or record file
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    if is_wav(&args.file) {
        let source = WavIqSource::open(&args.file)
            .with_context(|| format!("opening {}", args.file.display()))?;
        let duration = source.frames() as f64 / f64::from(source.sample_rate());
        println!("File: {}", args.file.display());
        println!("Type: I/Q WAV");
        println!("Sample rate: {} Hz", source.sample_rate());
        println!("Frames: {}", source.frames());
        println!("Duration: {:.3}s", duration);
        return Ok(());
    }

    let record = read_record_file(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    print_record(&args.file, &record);
    Ok(())
}

fn print_record(path: &Path, record: &RecordFile) {
    let layout = &record.layout;
    let value = match layout.value {
        ValueKind::Real => "real",
        ValueKind::Complex => "complex",
    };
    println!("File: {}", path.display());
    println!("Type: {:?} record", layout.kind);
    println!("Values: {} {} per row", layout.row_width, value);
    println!("Rows: {}", record.rows.len());
    println!("Frame length: {}", layout.frame_len);
    println!("X: start {} step {}", layout.xstart, layout.xdelta);
    println!("Y: start {} step {}", layout.ystart, layout.ydelta);

    if let Some(last) = record.rows.last() {
        let peak = last.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        println!("Last row peak: {:.6}", peak);
    }
}
