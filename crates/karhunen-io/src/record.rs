//! Record sinks and the text record file format.
//!
//! A record stream is a sequence of fixed-width rows, one per block, plus a
//! [`RecordLayout`] describing how to interpret them.
//!
//! # File Format
//!
//! ```text
//! # karhunen-record
//! # layout: {"kind":"coefficients","value":"complex","row_width":2,...}
//! 0.5,-0.25,1.75,0
//! ...
//! ```
//!
//! Complex values are interleaved as `re,im`. Lines starting with `#` after
//! the header are ignored.

use crate::{Error, Result};
use karhunen_core::Complex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// First line of every record file.
pub const RECORD_MAGIC: &str = "# karhunen-record";
const LAYOUT_PREFIX: &str = "# layout: ";

/// Which engine output a record stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Eigenvalues, `num_eigen` per row.
    Eigenvalues,
    /// Projection coefficients, `num_eigen` per row.
    Coefficients,
    /// Weighted basis, `order × num_eigen` per row.
    Basis,
}

/// Scalar type of the row values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// One `f32` per value.
    Real,
    /// Two `f32` (`re`, `im`) per value.
    Complex,
}

impl ValueKind {
    /// Scalars stored per value.
    pub fn scalars(self) -> usize {
        match self {
            ValueKind::Real => 1,
            ValueKind::Complex => 2,
        }
    }
}

/// Interpretation of a record stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordLayout {
    /// Output carried.
    pub kind: RecordKind,
    /// Scalar type.
    pub value: ValueKind,
    /// Values per row.
    pub row_width: usize,
    /// Values per frame along the x axis.
    pub frame_len: usize,
    /// Position of the first value in a frame.
    pub xstart: f64,
    /// Spacing of values in a frame.
    pub xdelta: f64,
    /// Position of the first row.
    pub ystart: f64,
    /// Spacing between rows.
    pub ydelta: f64,
}

impl RecordLayout {
    /// Scalars per row.
    pub fn scalars_per_row(&self) -> usize {
        self.row_width * self.value.scalars()
    }
}

/// One row handed to a sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordRow<'a> {
    /// Real values.
    Real(&'a [f32]),
    /// Complex values.
    Complex(&'a [Complex<f32>]),
}

impl RecordRow<'_> {
    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            RecordRow::Real(v) => v.len(),
            RecordRow::Complex(v) => v.len(),
        }
    }

    /// Whether the row holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value kind of the row.
    pub fn value_kind(&self) -> ValueKind {
        match self {
            RecordRow::Real(_) => ValueKind::Real,
            RecordRow::Complex(_) => ValueKind::Complex,
        }
    }

    /// Append the row's scalars to `out`, complex values interleaved.
    pub fn extend_scalars(&self, out: &mut Vec<f32>) {
        match self {
            RecordRow::Real(v) => out.extend_from_slice(v),
            RecordRow::Complex(v) => out.extend(v.iter().flat_map(|z| [z.re, z.im])),
        }
    }
}

fn check_row(layout: &RecordLayout, row: &RecordRow<'_>) -> Result<()> {
    if row.value_kind() != layout.value || row.len() != layout.row_width {
        return Err(Error::UnsupportedFormat(format!(
            "{:?} row of {} values does not match {:?} layout of width {}",
            row.value_kind(),
            row.len(),
            layout.value,
            layout.row_width
        )));
    }
    Ok(())
}

/// Destination for one output stream.
pub trait RecordSink {
    /// Layout of the rows this sink accepts.
    fn layout(&self) -> &RecordLayout;

    /// Append one row.
    fn write_row(&mut self, row: RecordRow<'_>) -> Result<()>;

    /// Flush and release the sink. Further writes are an error.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink collecting rows in memory.
#[derive(Debug, Clone)]
pub struct MemorySink {
    layout: RecordLayout,
    rows: Vec<Vec<f32>>,
    closed: bool,
}

impl MemorySink {
    /// Empty sink for `layout`.
    pub fn new(layout: RecordLayout) -> Self {
        Self {
            layout,
            rows: Vec::new(),
            closed: false,
        }
    }

    /// Rows written so far, as interleaved scalars.
    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    /// Row `index` decoded as complex values.
    pub fn complex_row(&self, index: usize) -> Vec<Complex<f32>> {
        self.rows[index]
            .chunks_exact(2)
            .map(|p| Complex::new(p[0], p[1]))
            .collect()
    }

    /// Whether [`close`](RecordSink::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RecordSink for MemorySink {
    fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    fn write_row(&mut self, row: RecordRow<'_>) -> Result<()> {
        if self.closed {
            return Err(Error::UnsupportedFormat("write to closed sink".to_string()));
        }
        check_row(&self.layout, &row)?;
        let mut scalars = Vec::with_capacity(self.layout.scalars_per_row());
        row.extend_scalars(&mut scalars);
        self.rows.push(scalars);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Sink writing the text record format.
pub struct RecordFileWriter<W: Write> {
    layout: RecordLayout,
    writer: Option<W>,
    line: String,
    rows: usize,
}

impl RecordFileWriter<BufWriter<File>> {
    /// Create (truncate) `path` and write the header.
    pub fn create<P: AsRef<Path>>(path: P, layout: RecordLayout) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), layout)
    }
}

impl<W: Write> RecordFileWriter<W> {
    /// Wrap `writer` and write the header.
    pub fn new(mut writer: W, layout: RecordLayout) -> Result<Self> {
        let json = serde_json::to_string(&layout)
            .map_err(|e| Error::UnsupportedFormat(format!("layout: {e}")))?;
        writeln!(writer, "{RECORD_MAGIC}")?;
        writeln!(writer, "{LAYOUT_PREFIX}{json}")?;
        Ok(Self {
            layout,
            writer: Some(writer),
            line: String::new(),
            rows: 0,
        })
    }

    /// Rows written so far.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Close and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| Error::UnsupportedFormat("record writer already closed".to_string()))?;
        writer.flush()?;
        Ok(writer)
    }
}

impl<W: Write> std::fmt::Debug for RecordFileWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordFileWriter")
            .field("layout", &self.layout)
            .field("rows", &self.rows)
            .field("open", &self.writer.is_some())
            .finish()
    }
}

impl<W: Write> RecordSink for RecordFileWriter<W> {
    fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    fn write_row(&mut self, row: RecordRow<'_>) -> Result<()> {
        check_row(&self.layout, &row)?;
        let Some(writer) = self.writer.as_mut() else {
            return Err(Error::UnsupportedFormat("write to closed record file".to_string()));
        };
        self.line.clear();
        let mut push = |x: f32| {
            if !self.line.is_empty() {
                self.line.push(',');
            }
            self.line.push_str(&x.to_string());
        };
        match row {
            RecordRow::Real(v) => v.iter().copied().for_each(&mut push),
            RecordRow::Complex(v) => v.iter().for_each(|z| {
                push(z.re);
                push(z.im);
            }),
        }
        writeln!(writer, "{}", self.line)?;
        self.rows += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Parsed record file.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFile {
    /// Layout from the header.
    pub layout: RecordLayout,
    /// Rows as interleaved scalars.
    pub rows: Vec<Vec<f32>>,
}

impl RecordFile {
    /// Row `index` decoded as complex values.
    pub fn complex_row(&self, index: usize) -> Vec<Complex<f32>> {
        self.rows[index]
            .chunks_exact(2)
            .map(|p| Complex::new(p[0], p[1]))
            .collect()
    }
}

/// Read a record file written by [`RecordFileWriter`].
pub fn read_record_file<P: AsRef<Path>>(path: P) -> Result<RecordFile> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();
    let format_err = |line: usize, reason: String| Error::RecordFormat { line, reason };

    match lines.next().transpose()? {
        Some(first) if first.trim_end() == RECORD_MAGIC => {}
        _ => return Err(format_err(1, format!("expected '{RECORD_MAGIC}'"))),
    }
    let layout: RecordLayout = match lines.next().transpose()? {
        Some(second) => {
            let json = second
                .strip_prefix(LAYOUT_PREFIX)
                .ok_or_else(|| format_err(2, "missing layout line".to_string()))?;
            serde_json::from_str(json).map_err(|e| format_err(2, e.to_string()))?
        }
        None => return Err(format_err(2, "missing layout line".to_string())),
    };

    let width = layout.scalars_per_row();
    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        let number = idx + 3;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let row = trimmed
            .split(',')
            .map(|field| field.trim().parse::<f32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| format_err(number, e.to_string()))?;
        if row.len() != width {
            return Err(format_err(
                number,
                format!("expected {width} values, found {}", row.len()),
            ));
        }
        rows.push(row);
    }
    Ok(RecordFile { layout, rows })
}
