//! Block streaming over a [`SampleSource`].
//!
//! The controller keeps a queue of raw samples starting at the current block.
//! Each iteration tops the queue up to `window_length` from the source,
//! transforms the first `window_length` samples (zero-padded when the stream
//! runs short), writes one row to every enabled sink, then drops
//! `consumption_stride` samples from the front. The stream ends once the
//! source is exhausted and no unprocessed samples remain.
//!
//! Decomposition failures are downgraded to warnings: the engine has already
//! zeroed its outputs, and those zero rows are written like any other, so all
//! sinks stay aligned block for block.

use crate::record::{RecordKind, RecordLayout, RecordRow, RecordSink, ValueKind};
use crate::source::{SampleSource, Timing};
use crate::Result;
use karhunen_config::StreamPlan;
use karhunen_core::{Complex, KltEngine, KltError, SelectionInfo};
use std::collections::VecDeque;

/// Optional sinks for the three engine outputs.
#[derive(Default)]
pub struct Sinks<'a> {
    /// Eigenvalue rows (`num_eigen` real values).
    pub eigenvalues: Option<&'a mut dyn RecordSink>,
    /// Coefficient rows (`num_eigen` complex values).
    pub coefficients: Option<&'a mut dyn RecordSink>,
    /// Weighted basis rows (`order × num_eigen` complex values).
    pub basis: Option<&'a mut dyn RecordSink>,
}

impl Sinks<'_> {
    /// Number of enabled sinks.
    pub fn enabled(&self) -> usize {
        usize::from(self.eigenvalues.is_some())
            + usize::from(self.coefficients.is_some())
            + usize::from(self.basis.is_some())
    }

    fn write_block(&mut self, engine: &KltEngine) -> Result<()> {
        if let Some(sink) = self.eigenvalues.as_deref_mut() {
            sink.write_row(RecordRow::Real(engine.eigenvalues()))?;
        }
        if let Some(sink) = self.coefficients.as_deref_mut() {
            sink.write_row(RecordRow::Complex(engine.coefficients()))?;
        }
        if let Some(sink) = self.basis.as_deref_mut() {
            sink.write_row(RecordRow::Complex(engine.basis()))?;
        }
        Ok(())
    }

    /// Close every enabled sink, returning the first error after trying all.
    pub fn close_all(&mut self) -> Result<()> {
        let mut first = Ok(());
        for sink in [
            self.eigenvalues.as_deref_mut(),
            self.coefficients.as_deref_mut(),
            self.basis.as_deref_mut(),
        ]
        .into_iter()
        .flatten()
        {
            let closed = sink.close();
            if first.is_ok() {
                first = closed;
            }
        }
        first
    }
}

/// Layouts of the three output streams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputLayouts {
    /// Eigenvalue stream.
    pub eigenvalues: RecordLayout,
    /// Coefficient stream.
    pub coefficients: RecordLayout,
    /// Weighted basis stream.
    pub basis: RecordLayout,
}

impl OutputLayouts {
    /// Derive the layouts from the input timing and the stream plan.
    pub fn new(timing: Timing, plan: &StreamPlan) -> Self {
        let k = plan.engine.num_eigen();
        let block_step = timing.xdelta * plan.consumption_stride as f64;
        let per_block = |kind, value| RecordLayout {
            kind,
            value,
            row_width: k,
            frame_len: k,
            xstart: 0.0,
            xdelta: 1.0,
            ystart: timing.xstart,
            ydelta: block_step,
        };
        Self {
            eigenvalues: per_block(RecordKind::Eigenvalues, ValueKind::Real),
            coefficients: per_block(RecordKind::Coefficients, ValueKind::Complex),
            basis: RecordLayout {
                kind: RecordKind::Basis,
                value: ValueKind::Complex,
                row_width: plan.engine.basis_len(),
                frame_len: plan.output_stride,
                xstart: timing.xstart,
                xdelta: timing.xdelta,
                ystart: timing.xstart,
                ydelta: block_step / k as f64,
            },
        }
    }
}

/// Progress of one block, passed to the run callback.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockReport {
    /// Zero-based block index.
    pub index: usize,
    /// Raw samples in this block before zero padding.
    pub valid: usize,
    /// Samples read from the source so far.
    pub samples_read: usize,
    /// Transform result for the block.
    pub outcome: std::result::Result<SelectionInfo, KltError>,
}

/// Totals for a finished stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamSummary {
    /// Blocks transformed (and rows written per enabled sink).
    pub blocks: usize,
    /// Blocks whose decomposition failed.
    pub failed_blocks: usize,
    /// Samples read from the source.
    pub samples_read: usize,
}

/// Drives a [`KltEngine`] over a sample stream.
#[derive(Debug)]
pub struct StreamController {
    plan: StreamPlan,
    engine: KltEngine,
    pending: VecDeque<Complex<f32>>,
    read_buf: Vec<Complex<f32>>,
}

impl StreamController {
    /// Build the engine and queue for `plan`.
    pub fn new(plan: StreamPlan) -> Result<Self> {
        let len = plan.engine.window_length();
        let engine = KltEngine::new(plan.engine)?;
        let mut pending = VecDeque::new();
        pending
            .try_reserve_exact(len)
            .map_err(|_| KltError::Allocation { buffer: "pending samples", len })?;
        let mut read_buf = Vec::new();
        read_buf
            .try_reserve_exact(len)
            .map_err(|_| KltError::Allocation { buffer: "read buffer", len })?;
        read_buf.resize(len, Complex::new(0.0, 0.0));
        Ok(Self {
            plan,
            engine,
            pending,
            read_buf,
        })
    }

    /// Stream plan in use.
    pub fn plan(&self) -> &StreamPlan {
        &self.plan
    }

    /// The engine, holding the outputs of the last block.
    pub fn engine(&self) -> &KltEngine {
        &self.engine
    }

    /// Output layouts for a source with `timing`.
    pub fn layouts(&self, timing: Timing) -> OutputLayouts {
        OutputLayouts::new(timing, &self.plan)
    }

    /// Process `source` to exhaustion, writing every block to `sinks`.
    ///
    /// All enabled sinks are closed before this returns, on success and on
    /// error alike.
    pub fn run<S, F>(&mut self, source: &mut S, sinks: &mut Sinks<'_>, on_block: F) -> Result<StreamSummary>
    where
        S: SampleSource + ?Sized,
        F: FnMut(&BlockReport),
    {
        let result = self.stream(source, sinks, on_block);
        let closed = sinks.close_all();
        let summary = result?;
        closed?;
        tracing::info!(
            blocks = summary.blocks,
            failed = summary.failed_blocks,
            samples = summary.samples_read,
            "stream finished"
        );
        Ok(summary)
    }

    fn stream<S, F>(&mut self, source: &mut S, sinks: &mut Sinks<'_>, mut on_block: F) -> Result<StreamSummary>
    where
        S: SampleSource + ?Sized,
        F: FnMut(&BlockReport),
    {
        let len = self.plan.engine.window_length();
        let stride = self.plan.consumption_stride;
        let mut summary = StreamSummary::default();
        let mut exhausted = false;
        self.pending.clear();

        tracing::info!(
            window_length = len,
            stride,
            order = self.plan.engine.order(),
            num_eigen = self.plan.engine.num_eigen(),
            sinks = sinks.enabled(),
            "stream started"
        );

        loop {
            while !exhausted && self.pending.len() < len {
                let want = len - self.pending.len();
                let got = source.read(&mut self.read_buf[..want])?;
                if got == 0 {
                    exhausted = true;
                } else {
                    self.pending.extend(&self.read_buf[..got]);
                    summary.samples_read += got;
                }
            }

            let valid = self.pending.len().min(len);
            if valid == 0 {
                break;
            }

            let window = self.engine.samples_mut();
            for (dst, src) in window.iter_mut().zip(self.pending.iter()) {
                *dst = *src;
            }
            window[valid..].fill(Complex::new(0.0, 0.0));

            let index = summary.blocks;
            let outcome = self.engine.transform();
            match &outcome {
                Ok(info) => {
                    tracing::debug!(block = index, valid, nsplit = info.nsplit, "block transformed");
                }
                Err(err) if err.is_recoverable() => {
                    summary.failed_blocks += 1;
                    tracing::warn!(block = index, %err, "decomposition failed, writing zeroed outputs");
                }
                Err(err) => return Err(err.clone().into()),
            }

            sinks.write_block(&self.engine)?;
            summary.blocks += 1;
            on_block(&BlockReport {
                index,
                valid,
                samples_read: summary.samples_read,
                outcome,
            });

            let drop = stride.min(self.pending.len());
            self.pending.drain(..drop);
        }

        Ok(summary)
    }
}
