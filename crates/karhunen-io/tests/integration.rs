//! Integration tests for karhunen-io.
//!
//! Covers overlap/stride block cutting, sink synchronization across failed
//! blocks, and the WAV → transform → record file path.

use karhunen_config::{KltSettings, StreamPlan};
use karhunen_core::{Complex, KltEngine};
use karhunen_io::{
    BlockReport, MemorySink, RecordFileWriter, RecordKind, RecordRow, RecordSink, SampleSource, Sinks, StreamController,
    Timing, VecSource, WavIqSource, read_record_file, write_iq_wav,
};
use tempfile::TempDir;

fn plan(window_length: usize, input_overlap: f64, order: usize, num_eigen: usize) -> StreamPlan {
    KltSettings {
        window_length,
        input_overlap,
        order,
        num_eigen,
        ..KltSettings::default()
    }
    .plan()
    .unwrap()
}

fn ramp(n: usize) -> Vec<Complex<f32>> {
    (0..n)
        .map(|i| Complex::new(1.0 + i as f32, 0.5 * (i as f32).sin()))
        .collect()
}

/// Transform one explicit block with a fresh engine.
fn reference(plan: &StreamPlan, block: &[Complex<f32>]) -> (Vec<f32>, Vec<Complex<f32>>, Vec<Complex<f32>>) {
    let mut engine = KltEngine::new(plan.engine).unwrap();
    engine.samples_mut().copy_from_slice(block);
    let _ = engine.transform();
    (
        engine.eigenvalues().to_vec(),
        engine.coefficients().to_vec(),
        engine.basis().to_vec(),
    )
}

fn padded(samples: &[Complex<f32>], len: usize) -> Vec<Complex<f32>> {
    let mut block = samples.to_vec();
    block.resize(len, Complex::new(0.0, 0.0));
    block
}

// ============================================================================
// 1. Overlap and stride
// ============================================================================

#[test]
fn half_overlap_over_ten_samples_yields_three_blocks() {
    let plan = plan(8, 0.5, 4, 2);
    assert_eq!(plan.consumption_stride, 4);
    let samples = ramp(10);

    let mut controller = StreamController::new(plan).unwrap();
    let layouts = controller.layouts(Timing::default());
    let mut eig = MemorySink::new(layouts.eigenvalues);
    let mut coeff = MemorySink::new(layouts.coefficients);
    let mut basis = MemorySink::new(layouts.basis);
    let mut reports: Vec<BlockReport> = Vec::new();
    let summary = {
        let mut sinks = Sinks {
            eigenvalues: Some(&mut eig),
            coefficients: Some(&mut coeff),
            basis: Some(&mut basis),
        };
        controller
            .run(&mut VecSource::new(samples.clone()), &mut sinks, |r| reports.push(r.clone()))
            .unwrap()
    };

    assert_eq!(summary.blocks, 3);
    assert_eq!(summary.samples_read, 10);
    assert_eq!(reports.iter().map(|r| r.valid).collect::<Vec<_>>(), vec![8, 6, 2]);
    for sink in [&eig, &coeff, &basis] {
        assert_eq!(sink.rows().len(), 3);
        assert!(sink.is_closed());
    }

    let blocks = [
        samples[0..8].to_vec(),
        padded(&samples[4..10], 8),
        padded(&samples[8..10], 8),
    ];
    for (i, block) in blocks.iter().enumerate() {
        let (vals, coeffs, weighted) = reference(&plan, block);
        assert_eq!(eig.rows()[i], vals, "eigenvalues of block {i}");
        assert_eq!(coeff.complex_row(i), coeffs, "coefficients of block {i}");
        assert_eq!(basis.complex_row(i), weighted, "basis of block {i}");
    }
}

#[test]
fn no_overlap_cuts_disjoint_blocks() {
    let plan = plan(5, 0.0, 3, 1);
    let samples = ramp(12);
    let mut controller = StreamController::new(plan).unwrap();
    let mut coeff = MemorySink::new(controller.layouts(Timing::default()).coefficients);
    let mut valid = Vec::new();
    {
        let mut sinks = Sinks {
            coefficients: Some(&mut coeff),
            ..Sinks::default()
        };
        controller
            .run(&mut VecSource::new(samples.clone()), &mut sinks, |r| valid.push(r.valid))
            .unwrap();
    }
    assert_eq!(valid, vec![5, 5, 2]);
    let (_, last, _) = reference(&plan, &padded(&samples[10..12], 5));
    assert_eq!(coeff.complex_row(2), last);
}

// ============================================================================
// 2. Failure synchronization
// ============================================================================

#[test]
fn failed_block_writes_zero_rows_and_stream_continues() {
    let plan = plan(4, 0.0, 3, 2);
    let mut samples = ramp(12);
    samples[5] = Complex::new(f32::NAN, 0.0);

    let mut controller = StreamController::new(plan).unwrap();
    let layouts = controller.layouts(Timing::default());
    let mut eig = MemorySink::new(layouts.eigenvalues);
    let mut coeff = MemorySink::new(layouts.coefficients);
    let mut basis = MemorySink::new(layouts.basis);
    let mut outcomes = Vec::new();
    let summary = {
        let mut sinks = Sinks {
            eigenvalues: Some(&mut eig),
            coefficients: Some(&mut coeff),
            basis: Some(&mut basis),
        };
        controller
            .run(&mut VecSource::new(samples.clone()), &mut sinks, |r| {
                outcomes.push(r.outcome.is_ok())
            })
            .unwrap()
    };

    assert_eq!(summary.blocks, 3);
    assert_eq!(summary.failed_blocks, 1);
    assert_eq!(outcomes, vec![true, false, true]);
    for sink in [&eig, &coeff, &basis] {
        assert_eq!(sink.rows().len(), 3);
        assert!(sink.rows()[1].iter().all(|&v| v == 0.0));
    }
    assert_eq!(basis.rows()[1].len(), 2 * 3 * 2);

    let (vals, coeffs, _) = reference(&plan, &samples[8..12]);
    assert_eq!(eig.rows()[2], vals);
    assert_eq!(coeff.complex_row(2), coeffs);
}

// ============================================================================
// 3. Files
// ============================================================================

#[test]
fn wav_to_record_files_round_trip() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("tone.wav");
    let samples: Vec<_> = (0..100)
        .map(|i| Complex::from_polar(0.7, 0.3 * i as f32))
        .collect();
    write_iq_wav(&wav, &samples, 1000).unwrap();

    let plan = plan(32, 0.5, 8, 2);
    let mut source = WavIqSource::open(&wav).unwrap();
    let mut controller = StreamController::new(plan).unwrap();
    let layouts = controller.layouts(source.timing());
    assert!((layouts.coefficients.ydelta - 0.016).abs() < 1e-12);

    let eig_path = dir.path().join("eig.rec");
    let basis_path = dir.path().join("basis.rec");
    let mut eig = RecordFileWriter::create(&eig_path, layouts.eigenvalues).unwrap();
    let mut basis = RecordFileWriter::create(&basis_path, layouts.basis).unwrap();
    let summary = {
        let mut sinks = Sinks {
            eigenvalues: Some(&mut eig),
            basis: Some(&mut basis),
            ..Sinks::default()
        };
        controller.run(&mut source, &mut sinks, |_| {}).unwrap()
    };
    // 100 samples at stride 16
    assert_eq!(summary.blocks, 7);
    assert!(eig.write_row(RecordRow::Real(&[0.0, 0.0])).is_err());

    let eig_file = read_record_file(&eig_path).unwrap();
    assert_eq!(eig_file.layout.kind, RecordKind::Eigenvalues);
    assert_eq!(eig_file.rows.len(), 7);
    let (vals, _, weighted) = reference(&plan, &samples[0..32]);
    assert_eq!(eig_file.rows[0], vals);

    let basis_file = read_record_file(&basis_path).unwrap();
    assert_eq!(basis_file.layout.frame_len, plan.output_stride);
    assert_eq!(basis_file.complex_row(0), weighted);
}
