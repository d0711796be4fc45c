//! Integration tests for karhunen-core.
//!
//! Exercises the eigen-solver against closed-form spectra and the engine's
//! block-level contracts: coefficient/basis consistency, degenerate blocks,
//! eigenvalue normalization, and recovery after a failed decomposition.

use karhunen_core::{
    AutocorrelationMethod, Complex, DecompositionStage, EngineConfig, HermitianEigenSolver,
    KltEngine, KltError, PackedHermitian,
};

const TAU: f32 = std::f32::consts::TAU;

fn chirp(n: usize) -> Vec<Complex<f32>> {
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            Complex::from_polar(1.0 + 0.2 * t, TAU * (3.0 * t + 4.0 * t * t))
        })
        .collect()
}

fn tridiagonal_toeplitz(n: usize, a: f32, b: Complex<f32>) -> PackedHermitian {
    let mut m = PackedHermitian::new(n).unwrap();
    for i in 0..n {
        m.set(i, i, Complex::new(a, 0.0));
        if i + 1 < n {
            m.set(i + 1, i, b);
        }
    }
    m
}

// ============================================================================
// 1. Eigen-solver accuracy
// ============================================================================

#[test]
fn tridiagonal_toeplitz_spectrum_matches_closed_form() {
    let n = 12;
    let k = 4;
    let (a, b) = (3.0f32, Complex::new(0.6, -0.8));
    let original = tridiagonal_toeplitz(n, a, b);
    let mut matrix = original.clone();

    let mut solver = HermitianEigenSolver::new(n, k).unwrap();
    let mut vals = vec![0.0f32; k];
    let mut vecs = vec![Complex::new(0.0, 0.0); n * k];
    let info = solver.solve(&mut matrix, &mut vals, &mut vecs).unwrap();
    assert_eq!(info.found, k);

    // a + 2|b| cos(jπ/(n+1)), largest for j = 1..=k
    let mut expected: Vec<f32> = (1..=k)
        .map(|j| a + 2.0 * b.norm() * (j as f32 * std::f32::consts::PI / (n + 1) as f32).cos())
        .collect();
    expected.reverse();
    for (got, want) in vals.iter().zip(&expected) {
        assert!((got - want).abs() <= 1e-4 * want.abs(), "{got} vs {want}");
    }

    let mut av = vec![Complex::new(0.0, 0.0); n];
    for j in 0..k {
        let v = &vecs[j * n..(j + 1) * n];
        original.mul_vec(v, &mut av);
        let residual: f32 = av
            .iter()
            .zip(v)
            .map(|(x, y)| (x - y * vals[j]).norm_sqr())
            .sum::<f32>()
            .sqrt();
        assert!(residual < 1e-4, "residual {residual} for pair {j}");
        for i in 0..k {
            let dot: Complex<f32> = (0..n).map(|t| vecs[i * n + t].conj() * v[t]).sum();
            let want = if i == j { 1.0 } else { 0.0 };
            assert!((dot - Complex::new(want, 0.0)).norm() < 1e-4, "<v{i}, v{j}> = {dot}");
        }
    }
}

#[test]
fn diagonal_matrix_splits_and_selects_across_blocks() {
    let n = 5;
    let mut matrix = PackedHermitian::new(n).unwrap();
    for (i, d) in [1.0, 7.0, 3.0, 9.0, 5.0].into_iter().enumerate() {
        matrix.set(i, i, Complex::new(d, 0.0));
    }
    let mut solver = HermitianEigenSolver::new(n, 3).unwrap();
    let mut vals = vec![0.0f32; 3];
    let mut vecs = vec![Complex::new(0.0, 0.0); n * 3];
    let info = solver.solve(&mut matrix, &mut vals, &mut vecs).unwrap();
    assert_eq!(info.nsplit, n);
    assert_eq!(vals, vec![5.0, 7.0, 9.0]);
    // Eigenvector of 9.0 is e_3.
    assert!((vecs[2 * n + 3] - Complex::new(1.0, 0.0)).norm() < 1e-6);
}

// ============================================================================
// 2. Engine block contracts
// ============================================================================

#[test]
fn basis_is_eigenvector_times_coefficient() {
    let config = EngineConfig::new(48, 10, 3).unwrap();
    let mut engine = KltEngine::new(config).unwrap();
    engine.samples_mut().copy_from_slice(&chirp(48));
    engine.transform().unwrap();

    let order = 10;
    let x = engine.samples();
    for c in 0..3 {
        let v = &engine.eigenvectors()[c * order..(c + 1) * order];
        let coeff: Complex<f32> = (0..order).fold(Complex::new(0.0, 0.0), |acc, t| acc + x[t] * v[t].conj());
        assert_eq!(engine.coefficients()[c], coeff);
        for t in 0..order {
            assert_eq!(engine.basis_function(c)[t], v[t] * coeff);
        }
    }
}

#[test]
fn zero_block_yields_zero_spectrum() {
    let config = EngineConfig::new(16, 6, 3).unwrap().with_normalized_eigenvalues(true);
    let mut engine = KltEngine::new(config).unwrap();
    let info = engine.transform().unwrap();
    assert_eq!(info.found, 3);
    assert!(engine.eigenvalues().iter().all(|&v| v == 0.0));
    assert!(engine.coefficients().iter().all(|c| c.re == 0.0 && c.im == 0.0));
    assert!(engine.basis().iter().all(|c| c.re == 0.0 && c.im == 0.0));
}

#[test]
fn normalized_top_eigenvalue_is_one() {
    let config = EngineConfig::new(40, 8, 3)
        .unwrap()
        .with_window(true)
        .with_normalized_eigenvalues(true);
    let mut engine = KltEngine::new(config).unwrap();
    engine.samples_mut().copy_from_slice(&chirp(40));
    engine.transform().unwrap();
    let vals = engine.eigenvalues();
    assert!((vals[2] - 1.0).abs() < 1e-6);
    assert!(vals.iter().all(|v| v.abs() <= 1.0 + 1e-6));
}

#[test]
fn failed_block_zeroes_outputs_and_next_block_recovers() {
    let config = EngineConfig::new(16, 4, 2).unwrap();
    let mut engine = KltEngine::new(config).unwrap();

    engine.samples_mut().copy_from_slice(&chirp(16));
    engine.samples_mut()[3] = Complex::new(f32::NAN, 0.0);
    let err = engine.transform().unwrap_err();
    assert!(err.is_recoverable());
    assert!(matches!(
        err,
        KltError::Decomposition {
            stage: DecompositionStage::Tridiagonalize,
            ..
        }
    ));
    assert!(engine.eigenvalues().iter().all(|&v| v == 0.0));
    assert!(engine.coefficients().iter().all(|c| *c == Complex::new(0.0, 0.0)));
    assert!(engine.basis().iter().all(|c| *c == Complex::new(0.0, 0.0)));

    engine.samples_mut().copy_from_slice(&chirp(16));
    engine.transform().unwrap();
    assert!(engine.eigenvalues().iter().all(|v| v.is_finite()));
    assert!(engine.eigenvalues()[1] > 0.0);
}

#[test]
fn decomposition_is_invariant_to_input_amplitude() {
    let (len, order, k) = (32, 8, 2);
    let two_tone: Vec<Complex<f32>> = (0..len)
        .map(|i| {
            let t = i as f32;
            Complex::from_polar(1.0, 0.9 * t) + Complex::from_polar(0.3, -2.1 * t)
        })
        .collect();

    for (name, block) in [("two-tone", two_tone), ("chirp", chirp(len))] {
        let config = EngineConfig::new(len, order, k).unwrap();
        let mut reference = KltEngine::new(config).unwrap();
        reference.samples_mut().copy_from_slice(&block);
        reference.transform().unwrap();
        let ref_vals = reference.eigenvalues().to_vec();
        let ref_vecs = reference.eigenvectors().to_vec();
        let ref_coeffs = reference.coefficients().to_vec();
        let peak = f64::from(ref_vals[k - 1]);
        let coeff_peak = ref_coeffs.iter().fold(0.0f32, |m, z| m.max(z.norm()));

        let mut engine = KltEngine::new(config).unwrap();
        for amp in [1e-12f32, 1e-9, 1e-6, 1e-3, 1e3, 1e6, 1e8, 3e8, 1e9] {
            for (dst, src) in engine.samples_mut().iter_mut().zip(&block) {
                *dst = *src * amp;
            }
            engine
                .transform()
                .unwrap_or_else(|e| panic!("{name} at amplitude {amp:e}: {e}"));

            let power = f64::from(amp) * f64::from(amp);
            for (got, want) in engine.eigenvalues().iter().zip(&ref_vals) {
                let scaled = f64::from(*got) / power;
                assert!(
                    (scaled - f64::from(*want)).abs() <= 1e-4 * peak,
                    "{name} at amplitude {amp:e}: {scaled} vs {want}"
                );
            }
            for (got, want) in engine.coefficients().iter().zip(&ref_coeffs) {
                let scaled = got.norm() / amp;
                assert!(
                    (scaled - want.norm()).abs() <= 1e-3 * coeff_peak,
                    "{name} at amplitude {amp:e}: |c| {scaled} vs {}",
                    want.norm()
                );
            }
            // Unit eigenvectors agree up to a phase factor.
            for c in 0..k {
                let v = &engine.eigenvectors()[c * order..(c + 1) * order];
                let r = &ref_vecs[c * order..(c + 1) * order];
                let overlap: Complex<f32> = r.iter().zip(v).map(|(a, b)| a.conj() * *b).sum();
                assert!(
                    overlap.norm() > 1.0 - 1e-3,
                    "{name} at amplitude {amp:e}: vector {c} overlap {}",
                    overlap.norm()
                );
            }
        }
    }
}

#[test]
fn fft_and_direct_estimators_agree_on_spectrum() {
    let samples = chirp(64);
    let mut spectra = Vec::new();
    for method in [AutocorrelationMethod::Direct, AutocorrelationMethod::Fft] {
        let config = EngineConfig::new(64, 12, 4).unwrap().with_autocorrelation(method);
        let mut engine = KltEngine::new(config).unwrap();
        engine.samples_mut().copy_from_slice(&samples);
        engine.transform().unwrap();
        spectra.push(engine.eigenvalues().to_vec());
    }
    let top = spectra[0][3];
    for (a, b) in spectra[0].iter().zip(&spectra[1]) {
        assert!((a - b).abs() < 1e-3 * top, "{a} vs {b}");
    }
}
