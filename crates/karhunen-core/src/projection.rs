//! Projection of a block onto its eigenbasis.
//!
//! ```text
//! coeff[c]      = Σ_{t<order} x[t] · conj(v_c[t])
//! basis[c][t]   = v_c[t] · coeff[c]
//! ```
//!
//! Only the first `order` samples of the block take part.

use rustfft::num_complex::Complex;

/// Inner products of `x[..order]` with each of the `coefficients.len()`
/// eigenvectors stored column-major in `vectors`.
pub fn project(x: &[Complex<f32>], vectors: &[Complex<f32>], order: usize, coefficients: &mut [Complex<f32>]) {
    for (c, coeff) in coefficients.iter_mut().enumerate() {
        let v = &vectors[c * order..(c + 1) * order];
        *coeff = x[..order]
            .iter()
            .zip(v)
            .fold(Complex::new(0.0, 0.0), |acc, (xt, vt)| acc + xt * vt.conj());
    }
}

/// Weight each eigenvector by its coefficient into `basis` (column-major).
pub fn weight_basis(vectors: &[Complex<f32>], coefficients: &[Complex<f32>], order: usize, basis: &mut [Complex<f32>]) {
    for (c, &coeff) in coefficients.iter().enumerate() {
        let span = c * order..(c + 1) * order;
        for (out, v) in basis[span.clone()].iter_mut().zip(&vectors[span]) {
            *out = v * coeff;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f32, im: f32) -> Complex<f32> {
        Complex::new(re, im)
    }

    #[test]
    fn projection_uses_first_order_samples() {
        let x = [c(1.0, 0.0), c(0.0, 1.0), c(100.0, 100.0)];
        let vectors = [c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(0.0, 1.0)];
        let mut coeffs = [c(0.0, 0.0); 2];
        project(&x, &vectors, 2, &mut coeffs);
        assert_eq!(coeffs[0], c(1.0, 0.0));
        // i · conj(i) = 1
        assert_eq!(coeffs[1], c(1.0, 0.0));
    }

    #[test]
    fn basis_is_vector_times_coefficient() {
        let vectors = [c(0.6, 0.0), c(0.0, 0.8)];
        let coeffs = [c(2.0, -1.0)];
        let mut basis = [c(0.0, 0.0); 2];
        weight_basis(&vectors, &coeffs, 2, &mut basis);
        assert_eq!(basis[0], vectors[0] * coeffs[0]);
        assert_eq!(basis[1], vectors[1] * coeffs[0]);
    }
}
