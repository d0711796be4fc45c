//! Householder reduction of a packed Hermitian matrix to real tridiagonal form,
//! and application of the accumulated unitary transform.
//!
//! The reduction computes `T = Qᴴ A Q` with
//!
//! ```text
//! Q = H(0) · H(1) · … · H(n−2),   H(i) = I − τᵢ vᵢ vᵢᴴ
//! ```
//!
//! where `vᵢ[0..=i] = 0`, `vᵢ[i+1] = 1` and `vᵢ[i+2..n]` is stored in place of
//! the annihilated entries of column `i`. Each τᵢ is chosen so that the
//! subdiagonal entry `A(i+1, i)` becomes real, which makes `T` real symmetric.
//!
//! Reference: Golub & Van Loan, "Matrix Computations" (4th ed.), §8.3.1.

use crate::error::{DecompositionStage, KltError, Result};
use crate::packed::{PackedHermitian, packed_index};
use rustfft::num_complex::Complex;

const ZERO: Complex<f32> = Complex { re: 0.0, im: 0.0 };
const ONE: Complex<f32> = Complex { re: 1.0, im: 0.0 };

#[inline]
fn is_finite(z: Complex<f32>) -> bool {
    z.re.is_finite() && z.im.is_finite()
}

/// Hermitian access into raw packed storage.
#[inline]
fn herm(ap: &[Complex<f32>], n: usize, r: usize, c: usize) -> Complex<f32> {
    if r >= c {
        ap[packed_index(n, r, c)]
    } else {
        ap[packed_index(n, c, r)].conj()
    }
}

/// `|z|²` squared in f64, so it neither overflows nor underflows for any
/// finite f32 input.
#[inline]
fn norm_sqr_f64(z: Complex<f32>) -> f64 {
    let (re, im) = (f64::from(z.re), f64::from(z.im));
    re * re + im * im
}

/// Generate an elementary reflector.
///
/// On entry `s[0]` is α and `s[1..]` is x. On return `s[0]` is the real β and
/// `s[1..]` holds the reflector tail, so that
/// `Hᴴ · [α; x] = [β; 0]` with `H = I − τ [1; v] [1; v]ᴴ`.
fn reflector(s: &mut [Complex<f32>]) -> (f32, Complex<f32>) {
    let alpha = s[0];
    let xnorm_sq: f64 = s[1..].iter().map(|&z| norm_sqr_f64(z)).sum();
    if xnorm_sq == 0.0 && alpha.im == 0.0 {
        return (alpha.re, ZERO);
    }
    let norm = (norm_sqr_f64(alpha) + xnorm_sq).sqrt() as f32;
    let beta = if alpha.re >= 0.0 { -norm } else { norm };
    let tau = Complex::new((beta - alpha.re) / beta, -alpha.im / beta);
    let denom = alpha - beta;
    let denom_sq = norm_sqr_f64(denom);
    let scale = Complex::new(
        (f64::from(denom.re) / denom_sq) as f32,
        (-f64::from(denom.im) / denom_sq) as f32,
    );
    for z in &mut s[1..] {
        *z *= scale;
    }
    s[0] = Complex::new(beta, 0.0);
    (beta, tau)
}

/// Reduce `matrix` to real symmetric tridiagonal form.
///
/// Writes the diagonal to `d` (`n`), the off-diagonal to `e` (`n − 1`) and the
/// reflector scalars to `tau` (`n − 1`). `matrix` is overwritten with the
/// reflector vectors. `v` and `w` are scratch of at least `n` entries.
///
/// Fails with the 1-based column index when a non-finite entry is met.
pub fn tridiagonalize(
    matrix: &mut PackedHermitian,
    d: &mut [f32],
    e: &mut [f32],
    tau: &mut [Complex<f32>],
    v: &mut [Complex<f32>],
    w: &mut [Complex<f32>],
) -> Result<()> {
    let n = matrix.order();
    let ap = matrix.as_mut_slice();
    ap[0] = Complex::new(ap[0].re, 0.0);

    for i in 0..n - 1 {
        let col = packed_index(n, i, i);
        let col_len = n - i;
        if !ap[col..col + col_len].iter().all(|&z| is_finite(z)) {
            return Err(KltError::decomposition(
                DecompositionStage::Tridiagonalize,
                (i + 1) as i32,
            ));
        }

        let (beta, taui) = reflector(&mut ap[col + 1..col + col_len]);
        e[i] = beta;

        if taui != ZERO {
            let m = n - i - 1;
            let off = i + 1;

            v[0] = ONE;
            v[1..m].copy_from_slice(&ap[col + 2..col + col_len]);

            // w = τ · A22 · v
            for r in 0..m {
                let mut acc = ZERO;
                for c in 0..m {
                    let a = if r == c {
                        Complex::new(ap[packed_index(n, off + r, off + r)].re, 0.0)
                    } else {
                        herm(ap, n, off + r, off + c)
                    };
                    acc += a * v[c];
                }
                w[r] = taui * acc;
            }

            // w -= ½ τ (wᴴ v) v
            let mut dot = ZERO;
            for k in 0..m {
                dot += w[k].conj() * v[k];
            }
            let alpha = -0.5 * taui * dot;
            for k in 0..m {
                w[k] += alpha * v[k];
            }

            // A22 -= v wᴴ + w vᴴ (lower triangle only)
            for c in 0..m {
                for r in c..m {
                    let idx = packed_index(n, off + r, off + c);
                    let update = v[r] * w[c].conj() + w[r] * v[c].conj();
                    ap[idx] -= update;
                    if r == c {
                        ap[idx].im = 0.0;
                    }
                }
            }
        } else {
            let next = packed_index(n, i + 1, i + 1);
            ap[next].im = 0.0;
        }

        // Keep β in the subdiagonal slot; apply_q treats v[i+1] = 1 implicitly.
        ap[col + 1] = Complex::new(beta, 0.0);
        d[i] = ap[col].re;
        tau[i] = taui;
    }

    let last = ap.len() - 1;
    if !is_finite(ap[last]) {
        return Err(KltError::decomposition(
            DecompositionStage::Tridiagonalize,
            n as i32,
        ));
    }
    d[n - 1] = ap[last].re;
    Ok(())
}

/// Overwrite the `k` column vectors in `c` (column-major, `n` rows) with `Q · c`.
///
/// `reflectors` and `tau` must come from [`tridiagonalize`].
pub fn apply_q(reflectors: &PackedHermitian, tau: &[Complex<f32>], c: &mut [Complex<f32>], k: usize) {
    let n = reflectors.order();
    let ap = reflectors.as_slice();
    for i in (0..n - 1).rev() {
        let taui = tau[i];
        if taui == ZERO {
            continue;
        }
        let col = packed_index(n, i, i);
        // v[i+1] = 1, v[i+2..n] = ap[col+2..col+n-i]
        for j in 0..k {
            let column = &mut c[j * n..(j + 1) * n];
            let mut s = column[i + 1];
            for r in i + 2..n {
                s += ap[col + r - i].conj() * column[r];
            }
            let f = taui * s;
            column[i + 1] -= f;
            for r in i + 2..n {
                column[r] -= ap[col + r - i] * f;
            }
        }
    }
}
