//! Top-K eigen-decomposition of packed Hermitian matrices.
//!
//! Three stages, each reporting its own [`DecompositionStage`] on failure:
//!
//! 1. [`tridiagonalize`]: unitary reduction `T = Qᴴ A Q`
//! 2. [`select_largest`]: bisection for the `K` largest eigenvalues of `T`
//! 3. [`InverseIteration`] then [`apply_q`]: eigenvectors of `T`, mapped
//!    back through `Q`
//!
//! [`HermitianEigenSolver`] owns every scratch array the pipeline needs, so a
//! solve never allocates. Before the first stage the matrix is scaled by a
//! power of two so that its largest entry lies in `[1, 2)`; the eigenvalues
//! are scaled back afterwards. Power-of-two scaling is exact, so the result
//! does not depend on the amplitude of the input block.

mod bisect;
mod inverse;
mod tridiag;

pub use bisect::{SelectionInfo, SelectionScratch, select_largest, split_blocks, sturm_count};
pub use inverse::InverseIteration;
pub use tridiag::{apply_q, tridiagonalize};

use crate::buffer;
use crate::error::{DecompositionStage, KltError, Result};
use crate::packed::PackedHermitian;
use rustfft::num_complex::Complex;

/// `x · 2^exp`, split in two steps so that neither factor leaves the normal
/// range.
fn scale_pow2(x: f32, exp: i32) -> f32 {
    let half = exp / 2;
    x * pow2(half) * pow2(exp - half)
}

/// `2^exp` for `exp` in `[-126, 127]`.
fn pow2(exp: i32) -> f32 {
    f32::from_bits(((exp + 127) as u32) << 23)
}

/// Binary exponent that brings the largest finite entry of `ap` into `[1, 2)`.
///
/// Zero for an all-zero matrix. A non-finite entry is left for
/// [`tridiagonalize`] to report.
fn balancing_exponent(ap: &[Complex<f32>]) -> i32 {
    let anrm = ap
        .iter()
        .fold(0.0f32, |m, z| m.max(z.re.abs()).max(z.im.abs()));
    if anrm == 0.0 || !anrm.is_finite() {
        return 0;
    }
    // Subnormals report -127 here, which still moves them up.
    let exponent = ((anrm.to_bits() >> 23) & 0xff) as i32 - 127;
    -exponent
}

/// Solver for the `num_eigen` algebraically largest eigenpairs.
#[derive(Debug, Clone)]
pub struct HermitianEigenSolver {
    order: usize,
    num_eigen: usize,
    d: Vec<f32>,
    e: Vec<f32>,
    tau: Vec<Complex<f32>>,
    v: Vec<Complex<f32>>,
    w: Vec<Complex<f32>>,
    selection: SelectionScratch,
    eigen_block: Vec<usize>,
    z: Vec<f32>,
    inverse: InverseIteration,
}

impl HermitianEigenSolver {
    /// Allocate a solver for `order × order` matrices.
    pub fn new(order: usize, num_eigen: usize) -> Result<Self> {
        if order < 2 || num_eigen < 1 || num_eigen > order {
            return Err(KltError::invalid_config(format!(
                "solver needs order >= 2 and num_eigen in [1, order], got {order}/{num_eigen}"
            )));
        }
        Ok(Self {
            order,
            num_eigen,
            d: buffer::zeroed("tridiagonal diagonal", order)?,
            e: buffer::zeroed("tridiagonal off-diagonal", order - 1)?,
            tau: buffer::zeroed("reflector scalars", order - 1)?,
            v: buffer::zeroed("reflector vector", order)?,
            w: buffer::zeroed("reflector work", order)?,
            selection: SelectionScratch::new(order)?,
            eigen_block: buffer::zeroed("eigenvalue blocks", num_eigen)?,
            z: buffer::zeroed(
                "tridiagonal eigenvectors",
                buffer::product("tridiagonal eigenvectors", order, num_eigen)?,
            )?,
            inverse: InverseIteration::new(order, num_eigen)?,
        })
    }

    /// Matrix order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Eigenpairs per solve.
    pub fn num_eigen(&self) -> usize {
        self.num_eigen
    }

    /// Decompose `matrix`, destroying its contents.
    ///
    /// On success `eigenvalues[..num_eigen]` holds the largest eigenvalues in
    /// ascending order and `vectors` (column-major, `order` rows) the matching
    /// orthonormal eigenvectors. On failure the contents of both outputs are
    /// unspecified; callers zero them.
    pub fn solve(
        &mut self,
        matrix: &mut PackedHermitian,
        eigenvalues: &mut [f32],
        vectors: &mut [Complex<f32>],
    ) -> Result<SelectionInfo> {
        debug_assert_eq!(matrix.order(), self.order);
        let (n, k) = (self.order, self.num_eigen);

        let shift = balancing_exponent(matrix.as_slice());
        if shift != 0 {
            for z in matrix.as_mut_slice() {
                z.re = scale_pow2(z.re, shift);
                z.im = scale_pow2(z.im, shift);
            }
        }

        tridiagonalize(
            matrix,
            &mut self.d,
            &mut self.e,
            &mut self.tau,
            &mut self.v,
            &mut self.w,
        )?;

        let info = select_largest(
            &self.d,
            &self.e,
            k,
            &mut eigenvalues[..k],
            &mut self.eigen_block,
            &mut self.selection,
        )?;

        self.inverse.run(
            &self.d,
            &self.e,
            &self.selection.block_end,
            info.nsplit,
            &eigenvalues[..k],
            &self.eigen_block,
            &mut self.z,
        )?;

        if shift != 0 {
            for v in &mut eigenvalues[..k] {
                *v = scale_pow2(*v, -shift);
            }
            if !eigenvalues[..k].iter().all(|v| v.is_finite()) {
                return Err(KltError::decomposition(
                    DecompositionStage::SelectEigenvalues,
                    2,
                ));
            }
        }

        let vectors = &mut vectors[..n * k];
        for (out, &x) in vectors.iter_mut().zip(&self.z) {
            *out = Complex::new(x, 0.0);
        }
        apply_q(matrix, &self.tau, vectors, k);

        for (j, column) in vectors.chunks_exact(n).enumerate() {
            if !column.iter().all(|z| z.re.is_finite() && z.im.is_finite()) {
                return Err(KltError::decomposition(
                    DecompositionStage::BackTransform,
                    (j + 1) as i32,
                ));
            }
        }
        Ok(info)
    }
}
