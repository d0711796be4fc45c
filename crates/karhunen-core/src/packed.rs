//! Packed lower-triangular storage for Hermitian matrices.
//!
//! Column-major, lower triangle only: column `c` holds rows `c..order`, so the
//! matrix occupies `order · (order + 1) / 2` complex entries. Entry `(r, c)`
//! with `r >= c` lives at
//!
//! ```text
//! c · (2·order − c + 1) / 2 + (r − c)
//! ```
//!
//! The upper triangle is implied by Hermitian symmetry: `A(c, r) = conj(A(r, c))`.

use crate::buffer;
use crate::error::{KltError, Result};
use rustfft::num_complex::Complex;

/// Owned packed Hermitian matrix.
///
/// The eigen-solver overwrites the contents with Householder reflectors, so
/// the matrix must be rebuilt before every decomposition.
#[derive(Debug, Clone)]
pub struct PackedHermitian {
    order: usize,
    data: Vec<Complex<f32>>,
}

/// Offset of entry `(row, col)`, `row >= col`, in packed storage.
#[inline]
pub fn packed_index(order: usize, row: usize, col: usize) -> usize {
    debug_assert!(row >= col && row < order);
    col * (2 * order - col + 1) / 2 + (row - col)
}

impl PackedHermitian {
    /// Allocate a zero matrix of the given order.
    pub fn new(order: usize) -> Result<Self> {
        let len = buffer::product("packed matrix", order, order.saturating_add(1))? / 2;
        let data = buffer::zeroed("packed matrix", len)?;
        Ok(Self { order, data })
    }

    /// Build from the dense lower triangle of `rows` (row-major, `order × order`).
    ///
    /// The upper triangle of `rows` is ignored.
    pub fn from_lower(order: usize, rows: &[Complex<f32>]) -> Result<Self> {
        if order.checked_mul(order) != Some(rows.len()) {
            return Err(KltError::invalid_config(format!(
                "dense matrix of order {order} needs {order}x{order} entries, got {}",
                rows.len()
            )));
        }
        let mut m = Self::new(order)?;
        for c in 0..order {
            for r in c..order {
                m.set(r, c, rows[r * order + c]);
            }
        }
        Ok(m)
    }

    /// Matrix order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Packed entries.
    pub fn as_slice(&self) -> &[Complex<f32>] {
        &self.data
    }

    /// Mutable packed entries.
    pub fn as_mut_slice(&mut self) -> &mut [Complex<f32>] {
        &mut self.data
    }

    /// Entry `(row, col)` of the full Hermitian matrix.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Complex<f32> {
        if row >= col {
            self.data[packed_index(self.order, row, col)]
        } else {
            self.data[packed_index(self.order, col, row)].conj()
        }
    }

    /// Set lower-triangle entry `(row, col)`, `row >= col`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: Complex<f32>) {
        let idx = packed_index(self.order, row, col);
        self.data[idx] = value;
    }

    /// Expand the lag vector stored in column 0 into the full Toeplitz matrix.
    ///
    /// On entry the first `order` entries hold `r[0..order]`; on return column
    /// `c` holds `r[0..order-c]`, i.e. `A(c + j, c) = r[j]`.
    pub fn expand_toeplitz(&mut self) {
        let n = self.order;
        let mut out = n;
        for col_len in (1..n).rev() {
            for lag in 0..col_len {
                self.data[out] = self.data[lag];
                out += 1;
            }
        }
    }

    /// Dense Hermitian matrix-vector product `y = A x`.
    pub fn mul_vec(&self, x: &[Complex<f32>], y: &mut [Complex<f32>]) {
        let n = self.order;
        debug_assert!(x.len() >= n && y.len() >= n);
        for (r, yr) in y.iter_mut().enumerate().take(n) {
            let mut acc = Complex::new(0.0, 0.0);
            for (c, xc) in x.iter().enumerate().take(n) {
                acc += self.get(r, c) * xc;
            }
            *yr = acc;
        }
    }
}
