//! Sturm-sequence bisection for the largest eigenvalues of a symmetric
//! tridiagonal matrix.
//!
//! The matrix is first split into unreduced blocks wherever an off-diagonal
//! entry is negligible:
//!
//! ```text
//! e[j]² ≤ ulp² · |d[j] · d[j+1]| + safe_min
//! ```
//!
//! Each block's candidates are bisected independently on the Sturm count
//! (number of eigenvalues below `x`), then the largest `k` are selected
//! across all blocks.
//!
//! Reference: Demmel, "Applied Numerical Linear Algebra", §5.3.4.

use crate::error::{DecompositionStage, KltError, Result};

const ULP: f32 = f32::EPSILON;
const SAFE_MIN: f32 = f32::MIN_POSITIVE;
const FUDGE: f32 = 2.1;
const MAX_BISECT_ITERS: usize = 256;

/// Selection metadata, informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionInfo {
    /// Eigenvalues selected.
    pub found: usize,
    /// Number of unreduced diagonal blocks.
    pub nsplit: usize,
}

/// Split `d`/`e` into unreduced blocks.
///
/// Writes the inclusive end index of each block to `block_end` and returns
/// the number of blocks.
pub fn split_blocks(d: &[f32], e: &[f32], block_end: &mut [usize]) -> usize {
    let n = d.len();
    let mut nsplit = 0;
    for j in 0..n - 1 {
        let e2 = e[j] * e[j];
        if (d[j] * d[j + 1]).abs() * ULP * ULP + SAFE_MIN > e2 {
            block_end[nsplit] = j;
            nsplit += 1;
        }
    }
    block_end[nsplit] = n - 1;
    nsplit + 1
}

/// Number of eigenvalues of the tridiagonal block strictly below `x`.
///
/// `e` holds the block's `d.len() − 1` off-diagonal entries.
pub fn sturm_count(d: &[f32], e: &[f32], x: f32, pivmin: f32) -> usize {
    let mut count = 0;
    let mut q = d[0] - x;
    if q.abs() < pivmin {
        q = -pivmin;
    }
    if q < 0.0 {
        count += 1;
    }
    for i in 1..d.len() {
        q = d[i] - x - e[i - 1] * e[i - 1] / q;
        if q.abs() < pivmin {
            q = -pivmin;
        }
        if q < 0.0 {
            count += 1;
        }
    }
    count
}

/// Bisect for the eigenvalue with ascending local index `k` of one block.
fn bisect(d: &[f32], e: &[f32], k: usize, lo: f32, hi: f32, pivmin: f32, atol: f32) -> Option<f32> {
    let (mut lo, mut hi) = (lo, hi);
    for _ in 0..MAX_BISECT_ITERS {
        let width = hi - lo;
        let tol = atol.max(pivmin).max(2.0 * ULP * lo.abs().max(hi.abs()));
        if width <= tol {
            return Some(0.5 * (lo + hi));
        }
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            // Interval can no longer shrink in f32.
            return Some(mid);
        }
        if sturm_count(d, e, mid, pivmin) > k {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    None
}

/// Scratch for [`select_largest`], sized once for a given order.
#[derive(Debug, Clone)]
pub struct SelectionScratch {
    pub(crate) block_end: Vec<usize>,
    values: Vec<f32>,
    blocks: Vec<usize>,
    locals: Vec<usize>,
    rank: Vec<usize>,
}

impl SelectionScratch {
    /// Allocate scratch for matrices up to `order`.
    pub fn new(order: usize) -> Result<Self> {
        Ok(Self {
            block_end: crate::buffer::zeroed("block split indices", order)?,
            values: crate::buffer::zeroed("candidate eigenvalues", order)?,
            blocks: crate::buffer::zeroed("candidate blocks", order)?,
            locals: crate::buffer::zeroed("candidate local indices", order)?,
            rank: crate::buffer::zeroed("candidate ranks", order)?,
        })
    }

    /// First index of block `b`.
    pub(crate) fn block_start(&self, b: usize) -> usize {
        if b == 0 { 0 } else { self.block_end[b - 1] + 1 }
    }
}

/// Find the `k` largest eigenvalues of the tridiagonal matrix (`d`, `e`).
///
/// On success `eigenvalues[..k]` holds them in ascending order and
/// `eigen_block[..k]` the block each belongs to. Exact ties are ordered by
/// block.
pub fn select_largest(
    d: &[f32],
    e: &[f32],
    k: usize,
    eigenvalues: &mut [f32],
    eigen_block: &mut [usize],
    scratch: &mut SelectionScratch,
) -> Result<SelectionInfo> {
    let fail = |info| Err(KltError::decomposition(DecompositionStage::SelectEigenvalues, info));
    if !d.iter().chain(e.iter()).all(|x| x.is_finite()) {
        return fail(2);
    }

    let nsplit = split_blocks(d, e, &mut scratch.block_end);
    let max_e2 = e.iter().map(|x| x * x).fold(0.0f32, f32::max);
    let pivmin = SAFE_MIN * max_e2.max(1.0);

    let mut candidates = 0;
    for b in 0..nsplit {
        let start = scratch.block_start(b);
        let end = scratch.block_end[b];
        let m = end - start + 1;
        let bd = &d[start..=end];
        let be = &e[start..end];
        let wanted = k.min(m);

        if m == 1 {
            scratch.values[candidates] = bd[0];
            scratch.blocks[candidates] = b;
            scratch.locals[candidates] = 0;
            candidates += 1;
            continue;
        }

        // Gershgorin interval.
        let mut gl = f32::INFINITY;
        let mut gu = f32::NEG_INFINITY;
        for i in 0..m {
            let left = if i > 0 { be[i - 1].abs() } else { 0.0 };
            let right = if i + 1 < m { be[i].abs() } else { 0.0 };
            gl = gl.min(bd[i] - left - right);
            gu = gu.max(bd[i] + left + right);
        }
        let tnorm = gl.abs().max(gu.abs());
        let pad = FUDGE * tnorm * ULP * m as f32 + FUDGE * 2.0 * pivmin;
        gl -= pad;
        gu += pad;
        let atol = ULP * tnorm;

        for local in m - wanted..m {
            let Some(value) = bisect(bd, be, local, gl, gu, pivmin, atol) else {
                return fail(1);
            };
            scratch.values[candidates] = value;
            scratch.blocks[candidates] = b;
            scratch.locals[candidates] = local;
            candidates += 1;
        }
    }

    if candidates < k {
        return fail(3);
    }

    // Largest first; ties go to the lower block.
    let rank = &mut scratch.rank[..candidates];
    for (i, r) in rank.iter_mut().enumerate() {
        *r = i;
    }
    let (values, blocks, locals) = (&scratch.values, &scratch.blocks, &scratch.locals);
    rank.sort_unstable_by(|&a, &b| {
        values[b]
            .total_cmp(&values[a])
            .then(blocks[a].cmp(&blocks[b]))
            .then(locals[b].cmp(&locals[a]))
    });
    let chosen = &mut rank[..k];
    chosen.sort_unstable_by(|&a, &b| {
        values[a]
            .total_cmp(&values[b])
            .then(blocks[a].cmp(&blocks[b]))
            .then(locals[a].cmp(&locals[b]))
    });
    for (j, &idx) in chosen.iter().enumerate() {
        eigenvalues[j] = values[idx];
        eigen_block[j] = blocks[idx];
    }

    Ok(SelectionInfo { found: k, nsplit })
}
