//! Dense `C += A * B` kernels over square row-major matrices.
//!
//! Every kernel uses the same i-k-j nesting: for each output row `i` and each
//! shared index `k`, row `k` of B is scaled by `A[i][k]` and added into row
//! `i` of C. Both B and C are then walked with unit stride in the innermost
//! loop. The parallel variants only differ in how the `(i, k)` space is
//! split across workers.

use std::cmp::min;
use std::fmt;
use std::str::FromStr;

use num::integer::div_ceil;

use crate::error::{invalid_variant, BenchError};
use crate::exec::Executor;
use crate::matrix::Matrix;

/// Parallelisation strategy for one benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Output rows statically split across workers.
    Flat,
    /// The `(i, k)` pair space flattened, then statically split.
    Collapsed,
    /// Cubic tiles of side `block_size`; the `(ii, kk)` tile space is flattened and split.
    Blocked,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Flat, Variant::Collapsed, Variant::Blocked];

    /// Name used on the command line and in the CSV record.
    pub fn name(self) -> &'static str {
        match self {
            Variant::Flat => "single",
            Variant::Collapsed => "collapse",
            Variant::Blocked => "blocked",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| invalid_variant(s))
    }
}

/// `c_row += r * b_row`, element-wise.
#[inline(always)]
fn axpy_row(r: f64, b_row: &[f64], c_row: &mut [f64]) {
    for (c, &b) in c_row.iter_mut().zip(b_row) {
        *c += r * b;
    }
}

/// Accumulates `A[i][k] * B[k][..]` for `k` in `ks` into `c_row`.
#[inline(always)]
fn row_update(a: &Matrix, b: &Matrix, i: usize, ks: std::ops::Range<usize>, c_row: &mut [f64]) {
    let a_row = a.row(i);
    for k in ks {
        axpy_row(a_row[k], b.row(k), c_row);
    }
}

fn check_dims(a: &Matrix, b: &Matrix, c: &Matrix) -> usize {
    let n = a.dim();
    assert_eq!(b.dim(), n, "B: expected {n}x{n}, got {0}x{0}", b.dim());
    assert_eq!(c.dim(), n, "C: expected {n}x{n}, got {0}x{0}", c.dim());
    n
}

/// Sequential `C += A * B` in i-k-j order. Ground truth for every other kernel.
///
/// # Panics
///
/// Panics if the three matrices differ in dimension.
pub fn matmul_reference(a: &Matrix, b: &Matrix, c: &mut Matrix) {
    let n = check_dims(a, b, c);
    for (i, c_row) in c.as_mut_slice().chunks_exact_mut(n).enumerate() {
        row_update(a, b, i, 0..n, c_row);
    }
}

/// Parallel `C += A * B` with the row index split into one contiguous run per worker.
pub fn matmul_flat<E: Executor>(exec: &E, a: &Matrix, b: &Matrix, c: &mut Matrix) {
    let n = check_dims(a, b, c);
    exec.for_rows(c.as_mut_slice(), n, |first_row, rows| {
        for (di, c_row) in rows.chunks_exact_mut(n).enumerate() {
            row_update(a, b, first_row + di, 0..n, c_row);
        }
    });
}

/// Parallel `C += A * B` over the flattened `(i, k)` space.
///
/// With few rows per worker the chunks stay balanced, since each holds
/// `n * n / workers` iterations regardless of where row boundaries fall.
pub fn matmul_collapsed<E: Executor>(exec: &E, a: &Matrix, b: &Matrix, c: &mut Matrix) {
    let n = check_dims(a, b, c);
    exec.for_collapsed(c.as_mut_slice(), n, n, n, |i, ks, c_row| {
        row_update(a, b, i, ks, c_row);
    });
}

/// Parallel tiled `C += A * B`.
///
/// The iteration space is cut into cubes of side `block_size`; tiles on the
/// high edge are clamped to `n`. The `(ii, kk)` tile pairs are flattened and
/// split across workers, and each pair sweeps every `jj` tile so the `B`
/// sub-block stays in cache for the whole inner `j` loop.
///
/// A `block_size` of zero is treated as one; anything above `n` yields a
/// single tile.
pub fn matmul_blocked<E: Executor>(
    exec: &E,
    a: &Matrix,
    b: &Matrix,
    c: &mut Matrix,
    block_size: usize,
) {
    let n = check_dims(a, b, c);
    let bs = block_size.clamp(1, n);
    let tiles = div_ceil(n, bs);

    exec.for_collapsed(c.as_mut_slice(), bs * n, tiles, tiles, |ii, kks, band| {
        let i0 = ii * bs;
        let i_end = min(i0 + bs, n);
        for kk in kks {
            let k0 = kk * bs;
            let k_end = min(k0 + bs, n);
            for j0 in (0..n).step_by(bs) {
                let j_end = min(j0 + bs, n);
                for i in i0..i_end {
                    let a_row = a.row(i);
                    let c_row = &mut band[(i - i0) * n..(i - i0 + 1) * n];
                    for k in k0..k_end {
                        axpy_row(a_row[k], &b.row(k)[j0..j_end], &mut c_row[j0..j_end]);
                    }
                }
            }
        }
    });
}

/// Runs `variant` once. `block_size` only affects [`Variant::Blocked`].
///
/// # Panics
///
/// Every kernel panics if the three matrices differ in dimension.
pub fn run_variant<E: Executor>(
    variant: Variant,
    exec: &E,
    a: &Matrix,
    b: &Matrix,
    c: &mut Matrix,
    block_size: usize,
) {
    match variant {
        Variant::Flat => matmul_flat(exec, a, b, c),
        Variant::Collapsed => matmul_collapsed(exec, a, b, c),
        Variant::Blocked => matmul_blocked(exec, a, b, c, block_size),
    }
}
