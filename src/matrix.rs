//! Square row-major `f64` matrices over cache-line-aligned storage.
//!
//! Element `(i, j)` of an `n x n` matrix lives at linear offset `i * n + j`.
//! Row slices and `ndarray` views are the only ways in; no caller ever does
//! offset arithmetic on the raw buffer.

use ndarray::{ArrayView2, ArrayViewMut2, Zip};

use crate::error::{constraint_error, layout_error, Result};
use crate::utils::AlignedBuf;
use crate::CACHE_LINE;

const ROW_MUL: u32 = 1_315_423_911;
const COL_MUL: u32 = 2_654_435_761;

/// Generator value for element `(i, j)`.
///
/// `scale * ((i * 1315423911 + j * 2654435761) mod 256) / 255`, with the
/// multiply-add wrapping in 32 bits. Result lies in `[0, scale]`.
#[inline]
pub fn pattern_value(i: usize, j: usize, scale: f64) -> f64 {
    let h = (i as u32)
        .wrapping_mul(ROW_MUL)
        .wrapping_add((j as u32).wrapping_mul(COL_MUL));
    scale * f64::from(h & 0xFF) / 255.0
}

/// An `n x n` dense matrix stored contiguously in row-major order.
#[derive(Debug)]
pub struct Matrix {
    n: usize,
    buf: AlignedBuf,
}

impl Matrix {
    /// Allocates an all-zero `n x n` matrix aligned to [`CACHE_LINE`].
    ///
    /// # Errors
    ///
    /// `Constraint` for `n == 0`, `Layout` if `n * n` overflows, and
    /// `Allocation` when the allocator is exhausted.
    pub fn zeros(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(constraint_error("matrix dimension must be positive"));
        }
        let len = n
            .checked_mul(n)
            .ok_or_else(|| layout_error(n, CACHE_LINE, "n * n overflows usize"))?;
        let buf = AlignedBuf::zeroed(len, CACHE_LINE)?;
        Ok(Matrix { n, buf })
    }

    /// Allocates an `n x n` matrix filled by [`Matrix::fill_pattern`].
    pub fn generate(n: usize, scale: f64) -> Result<Self> {
        let mut m = Matrix::zeros(n)?;
        m.fill_pattern(scale);
        Ok(m)
    }

    /// Overwrites every element with [`pattern_value`].
    ///
    /// Runs on the calling thread only, so the contents never depend on the
    /// worker count or on which kernel consumes them afterwards.
    pub fn fill_pattern(&mut self, scale: f64) {
        Zip::indexed(self.view_mut()).for_each(|(i, j), x| *x = pattern_value(i, j, scale));
    }

    /// Resets every element to `0.0`.
    pub fn fill_zero(&mut self) {
        self.buf.fill(0.0);
    }

    /// Side length.
    #[inline]
    pub fn dim(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.buf
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.buf
    }

    /// Row `i` as a contiguous slice of length `n`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.n;
        &self.buf[i * n..(i + 1) * n]
    }

    /// Mutable row `i`.
    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        let n = self.n;
        &mut self.buf[i * n..(i + 1) * n]
    }

    /// Bounds-checked element read.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.view().get((i, j)).copied()
    }

    /// Read-only 2D view sharing this matrix's storage.
    ///
    /// # Panics
    ///
    /// Never in practice: the buffer is allocated with exactly `n * n`
    /// elements, so the shape always matches.
    pub fn view(&self) -> ArrayView2<'_, f64> {
        ArrayView2::from_shape((self.n, self.n), &self.buf[..])
            .expect("buffer always holds n * n elements")
    }

    /// Mutable 2D view sharing this matrix's storage.
    ///
    /// # Panics
    ///
    /// Same invariant as [`Matrix::view`].
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        let n = self.n;
        ArrayViewMut2::from_shape((n, n), &mut self.buf[..])
            .expect("buffer always holds n * n elements")
    }

    /// Relative L2 distance `||self - reference|| / ||reference||`.
    ///
    /// Falls back to the absolute distance `||self - reference||` when the
    /// reference is all zero.
    ///
    /// # Panics
    ///
    /// Panics if the two matrices differ in dimension.
    pub fn relative_error(&self, reference: &Matrix) -> f64 {
        assert_eq!(
            self.n, reference.n,
            "relative_error: dimension mismatch ({} vs {})",
            self.n, reference.n
        );

        let (num, den) = Zip::from(self.view())
            .and(reference.view())
            .fold((0.0f64, 0.0f64), |(num, den), &c, &r| {
                let d = c - r;
                (num + d * d, den + r * r)
            });

        if den == 0.0 {
            num.sqrt()
        } else {
            (num / den).sqrt()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;

    #[test]
    fn test_pattern_value_known_points() {
        assert_eq!(pattern_value(0, 0, 1.0), 0.0);
        // 2654435761 & 0xFF = 0xB1 = 177
        assert_eq!(pattern_value(0, 1, 1.0), 177.0 / 255.0);
        // 1315423911 & 0xFF = 0xA7 = 167
        assert_eq!(pattern_value(1, 0, 2.0), 2.0 * 167.0 / 255.0);
    }

    #[test]
    fn test_pattern_value_wraps_in_32_bits() {
        let i = 70_000usize;
        let j = 123_456usize;
        let h = (i as u64 * 1_315_423_911 + j as u64 * 2_654_435_761) as u32;
        assert_eq!(pattern_value(i, j, 1.0), f64::from(h & 0xFF) / 255.0);
    }

    #[test]
    fn test_generate_range_and_layout() {
        let m = Matrix::generate(13, 3.0).unwrap();
        assert_eq!(m.as_slice().len(), 169);
        for i in 0..13 {
            for j in 0..13 {
                let v = m.get(i, j).unwrap();
                assert!((0.0..=3.0).contains(&v));
                assert_eq!(m.as_slice()[i * 13 + j], v);
                assert_eq!(m.row(i)[j], v);
            }
        }
        assert_eq!(m.get(13, 0), None);
    }

    #[test]
    fn test_generate_is_reproducible() {
        let a = Matrix::generate(37, 1.0).unwrap();
        let b = Matrix::generate(37, 1.0).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_buffer_is_cache_line_aligned() {
        let m = Matrix::zeros(5).unwrap();
        assert_eq!(m.as_slice().as_ptr() as usize % CACHE_LINE, 0);
        assert_eq!(m.buf.alignment(), CACHE_LINE);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            Matrix::zeros(0).unwrap_err(),
            BenchError::Constraint { .. }
        ));
    }

    #[test]
    fn test_huge_dimension_fails_cleanly() {
        let err = Matrix::zeros(usize::MAX).unwrap_err();
        assert!(matches!(err, BenchError::Layout { .. }));
    }

    #[test]
    fn test_fill_zero() {
        let mut m = Matrix::generate(8, 1.0).unwrap();
        m.fill_zero();
        assert!(m.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_row_mut_and_view_agree() {
        let mut m = Matrix::zeros(3).unwrap();
        m.row_mut(1)[2] = 4.0;
        assert_eq!(m.view()[[1, 2]], 4.0);
        m.view_mut()[[2, 0]] = 5.0;
        assert_eq!(m.row(2)[0], 5.0);
    }

    #[test]
    fn test_relative_error_identical_is_zero() {
        let a = Matrix::generate(9, 1.0).unwrap();
        let b = Matrix::generate(9, 1.0).unwrap();
        assert_eq!(a.relative_error(&b), 0.0);
    }

    #[test]
    fn test_relative_error_scaled() {
        let reference = Matrix::generate(6, 1.0).unwrap();
        let mut c = Matrix::generate(6, 1.0).unwrap();
        c.as_mut_slice().iter_mut().for_each(|x| *x *= 1.5);
        assert!((c.relative_error(&reference) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_relative_error_zero_reference_is_absolute() {
        let reference = Matrix::zeros(2).unwrap();
        let mut c = Matrix::zeros(2).unwrap();
        c.as_mut_slice().copy_from_slice(&[3.0, 0.0, 0.0, 4.0]);
        assert_eq!(c.relative_error(&reference), 5.0);
    }
}
