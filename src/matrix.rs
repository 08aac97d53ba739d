//! Row-major matrix over contiguous `f32` storage.
//!
//! The storage can be owned (`Vec<f32>`, used for scratch), borrowed (`&[f32]`, the design
//! matrix) or mutably borrowed (`&mut [f32]`, the caller's parameters).

use std::slice::{Chunks, ChunksMut};

use crate::config::check_len;
use crate::error::EpochError;

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<S = Vec<f32>> {
    data: S,
    rows: usize,
    cols: usize,
}

impl Matrix<Vec<f32>> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { data: vec![0.0; rows * cols], rows, cols }
    }

    /// Borrow the first `rows` rows; scratch is sized for the largest batch and
    /// a partial batch uses only its head.
    pub fn head_mut(&mut self, rows: usize) -> Matrix<&mut [f32]> {
        debug_assert!(rows <= self.rows, "head_mut({rows}) of {} rows", self.rows);
        Matrix { data: &mut self.data[..rows * self.cols], rows, cols: self.cols }
    }
}

impl<S: AsRef<[f32]>> Matrix<S> {
    /// Wrap a flat row-major buffer, checking its length against `rows * cols`.
    pub fn from_buffer(buffer: &'static str, data: S, rows: usize, cols: usize) -> Result<Self, EpochError> {
        let expected = rows.checked_mul(cols).ok_or(EpochError::SizeOverflow { buffer })?;
        check_len(buffer, expected, data.as_ref().len())?;
        Ok(Self { data, rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[f32] {
        self.data.as_ref()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        debug_assert!(row < self.rows && col < self.cols, "({row}, {col}) out of ({}, {})", self.rows, self.cols);
        self.data.as_ref()[row * self.cols + col]
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[f32] {
        debug_assert!(row < self.rows, "row {row} out of {}", self.rows);
        &self.data.as_ref()[row * self.cols..(row + 1) * self.cols]
    }

    /// Borrow the contiguous window of rows `start..end`.
    pub fn row_range(&self, start: usize, end: usize) -> Matrix<&[f32]> {
        debug_assert!(start <= end && end <= self.rows, "rows {start}..{end} out of {}", self.rows);
        Matrix { data: &self.data.as_ref()[start * self.cols..end * self.cols], rows: end - start, cols: self.cols }
    }

    pub fn row_iter(&self) -> RowIter<'_> {
        RowIter { chunks: self.data.as_ref().chunks(self.cols.max(1)), remaining: self.rows }
    }
}

impl<S: AsRef<[f32]> + AsMut<[f32]>> Matrix<S> {
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        self.data.as_mut()
    }

    #[inline]
    pub fn get_mut(&mut self, row: usize, col: usize) -> &mut f32 {
        debug_assert!(row < self.rows && col < self.cols, "({row}, {col}) out of ({}, {})", self.rows, self.cols);
        let cols = self.cols;
        &mut self.data.as_mut()[row * cols + col]
    }

    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [f32] {
        debug_assert!(row < self.rows, "row {row} out of {}", self.rows);
        let cols = self.cols;
        &mut self.data.as_mut()[row * cols..(row + 1) * cols]
    }

    pub fn row_iter_mut(&mut self) -> RowIterMut<'_> {
        let remaining = self.rows;
        let cols = self.cols.max(1);
        RowIterMut { chunks: self.data.as_mut().chunks_mut(cols), remaining }
    }

    pub fn fill(&mut self, value: f32) {
        self.data.as_mut().fill(value);
    }
}

/// Rows of a matrix in index order. Yields `rows` slices even when `cols == 0`.
pub struct RowIter<'a> {
    chunks: Chunks<'a, f32>,
    remaining: usize,
}

impl<'a> Iterator for RowIter<'a> {
    type Item = &'a [f32];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.chunks.next().unwrap_or(&[]))
    }
}

pub struct RowIterMut<'a> {
    chunks: ChunksMut<'a, f32>,
    remaining: usize,
}

impl<'a> Iterator for RowIterMut<'a> {
    type Item = &'a mut [f32];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.chunks.next().unwrap_or(&mut []))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_row_major() -> anyhow::Result<()> {
        let data = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let m = Matrix::from_buffer("x", &data[..], 2, 3)?;
        assert_eq!(m.get(0, 2), 3.0);
        assert_eq!(m.get(1, 0), 4.0);
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(m.row_range(1, 2).as_slice(), &[4.0, 5.0, 6.0]);
        assert_eq!(m.row_iter().count(), 2);
        Ok(())
    }

    #[test]
    fn rejects_wrong_length() {
        let data = [0.0f32; 5];
        let err = Matrix::from_buffer("theta", &data[..], 2, 3).unwrap_err();
        assert_eq!(err, EpochError::ShapeMismatch { buffer: "theta", expected: 6, actual: 5 });
    }

    #[test]
    fn writes_through_borrowed_storage() -> anyhow::Result<()> {
        let mut data = vec![0.0f32; 4];
        {
            let mut m = Matrix::from_buffer("theta", &mut data[..], 2, 2)?;
            *m.get_mut(1, 0) = 7.0;
            m.row_mut(0)[1] = -1.0;
        }
        assert_eq!(data, vec![0.0, -1.0, 7.0, 0.0]);
        Ok(())
    }

    #[test]
    fn head_covers_leading_rows() {
        let mut scratch = Matrix::zeros(4, 3);
        let mut head = scratch.head_mut(2);
        assert_eq!((head.rows(), head.cols()), (2, 3));
        head.fill(1.0);
        assert_eq!(scratch.as_slice().iter().filter(|&&v| v == 1.0).count(), 6);
    }

    #[test]
    fn zero_width_rows_are_still_counted() {
        let m = Matrix::zeros(3, 0);
        assert_eq!(m.row_iter().count(), 3);
        assert!(m.row_iter().all(|row| row.is_empty()));
    }
}
