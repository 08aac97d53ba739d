//! Adapter from host array handles (data, shape, byte strides) to the flat-buffer ABI.
//!
//! A dynamic host such as numpy hands over arrays together with their shape and strides.
//! The kernel only understands C-contiguous row-major buffers, so the layout is checked here
//! and the sizes m, n and k are read off the shapes.

use std::mem::size_of;

use crate::epoch::softmax_regression_epoch;
use crate::error::EpochError;

/// Read-only host array.
#[derive(Debug, Clone, Copy)]
pub struct HostArray<'a, T> {
    pub data: &'a [T],
    pub shape: &'a [usize],
    /// strides in bytes
    pub strides: &'a [isize],
}

/// Writable host array.
#[derive(Debug)]
pub struct HostArrayMut<'a, T> {
    pub data: &'a mut [T],
    pub shape: &'a [usize],
    /// strides in bytes
    pub strides: &'a [isize],
}

impl<'a, T> HostArray<'a, T> {
    pub fn new(data: &'a [T], shape: &'a [usize], strides: &'a [isize]) -> Self {
        Self { data, shape, strides }
    }

    pub fn check_layout(&self, buffer: &'static str, ndim: usize) -> Result<(), EpochError> {
        check_c_contiguous::<T>(buffer, self.data.len(), self.shape, self.strides, ndim)
    }
}

impl<'a, T> HostArrayMut<'a, T> {
    pub fn new(data: &'a mut [T], shape: &'a [usize], strides: &'a [isize]) -> Self {
        Self { data, shape, strides }
    }

    pub fn check_layout(&self, buffer: &'static str, ndim: usize) -> Result<(), EpochError> {
        check_c_contiguous::<T>(buffer, self.data.len(), self.shape, self.strides, ndim)
    }
}

/// Byte strides of a C-contiguous array with the given shape.
pub fn c_strides<T>(shape: &[usize]) -> Vec<isize> {
    let mut strides = vec![0isize; shape.len()];
    let mut acc = size_of::<T>() as isize;
    for (stride, &dim) in strides.iter_mut().zip(shape).rev() {
        *stride = acc;
        acc *= dim.max(1) as isize;
    }
    strides
}

fn check_c_contiguous<T>(
    buffer: &'static str,
    len: usize,
    shape: &[usize],
    strides: &[isize],
    ndim: usize,
) -> Result<(), EpochError> {
    let layout_err = |reason: String| Err(EpochError::Layout { buffer, reason });
    if shape.len() != ndim {
        return layout_err(format!("expected {ndim} dimensions, got {}", shape.len()));
    }
    if strides.len() != ndim {
        return layout_err(format!("expected {ndim} strides, got {}", strides.len()));
    }
    // dimensions of extent 0 or 1 never step, so their strides are irrelevant
    let mut expected = size_of::<T>() as isize;
    for (axis, (&dim, &stride)) in shape.iter().zip(strides).enumerate().rev() {
        if dim > 1 && stride != expected {
            return layout_err(format!("axis {axis} has stride {stride}, expected {expected} (not C-contiguous)"));
        }
        expected = expected.saturating_mul(dim as isize);
    }
    let elements = shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or(EpochError::SizeOverflow { buffer })?;
    if elements != len {
        return Err(EpochError::ShapeMismatch { buffer, expected: elements, actual: len });
    }
    Ok(())
}

/// Host-facing epoch: X is (m, n), y is (m,), theta is (n, k), all C-contiguous.
pub fn softmax_regression_epoch_host(
    x: HostArray<'_, f32>,
    y: HostArray<'_, u8>,
    theta: HostArrayMut<'_, f32>,
    lr: f32,
    batch: usize,
) -> Result<(), EpochError> {
    x.check_layout("x", 2)?;
    y.check_layout("y", 1)?;
    theta.check_layout("theta", 2)?;

    let (m, n) = (x.shape[0], x.shape[1]);
    let k = theta.shape[1];
    if y.shape[0] != m {
        return Err(EpochError::ShapeMismatch { buffer: "y", expected: m, actual: y.shape[0] });
    }
    if theta.shape[0] != n {
        return Err(EpochError::Layout {
            buffer: "theta",
            reason: format!("first dimension is {}, expected input dimension {n}", theta.shape[0]),
        });
    }
    softmax_regression_epoch(x.data, y.data, theta.data, m, n, k, lr, batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_c_strides() {
        assert_eq!(c_strides::<f32>(&[3, 5]), vec![20, 4]);
        assert_eq!(c_strides::<u8>(&[7]), vec![1]);
    }

    #[test]
    fn runs_epoch_through_host_arrays() -> anyhow::Result<()> {
        let x = [1.0f32, 0.0, 0.0, 1.0];
        let y = [0u8, 1];
        let mut theta = [0.0f32; 4];
        let (x_shape, y_shape, theta_shape) = ([2, 2], [2], [2, 2]);
        let x_strides = c_strides::<f32>(&x_shape);
        let y_strides = c_strides::<u8>(&y_shape);
        let theta_strides = c_strides::<f32>(&theta_shape);

        softmax_regression_epoch_host(
            HostArray::new(&x, &x_shape, &x_strides),
            HostArray::new(&y, &y_shape, &y_strides),
            HostArrayMut::new(&mut theta, &theta_shape, &theta_strides),
            1.0,
            2,
        )?;
        assert_eq!(theta, [0.25, -0.25, -0.25, 0.25]);
        Ok(())
    }

    #[test]
    fn rejects_transposed_input() {
        // Fortran-ordered (2, 3) array of f32
        let x = [0.0f32; 6];
        let array = HostArray::new(&x, &[2, 3], &[4, 8]);
        let err = array.check_layout("x", 2).unwrap_err();
        assert!(matches!(err, EpochError::Layout { buffer: "x", .. }), "{err}");
    }

    #[test]
    fn ignores_strides_of_unit_dimensions() {
        let x = [0.0f32; 3];
        let array = HostArray::new(&x, &[1, 3], &[0, 4]);
        assert_eq!(array.check_layout("x", 2), Ok(()));
    }

    #[test]
    fn rejects_wrong_rank_and_mismatched_dimensions() {
        let x = [0.0f32; 4];
        let flat = HostArray::new(&x, &[4], &[4]);
        assert!(matches!(flat.check_layout("x", 2), Err(EpochError::Layout { .. })));

        let y = [0u8; 3];
        let mut theta = [0.0f32; 4];
        let err = softmax_regression_epoch_host(
            HostArray::new(&x, &[2, 2], &[8, 4]),
            HostArray::new(&y, &[3], &[1]),
            HostArrayMut::new(&mut theta, &[2, 2], &[8, 4]),
            0.1,
            1,
        )
        .unwrap_err();
        assert_eq!(err, EpochError::ShapeMismatch { buffer: "y", expected: 2, actual: 3 });

        let y = [0u8; 2];
        let mut theta = [0.0f32; 6];
        let err = softmax_regression_epoch_host(
            HostArray::new(&x, &[2, 2], &[8, 4]),
            HostArray::new(&y, &[2], &[1]),
            HostArrayMut::new(&mut theta, &[3, 2], &[8, 4]),
            0.1,
            1,
        )
        .unwrap_err();
        assert!(matches!(err, EpochError::Layout { buffer: "theta", .. }), "{err}");
    }
}
