//! C ABI: three contiguous buffers, three sizes and two scalars.

use std::slice;

use crate::config::Shape;
use crate::epoch::softmax_regression_epoch;
use crate::error::EpochError;

/// Runs one epoch in place on `theta`.
///
/// Returns 0 on success, otherwise [`EpochError::code`] of the rejected call, in which case
/// `theta` has not been modified. A null pointer is only accepted for an empty buffer.
///
/// # Safety
/// `x`, `y` and `theta` must point to `m * n`, `m` and `n * k` valid elements respectively,
/// and `theta` must not overlap `x` or `y`.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn softmax_regression_epoch_c(
    x: *const f32,
    y: *const u8,
    theta: *mut f32,
    m: usize,
    n: usize,
    k: usize,
    lr: f32,
    batch: usize,
) -> i32 {
    match epoch_from_raw(x, y, theta, m, n, k, lr, batch) {
        Ok(()) => 0,
        Err(err) => {
            log::error!("softmax_regression_epoch_c rejected: {err}");
            err.code()
        }
    }
}

#[allow(clippy::too_many_arguments)]
unsafe fn epoch_from_raw(
    x: *const f32,
    y: *const u8,
    theta: *mut f32,
    m: usize,
    n: usize,
    k: usize,
    lr: f32,
    batch: usize,
) -> Result<(), EpochError> {
    let (x_len, theta_len) = Shape::new(m, n, k).expected_lens()?;
    let x = slice_or_empty(x, x_len, "x")?;
    let y = slice_or_empty(y, m, "y")?;
    let theta: &mut [f32] = if theta_len == 0 {
        &mut []
    } else if theta.is_null() {
        return Err(null_pointer("theta", theta_len));
    } else {
        slice::from_raw_parts_mut(theta, theta_len)
    };
    softmax_regression_epoch(x, y, theta, m, n, k, lr, batch)
}

unsafe fn slice_or_empty<'a, T>(ptr: *const T, len: usize, buffer: &'static str) -> Result<&'a [T], EpochError> {
    if len == 0 {
        Ok(&[])
    } else if ptr.is_null() {
        Err(null_pointer(buffer, len))
    } else {
        Ok(slice::from_raw_parts(ptr, len))
    }
}

fn null_pointer(buffer: &'static str, expected: usize) -> EpochError {
    EpochError::ShapeMismatch { buffer, expected, actual: 0 }
}
