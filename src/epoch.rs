//! One epoch of mini-batch SGD for softmax regression: linear scores, softmax,
//! cross-entropy gradient, averaged update. Batches run strictly in index order
//! and every batch sees the parameters left by the previous one.

use std::ops::Range;

use crate::config::{EpochConfig, Shape};
use crate::error::EpochError;
use crate::math::{accumulate_xt, matmul, sgd_step, softmax_rows, subtract_one_hot};
use crate::matrix::Matrix;

/// Per-call scratch, sized for the largest batch and overwritten by every batch.
struct Scratch {
    /// logits, then probabilities, then errors (batch, k)
    logits: Matrix,
    /// gradient accumulator (n, k)
    grad: Matrix,
}

impl Scratch {
    fn new(max_batch: usize, n: usize, k: usize) -> Self {
        Self {
            logits: Matrix::zeros(max_batch, k),
            grad: Matrix::zeros(n, k),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchedSoftmaxUpdater {
    config: EpochConfig,
}

impl BatchedSoftmaxUpdater {
    pub fn new(config: EpochConfig) -> Result<Self, EpochError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EpochConfig {
        &self.config
    }

    /// Contiguous, non-overlapping windows covering `0..m`; only the last may be shorter.
    pub fn batches(&self, m: usize) -> impl Iterator<Item = Range<usize>> {
        let batch = self.config.batch;
        (0..m).step_by(batch).map(move |start| start..(start + batch).min(m))
    }

    /// Runs one epoch over `x` (m, n) and `y` (m), updating `theta` (n, k) in place.
    ///
    /// Shapes and labels are checked before the first update, so on error `theta` is untouched.
    pub fn run_epoch<X, T>(&self, x: &Matrix<X>, y: &[u8], theta: &mut Matrix<T>) -> Result<(), EpochError>
    where
        X: AsRef<[f32]>,
        T: AsRef<[f32]> + AsMut<[f32]>,
    {
        let (m, n, k) = (x.rows(), x.cols(), theta.cols());
        if y.len() != m {
            return Err(EpochError::ShapeMismatch { buffer: "y", expected: m, actual: y.len() });
        }
        if theta.rows() != n {
            return Err(EpochError::ShapeMismatch {
                buffer: "theta",
                expected: n.saturating_mul(k),
                actual: theta.as_slice().len(),
            });
        }
        check_labels(y, k)?;

        let EpochConfig { lr, batch } = self.config;
        log::debug!("run_epoch(m={m}, n={n}, k={k}, lr={lr}, batch={batch})");
        if m == 0 {
            return Ok(());
        }

        let mut scratch = Scratch::new(batch.min(m), n, k);
        for window in self.batches(m) {
            log::trace!("batch {}..{}", window.start, window.end);
            let x_batch = x.row_range(window.start, window.end);
            let y_batch = &y[window.clone()];
            let mut logits = scratch.logits.head_mut(window.len());

            matmul(&mut logits, &x_batch, &*theta);
            softmax_rows(&mut logits);
            subtract_one_hot(&mut logits, y_batch);
            accumulate_xt(&mut scratch.grad, &x_batch, &logits);
            sgd_step(theta, &scratch.grad, lr, window.len());
        }
        Ok(())
    }
}

fn check_labels(y: &[u8], k: usize) -> Result<(), EpochError> {
    match y.iter().position(|&label| label as usize >= k) {
        Some(index) => Err(EpochError::LabelOutOfRange { index, label: y[index], classes: k }),
        None => Ok(()),
    }
}

/// Flat-buffer entry point: X (m*n), y (m) and theta (n*k) are row-major.
///
/// Validates the configuration, then the buffer sizes, then the labels; nothing is
/// written to `theta` unless all checks pass. A failed call means the epoch was not applied.
#[allow(clippy::too_many_arguments)]
pub fn softmax_regression_epoch(
    x: &[f32],
    y: &[u8],
    theta: &mut [f32],
    m: usize,
    n: usize,
    k: usize,
    lr: f32,
    batch: usize,
) -> Result<(), EpochError> {
    let updater = BatchedSoftmaxUpdater::new(EpochConfig { lr, batch })?;
    Shape::new(m, n, k).check_buffers(x.len(), y.len(), theta.len())?;
    let x = Matrix::from_buffer("x", x, m, n)?;
    let mut theta = Matrix::from_buffer("theta", theta, n, k)?;
    updater.run_epoch(&x, y, &mut theta)
}
