use crate::matrix::Matrix;

/// In-place softmax of one row of scores.
pub fn softmax(array: &mut [f32]) {
    if array.is_empty() {
        return;
    }
    // find max value (for numerical stability)
    let max_val = array.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    // exp and sum
    let mut sum = 0.0;
    for x in array.iter_mut() {
        *x = (*x - max_val).exp();
        sum += *x;
    }
    // normalize
    array.iter_mut().for_each(|x| *x /= sum);
}

pub fn softmax_rows<S: AsRef<[f32]> + AsMut<[f32]>>(scores: &mut Matrix<S>) {
    scores.row_iter_mut().for_each(softmax);
}

/// Params:
/// * `out`: (b, k), overwritten
/// * `x`: (b, n)
/// * `w`: (n, k)
///
/// x (b,n) @ w (n,k) -> out (b,k)
pub fn matmul<O, X, W>(out: &mut Matrix<O>, x: &Matrix<X>, w: &Matrix<W>)
where
    O: AsRef<[f32]> + AsMut<[f32]>,
    X: AsRef<[f32]>,
    W: AsRef<[f32]>,
{
    debug_assert_eq!(x.cols(), w.rows(), "inner dimensions");
    debug_assert_eq!((out.rows(), out.cols()), (x.rows(), w.cols()), "output shape");
    for (x_row, out_row) in x.row_iter().zip(out.row_iter_mut()) {
        out_row.fill(0.0);
        // summation runs over p in index order, so results are reproducible
        for (&xp, w_row) in x_row.iter().zip(w.row_iter()) {
            out_row.iter_mut()
                .zip(w_row)
                .for_each(|(o, &wl)| *o += xp * wl);
        }
    }
}

/// Turns per-row class probabilities into the cross-entropy error `p - onehot(y)`.
pub fn subtract_one_hot<S: AsRef<[f32]> + AsMut<[f32]>>(probs: &mut Matrix<S>, labels: &[u8]) {
    debug_assert_eq!(probs.rows(), labels.len());
    for (row, &label) in labels.iter().enumerate() {
        *probs.get_mut(row, label as usize) -= 1.0;
    }
}

/// Params:
/// * `grad`: (n, k), overwritten
/// * `x`: (b, n)
/// * `err`: (b, k)
///
/// x^T (n,b) @ err (b,k) -> grad (n,k)
pub fn accumulate_xt<G, X, E>(grad: &mut Matrix<G>, x: &Matrix<X>, err: &Matrix<E>)
where
    G: AsRef<[f32]> + AsMut<[f32]>,
    X: AsRef<[f32]>,
    E: AsRef<[f32]>,
{
    debug_assert_eq!(x.rows(), err.rows(), "batch dimensions");
    debug_assert_eq!((grad.rows(), grad.cols()), (x.cols(), err.cols()), "gradient shape");
    grad.fill(0.0);
    // examples are added in index order for every (p, l)
    for (x_row, err_row) in x.row_iter().zip(err.row_iter()) {
        for (&xp, grad_row) in x_row.iter().zip(grad.row_iter_mut()) {
            grad_row.iter_mut()
                .zip(err_row)
                .for_each(|(g, &e)| *g += xp * e);
        }
    }
}

/// theta -= lr * grad / batch_len
pub fn sgd_step<T, G>(theta: &mut Matrix<T>, grad: &Matrix<G>, lr: f32, batch_len: usize)
where
    T: AsRef<[f32]> + AsMut<[f32]>,
    G: AsRef<[f32]>,
{
    debug_assert_eq!(theta.as_slice().len(), grad.as_slice().len());
    let b = batch_len as f32;
    theta.as_mut_slice().iter_mut()
        .zip(grad.as_slice())
        .for_each(|(t, &g)| *t -= lr * g / b);
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    #[test]
    fn softmax_rows_sum_to_one() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..50 {
            let k = rng.random_range(1..12);
            let scale = [1.0f32, 30.0, 500.0][rng.random_range(0..3)];
            let mut row: Vec<f32> = (0..k).map(|_| (rng.random::<f32>() - 0.5) * scale).collect();
            softmax(&mut row);
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "sum={sum} k={k} scale={scale}");
            assert!(row.iter().all(|p| p.is_finite() && *p >= 0.0));
        }
    }

    #[test]
    fn softmax_survives_large_logits() {
        let mut row = [1000.0, 1000.0];
        softmax(&mut row);
        assert_eq!(row, [0.5, 0.5]);
    }

    #[test]
    fn softmax_of_empty_row_is_noop() {
        let mut row: [f32; 0] = [];
        softmax(&mut row);
    }

    #[test]
    fn matmul_matches_hand_computation() -> anyhow::Result<()> {
        let x = Matrix::from_buffer("x", vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3)?;
        let w = Matrix::from_buffer("w", vec![1.0f32, 0.0, 0.0, 1.0, 1.0, 1.0], 3, 2)?;
        let mut out = Matrix::zeros(2, 2);
        out.fill(99.0);
        matmul(&mut out, &x, &w);
        assert_eq!(out.as_slice(), &[4.0, 5.0, 10.0, 11.0]);
        Ok(())
    }

    #[test]
    fn gradient_is_xt_times_error() -> anyhow::Result<()> {
        let x = Matrix::from_buffer("x", vec![1.0f32, 0.0, 0.0, 1.0], 2, 2)?;
        let mut probs = Matrix::from_buffer("probs", vec![0.5f32, 0.5, 0.5, 0.5], 2, 2)?;
        subtract_one_hot(&mut probs, &[0, 1]);
        assert_eq!(probs.as_slice(), &[-0.5, 0.5, 0.5, -0.5]);

        let mut grad = Matrix::zeros(2, 2);
        grad.fill(3.0);
        accumulate_xt(&mut grad, &x, &probs);
        assert_eq!(grad.as_slice(), &[-0.5, 0.5, 0.5, -0.5]);
        Ok(())
    }

    #[test]
    fn sgd_step_averages_over_batch() -> anyhow::Result<()> {
        let mut theta = Matrix::from_buffer("theta", vec![1.0f32, 1.0], 1, 2)?;
        let grad = Matrix::from_buffer("grad", vec![4.0f32, -2.0], 1, 2)?;
        sgd_step(&mut theta, &grad, 0.5, 4);
        assert_eq!(theta.as_slice(), &[0.5, 1.25]);
        Ok(())
    }
}
