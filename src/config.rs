use crate::error::EpochError;

/// Hyperparameters of one epoch call; the schedule across epochs belongs to the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochConfig {
    /// SGD step size
    pub lr: f32,
    /// examples per gradient step; the last batch of an epoch may be smaller
    pub batch: usize,
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self { lr: 0.1, batch: 100 }
    }
}

impl EpochConfig {
    pub fn new(lr: f32, batch: usize) -> Result<Self, EpochError> {
        let config = Self { lr, batch };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EpochError> {
        if self.batch == 0 {
            return Err(EpochError::ZeroBatch);
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(EpochError::InvalidLearningRate(self.lr));
        }
        Ok(())
    }
}

/// Problem dimensions
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// number of examples
    pub m: usize,
    /// input dimension
    pub n: usize,
    /// number of classes
    pub k: usize,
}

impl Shape {
    pub fn new(m: usize, n: usize, k: usize) -> Self {
        Self { m, n, k }
    }

    /// Element counts of X (m, n) and theta (n, k).
    pub fn expected_lens(&self) -> Result<(usize, usize), EpochError> {
        let x_len = self.m.checked_mul(self.n).ok_or(EpochError::SizeOverflow { buffer: "x" })?;
        let theta_len = self.n.checked_mul(self.k).ok_or(EpochError::SizeOverflow { buffer: "theta" })?;
        Ok((x_len, theta_len))
    }

    /// Checks all three buffers against the declared sizes.
    pub fn check_buffers(&self, x_len: usize, y_len: usize, theta_len: usize) -> Result<(), EpochError> {
        let (expected_x, expected_theta) = self.expected_lens()?;
        check_len("x", expected_x, x_len)?;
        check_len("y", self.m, y_len)?;
        check_len("theta", expected_theta, theta_len)
    }
}

pub(crate) fn check_len(buffer: &'static str, expected: usize, actual: usize) -> Result<(), EpochError> {
    if expected != actual {
        return Err(EpochError::ShapeMismatch { buffer, expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = EpochConfig::default();
        assert_eq!(config.lr, 0.1, "lr");
        assert_eq!(config.batch, 100, "batch");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_hyperparameters() {
        assert_eq!(EpochConfig::new(0.1, 0), Err(EpochError::ZeroBatch));
        assert_eq!(EpochConfig::new(0.0, 1), Err(EpochError::InvalidLearningRate(0.0)));
        assert_eq!(EpochConfig::new(-0.5, 1), Err(EpochError::InvalidLearningRate(-0.5)));
        assert_eq!(EpochConfig::new(f32::INFINITY, 1), Err(EpochError::InvalidLearningRate(f32::INFINITY)));
        assert!(matches!(EpochConfig::new(f32::NAN, 1), Err(EpochError::InvalidLearningRate(_))));
    }

    #[test]
    fn reports_the_first_mismatched_buffer() {
        let shape = Shape::new(3, 2, 4);
        assert_eq!(shape.check_buffers(6, 3, 8), Ok(()));
        assert_eq!(
            shape.check_buffers(6, 2, 8),
            Err(EpochError::ShapeMismatch { buffer: "y", expected: 3, actual: 2 })
        );
        assert_eq!(
            shape.check_buffers(6, 3, 9),
            Err(EpochError::ShapeMismatch { buffer: "theta", expected: 8, actual: 9 })
        );
    }

    #[test]
    fn overflowing_sizes_are_rejected() {
        let shape = Shape::new(usize::MAX, 2, 1);
        assert_eq!(shape.expected_lens(), Err(EpochError::SizeOverflow { buffer: "x" }));
    }
}
