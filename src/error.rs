use std::fmt;

/// Reasons an epoch call is rejected before any parameter is touched.
#[derive(Debug, Clone, PartialEq)]
pub enum EpochError {
    /// a buffer length disagrees with the declared sizes
    ShapeMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },
    /// the declared sizes do not fit in `usize` when multiplied
    SizeOverflow { buffer: &'static str },
    /// a label is not a valid class id
    LabelOutOfRange {
        index: usize,
        label: u8,
        classes: usize,
    },
    /// batch size of zero
    ZeroBatch,
    /// learning rate that is NaN, infinite or not positive
    InvalidLearningRate(f32),
    /// host array with the wrong rank or a non row-major memory layout
    Layout {
        buffer: &'static str,
        reason: String,
    },
}

impl EpochError {
    /// Status code reported through the C ABI; 0 is reserved for success.
    pub fn code(&self) -> i32 {
        match self {
            EpochError::ShapeMismatch { .. } | EpochError::SizeOverflow { .. } => 1,
            EpochError::LabelOutOfRange { .. } => 2,
            EpochError::ZeroBatch | EpochError::InvalidLearningRate(_) => 3,
            EpochError::Layout { .. } => 4,
        }
    }
}

impl fmt::Display for EpochError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpochError::ShapeMismatch { buffer, expected, actual } => write!(
                f,
                "buffer `{buffer}` has {actual} elements, expected {expected}"
            ),
            EpochError::SizeOverflow { buffer } => {
                write!(f, "size of buffer `{buffer}` overflows usize")
            }
            EpochError::LabelOutOfRange { index, label, classes } => write!(
                f,
                "label {label} of example {index} is out of range for {classes} classes"
            ),
            EpochError::ZeroBatch => write!(f, "batch size must be > 0"),
            EpochError::InvalidLearningRate(lr) => {
                write!(f, "learning rate must be finite and > 0, got {lr}")
            }
            EpochError::Layout { buffer, reason } => {
                write!(f, "buffer `{buffer}` has an unsupported layout: {reason}")
            }
        }
    }
}

impl std::error::Error for EpochError {}
