pub mod error;
pub mod config;
pub mod matrix;

pub mod math;
pub mod epoch;

pub mod host;
pub mod ffi;
pub mod io;

pub use epoch::{softmax_regression_epoch, BatchedSoftmaxUpdater};
pub use error::EpochError;
