//! The two launch workloads and their host-side checks.

pub mod matmul;
pub mod vector_add;

pub use matmul::{Matrix, MatrixMultiply};
pub use vector_add::{VectorAdd, VectorFill};

use thiserror::Error;

/// First element where device output disagrees with the host reference.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("output mismatch at index {index}: expected {expected}, got {actual}")]
pub struct Mismatch {
    pub index: usize,
    pub expected: String,
    pub actual: String,
}

/// Converts a host size to the `int` a kernel parameter takes.
pub(crate) fn kernel_int(value: usize, what: &str) -> crate::error::Result<i32> {
    i32::try_from(value).map_err(|_| {
        crate::error::LaunchError::InvalidGeometry(format!(
            "{} {} does not fit a kernel int",
            what, value
        ))
    })
}
