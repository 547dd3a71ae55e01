//! Square integer matrix multiply.
//!
//! Kernel parameters: `M`, `N`, `K` (all equal to the matrix edge), then the
//! `A`, `B` and `C` buffers. The launch is 2-D with one work-item per output
//! element and square groups of [`TILE_EDGE`].

use super::{Mismatch, kernel_int};
use crate::buffer::{Access, DeviceBuffer};
use crate::context::{ArgKind, ExecutionContext, KernelSignature};
use crate::error::{LaunchError, Result};
use crate::geometry::WorkGeometry;
use crate::launcher::{Workload, bind_buffers, bind_ints};

pub const KERNEL_NAME: &str = "multiply_matrices";
pub const KERNEL_PATH: &str = "kernels/matrix_mul.cl";
/// Work-group edge. The kernel's tile size must agree.
pub const TILE_EDGE: usize = 4;
pub const DEFAULT_EDGE: usize = 16;

/// Row-major square matrix of `i32`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    edge: usize,
    data: Vec<i32>,
}

/// Returns the element count of an `edge` x `edge` matrix.
///
/// The kernel indexes elements with `int`, so both the edge and the element
/// count must fit one.
pub fn element_count(edge: usize) -> Result<usize> {
    kernel_int(edge, "matrix edge")?;
    edge.checked_mul(edge)
        .filter(|count| i32::try_from(*count).is_ok())
        .ok_or_else(|| {
            LaunchError::InvalidGeometry(format!(
                "a {0}x{0} matrix has too many elements for a kernel int index",
                edge
            ))
        })
}

impl Matrix {
    pub fn from_fn(edge: usize, f: impl Fn(usize, usize) -> i32) -> Result<Self> {
        let count = element_count(edge)?;
        let data = (0..count).map(|i| f(i / edge, i % edge)).collect();
        Ok(Self { edge, data })
    }

    pub fn from_vec(edge: usize, data: Vec<i32>) -> Result<Self> {
        let count = element_count(edge)?;
        if data.len() != count {
            return Err(LaunchError::SizeMismatch {
                expected: count,
                actual: data.len(),
            });
        }
        Ok(Self { edge, data })
    }

    pub fn zeros(edge: usize) -> Result<Self> {
        Self::from_fn(edge, |_, _| 0)
    }

    pub fn identity(edge: usize) -> Result<Self> {
        Self::from_fn(edge, |r, c| i32::from(r == c))
    }

    /// Builds small deterministic values that differ per seed.
    pub fn pattern(edge: usize, seed: i32) -> Result<Self> {
        Self::from_fn(edge, |r, c| ((r * 7 + c * 3) as i32 + seed) % 11 - 5)
    }

    pub fn edge(&self) -> usize {
        self.edge
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> i32 {
        self.data[row * self.edge + col]
    }

    /// Computes the host reference product.
    ///
    /// Arithmetic wraps on overflow, as the kernel's `int` arithmetic does.
    ///
    /// # Panics
    ///
    /// Panics if the two edges differ.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.edge, other.edge, "matrix edges must match");
        let n = self.edge;
        let data = (0..n * n)
            .map(|i| {
                let (r, c) = (i / n, i % n);
                (0..n).fold(0i32, |acc, k| {
                    acc.wrapping_add(self.get(r, k).wrapping_mul(other.get(k, c)))
                })
            })
            .collect();
        Matrix { edge: n, data }
    }
}

/// Compares matrices element by element, exactly.
pub fn verify(expected: &Matrix, actual: &Matrix) -> std::result::Result<(), Mismatch> {
    if expected.edge != actual.edge {
        return Err(Mismatch {
            index: 0,
            expected: format!("{0}x{0} matrix", expected.edge),
            actual: format!("{0}x{0} matrix", actual.edge),
        });
    }
    match expected
        .data
        .iter()
        .zip(&actual.data)
        .position(|(e, a)| e != a)
    {
        Some(index) => Err(Mismatch {
            index,
            expected: expected.data[index].to_string(),
            actual: actual.data[index].to_string(),
        }),
        None => Ok(()),
    }
}

/// Computes `C = A * B` on the device.
#[derive(Debug, Clone)]
pub struct MatrixMultiply {
    a: Matrix,
    b: Matrix,
}

pub struct MatrixBuffers<'ctx> {
    a: DeviceBuffer<'ctx, i32>,
    b: DeviceBuffer<'ctx, i32>,
    c: DeviceBuffer<'ctx, i32>,
}

impl MatrixMultiply {
    pub fn new(a: Matrix, b: Matrix) -> Result<Self> {
        if a.edge != b.edge {
            return Err(LaunchError::SizeMismatch {
                expected: a.edge * a.edge,
                actual: b.edge * b.edge,
            });
        }
        Ok(Self { a, b })
    }

    /// Multiplies two patterned matrices.
    pub fn patterned(edge: usize) -> Result<Self> {
        Ok(Self {
            a: Matrix::pattern(edge, 1)?,
            b: Matrix::pattern(edge, 4)?,
        })
    }

    /// Multiplies the identity by a patterned matrix, so the product equals `B`.
    pub fn identity(edge: usize) -> Result<Self> {
        Ok(Self {
            a: Matrix::identity(edge)?,
            b: Matrix::pattern(edge, 4)?,
        })
    }

    pub fn edge(&self) -> usize {
        self.a.edge
    }

    pub fn a(&self) -> &Matrix {
        &self.a
    }

    pub fn b(&self) -> &Matrix {
        &self.b
    }

    pub fn expected(&self) -> Matrix {
        self.a.multiply(&self.b)
    }
}

impl Workload for MatrixMultiply {
    type Buffers<'ctx> = MatrixBuffers<'ctx>;
    type Output = Matrix;

    fn name(&self) -> &str {
        "matmul"
    }

    fn signature(&self) -> KernelSignature {
        KernelSignature::new(KERNEL_NAME)
            .with_arg("M", ArgKind::Int)
            .with_arg("N", ArgKind::Int)
            .with_arg("K", ArgKind::Int)
            .with_arg("A", ArgKind::IntBuffer)
            .with_arg("B", ArgKind::IntBuffer)
            .with_arg("C", ArgKind::IntBuffer)
    }

    fn geometry(&self) -> Result<WorkGeometry> {
        element_count(self.edge())?;
        WorkGeometry::square(self.edge(), TILE_EDGE)
    }

    fn stage<'ctx>(&self, ctx: &'ctx ExecutionContext) -> Result<MatrixBuffers<'ctx>> {
        let a = DeviceBuffer::from_slice(ctx, self.a.as_slice(), Access::ReadOnly)?;
        let b = DeviceBuffer::from_slice(ctx, self.b.as_slice(), Access::ReadOnly)?;
        let zeros = Matrix::zeros(self.edge())?;
        let c = DeviceBuffer::from_slice(ctx, zeros.as_slice(), Access::ReadWrite)?;
        Ok(MatrixBuffers { a, b, c })
    }

    fn bind(&self, ctx: &ExecutionContext, buffers: &MatrixBuffers<'_>) -> Result<()> {
        let n = kernel_int(self.edge(), "matrix edge")?;
        let first = bind_ints(ctx, &[n, n, n])?;
        bind_buffers(ctx, first, &[&buffers.a, &buffers.b, &buffers.c])
    }

    fn retrieve(&self, buffers: &MatrixBuffers<'_>) -> Result<Matrix> {
        Matrix::from_vec(self.edge(), buffers.c.read_vec()?)
    }
}
