//! Float vector addition.
//!
//! Kernel parameters: `n`, then the `a`, `b` and `c` buffers. The 1-D
//! global size is rounded up to a multiple of [`GROUP_SIZE`]; the kernel
//! skips work-items at or past `n`.

use super::{Mismatch, kernel_int};
use crate::buffer::{Access, DeviceBuffer};
use crate::context::{ArgKind, ExecutionContext, KernelSignature};
use crate::error::{LaunchError, Result};
use crate::geometry::WorkGeometry;
use crate::launcher::{Workload, bind_buffers, bind_ints};
use rand::Rng;

pub const KERNEL_NAME: &str = "vector_addition";
pub const KERNEL_PATH: &str = "kernels/vector_addition.cl";
pub const GROUP_SIZE: usize = 256;
pub const DEFAULT_LEN: usize = 1024;
/// Number of `a + b = c` lines printed after a launch.
pub const PRINT_COUNT: usize = 10;
pub const TOLERANCE: f32 = 1e-5;

/// How input vectors are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VectorFill {
    /// Uniform values in `[0, 1)`.
    #[default]
    Random,
    /// `a[i] = i + 1` and `b[i] = 10 * (i + 1)`.
    Sequential,
}

/// Computes `c = a + b` on the device.
#[derive(Debug, Clone)]
pub struct VectorAdd {
    a: Vec<f32>,
    b: Vec<f32>,
}

pub struct VectorBuffers<'ctx> {
    a: DeviceBuffer<'ctx, f32>,
    b: DeviceBuffer<'ctx, f32>,
    c: DeviceBuffer<'ctx, f32>,
}

impl VectorAdd {
    pub fn new(a: Vec<f32>, b: Vec<f32>) -> Result<Self> {
        kernel_int(a.len(), "vector length")?;
        if a.len() != b.len() {
            return Err(LaunchError::SizeMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        Ok(Self { a, b })
    }

    pub fn filled(len: usize, fill: VectorFill) -> Result<Self> {
        match fill {
            VectorFill::Random => Self::random(len),
            VectorFill::Sequential => Self::sequential(len),
        }
    }

    /// Builds `a = 1, 2, 3, ...` and `b = 10, 20, 30, ...`.
    ///
    /// Fails before allocating when `len` does not fit the kernel's `n`.
    pub fn sequential(len: usize) -> Result<Self> {
        kernel_int(len, "vector length")?;
        let a = (1..=len).map(|i| i as f32).collect();
        let b = (1..=len).map(|i| (i * 10) as f32).collect();
        Ok(Self { a, b })
    }

    /// Builds uniform random inputs in `[0, 1)`.
    pub fn random(len: usize) -> Result<Self> {
        kernel_int(len, "vector length")?;
        let mut rng = rand::thread_rng();
        let a = (0..len).map(|_| rng.r#gen::<f32>()).collect();
        let b = (0..len).map(|_| rng.r#gen::<f32>()).collect();
        Ok(Self { a, b })
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn a(&self) -> &[f32] {
        &self.a
    }

    pub fn b(&self) -> &[f32] {
        &self.b
    }

    /// Returns the host reference sum.
    pub fn expected(&self) -> Vec<f32> {
        self.a.iter().zip(&self.b).map(|(x, y)| x + y).collect()
    }

    /// Formats the first `count` results as `a + b = c` lines.
    pub fn summary_lines(&self, c: &[f32], count: usize) -> Vec<String> {
        self.a
            .iter()
            .zip(&self.b)
            .zip(c)
            .take(count)
            .map(|((a, b), c)| format!("{:.6} + {:.6} = {:.6}", a, b, c))
            .collect()
    }
}

/// Compares vectors element by element within [`TOLERANCE`].
pub fn verify(expected: &[f32], actual: &[f32]) -> std::result::Result<(), Mismatch> {
    if expected.len() != actual.len() {
        return Err(Mismatch {
            index: expected.len().min(actual.len()),
            expected: format!("{} elements", expected.len()),
            actual: format!("{} elements", actual.len()),
        });
    }
    match expected
        .iter()
        .zip(actual)
        .position(|(e, a)| (e - a).abs() > TOLERANCE)
    {
        Some(index) => Err(Mismatch {
            index,
            expected: expected[index].to_string(),
            actual: actual[index].to_string(),
        }),
        None => Ok(()),
    }
}

impl Workload for VectorAdd {
    type Buffers<'ctx> = VectorBuffers<'ctx>;
    type Output = Vec<f32>;

    fn name(&self) -> &str {
        "vector-add"
    }

    fn signature(&self) -> KernelSignature {
        KernelSignature::new(KERNEL_NAME)
            .with_arg("n", ArgKind::Int)
            .with_arg("a", ArgKind::FloatBuffer)
            .with_arg("b", ArgKind::FloatBuffer)
            .with_arg("c", ArgKind::FloatBuffer)
    }

    fn geometry(&self) -> Result<WorkGeometry> {
        kernel_int(self.len(), "vector length")?;
        WorkGeometry::linear(self.len(), GROUP_SIZE)
    }

    fn stage<'ctx>(&self, ctx: &'ctx ExecutionContext) -> Result<VectorBuffers<'ctx>> {
        let a = DeviceBuffer::from_slice(ctx, &self.a, Access::ReadOnly)?;
        let b = DeviceBuffer::from_slice(ctx, &self.b, Access::ReadOnly)?;
        let c = DeviceBuffer::allocate(ctx, self.len(), Access::WriteOnly)?;
        Ok(VectorBuffers { a, b, c })
    }

    fn bind(&self, ctx: &ExecutionContext, buffers: &VectorBuffers<'_>) -> Result<()> {
        let n = kernel_int(self.len(), "vector length")?;
        let first = bind_ints(ctx, &[n])?;
        bind_buffers(ctx, first, &[&buffers.a, &buffers.b, &buffers.c])
    }

    fn retrieve(&self, buffers: &VectorBuffers<'_>) -> Result<Vec<f32>> {
        buffers.c.read_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_sequential_inputs() {
        let workload = VectorAdd::sequential(1024).unwrap();
        assert_eq!(workload.len(), 1024);
        assert_eq!(&workload.a()[..3], &[1.0, 2.0, 3.0]);
        assert_eq!(&workload.b()[..3], &[10.0, 20.0, 30.0]);

        let expected = workload.expected();
        assert!(
            expected
                .iter()
                .enumerate()
                .all(|(i, c)| *c == 11.0 * (i + 1) as f32)
        );
    }

    #[test]
    fn test_random_inputs_in_unit_range() {
        let workload = VectorAdd::random(512).unwrap();
        assert!(workload.a().iter().chain(workload.b()).all(|x| (0.0..1.0).contains(x)));
    }

    #[test]
    fn test_summary_prints_ten_lines() {
        let workload = VectorAdd::sequential(1024).unwrap();
        let lines = workload.summary_lines(&workload.expected(), PRINT_COUNT);
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "1.000000 + 10.000000 = 11.000000");
        assert_eq!(lines[9], "10.000000 + 100.000000 = 110.000000");
    }

    #[test]
    fn test_summary_shorter_than_count() {
        let workload = VectorAdd::sequential(3).unwrap();
        assert_eq!(workload.summary_lines(&workload.expected(), PRINT_COUNT).len(), 3);
    }

    #[test]
    fn test_verify_tolerance() {
        let expected = vec![1.0, 2.0, 3.0];
        assert!(verify(&expected, &[1.0, 2.0 + 1e-6, 3.0]).is_ok());

        let mismatch = verify(&expected, &[1.0, 2.5, 3.0]).unwrap_err();
        assert_eq!(mismatch.index, 1);

        assert!(verify(&expected, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_geometry_rounds_up() {
        let geometry = VectorAdd::sequential(1000).unwrap().geometry().unwrap();
        assert_eq!(
            geometry,
            WorkGeometry::Linear {
                global: 1024,
                local: GROUP_SIZE
            }
        );
    }

    #[rstest]
    #[case(VectorFill::Sequential)]
    #[case(VectorFill::Random)]
    fn test_oversized_length_is_rejected(#[case] fill: VectorFill) {
        let len = i32::MAX as usize + 1;
        assert!(matches!(
            VectorAdd::filled(len, fill),
            Err(LaunchError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        assert!(VectorAdd::new(vec![1.0; 4], vec![1.0; 5]).is_err());
    }
}
