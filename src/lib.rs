//! Host-side launchers for OpenCL kernels.
//!
//! Two workloads share one launch path: a square integer matrix multiply and
//! a float vector addition. Each launch resolves a device, compiles the
//! kernel source, stages input buffers, binds kernel arguments, runs the
//! kernel and reads the result back.
//!
//! # Usage
//!
//! ```ignore
//! use cl_launch::{LaunchConfig, Launcher, VectorAdd, vector_add};
//!
//! let config = LaunchConfig::new(vector_add::KERNEL_PATH);
//! let workload = VectorAdd::sequential(1024)?;
//! let launch = Launcher::new(config).run(&workload)?;
//! assert!(vector_add::verify(&workload.expected(), &launch.output).is_ok());
//! ```

pub mod buffer;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod geometry;
pub mod launcher;
pub mod program;
pub mod workload;

pub use buffer::{Access, BufferElement, DeviceBuffer};
pub use config::{BuildOptions, LaunchConfig};
pub use context::{ArgKind, ExecutionContext, KernelArg, KernelSignature};
pub use device::{DeviceClass, DeviceSummary, ResolvedDevice, is_available, list_devices, resolve_device};
pub use error::{LaunchError, ObjectKind, Result};
pub use geometry::{WorkGeometry, round_up};
pub use launcher::{Launch, LaunchReport, LaunchStage, Launcher, Workload};
pub use program::{build_program, read_source};
pub use workload::{Matrix, MatrixMultiply, Mismatch, VectorAdd, VectorFill, matmul, vector_add};
