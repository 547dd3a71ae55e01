//! Common helpers for launch integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use cl_launch::{is_available, resolve_device};

pub const EPSILON: f32 = 1e-5;

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

pub fn vec_approx_eq(a: &[f32], b: &[f32]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| approx_eq(*x, *y))
}

/// Returns the path of a kernel shipped in `kernels/`.
pub fn kernel_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("kernels")
        .join(name)
}

/// Returns true when a usable OpenCL device exists, and logs why not otherwise.
pub fn setup_opencl() -> bool {
    let _ = env_logger::builder().is_test(true).try_init();
    if !is_available() {
        eprintln!("OpenCL not available, skipping test");
        return false;
    }
    match resolve_device() {
        Ok(_) => true,
        Err(e) => {
            eprintln!("OpenCL device not available: {}", e);
            false
        }
    }
}
