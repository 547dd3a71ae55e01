//! Kernel source loading and program compilation.

use crate::config::BuildOptions;
use crate::device::ResolvedDevice;
use crate::error::{LaunchError, ObjectKind, Result};
use log::debug;
use opencl3::context::Context;
use opencl3::program::Program;
use std::fs;
use std::path::Path;

/// Reads a kernel source file into memory.
pub fn read_source(path: &Path) -> Result<String> {
    let source = fs::read_to_string(path).map_err(|source| LaunchError::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "Read {} bytes of kernel source from {}",
        source.len(),
        path.display()
    );
    Ok(source)
}

/// Compiles kernel source for a single device.
///
/// Blocks until the build finishes. Nothing is cached, so every call
/// recompiles. A failed build returns the device's build log in
/// [`LaunchError::Compile`].
pub fn build_program(
    context: &Context,
    device: &ResolvedDevice,
    source: &str,
    options: &BuildOptions,
) -> Result<Program> {
    let mut program = Program::create_from_source(context, source)
        .map_err(|e| LaunchError::creation(ObjectKind::Program, e))?;

    let device_id = device.cl_device().id();
    if let Err(e) = program.build(&[device_id], &options.as_string()) {
        let log = program
            .get_build_log(device_id)
            .ok()
            .filter(|log| !log.trim().is_empty())
            .unwrap_or_else(|| format!("build failed without a compiler log: {}", e));
        return Err(LaunchError::Compile { log });
    }

    debug!("Built program for {}", device.name());
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{is_available, resolve_device};
    use std::io::Write;

    #[test]
    fn test_read_source() {
        let mut file = tempfile::Builder::new().suffix(".cl").tempfile().unwrap();
        write!(file, "__kernel void noop() {{}}").unwrap();

        let source = read_source(file.path()).unwrap();
        assert_eq!(source, "__kernel void noop() {}");
    }

    #[test]
    fn test_read_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does_not_exist.cl");

        let err = read_source(&path).unwrap_err();
        assert!(matches!(err, LaunchError::SourceRead { .. }));
        assert!(err.to_string().starts_with("couldn't find the program file"));
    }

    fn test_context() -> Option<(ResolvedDevice, Context)> {
        if !is_available() {
            println!("OpenCL not available, skipping test");
            return None;
        }
        let device = resolve_device().ok()?;
        let context = Context::from_device(device.cl_device()).ok()?;
        Some((device, context))
    }

    #[test]
    fn test_build_valid_source() {
        let Some((device, context)) = test_context() else {
            return;
        };
        let source = "__kernel void fill(__global int* a) { a[get_global_id(0)] = 7; }";

        let program = build_program(&context, &device, source, &BuildOptions::default());
        assert!(program.is_ok(), "Failed to build: {:?}", program.err());
    }

    #[test]
    fn test_build_syntax_error_reports_log() {
        let Some((device, context)) = test_context() else {
            return;
        };
        let source = "__kernel void broken(__global int* a) { a[0] = ; }";

        let err = build_program(&context, &device, source, &BuildOptions::default()).unwrap_err();
        let log = err.build_log().expect("expected a compile error");
        assert!(!log.trim().is_empty());
    }
}
