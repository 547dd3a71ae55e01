//! Error types for kernel launches.

use opencl3::error_codes::ClError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LaunchError>;

/// OpenCL object classes whose creation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Context,
    Program,
    CommandQueue,
    Kernel,
    Buffer,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Context => "context",
            ObjectKind::Program => "program",
            ObjectKind::CommandQueue => "command queue",
            ObjectKind::Kernel => "kernel",
            ObjectKind::Buffer => "buffer",
        };
        f.write_str(name)
    }
}

/// Error raised by any stage of a launch.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("couldn't identify a platform")]
    NoPlatform,

    #[error("couldn't access any devices: {0}")]
    DeviceResolution(String),

    #[error("couldn't find the program file {}: {source}", .path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Compilation failed; `log` holds the compiler diagnostics.
    #[error("couldn't build the program")]
    Compile { log: String },

    #[error("couldn't create a {kind}: {message}")]
    ObjectCreation { kind: ObjectKind, message: String },

    #[error("couldn't set kernel argument {index}: {message}")]
    KernelArgument { index: usize, message: String },

    #[error("buffer size mismatch: expected {expected} elements, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("invalid work geometry: {0}")]
    InvalidGeometry(String),

    #[error("OpenCL error: {0}")]
    Runtime(String),
}

impl LaunchError {
    pub(crate) fn creation(kind: ObjectKind, err: ClError) -> Self {
        LaunchError::ObjectCreation {
            kind,
            message: err.to_string(),
        }
    }

    /// Returns the process exit status for this error.
    ///
    /// Every failure maps to 1; success is the caller's 0.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Returns the compiler log if this is a build failure.
    pub fn build_log(&self) -> Option<&str> {
        match self {
            LaunchError::Compile { log } => Some(log),
            _ => None,
        }
    }
}

impl From<ClError> for LaunchError {
    fn from(e: ClError) -> Self {
        LaunchError::Runtime(e.to_string())
    }
}
