//! Launch configuration.

use std::path::PathBuf;

/// Compiler flags passed to the OpenCL program build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    flags: Vec<String>,
}

impl BuildOptions {
    /// Fast math compilation flags.
    pub const FAST_MATH: &'static str =
        "-cl-fast-relaxed-math -cl-mad-enable -cl-unsafe-math-optimizations";

    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options with fast math optimizations enabled.
    ///
    /// Can noticeably change floating point results.
    pub fn fast_math() -> Self {
        Self::new().with_flag(Self::FAST_MATH)
    }

    /// Appends a raw compiler flag.
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Defines a preprocessor macro (`-DNAME=VALUE`).
    pub fn define(self, name: &str, value: impl std::fmt::Display) -> Self {
        self.with_flag(format!("-D{}={}", name, value))
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Returns the flags joined into the string handed to the compiler.
    pub fn as_string(&self) -> String {
        self.flags.join(" ")
    }
}

/// Settings shared by every launch.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Path of the kernel source file.
    pub kernel_path: PathBuf,
    /// Compiler flags for the program build.
    pub build_options: BuildOptions,
}

impl LaunchConfig {
    pub fn new(kernel_path: impl Into<PathBuf>) -> Self {
        Self {
            kernel_path: kernel_path.into(),
            build_options: BuildOptions::default(),
        }
    }

    pub fn with_build_options(mut self, options: BuildOptions) -> Self {
        self.build_options = options;
        self
    }

    /// Replaces the build options with the fast math flags when `fast_math` is set.
    pub fn with_fast_math(self, fast_math: bool) -> Self {
        if fast_math {
            self.with_build_options(BuildOptions::fast_math())
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_empty() {
        let options = BuildOptions::default();
        assert!(options.is_empty());
        assert_eq!(options.as_string(), "");
    }

    #[test]
    fn test_define_and_fast_math() {
        let options = BuildOptions::fast_math().define("TS", 4);
        assert_eq!(
            options.as_string(),
            "-cl-fast-relaxed-math -cl-mad-enable -cl-unsafe-math-optimizations -DTS=4"
        );
    }

    #[test]
    fn test_launch_config_fast_math_toggle() {
        let config = LaunchConfig::new("kernels/vector_addition.cl").with_fast_math(false);
        assert!(config.build_options.is_empty());

        let config = config.with_fast_math(true);
        assert_eq!(config.build_options, BuildOptions::fast_math());
    }
}
