//! cl-launch: run the matrix multiply and vector addition kernels
//!
//! Usage:
//!   cl-launch matmul [--size N] [--identity] [--kernel PATH]
//!   cl-launch vector-add [--len N] [--sequential] [--kernel PATH]
//!   cl-launch devices
//!
//! Set `RUST_LOG=debug` to trace each launch stage.

use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::info;

use cl_launch::{
    LaunchConfig, LaunchError, Launcher, MatrixMultiply, VectorAdd, VectorFill, list_devices,
    matmul, vector_add,
};

#[derive(Parser)]
#[command(name = "cl-launch")]
#[command(about = "Launch OpenCL matrix multiply and vector addition kernels")]
#[command(version)]
struct Cli {
    /// Compile kernels with fast math flags
    #[arg(long, global = true)]
    fast_math: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Multiply two square integer matrices
    Matmul {
        /// Matrix edge length (multiple of 4)
        #[arg(short, long, default_value_t = matmul::DEFAULT_EDGE)]
        size: usize,

        /// Kernel source file
        #[arg(short, long, default_value = matmul::KERNEL_PATH)]
        kernel: PathBuf,

        /// Use the identity matrix as A
        #[arg(long)]
        identity: bool,
    },

    /// Add two float vectors
    VectorAdd {
        /// Vector length
        #[arg(short, long, default_value_t = vector_add::DEFAULT_LEN)]
        len: usize,

        /// Kernel source file
        #[arg(short, long, default_value = vector_add::KERNEL_PATH)]
        kernel: PathBuf,

        /// Fill inputs with 1, 2, 3, ... and 10, 20, 30, ... instead of random values
        #[arg(long)]
        sequential: bool,
    },

    /// List OpenCL devices
    Devices,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        let (log, code) = failure_output(e.as_ref());
        if let Some(log) = log {
            println!("{}", log);
        }
        eprintln!("Error: {}", e);
        process::exit(code);
    }
}

/// Returns the compiler log to print on stdout, if any, and the exit status.
fn failure_output(e: &(dyn Error + 'static)) -> (Option<String>, i32) {
    match e.downcast_ref::<LaunchError>() {
        Some(launch_error) => (
            launch_error.build_log().map(str::to_string),
            launch_error.exit_code(),
        ),
        None => (None, 1),
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Matmul {
            size,
            kernel,
            identity,
        } => {
            let workload = if identity {
                MatrixMultiply::identity(size)?
            } else {
                MatrixMultiply::patterned(size)?
            };
            let config = LaunchConfig::new(kernel).with_fast_math(cli.fast_math);
            let launch = Launcher::new(config).run(&workload)?;
            log_report(&launch.report);

            matmul::verify(&workload.expected(), &launch.output)?;
            println!(
                "{0}x{0} matrix product matches the host reference",
                workload.edge()
            );
        }
        Commands::VectorAdd {
            len,
            kernel,
            sequential,
        } => {
            let fill = if sequential {
                VectorFill::Sequential
            } else {
                VectorFill::Random
            };
            let workload = VectorAdd::filled(len, fill)?;
            let config = LaunchConfig::new(kernel).with_fast_math(cli.fast_math);
            let launch = Launcher::new(config).run(&workload)?;
            log_report(&launch.report);

            for line in workload.summary_lines(&launch.output, vector_add::PRINT_COUNT) {
                println!("{}", line);
            }
            vector_add::verify(&workload.expected(), &launch.output)?;
        }
        Commands::Devices => {
            let devices = list_devices()?;
            if devices.is_empty() {
                println!("No OpenCL devices found");
            }
            for device in devices {
                println!("{}: {} ({})", device.platform, device.name, device.class);
            }
        }
    }
    Ok(())
}

fn log_report(report: &cl_launch::LaunchReport) {
    info!(
        "{} on {} ({}), {}, {:?} total",
        report.workload,
        report.device_name,
        report.device_class,
        report.geometry,
        report.total()
    );
    for (stage, elapsed) in &report.timings {
        info!("  {:<18} {:?}", stage.to_string(), elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compile_failure_prints_log() {
        let err = LaunchError::Compile {
            log: "<kernel>:1:40: error: expected expression".to_string(),
        };
        let (log, code) = failure_output(&err);
        assert_eq!(
            log.as_deref(),
            Some("<kernel>:1:40: error: expected expression")
        );
        assert_eq!(code, 1);
    }

    #[test]
    fn test_other_failures_exit_without_log() {
        let (log, code) = failure_output(&LaunchError::NoPlatform);
        assert_eq!(log, None);
        assert_eq!(code, 1);

        let err = LaunchError::ObjectCreation {
            kind: cl_launch::ObjectKind::Program,
            message: "CL_OUT_OF_HOST_MEMORY".to_string(),
        };
        assert_eq!(failure_output(&err), (None, 1));

        let mismatch = cl_launch::Mismatch {
            index: 3,
            expected: "7".to_string(),
            actual: "8".to_string(),
        };
        assert_eq!(failure_output(&mismatch), (None, 1));
    }

    #[test]
    fn test_defaults_match_constants() {
        let cli = Cli::try_parse_from(["cl-launch", "vector-add"]).unwrap();
        match cli.command {
            Commands::VectorAdd {
                len,
                kernel,
                sequential,
            } => {
                assert_eq!(len, 1024);
                assert_eq!(kernel, PathBuf::from("kernels/vector_addition.cl"));
                assert!(!sequential);
            }
            _ => panic!("expected vector-add"),
        }

        let cli = Cli::try_parse_from(["cl-launch", "--fast-math", "matmul", "-s", "8"]).unwrap();
        assert!(cli.fast_math);
        assert!(matches!(cli.command, Commands::Matmul { size: 8, .. }));
    }
}
