//! Launch sequencing.
//!
//! A launch walks a fixed list of stages:
//!
//! ```text
//! Init -> DeviceResolved -> ContextBuilt -> BuffersStaged -> ArgsBound
//!      -> Enqueued -> ResultRetrieved -> Released
//! ```
//!
//! A failure at any stage ends the launch. Objects created up to that point
//! are dropped, which releases them.

use crate::buffer::BufferElement;
use crate::config::LaunchConfig;
use crate::context::{ExecutionContext, KernelSignature};
use crate::device::{DeviceClass, resolve_device};
use crate::error::Result;
use crate::geometry::WorkGeometry;
use log::{debug, error, info};
use std::fmt;
use std::time::{Duration, Instant};

/// Stage a launch has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LaunchStage {
    Init,
    DeviceResolved,
    ContextBuilt,
    BuffersStaged,
    ArgsBound,
    Enqueued,
    ResultRetrieved,
    Released,
}

impl LaunchStage {
    /// Returns the stage that follows this one, if any.
    pub fn next(self) -> Option<LaunchStage> {
        use LaunchStage::*;
        match self {
            Init => Some(DeviceResolved),
            DeviceResolved => Some(ContextBuilt),
            ContextBuilt => Some(BuffersStaged),
            BuffersStaged => Some(ArgsBound),
            ArgsBound => Some(Enqueued),
            Enqueued => Some(ResultRetrieved),
            ResultRetrieved => Some(Released),
            Released => None,
        }
    }
}

impl fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaunchStage::Init => "init",
            LaunchStage::DeviceResolved => "device resolved",
            LaunchStage::ContextBuilt => "context built",
            LaunchStage::BuffersStaged => "buffers staged",
            LaunchStage::ArgsBound => "arguments bound",
            LaunchStage::Enqueued => "enqueued",
            LaunchStage::ResultRetrieved => "result retrieved",
            LaunchStage::Released => "released",
        };
        f.write_str(name)
    }
}

/// A kernel launch: host data, buffers and argument layout.
///
/// Implementors describe what to run; [`Launcher`] decides when.
pub trait Workload {
    /// Device buffers held between staging and retrieval.
    type Buffers<'ctx>;
    /// Host-side result.
    type Output;

    fn name(&self) -> &str;

    /// Returns the entry point and parameter layout of the kernel.
    fn signature(&self) -> KernelSignature;

    fn geometry(&self) -> Result<WorkGeometry>;

    /// Allocates device buffers and copies inputs into them.
    fn stage<'ctx>(&self, ctx: &'ctx ExecutionContext) -> Result<Self::Buffers<'ctx>>;

    /// Binds every kernel parameter, in declaration order.
    fn bind(&self, ctx: &ExecutionContext, buffers: &Self::Buffers<'_>) -> Result<()>;

    /// Copies the output back to the host.
    fn retrieve(&self, buffers: &Self::Buffers<'_>) -> Result<Self::Output>;
}

/// What happened during a successful launch.
#[derive(Debug, Clone)]
pub struct LaunchReport {
    pub workload: String,
    pub device_name: String,
    pub device_class: DeviceClass,
    pub geometry: WorkGeometry,
    /// Time spent reaching each stage.
    pub timings: Vec<(LaunchStage, Duration)>,
}

impl LaunchReport {
    pub fn total(&self) -> Duration {
        self.timings.iter().map(|(_, elapsed)| *elapsed).sum()
    }
}

/// Output of a launch plus its report.
#[derive(Debug, Clone)]
pub struct Launch<T> {
    pub output: T,
    pub report: LaunchReport,
}

/// Runs workloads through the launch stages.
pub struct Launcher {
    config: LaunchConfig,
    stage: LaunchStage,
    timings: Vec<(LaunchStage, Duration)>,
    mark: Instant,
}

impl Launcher {
    pub fn new(config: LaunchConfig) -> Self {
        Self {
            config,
            stage: LaunchStage::Init,
            timings: Vec::new(),
            mark: Instant::now(),
        }
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// Returns the last stage reached.
    pub fn stage(&self) -> LaunchStage {
        self.stage
    }

    /// Runs `workload` from device resolution to release.
    pub fn run<W: Workload>(&mut self, workload: &W) -> Result<Launch<W::Output>> {
        self.stage = LaunchStage::Init;
        self.timings.clear();
        self.mark = Instant::now();

        let result = self.run_stages(workload);
        if let Err(e) = &result {
            error!(
                "{} launch stopped after stage '{}': {}",
                workload.name(),
                self.stage,
                e
            );
        }
        result
    }

    fn run_stages<W: Workload>(&mut self, workload: &W) -> Result<Launch<W::Output>> {
        let geometry = workload.geometry()?;

        let device = resolve_device()?;
        let device_name = device.name();
        let device_class = device.class();
        info!("Using {} ({})", device_name, device_class);
        self.advance(LaunchStage::DeviceResolved);

        let ctx = ExecutionContext::new(device, &self.config, workload.signature())?;
        self.advance(LaunchStage::ContextBuilt);

        let buffers = workload.stage(&ctx)?;
        self.advance(LaunchStage::BuffersStaged);

        workload.bind(&ctx, &buffers)?;
        self.advance(LaunchStage::ArgsBound);

        ctx.enqueue(&geometry)?;
        self.advance(LaunchStage::Enqueued);

        let output = workload.retrieve(&buffers)?;
        self.advance(LaunchStage::ResultRetrieved);

        drop(buffers);
        ctx.release();
        self.advance(LaunchStage::Released);

        Ok(Launch {
            output,
            report: LaunchReport {
                workload: workload.name().to_string(),
                device_name,
                device_class,
                geometry,
                timings: self.timings.clone(),
            },
        })
    }

    fn advance(&mut self, next: LaunchStage) {
        debug_assert_eq!(self.stage.next(), Some(next), "launch stages are linear");
        let now = Instant::now();
        self.timings.push((next, now - self.mark));
        self.mark = now;
        debug!("Stage: {} -> {}", self.stage, next);
        self.stage = next;
    }
}

/// Binds `values` to consecutive parameters starting at 0.
///
/// Shared by workloads whose kernels take leading `int` sizes.
pub(crate) fn bind_ints(ctx: &ExecutionContext, values: &[i32]) -> Result<usize> {
    for (index, value) in values.iter().enumerate() {
        ctx.set_arg_int(index, *value)?;
    }
    Ok(values.len())
}

/// Binds `buffers` to consecutive parameters starting at `first`.
pub(crate) fn bind_buffers<T: BufferElement>(
    ctx: &ExecutionContext,
    first: usize,
    buffers: &[&crate::buffer::DeviceBuffer<'_, T>],
) -> Result<()> {
    for (offset, buffer) in buffers.iter().enumerate() {
        ctx.set_arg_buffer(first + offset, buffer)?;
    }
    Ok(())
}
