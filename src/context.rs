//! Execution context for a single launch.
//!
//! [`ExecutionContext`] owns every OpenCL object a launch needs: the context,
//! the compiled program, one kernel and one command queue. Fields are
//! declared in teardown order (queue, kernel, program, context) so dropping
//! the struct on an error path releases them in the same order as
//! [`ExecutionContext::release`].

use crate::buffer::{BufferElement, DeviceBuffer};
use crate::config::LaunchConfig;
use crate::device::ResolvedDevice;
use crate::error::{LaunchError, ObjectKind, Result};
use crate::geometry::WorkGeometry;
use crate::program::{build_program, read_source};
use log::debug;
use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::kernel::Kernel;
use opencl3::memory::ClMem;
use opencl3::program::Program;
use opencl3::types::{cl_int, cl_uint};
use std::cell::RefCell;
use std::fmt;
use std::ptr;

/// Kind of value a kernel parameter expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// `int` scalar.
    Int,
    /// `__global int*` buffer.
    IntBuffer,
    /// `__global float*` buffer.
    FloatBuffer,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgKind::Int => "int",
            ArgKind::IntBuffer => "int buffer",
            ArgKind::FloatBuffer => "float buffer",
        };
        f.write_str(name)
    }
}

/// One positional kernel parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelArg {
    /// Host-side name, used in diagnostics only.
    pub label: String,
    pub kind: ArgKind,
}

/// Entry point name plus the parameters it declares, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSignature {
    entry_point: String,
    args: Vec<KernelArg>,
}

impl KernelSignature {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            args: Vec::new(),
        }
    }

    /// Appends the next positional parameter.
    pub fn with_arg(mut self, label: impl Into<String>, kind: ArgKind) -> Self {
        self.args.push(KernelArg {
            label: label.into(),
            kind,
        });
        self
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn args(&self) -> &[KernelArg] {
        &self.args
    }

    fn expect_kind(&self, index: usize, kind: ArgKind) -> Result<&KernelArg> {
        let arg = self.args.get(index).ok_or_else(|| LaunchError::KernelArgument {
            index,
            message: format!(
                "`{}` declares only {} arguments",
                self.entry_point,
                self.args.len()
            ),
        })?;
        if arg.kind != kind {
            return Err(LaunchError::KernelArgument {
                index,
                message: format!("`{}` expects {}, got {}", arg.label, arg.kind, kind),
            });
        }
        Ok(arg)
    }
}

/// OpenCL objects owned by one launch.
pub struct ExecutionContext {
    queue: CommandQueue,
    kernel: Kernel,
    program: Program,
    context: Context,
    device: ResolvedDevice,
    signature: KernelSignature,
    bound: RefCell<Vec<bool>>,
}

impl ExecutionContext {
    /// Creates the context, program, queue and kernel for `device`.
    ///
    /// Any failure drops whatever was already created.
    pub fn new(
        device: ResolvedDevice,
        config: &LaunchConfig,
        signature: KernelSignature,
    ) -> Result<Self> {
        let context = Context::from_device(device.cl_device())
            .map_err(|e| LaunchError::creation(ObjectKind::Context, e))?;

        let source = read_source(&config.kernel_path)?;
        let program = build_program(&context, &device, &source, &config.build_options)?;

        let queue = CommandQueue::create_default_with_properties(&context, 0, 0)
            .map_err(|e| LaunchError::creation(ObjectKind::CommandQueue, e))?;

        let kernel = Kernel::create(&program, signature.entry_point())
            .map_err(|e| LaunchError::creation(ObjectKind::Kernel, e))?;

        let declared = kernel
            .num_args()
            .map_err(|e| LaunchError::creation(ObjectKind::Kernel, e))?
            as usize;
        if declared != signature.args().len() {
            return Err(LaunchError::ObjectCreation {
                kind: ObjectKind::Kernel,
                message: format!(
                    "`{}` declares {} arguments, expected {}",
                    signature.entry_point(),
                    declared,
                    signature.args().len()
                ),
            });
        }

        debug!(
            "Created context for `{}` on {} ({})",
            signature.entry_point(),
            device.name(),
            device.class()
        );

        let bound = RefCell::new(vec![false; declared]);
        Ok(Self {
            queue,
            kernel,
            program,
            context,
            device,
            signature,
            bound,
        })
    }

    pub fn device(&self) -> &ResolvedDevice {
        &self.device
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    /// Binds an `int` scalar to parameter `index`.
    pub fn set_arg_int(&self, index: usize, value: cl_int) -> Result<()> {
        let arg = self.signature.expect_kind(index, ArgKind::Int)?;
        let result = unsafe { self.kernel.set_arg(index as cl_uint, &value) };
        result.map_err(|e| LaunchError::KernelArgument {
            index,
            message: format!("`{}`: {}", arg.label, e),
        })?;
        self.mark_bound(index);
        Ok(())
    }

    /// Binds a device buffer to parameter `index`.
    pub fn set_arg_buffer<T: BufferElement>(
        &self,
        index: usize,
        buffer: &DeviceBuffer<'_, T>,
    ) -> Result<()> {
        let arg = self.signature.expect_kind(index, T::ARG_KIND)?;
        let mem = buffer.cl_buffer().get();
        let result = unsafe { self.kernel.set_arg(index as cl_uint, &mem) };
        result.map_err(|e| LaunchError::KernelArgument {
            index,
            message: format!("`{}`: {}", arg.label, e),
        })?;
        self.mark_bound(index);
        Ok(())
    }

    fn mark_bound(&self, index: usize) {
        self.bound.borrow_mut()[index] = true;
    }

    /// Launches the kernel and blocks until the queue drains.
    ///
    /// Every declared parameter must be bound first.
    pub fn enqueue(&self, geometry: &WorkGeometry) -> Result<()> {
        if let Some(index) = self.bound.borrow().iter().position(|bound| !bound) {
            return Err(LaunchError::KernelArgument {
                index,
                message: format!("`{}` is not bound", self.signature.args()[index].label),
            });
        }

        let global = geometry.global_work_size();
        let local = geometry.local_work_size();
        debug!("Enqueueing `{}` with {}", self.signature.entry_point(), geometry);

        let _event = unsafe {
            self.queue.enqueue_nd_range_kernel(
                self.kernel.get(),
                geometry.dimensions() as cl_uint,
                ptr::null(),
                global.as_ptr(),
                local.as_ptr(),
                &[],
            )
        }?;
        self.queue.finish()?;
        Ok(())
    }

    /// Releases the queue, kernel, program and context, in that order.
    pub fn release(self) {
        let ExecutionContext {
            queue,
            kernel,
            program,
            context,
            signature,
            ..
        } = self;
        drop(queue);
        drop(kernel);
        drop(program);
        drop(context);
        debug!("Released context for `{}`", signature.entry_point());
    }
}
