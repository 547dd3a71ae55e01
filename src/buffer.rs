//! Device buffers and host transfers.
//!
//! Every transfer is blocking: a write returns once the data is on the
//! device, a read once it is back on the host.

use crate::context::{ArgKind, ExecutionContext};
use crate::error::{LaunchError, ObjectKind, Result};
use log::debug;
use opencl3::command_queue::CommandQueue;
use opencl3::memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE, CL_MEM_WRITE_ONLY};
use opencl3::types::{CL_BLOCKING, cl_float, cl_int, cl_mem_flags};
use std::ptr;

/// Element types that can live in a device buffer.
pub trait BufferElement: Copy + Default + 'static {
    /// Kernel parameter kind of a buffer holding this type.
    const ARG_KIND: ArgKind;
}

impl BufferElement for cl_int {
    const ARG_KIND: ArgKind = ArgKind::IntBuffer;
}

impl BufferElement for cl_float {
    const ARG_KIND: ArgKind = ArgKind::FloatBuffer;
}

/// How the kernel accesses a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    fn flags(self) -> cl_mem_flags {
        match self {
            Access::ReadOnly => CL_MEM_READ_ONLY,
            Access::WriteOnly => CL_MEM_WRITE_ONLY,
            Access::ReadWrite => CL_MEM_READ_WRITE,
        }
    }
}

/// A typed device buffer tied to the context that created it.
///
/// Borrowing the context guarantees buffers are released before it.
pub struct DeviceBuffer<'ctx, T: BufferElement> {
    buffer: Buffer<T>,
    queue: &'ctx CommandQueue,
    len: usize,
    access: Access,
}

impl<'ctx, T: BufferElement> DeviceBuffer<'ctx, T> {
    /// Allocates an uninitialised buffer of `len` elements.
    pub fn allocate(ctx: &'ctx ExecutionContext, len: usize, access: Access) -> Result<Self> {
        if len == 0 {
            return Err(LaunchError::InvalidGeometry(
                "cannot allocate an empty buffer".to_string(),
            ));
        }

        let buffer =
            unsafe { Buffer::<T>::create(ctx.context(), access.flags(), len, ptr::null_mut()) }
                .map_err(|e| LaunchError::creation(ObjectKind::Buffer, e))?;
        debug!(
            "Allocated {:?} buffer of {} bytes",
            access,
            len * std::mem::size_of::<T>()
        );

        Ok(Self {
            buffer,
            queue: ctx.queue(),
            len,
            access,
        })
    }

    /// Allocates a buffer sized to `data` and copies `data` into it.
    pub fn from_slice(ctx: &'ctx ExecutionContext, data: &[T], access: Access) -> Result<Self> {
        let mut buffer = Self::allocate(ctx, data.len(), access)?;
        buffer.write_from_host(data)?;
        Ok(buffer)
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the size in bytes on the device.
    pub fn byte_len(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn cl_buffer(&self) -> &Buffer<T> {
        &self.buffer
    }

    /// Copies `data` into the whole buffer and waits for the transfer.
    pub fn write_from_host(&mut self, data: &[T]) -> Result<()> {
        self.check_len(data.len())?;
        let _event = unsafe {
            self.queue
                .enqueue_write_buffer(&mut self.buffer, CL_BLOCKING, 0, data, &[])
        }?;
        Ok(())
    }

    /// Copies the whole buffer into `out` and waits for the transfer.
    pub fn read_to_host(&self, out: &mut [T]) -> Result<()> {
        self.check_len(out.len())?;
        let _event = unsafe {
            self.queue
                .enqueue_read_buffer(&self.buffer, CL_BLOCKING, 0, out, &[])
        }?;
        Ok(())
    }

    /// Reads the whole buffer into a new vector.
    pub fn read_vec(&self) -> Result<Vec<T>> {
        let mut out = vec![T::default(); self.len];
        self.read_to_host(&mut out)?;
        Ok(out)
    }

    fn check_len(&self, host_len: usize) -> Result<()> {
        if host_len != self.len {
            return Err(LaunchError::SizeMismatch {
                expected: self.len,
                actual: host_len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_arg_kinds() {
        assert_eq!(<cl_int as BufferElement>::ARG_KIND, ArgKind::IntBuffer);
        assert_eq!(<cl_float as BufferElement>::ARG_KIND, ArgKind::FloatBuffer);
    }

    #[test]
    fn test_access_flags() {
        assert_eq!(Access::ReadOnly.flags(), CL_MEM_READ_ONLY);
        assert_eq!(Access::WriteOnly.flags(), CL_MEM_WRITE_ONLY);
        assert_eq!(Access::ReadWrite.flags(), CL_MEM_READ_WRITE);
    }
}
