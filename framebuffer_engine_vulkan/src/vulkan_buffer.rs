/// VulkanBuffer - Vulkan implementation of the Buffer trait
///
/// Host-visible (`CpuToGpu`) buffer, persistently mapped by gpu-allocator.

use ash::vk;
use ash::vk::Handle;
use framebuffer_engine::fbe::device::{Buffer, BufferHandle, BufferUsage, IndexType};
use framebuffer_engine::fbe::{Error, Result};
use framebuffer_engine::engine_error;
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation
pub struct VulkanBuffer {
    /// Shared GPU context
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    size: u64,
    usage: BufferUsage,
    index_type: IndexType,
}

impl VulkanBuffer {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        buffer: vk::Buffer,
        allocation: Allocation,
        size: u64,
        usage: BufferUsage,
        index_type: IndexType,
    ) -> Self {
        Self { ctx, buffer, allocation: Some(allocation), size, usage, index_type }
    }

    /// Copy raw bytes into the buffer at `offset`
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if the write runs past the end of the buffer.
    pub fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let in_bounds = matches!(offset.checked_add(data.len() as u64), Some(end) if end <= self.size);
        if !in_bounds {
            engine_error!("fbe::vulkan", "Buffer write of {} bytes at offset {} exceeds size {}",
                data.len(), offset, self.size);
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                self.size
            )));
        }

        let allocation = self.allocation.as_ref().ok_or_else(|| {
            engine_error!("fbe::vulkan", "Buffer update failed: no GPU allocation");
            Error::BackendError("Buffer has no allocation".to_string())
        })?;

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr.add(offset as usize), data.len());
        }
        Ok(())
    }

    /// Copy a slice of plain-old-data values (vertices, indices) at `offset`
    pub fn write<T: bytemuck::Pod>(&self, offset: u64, values: &[T]) -> Result<()> {
        self.update(offset, bytemuck::cast_slice(values))
    }
}

impl Buffer for VulkanBuffer {
    fn native_handle(&self) -> BufferHandle {
        BufferHandle::from_raw(self.buffer.as_raw())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn index_type(&self) -> IndexType {
        self.index_type
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
