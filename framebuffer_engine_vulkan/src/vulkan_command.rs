/// VulkanCommandQueue - command pool + graphics queue
///
/// Implements context allocation, recording and submission. A context is a
/// primary command buffer from this queue's pool. `begin_render_pass`
/// restarts the buffer (it is re-recorded every frame) and `end_render_pass`
/// closes it, ready for `submit`.

use ash::vk;
use ash::vk::Handle;
use framebuffer_engine::fbe::device::{
    Buffer, CommandAllocator, CommandRecorder, CommandSubmitter, ContextHandle,
    DescriptorSetHandle, PipelineHandle, PoolHandle, RenderPassBegin, Shader,
};
use framebuffer_engine::fbe::{Error, Result};
use framebuffer_engine::{engine_err, engine_trace};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{clear_value_to_vk, full_rect, full_viewport, index_type_to_vk};

/// Vulkan command queue implementation
pub struct VulkanCommandQueue {
    ctx: Arc<GpuContext>,
    /// Command pool (pool and its buffers are externally synchronized)
    pool: Mutex<vk::CommandPool>,
    /// Signaled when the last submission completed
    fence: vk::Fence,
}

impl VulkanCommandQueue {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let pool = ctx.device.create_command_pool(&pool_create_info, None)
                .map_err(|e| engine_err!("fbe::vulkan", "Failed to create command pool: {:?}", e))?;

            let fence_create_info = vk::FenceCreateInfo::default()
                .flags(vk::FenceCreateFlags::SIGNALED);

            let fence = match ctx.device.create_fence(&fence_create_info, None) {
                Ok(fence) => fence,
                Err(e) => {
                    ctx.device.destroy_command_pool(pool, None);
                    return Err(engine_err!("fbe::vulkan", "Failed to create submit fence: {:?}", e));
                }
            };

            Ok(Self { ctx, pool: Mutex::new(pool), fence })
        }
    }

    fn lock_pool(&self) -> Result<MutexGuard<'_, vk::CommandPool>> {
        self.pool
            .lock()
            .map_err(|_| Error::BackendError("command pool lock poisoned".to_string()))
    }

    /// Run `record` on a context's command buffer with the pool locked
    fn record<F>(&self, context: ContextHandle, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer) -> Result<()>,
    {
        let _pool = self.lock_pool()?;
        record(&self.ctx.device, vk::CommandBuffer::from_raw(context.as_raw()))
    }
}

impl CommandAllocator for VulkanCommandQueue {
    fn allocate_primary_context(&self) -> Result<ContextHandle> {
        let pool = self.lock_pool()?;

        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffers = unsafe { self.ctx.device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| engine_err!("fbe::vulkan", "Failed to allocate command buffer: {:?}", e))?;

        command_buffers
            .first()
            .map(|buffer| ContextHandle::from_raw(buffer.as_raw()))
            .ok_or_else(|| engine_err!("fbe::vulkan", "Command buffer allocation returned nothing"))
    }

    fn free_context(&self, context: ContextHandle) {
        // Still free on a poisoned lock, the pool handle itself is intact
        let pool = self.pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        unsafe {
            self.ctx.device.free_command_buffers(
                *pool,
                &[vk::CommandBuffer::from_raw(context.as_raw())],
            );
        }
    }

    fn pool(&self) -> PoolHandle {
        let pool = self.pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        PoolHandle::from_raw(pool.as_raw())
    }
}

impl CommandRecorder for VulkanCommandQueue {
    fn begin_render_pass(&self, context: ContextHandle, begin: &RenderPassBegin<'_>) -> Result<()> {
        self.record(context, |device, command_buffer| unsafe {
            device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("fbe::vulkan", "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("fbe::vulkan", "Failed to begin command buffer: {:?}", e))?;

            let clear_values: Vec<vk::ClearValue> =
                begin.clear_values.iter().map(clear_value_to_vk).collect();

            let render_pass_info = vk::RenderPassBeginInfo::default()
                .render_pass(vk::RenderPass::from_raw(begin.render_pass.as_raw()))
                .framebuffer(vk::Framebuffer::from_raw(begin.framebuffer.as_raw()))
                .render_area(full_rect(begin.extent))
                .clear_values(&clear_values);

            device.cmd_begin_render_pass(command_buffer, &render_pass_info, vk::SubpassContents::INLINE);

            // Pipelines use dynamic viewport/scissor
            device.cmd_set_viewport(command_buffer, 0, &[full_viewport(begin.extent)]);
            device.cmd_set_scissor(command_buffer, 0, &[full_rect(begin.extent)]);

            engine_trace!("fbe::vulkan", "Begin render pass {}x{}", begin.extent.width, begin.extent.height);
            Ok(())
        })
    }

    fn end_render_pass(&self, context: ContextHandle) -> Result<()> {
        self.record(context, |device, command_buffer| unsafe {
            device.cmd_end_render_pass(command_buffer);
            device
                .end_command_buffer(command_buffer)
                .map_err(|e| engine_err!("fbe::vulkan", "Failed to end command buffer: {:?}", e))
        })
    }

    fn bind_pipeline(&self, context: ContextHandle, pipeline: PipelineHandle) -> Result<()> {
        self.record(context, |device, command_buffer| unsafe {
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk::Pipeline::from_raw(pipeline.as_raw()),
            );
            Ok(())
        })
    }

    fn bind_descriptor_set(
        &self,
        context: ContextHandle,
        shader: &dyn Shader,
        set_index: u32,
        set: DescriptorSetHandle,
    ) -> Result<()> {
        let layout = vk::PipelineLayout::from_raw(shader.layout_handle().as_raw());
        self.record(context, |device, command_buffer| unsafe {
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                set_index,
                &[vk::DescriptorSet::from_raw(set.as_raw())],
                &[], // dynamic_offsets
            );
            Ok(())
        })
    }

    fn bind_vertex_buffer(&self, context: ContextHandle, buffer: &dyn Buffer) -> Result<()> {
        let vk_buffer = vk::Buffer::from_raw(buffer.native_handle().as_raw());
        self.record(context, |device, command_buffer| unsafe {
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[vk_buffer], &[0]);
            Ok(())
        })
    }

    fn bind_index_buffer(&self, context: ContextHandle, buffer: &dyn Buffer) -> Result<()> {
        let vk_buffer = vk::Buffer::from_raw(buffer.native_handle().as_raw());
        let index_type = index_type_to_vk(buffer.index_type());
        self.record(context, |device, command_buffer| unsafe {
            device.cmd_bind_index_buffer(command_buffer, vk_buffer, 0, index_type);
            Ok(())
        })
    }

    fn draw(&self, context: ContextHandle, vertex_count: u32) -> Result<()> {
        self.record(context, |device, command_buffer| unsafe {
            device.cmd_draw(command_buffer, vertex_count, 1, 0, 0);
            Ok(())
        })
    }

    fn draw_indexed(&self, context: ContextHandle, index_count: u32) -> Result<()> {
        self.record(context, |device, command_buffer| unsafe {
            device.cmd_draw_indexed(command_buffer, index_count, 1, 0, 0, 0);
            Ok(())
        })
    }
}

impl CommandSubmitter for VulkanCommandQueue {
    fn submit(&self, contexts: &[ContextHandle]) -> Result<()> {
        let command_buffers: Vec<vk::CommandBuffer> = contexts
            .iter()
            .map(|context| vk::CommandBuffer::from_raw(context.as_raw()))
            .collect();

        let _pool = self.lock_pool()?;
        let queue = self.ctx.graphics_queue
            .lock()
            .map_err(|_| Error::BackendError("graphics queue lock poisoned".to_string()))?;

        unsafe {
            self.ctx.device
                .reset_fences(&[self.fence])
                .map_err(|e| engine_err!("fbe::vulkan", "submit: failed to reset fence: {:?}", e))?;

            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

            self.ctx.device
                .queue_submit(*queue, &[submit_info], self.fence)
                .map_err(|e| engine_err!("fbe::vulkan", "submit: failed to submit queue: {:?}", e))?;

            self.ctx.device
                .wait_for_fences(&[self.fence], true, u64::MAX)
                .map_err(|e| engine_err!("fbe::vulkan", "submit: failed to wait for fence: {:?}", e))?;
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx.device
                .device_wait_idle()
                .map_err(|e| engine_err!("fbe::vulkan", "Failed to wait idle: {:?}", e))
        }
    }
}

impl Drop for VulkanCommandQueue {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.wait_for_fences(&[self.fence], true, u64::MAX).ok();
            self.ctx.device.destroy_fence(self.fence, None);

            // Destroying the pool frees any command buffer still allocated from it
            let pool = match self.pool.get_mut() {
                Ok(pool) => *pool,
                Err(poisoned) => *poisoned.into_inner(),
            };
            self.ctx.device.destroy_command_pool(pool, None);
        }
    }
}
