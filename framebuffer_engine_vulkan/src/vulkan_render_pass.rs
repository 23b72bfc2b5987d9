/// VulkanRenderPass - Vulkan implementation of the RenderPass trait

use ash::vk;
use ash::vk::Handle;
use framebuffer_engine::fbe::device::{RenderPass, RenderPassHandle};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan render pass implementation
pub struct VulkanRenderPass {
    ctx: Arc<GpuContext>,
    /// Vulkan render pass handle
    pub(crate) render_pass: vk::RenderPass,
    /// Number of attachments a compatible framebuffer provides
    attachment_count: u32,
    /// Color attachments in the single subpass
    color_attachment_count: u32,
}

impl VulkanRenderPass {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        render_pass: vk::RenderPass,
        attachment_count: u32,
        color_attachment_count: u32,
    ) -> Self {
        Self { ctx, render_pass, attachment_count, color_attachment_count }
    }

    pub fn attachment_count(&self) -> u32 {
        self.attachment_count
    }

    pub fn color_attachment_count(&self) -> u32 {
        self.color_attachment_count
    }
}

impl RenderPass for VulkanRenderPass {
    fn native_handle(&self) -> RenderPassHandle {
        RenderPassHandle::from_raw(self.render_pass.as_raw())
    }
}

impl Drop for VulkanRenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
