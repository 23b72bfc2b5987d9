/*!
# Framebuffer Engine - Vulkan Backend

Vulkan implementation of the framebuffer_engine device traits, built on
`ash` for the bindings and `gpu-allocator` for memory management.

`VulkanDevice` bootstraps a headless device and creates render passes,
attachments, buffers, shaders, pipelines and command queues. Its objects
plug directly into `framebuffer_engine::fbe::RenderTarget`.

```no_run
use framebuffer_engine::fbe::RenderTarget;
use framebuffer_engine::fbe::device::{AttachmentDesc, Config, RenderPassDesc, TextureFormat};
use framebuffer_engine_vulkan::fbe::VulkanDevice;
use std::sync::Arc;

let device = Arc::new(VulkanDevice::new(Config::default())?);
let commands = device.create_command_queue()?;
let render_pass = device.create_render_pass(&RenderPassDesc {
    color_attachments: vec![AttachmentDesc::color(TextureFormat::R8G8B8A8_UNORM)],
    depth_stencil_attachment: None,
})?;
let color = device.create_attachment(256, 256, TextureFormat::R8G8B8A8_UNORM)?;

let mut target = RenderTarget::new(device.clone(), commands.clone(), color, render_pass)?;
target.bind()?;
target.unbind()?;
# Ok::<(), framebuffer_engine::fbe::Error>(())
```
*/

// Vulkan implementation modules
mod vulkan;
mod vulkan_context;
mod vulkan_format;
mod vulkan_surface;
mod vulkan_render_pass;
mod vulkan_buffer;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_command;

#[cfg(feature = "vulkan-validation")]
mod debug;

// Main fbe namespace module
pub mod fbe {
    pub use crate::vulkan::VulkanDevice;
    pub use crate::vulkan_surface::VulkanSurface;
    pub use crate::vulkan_render_pass::VulkanRenderPass;
    pub use crate::vulkan_buffer::VulkanBuffer;
    pub use crate::vulkan_shader::{ShaderDesc, VulkanShader};
    pub use crate::vulkan_pipeline::{
        CullMode, FrontFace, GraphicPipelineDesc, PrimitiveTopology, VertexAttribute,
        VertexBinding, VertexInputRate, VertexLayout, VulkanGraphicPipeline,
    };
    pub use crate::vulkan_command::VulkanCommandQueue;

    // Validation statistics (only with the vulkan-validation feature)
    #[cfg(feature = "vulkan-validation")]
    pub use crate::debug::{get_validation_stats, print_validation_stats_report, ValidationStats};
}

// Re-export ash for callers building descriptor set layouts and sets
pub use ash;
