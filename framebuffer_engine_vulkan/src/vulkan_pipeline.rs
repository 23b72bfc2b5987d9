/// VulkanGraphicPipeline - Vulkan implementation of the GraphicPipeline trait
///
/// The native pipeline is built lazily, once, against the render pass a
/// render target injects. The shader is referenced weakly: dropping the
/// shader elsewhere turns descriptor binding into a no-op and makes a
/// not-yet-built pipeline unbuildable.

use ash::vk;
use ash::vk::Handle;
use framebuffer_engine::fbe::device::{
    BufferFormat, GraphicPipeline, PipelineHandle, RenderPass, Shader,
};
use framebuffer_engine::fbe::{Error, Result};
use framebuffer_engine::{engine_debug, engine_err, engine_error};
use std::sync::{Arc, Mutex, Weak};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::buffer_format_to_vk;
use crate::vulkan_shader::VulkanShader;

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInputRate {
    /// Advance per vertex
    Vertex,
    /// Advance per instance
    Instance,
}

/// Vertex buffer binding description
#[derive(Debug, Clone, Copy)]
pub struct VertexBinding {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: BufferFormat,
    pub offset: u32,
}

/// Vertex input layout
#[derive(Debug, Clone, Default)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Front face winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

/// Fixed-function state of a graphics pipeline
#[derive(Debug, Clone)]
pub struct GraphicPipelineDesc {
    pub vertex_layout: VertexLayout,
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    /// Enable depth testing (the render pass must have a depth attachment)
    pub depth_test: bool,
    pub depth_write: bool,
    /// Color attachments of the render pass the pipeline will be used with
    pub color_attachment_count: u32,
}

impl Default for GraphicPipelineDesc {
    fn default() -> Self {
        Self {
            vertex_layout: VertexLayout::default(),
            topology: PrimitiveTopology::TriangleList,
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            depth_test: false,
            depth_write: false,
            color_attachment_count: 1,
        }
    }
}

pub(crate) fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
    }
}

pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(crate) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub(crate) fn input_rate_to_vk(rate: VertexInputRate) -> vk::VertexInputRate {
    match rate {
        VertexInputRate::Vertex => vk::VertexInputRate::VERTEX,
        VertexInputRate::Instance => vk::VertexInputRate::INSTANCE,
    }
}

/// Vulkan graphics pipeline implementation
pub struct VulkanGraphicPipeline {
    ctx: Arc<GpuContext>,
    shader: Weak<VulkanShader>,
    desc: GraphicPipelineDesc,
    /// Render pass injected by the render target
    render_pass: Mutex<Option<Arc<dyn RenderPass>>>,
    /// Null until built
    pipeline: Mutex<vk::Pipeline>,
}

impl VulkanGraphicPipeline {
    pub(crate) fn new(ctx: Arc<GpuContext>, shader: &Arc<VulkanShader>, desc: GraphicPipelineDesc) -> Self {
        Self {
            ctx,
            shader: Arc::downgrade(shader),
            desc,
            render_pass: Mutex::new(None),
            pipeline: Mutex::new(vk::Pipeline::null()),
        }
    }

    pub fn desc(&self) -> &GraphicPipelineDesc {
        &self.desc
    }

    /// Whether the native pipeline exists
    pub fn is_built(&self) -> bool {
        self.native_handle() != PipelineHandle::NULL
    }

    fn build(&self, shader: &VulkanShader, render_pass: vk::RenderPass) -> Result<vk::Pipeline> {
        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(shader.vertex_module)
                .name(&shader.vertex_entry),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(shader.fragment_module)
                .name(&shader.fragment_entry),
        ];

        // Vertex input state
        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = self.desc.vertex_layout.bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: input_rate_to_vk(binding.input_rate),
            })
            .collect();

        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = self.desc.vertex_layout.attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: buffer_format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(self.desc.topology))
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic, set per bind() from the framebuffer extent
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(self.desc.cull_mode))
            .front_face(front_face_to_vk(self.desc.front_face))
            .depth_bias_enable(false);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(self.desc.depth_test)
            .depth_write_enable(self.desc.depth_write)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachments = vec![
            vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(false);
            self.desc.color_attachment_count as usize
        ];

        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .depth_stencil_state(&depth_stencil_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(shader.pipeline_layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            self.ctx.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_create_info],
                None,
            )
        }
        .map_err(|e| engine_err!("fbe::vulkan", "Failed to create graphics pipeline: {:?}", e.1))?;

        pipelines.into_iter().next().ok_or_else(|| {
            engine_err!("fbe::vulkan", "Graphics pipeline creation returned no pipeline")
        })
    }
}

impl GraphicPipeline for VulkanGraphicPipeline {
    fn attach_render_pass(&self, render_pass: Arc<dyn RenderPass>) {
        if let Ok(mut guard) = self.render_pass.lock() {
            *guard = Some(render_pass);
        }
    }

    fn build_native(&self) -> Result<()> {
        let mut pipeline = self.pipeline.lock()
            .map_err(|_| Error::BackendError("pipeline lock poisoned".to_string()))?;
        if *pipeline != vk::Pipeline::null() {
            return Ok(());
        }

        let render_pass = self.render_pass.lock()
            .map_err(|_| Error::BackendError("pipeline lock poisoned".to_string()))?
            .as_ref()
            .map(|pass| vk::RenderPass::from_raw(pass.native_handle().as_raw()))
            .ok_or_else(|| {
                engine_error!("fbe::vulkan", "Pipeline build requested before a render pass was attached");
                Error::InvalidResource("no render pass attached to pipeline".to_string())
            })?;

        let shader = self.shader.upgrade().ok_or_else(|| {
            engine_error!("fbe::vulkan", "Pipeline shader was dropped before the pipeline was built");
            Error::InvalidResource("pipeline shader has been dropped".to_string())
        })?;

        *pipeline = self.build(&shader, render_pass)?;
        engine_debug!("fbe::vulkan", "Built graphics pipeline ({} color attachment(s), depth test {})",
            self.desc.color_attachment_count, self.desc.depth_test);
        Ok(())
    }

    fn native_handle(&self) -> PipelineHandle {
        self.pipeline
            .lock()
            .map(|pipeline| PipelineHandle::from_raw(pipeline.as_raw()))
            .unwrap_or(PipelineHandle::NULL)
    }

    fn shader(&self) -> Option<Arc<dyn Shader>> {
        self.shader.upgrade().map(|shader| shader as Arc<dyn Shader>)
    }
}

impl Drop for VulkanGraphicPipeline {
    fn drop(&mut self) {
        let pipeline = match self.pipeline.get_mut() {
            Ok(pipeline) => *pipeline,
            Err(poisoned) => *poisoned.into_inner(),
        };
        if pipeline != vk::Pipeline::null() {
            unsafe {
                self.ctx.device.destroy_pipeline(pipeline, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_state_conversions() {
        assert_eq!(topology_to_vk(PrimitiveTopology::TriangleList), vk::PrimitiveTopology::TRIANGLE_LIST);
        assert_eq!(topology_to_vk(PrimitiveTopology::PointList), vk::PrimitiveTopology::POINT_LIST);
        assert_eq!(cull_mode_to_vk(CullMode::Back), vk::CullModeFlags::BACK);
        assert_eq!(cull_mode_to_vk(CullMode::None), vk::CullModeFlags::NONE);
        assert_eq!(front_face_to_vk(FrontFace::Clockwise), vk::FrontFace::CLOCKWISE);
        assert_eq!(input_rate_to_vk(VertexInputRate::Instance), vk::VertexInputRate::INSTANCE);
    }

    #[test]
    fn test_default_desc_targets_single_color_attachment() {
        let desc = GraphicPipelineDesc::default();
        assert_eq!(desc.color_attachment_count, 1);
        assert_eq!(desc.topology, PrimitiveTopology::TriangleList);
        assert!(!desc.depth_test);
    }
}
