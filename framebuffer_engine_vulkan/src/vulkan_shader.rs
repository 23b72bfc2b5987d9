/// VulkanShader - Vulkan implementation of the Shader trait
///
/// Holds the vertex and fragment modules, the pipeline layout and the
/// descriptor-set table that render targets bind from. Descriptor set
/// layouts and sets are created by the caller (they belong to its descriptor
/// pool); the shader only references them.

use ash::vk;
use ash::vk::Handle;
use framebuffer_engine::fbe::device::{DescriptorSetHandle, PipelineLayoutHandle, Shader};
use framebuffer_engine::fbe::{Error, Result};
use framebuffer_engine::{engine_err, engine_error};
use std::ffi::{CStr, CString};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Shader creation descriptor
#[derive(Debug, Clone)]
pub struct ShaderDesc<'a> {
    /// Vertex stage SPIR-V bytes
    pub vertex_code: &'a [u8],
    /// Vertex stage entry point
    pub vertex_entry: &'a str,
    /// Fragment stage SPIR-V bytes
    pub fragment_code: &'a [u8],
    /// Fragment stage entry point
    pub fragment_entry: &'a str,
    /// Set layouts, in set-index order
    pub set_layouts: &'a [vk::DescriptorSetLayout],
    /// Push constant ranges
    pub push_constant_ranges: &'a [vk::PushConstantRange],
    /// Descriptor-set table indexed by `bind_uniform_sets`
    pub descriptor_sets: Vec<vk::DescriptorSet>,
}

/// Vulkan shader implementation
pub struct VulkanShader {
    ctx: Arc<GpuContext>,
    pub(crate) vertex_module: vk::ShaderModule,
    pub(crate) fragment_module: vk::ShaderModule,
    pub(crate) vertex_entry: CString,
    pub(crate) fragment_entry: CString,
    /// Pipeline layout shared by the pipelines built from this shader
    pub(crate) pipeline_layout: vk::PipelineLayout,
    descriptor_sets: Vec<vk::DescriptorSet>,
}

impl VulkanShader {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: ShaderDesc<'_>) -> Result<Self> {
        let vertex_entry = entry_point(desc.vertex_entry)?;
        let fragment_entry = entry_point(desc.fragment_entry)?;

        let vertex_module = create_module(&ctx, desc.vertex_code, "vertex")?;
        let fragment_module = match create_module(&ctx, desc.fragment_code, "fragment") {
            Ok(module) => module,
            Err(e) => {
                unsafe { ctx.device.destroy_shader_module(vertex_module, None) };
                return Err(e);
            }
        };

        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(desc.set_layouts)
            .push_constant_ranges(desc.push_constant_ranges);

        let pipeline_layout = match unsafe { ctx.device.create_pipeline_layout(&layout_info, None) } {
            Ok(layout) => layout,
            Err(e) => {
                unsafe {
                    ctx.device.destroy_shader_module(vertex_module, None);
                    ctx.device.destroy_shader_module(fragment_module, None);
                }
                return Err(engine_err!("fbe::vulkan", "Failed to create pipeline layout: {:?}", e));
            }
        };

        Ok(Self {
            ctx,
            vertex_module,
            fragment_module,
            vertex_entry,
            fragment_entry,
            pipeline_layout,
            descriptor_sets: desc.descriptor_sets,
        })
    }

    pub fn vertex_entry(&self) -> &CStr {
        &self.vertex_entry
    }

    pub fn fragment_entry(&self) -> &CStr {
        &self.fragment_entry
    }
}

fn entry_point(name: &str) -> Result<CString> {
    CString::new(name).map_err(|_| {
        engine_error!("fbe::vulkan", "Shader entry point '{}' contains a NUL byte", name);
        Error::InvalidResource(format!("shader entry point '{}' contains a NUL byte", name))
    })
}

fn create_module(ctx: &GpuContext, code: &[u8], stage: &str) -> Result<vk::ShaderModule> {
    // read_spv checks length and alignment and fixes endianness
    let words = ash::util::read_spv(&mut std::io::Cursor::new(code)).map_err(|e| {
        engine_error!("fbe::vulkan", "Invalid {} SPIR-V ({} bytes): {}", stage, code.len(), e);
        Error::InvalidResource(format!("invalid {} SPIR-V: {}", stage, e))
    })?;

    let create_info = vk::ShaderModuleCreateInfo::default().code(&words);

    unsafe { ctx.device.create_shader_module(&create_info, None) }
        .map_err(|e| engine_err!("fbe::vulkan", "Failed to create {} shader module: {:?}", stage, e))
}

impl Shader for VulkanShader {
    fn layout_handle(&self) -> PipelineLayoutHandle {
        PipelineLayoutHandle::from_raw(self.pipeline_layout.as_raw())
    }

    fn descriptor_set(&self, set_index: u32) -> Option<DescriptorSetHandle> {
        self.descriptor_sets
            .get(set_index as usize)
            .map(|set| DescriptorSetHandle::from_raw(set.as_raw()))
    }

    fn descriptor_set_count(&self) -> u32 {
        self.descriptor_sets.len() as u32
    }
}

impl Drop for VulkanShader {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
            self.ctx.device.destroy_shader_module(self.vertex_module, None);
            self.ctx.device.destroy_shader_module(self.fragment_module, None);
        }
    }
}
