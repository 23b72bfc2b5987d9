/// GraphicPipeline and Shader traits

use std::sync::Arc;
use crate::error::Result;
use crate::device::{DescriptorSetHandle, PipelineHandle, PipelineLayoutHandle, RenderPass};

/// Shader program as seen by draw recording
///
/// Owns the pipeline layout and the descriptor-set table that
/// `bind_uniform_sets` indexes into.
pub trait Shader: Send + Sync {
    /// Pipeline layout the descriptor sets are bound against
    fn layout_handle(&self) -> PipelineLayoutHandle;

    /// Descriptor set at `set_index`, or `None` if the table has no such entry
    fn descriptor_set(&self, set_index: u32) -> Option<DescriptorSetHandle>;

    /// Number of entries in the descriptor-set table
    fn descriptor_set_count(&self) -> u32;
}

/// Graphics pipeline
///
/// Native construction depends on the render pass shape, so it is deferred
/// until a render target injects its render pass. Implementations keep a
/// weak reference to their shader: `shader()` returns `None` once the shader
/// has been dropped elsewhere.
pub trait GraphicPipeline: Send + Sync {
    /// Inject the render pass the pipeline will be built against
    fn attach_render_pass(&self, render_pass: Arc<dyn RenderPass>);

    /// Build the native pipeline object
    ///
    /// Idempotent: once built, later calls return `Ok(())` without rebuilding.
    fn build_native(&self) -> Result<()>;

    /// Native pipeline handle (null until `build_native` succeeded)
    fn native_handle(&self) -> PipelineHandle;

    /// Upgrade the weak shader reference
    fn shader(&self) -> Option<Arc<dyn Shader>>;
}
