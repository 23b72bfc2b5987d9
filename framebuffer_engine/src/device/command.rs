/// Command allocation, recording and submission traits
///
/// The command-submission subsystem owns the command pool and the queue.
/// Render targets only borrow a primary context from it and emit commands
/// into that context; nothing executes until the context is submitted.

use crate::error::Result;
use crate::device::{
    Buffer, ContextHandle, DescriptorSetHandle, Extent2D, FramebufferHandle,
    PipelineHandle, PoolHandle, RenderPassHandle, Shader,
};

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

impl ClearValue {
    /// Color clear value from a glam vector
    pub fn color(rgba: glam::Vec4) -> Self {
        ClearValue::Color(rgba.to_array())
    }

    /// Opaque black
    pub const BLACK: ClearValue = ClearValue::Color([0.0, 0.0, 0.0, 1.0]);

    /// Far plane depth, zero stencil
    pub const DEPTH_ONE: ClearValue = ClearValue::DepthStencil { depth: 1.0, stencil: 0 };
}

/// Everything needed to open a render-pass recording scope
///
/// Plain handles only: the recorder never takes ownership of the render target.
#[derive(Debug, Clone, Copy)]
pub struct RenderPassBegin<'a> {
    pub framebuffer: FramebufferHandle,
    pub render_pass: RenderPassHandle,
    pub extent: Extent2D,
    /// One clear value per attachment, in attachment order
    pub clear_values: &'a [ClearValue],
}

/// Allocates and frees primary command contexts from a pool
pub trait CommandAllocator: Send + Sync {
    /// Allocate one primary context
    fn allocate_primary_context(&self) -> Result<ContextHandle>;

    /// Return a context to the pool
    fn free_context(&self, context: ContextHandle);

    /// Pool the contexts are allocated from
    fn pool(&self) -> PoolHandle;
}

/// Emits commands into a context
pub trait CommandRecorder: Send + Sync {
    /// Open a render-pass scope (the context starts recording)
    fn begin_render_pass(&self, context: ContextHandle, begin: &RenderPassBegin<'_>) -> Result<()>;

    /// Close the render-pass scope (the context stops recording)
    fn end_render_pass(&self, context: ContextHandle) -> Result<()>;

    /// Bind a graphics pipeline
    fn bind_pipeline(&self, context: ContextHandle, pipeline: PipelineHandle) -> Result<()>;

    /// Bind `set` at `set_index` against the shader's pipeline layout
    fn bind_descriptor_set(
        &self,
        context: ContextHandle,
        shader: &dyn Shader,
        set_index: u32,
        set: DescriptorSetHandle,
    ) -> Result<()>;

    /// Bind a vertex buffer at binding 0
    fn bind_vertex_buffer(&self, context: ContextHandle, buffer: &dyn Buffer) -> Result<()>;

    /// Bind an index buffer
    fn bind_index_buffer(&self, context: ContextHandle, buffer: &dyn Buffer) -> Result<()>;

    /// Non-indexed draw of one instance
    fn draw(&self, context: ContextHandle, vertex_count: u32) -> Result<()>;

    /// Indexed draw of one instance
    fn draw_indexed(&self, context: ContextHandle, index_count: u32) -> Result<()>;
}

/// Submits recorded contexts to the queue
pub trait CommandSubmitter: Send + Sync {
    /// Submit contexts for execution, in order
    fn submit(&self, contexts: &[ContextHandle]) -> Result<()>;

    /// Block until the queue is idle
    fn wait_idle(&self) -> Result<()>;
}

/// Full command-submission subsystem
pub trait GraphicsCommand: CommandAllocator + CommandRecorder + CommandSubmitter {}

impl<T: CommandAllocator + CommandRecorder + CommandSubmitter + ?Sized> GraphicsCommand for T {}
