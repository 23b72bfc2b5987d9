/// Mock device for unit tests (no GPU required)
///
/// Every collaborator trait has a mock here. The mock command queue records
/// each emitted command as a `RecordedCommand` so tests can assert on the
/// exact command stream of a render target.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::device::{
    Buffer, BufferHandle, BufferUsage, CommandAllocator, CommandRecorder, CommandSubmitter,
    ContextHandle, DescriptorSetHandle, Device, Extent2D, FramebufferDesc, FramebufferHandle,
    GraphicPipeline, PipelineHandle, PipelineLayoutHandle, PoolHandle, RenderPass,
    RenderPassBegin, RenderPassHandle, Shader, Surface, TextureFormat, ViewHandle,
};
use crate::error::{Error, Result};

// ============================================================================
// Mock Surface
// ============================================================================

#[derive(Debug)]
pub struct MockSurface {
    pub view: ViewHandle,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl MockSurface {
    pub fn color(view: u64, width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            view: ViewHandle::from_raw(view),
            width,
            height,
            format: TextureFormat::B8G8R8A8_UNORM,
        })
    }

    pub fn depth(view: u64, width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            view: ViewHandle::from_raw(view),
            width,
            height,
            format: TextureFormat::D32_FLOAT,
        })
    }
}

impl Surface for MockSurface {
    fn native_view(&self) -> ViewHandle {
        self.view
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

// ============================================================================
// Mock RenderPass
// ============================================================================

#[derive(Debug)]
pub struct MockRenderPass {
    pub handle: RenderPassHandle,
}

impl MockRenderPass {
    pub fn new(raw: u64) -> Arc<Self> {
        Arc::new(Self { handle: RenderPassHandle::from_raw(raw) })
    }
}

impl RenderPass for MockRenderPass {
    fn native_handle(&self) -> RenderPassHandle {
        self.handle
    }
}

// ============================================================================
// Mock Device
// ============================================================================

/// Parameters of one `create_framebuffer` call
#[derive(Debug, Clone, PartialEq)]
pub struct FramebufferRecord {
    pub handle: FramebufferHandle,
    pub render_pass: RenderPassHandle,
    pub attachments: Vec<ViewHandle>,
    pub extent: Extent2D,
    pub layers: u32,
}

#[derive(Debug)]
pub struct MockDevice {
    next_handle: AtomicU64,
    /// Make `create_framebuffer` fail like a rejected platform call
    pub fail_framebuffer_creation: AtomicBool,
    /// Make `create_framebuffer` succeed with the null handle
    pub return_null_framebuffer: AtomicBool,
    created: Mutex<Vec<FramebufferRecord>>,
    destroyed: Mutex<Vec<FramebufferHandle>>,
}

impl MockDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_handle: AtomicU64::new(0x1000),
            fail_framebuffer_creation: AtomicBool::new(false),
            return_null_framebuffer: AtomicBool::new(false),
            created: Mutex::new(Vec::new()),
            destroyed: Mutex::new(Vec::new()),
        })
    }

    pub fn created(&self) -> Vec<FramebufferRecord> {
        self.created.lock().unwrap().clone()
    }

    pub fn destroyed(&self) -> Vec<FramebufferHandle> {
        self.destroyed.lock().unwrap().clone()
    }
}

impl Device for MockDevice {
    fn create_framebuffer(&self, desc: &FramebufferDesc<'_>) -> Result<FramebufferHandle> {
        if self.fail_framebuffer_creation.load(Ordering::SeqCst) {
            return Err(Error::ResourceCreationError(
                "mock: framebuffer parameters rejected".to_string(),
            ));
        }

        let handle = if self.return_null_framebuffer.load(Ordering::SeqCst) {
            FramebufferHandle::NULL
        } else {
            FramebufferHandle::from_raw(self.next_handle.fetch_add(1, Ordering::SeqCst))
        };

        self.created.lock().unwrap().push(FramebufferRecord {
            handle,
            render_pass: desc.render_pass,
            attachments: desc.attachments.to_vec(),
            extent: desc.extent,
            layers: desc.layers,
        });
        Ok(handle)
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        self.destroyed.lock().unwrap().push(framebuffer);
    }
}

// ============================================================================
// Mock command queue
// ============================================================================

/// One command emitted into a context
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    BeginRenderPass {
        context: ContextHandle,
        framebuffer: FramebufferHandle,
        render_pass: RenderPassHandle,
        extent: Extent2D,
        clear_value_count: usize,
    },
    EndRenderPass { context: ContextHandle },
    BindPipeline { context: ContextHandle, pipeline: PipelineHandle },
    BindDescriptorSet {
        context: ContextHandle,
        layout: PipelineLayoutHandle,
        set_index: u32,
        set: DescriptorSetHandle,
    },
    BindVertexBuffer { context: ContextHandle, buffer: BufferHandle },
    BindIndexBuffer { context: ContextHandle, buffer: BufferHandle },
    Draw { context: ContextHandle, vertex_count: u32 },
    DrawIndexed { context: ContextHandle, index_count: u32 },
}

#[derive(Debug)]
pub struct MockCommands {
    pool: PoolHandle,
    next_context: AtomicU64,
    /// Make `allocate_primary_context` fail
    pub fail_allocation: AtomicBool,
    /// Make `end_render_pass` fail
    pub fail_end_render_pass: AtomicBool,
    allocated: Mutex<Vec<ContextHandle>>,
    freed: Mutex<Vec<ContextHandle>>,
    recording: Mutex<HashSet<ContextHandle>>,
    commands: Mutex<Vec<RecordedCommand>>,
    submitted: Mutex<Vec<ContextHandle>>,
}

impl MockCommands {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pool: PoolHandle::from_raw(0xC0),
            next_context: AtomicU64::new(0x2000),
            fail_allocation: AtomicBool::new(false),
            fail_end_render_pass: AtomicBool::new(false),
            allocated: Mutex::new(Vec::new()),
            freed: Mutex::new(Vec::new()),
            recording: Mutex::new(HashSet::new()),
            commands: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.lock().unwrap().clear();
    }

    pub fn allocated(&self) -> Vec<ContextHandle> {
        self.allocated.lock().unwrap().clone()
    }

    pub fn freed(&self) -> Vec<ContextHandle> {
        self.freed.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<ContextHandle> {
        self.submitted.lock().unwrap().clone()
    }

    /// Whether the context is inside a render-pass scope
    pub fn is_recording(&self, context: ContextHandle) -> bool {
        self.recording.lock().unwrap().contains(&context)
    }

    fn push(&self, command: RecordedCommand) {
        self.commands.lock().unwrap().push(command);
    }
}

impl CommandAllocator for MockCommands {
    fn allocate_primary_context(&self) -> Result<ContextHandle> {
        if self.fail_allocation.load(Ordering::SeqCst) {
            return Err(Error::BackendError("mock: command pool exhausted".to_string()));
        }
        let context = ContextHandle::from_raw(self.next_context.fetch_add(1, Ordering::SeqCst));
        self.allocated.lock().unwrap().push(context);
        Ok(context)
    }

    fn free_context(&self, context: ContextHandle) {
        self.freed.lock().unwrap().push(context);
    }

    fn pool(&self) -> PoolHandle {
        self.pool
    }
}

impl CommandRecorder for MockCommands {
    fn begin_render_pass(&self, context: ContextHandle, begin: &RenderPassBegin<'_>) -> Result<()> {
        self.recording.lock().unwrap().insert(context);
        self.push(RecordedCommand::BeginRenderPass {
            context,
            framebuffer: begin.framebuffer,
            render_pass: begin.render_pass,
            extent: begin.extent,
            clear_value_count: begin.clear_values.len(),
        });
        Ok(())
    }

    fn end_render_pass(&self, context: ContextHandle) -> Result<()> {
        self.recording.lock().unwrap().remove(&context);
        if self.fail_end_render_pass.load(Ordering::SeqCst) {
            return Err(Error::BackendError("mock: failed to end command buffer".to_string()));
        }
        self.push(RecordedCommand::EndRenderPass { context });
        Ok(())
    }

    fn bind_pipeline(&self, context: ContextHandle, pipeline: PipelineHandle) -> Result<()> {
        self.push(RecordedCommand::BindPipeline { context, pipeline });
        Ok(())
    }

    fn bind_descriptor_set(
        &self,
        context: ContextHandle,
        shader: &dyn Shader,
        set_index: u32,
        set: DescriptorSetHandle,
    ) -> Result<()> {
        self.push(RecordedCommand::BindDescriptorSet {
            context,
            layout: shader.layout_handle(),
            set_index,
            set,
        });
        Ok(())
    }

    fn bind_vertex_buffer(&self, context: ContextHandle, buffer: &dyn Buffer) -> Result<()> {
        self.push(RecordedCommand::BindVertexBuffer { context, buffer: buffer.native_handle() });
        Ok(())
    }

    fn bind_index_buffer(&self, context: ContextHandle, buffer: &dyn Buffer) -> Result<()> {
        self.push(RecordedCommand::BindIndexBuffer { context, buffer: buffer.native_handle() });
        Ok(())
    }

    fn draw(&self, context: ContextHandle, vertex_count: u32) -> Result<()> {
        self.push(RecordedCommand::Draw { context, vertex_count });
        Ok(())
    }

    fn draw_indexed(&self, context: ContextHandle, index_count: u32) -> Result<()> {
        self.push(RecordedCommand::DrawIndexed { context, index_count });
        Ok(())
    }
}

impl CommandSubmitter for MockCommands {
    fn submit(&self, contexts: &[ContextHandle]) -> Result<()> {
        self.submitted.lock().unwrap().extend_from_slice(contexts);
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Mock Buffer
// ============================================================================

#[derive(Debug)]
pub struct MockBuffer {
    pub handle: BufferHandle,
    pub size: u64,
    pub usage: BufferUsage,
}

impl MockBuffer {
    pub fn new(raw: u64, size: u64, usage: BufferUsage) -> Self {
        Self { handle: BufferHandle::from_raw(raw), size, usage }
    }
}

impl Buffer for MockBuffer {
    fn native_handle(&self) -> BufferHandle {
        self.handle
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }
}

// ============================================================================
// Mock Shader
// ============================================================================

#[derive(Debug)]
pub struct MockShader {
    pub layout: PipelineLayoutHandle,
    pub sets: Vec<DescriptorSetHandle>,
}

impl MockShader {
    pub fn new(layout: u64, sets: &[u64]) -> Arc<Self> {
        Arc::new(Self {
            layout: PipelineLayoutHandle::from_raw(layout),
            sets: sets.iter().map(|&raw| DescriptorSetHandle::from_raw(raw)).collect(),
        })
    }
}

impl Shader for MockShader {
    fn layout_handle(&self) -> PipelineLayoutHandle {
        self.layout
    }

    fn descriptor_set(&self, set_index: u32) -> Option<DescriptorSetHandle> {
        self.sets.get(set_index as usize).copied()
    }

    fn descriptor_set_count(&self) -> u32 {
        self.sets.len() as u32
    }
}

// ============================================================================
// Mock Pipeline
// ============================================================================

pub struct MockPipeline {
    raw: u64,
    shader: Weak<MockShader>,
    render_pass: Mutex<Option<Arc<dyn RenderPass>>>,
    handle: Mutex<PipelineHandle>,
    build_count: AtomicU32,
    /// Make `build_native` fail
    pub fail_build: AtomicBool,
}

impl MockPipeline {
    pub fn new(raw: u64, shader: &Arc<MockShader>) -> Arc<Self> {
        Self::with_weak_shader(raw, Arc::downgrade(shader))
    }

    pub fn without_shader(raw: u64) -> Arc<Self> {
        Self::with_weak_shader(raw, Weak::new())
    }

    fn with_weak_shader(raw: u64, shader: Weak<MockShader>) -> Arc<Self> {
        Arc::new(Self {
            raw,
            shader,
            render_pass: Mutex::new(None),
            handle: Mutex::new(PipelineHandle::NULL),
            build_count: AtomicU32::new(0),
            fail_build: AtomicBool::new(false),
        })
    }

    /// Number of native builds actually performed
    pub fn build_count(&self) -> u32 {
        self.build_count.load(Ordering::SeqCst)
    }

    pub fn attached_render_pass(&self) -> Option<RenderPassHandle> {
        self.render_pass.lock().unwrap().as_ref().map(|pass| pass.native_handle())
    }
}

impl GraphicPipeline for MockPipeline {
    fn attach_render_pass(&self, render_pass: Arc<dyn RenderPass>) {
        *self.render_pass.lock().unwrap() = Some(render_pass);
    }

    fn build_native(&self) -> Result<()> {
        if self.fail_build.load(Ordering::SeqCst) {
            return Err(Error::BackendError("mock: pipeline build failed".to_string()));
        }

        let mut handle = self.handle.lock().unwrap();
        if !handle.is_null() {
            return Ok(());
        }
        if self.render_pass.lock().unwrap().is_none() {
            return Err(Error::InvalidResource("mock: no render pass attached".to_string()));
        }

        *handle = PipelineHandle::from_raw(self.raw);
        self.build_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn native_handle(&self) -> PipelineHandle {
        *self.handle.lock().unwrap()
    }

    fn shader(&self) -> Option<Arc<dyn Shader>> {
        self.shader.upgrade().map(|shader| shader as Arc<dyn Shader>)
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
