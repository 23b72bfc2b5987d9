/// RenderTarget - framebuffer + dedicated command context + draw-binding protocol
///
/// A render target binds a color surface (and optionally a depth/stencil
/// surface) to a render pass through a native framebuffer, and owns one
/// primary command context allocated at construction. Each frame the target
/// is re-bound: `bind()` opens a render-pass scope on its context, the draw
/// calls record into it, `unbind()` closes the scope. Nothing executes until
/// the context is submitted by the command subsystem.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::device::{
    Buffer, ClearValue, ContextHandle, Device, Extent2D, FramebufferDesc, FramebufferHandle,
    GraphicPipeline, GraphicsCommand, RenderPass, RenderPassBegin, RenderPassHandle, Surface,
    ViewHandle,
};
use crate::{engine_debug, engine_error, engine_warn};

const SOURCE: &str = "fbe::RenderTarget";

/// State of the render target's command context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// No render-pass scope open
    Idle,
    /// Between `bind()` and `unbind()`
    Recording,
}

/// Render target
///
/// Exclusively owns the native framebuffer and the command context; both
/// are released on drop. Surfaces, render pass, device and command
/// subsystem are shared and outlive the target through their `Arc`s.
pub struct RenderTarget {
    /// Framebuffer creation/destruction
    device: Arc<dyn Device>,
    /// Command pool owner, recorder and queue
    commands: Arc<dyn GraphicsCommand>,
    /// Native framebuffer
    framebuffer: FramebufferHandle,
    /// Color attachment (attachment 0)
    color: Arc<dyn Surface>,
    /// Optional depth/stencil attachment (attachment 1)
    depth_stencil: Option<Arc<dyn Surface>>,
    /// Render pass the framebuffer was created against
    render_pass: Arc<dyn RenderPass>,
    /// Primary context dedicated to this target
    context: ContextHandle,
    /// Color surface extent at construction time
    extent: Extent2D,
    /// One clear value per attachment
    clear_values: Vec<ClearValue>,
    /// Currently attached pipeline
    pipeline: Option<Arc<dyn GraphicPipeline>>,
    state: RecordingState,
}

impl RenderTarget {
    /// Create a render target with a single color attachment
    ///
    /// # Errors
    ///
    /// - `Error::InvalidResource` if the color view is null
    /// - `Error::ResourceCreationError` if the extent is zero-sized, or if
    ///   the framebuffer or the command context cannot be created
    pub fn new(
        device: Arc<dyn Device>,
        commands: Arc<dyn GraphicsCommand>,
        color: Arc<dyn Surface>,
        render_pass: Arc<dyn RenderPass>,
    ) -> Result<Self> {
        Self::create(device, commands, color, None, render_pass)
    }

    /// Create a render target with a color and a depth/stencil attachment
    ///
    /// Attachment order is fixed: color is attachment 0, depth/stencil is 1.
    ///
    /// # Errors
    ///
    /// - `Error::ExtentMismatch` if the two surfaces differ in size
    /// - `Error::InvalidResource` if a view is null
    /// - `Error::ResourceCreationError` if the extent is zero-sized, or if
    ///   the framebuffer or the command context cannot be created
    pub fn with_depth_stencil(
        device: Arc<dyn Device>,
        commands: Arc<dyn GraphicsCommand>,
        color: Arc<dyn Surface>,
        depth_stencil: Arc<dyn Surface>,
        render_pass: Arc<dyn RenderPass>,
    ) -> Result<Self> {
        Self::create(device, commands, color, Some(depth_stencil), render_pass)
    }

    fn create(
        device: Arc<dyn Device>,
        commands: Arc<dyn GraphicsCommand>,
        color: Arc<dyn Surface>,
        depth_stencil: Option<Arc<dyn Surface>>,
        render_pass: Arc<dyn RenderPass>,
    ) -> Result<Self> {
        let extent = color.extent();

        // A zero-sized framebuffer is invalid usage on the native side
        if extent.is_empty() {
            engine_error!(SOURCE, "Unsupported framebuffer extent {}x{}", extent.width, extent.height);
            return Err(Error::ResourceCreationError(format!(
                "unsupported framebuffer extent {}x{}",
                extent.width, extent.height
            )));
        }

        let mut attachments: Vec<ViewHandle> = Vec::with_capacity(2);
        attachments.push(color.native_view());

        if let Some(depth) = &depth_stencil {
            if depth.extent() != extent {
                engine_error!(SOURCE, "Depth/stencil extent {}x{} does not match color extent {}x{}",
                    depth.width(), depth.height(), extent.width, extent.height);
                return Err(Error::ExtentMismatch {
                    color: extent,
                    depth_stencil: depth.extent(),
                });
            }
            attachments.push(depth.native_view());
        }

        if let Some(index) = attachments.iter().position(|view| view.is_null()) {
            engine_error!(SOURCE, "Attachment {} has a null image view", index);
            return Err(Error::InvalidResource(format!("attachment {} has a null image view", index)));
        }

        let framebuffer = device.create_framebuffer(&FramebufferDesc {
            render_pass: render_pass.native_handle(),
            attachments: &attachments,
            extent,
            layers: 1,
        })?;

        let context = match commands.allocate_primary_context() {
            Ok(context) => context,
            Err(e) => {
                // Nothing else owns the framebuffer yet
                if !framebuffer.is_null() {
                    device.destroy_framebuffer(framebuffer);
                }
                engine_error!(SOURCE, "Failed to allocate command context: {}", e);
                return Err(match e {
                    Error::ResourceCreationError(_) => e,
                    other => Error::ResourceCreationError(other.to_string()),
                });
            }
        };

        let mut clear_values = vec![ClearValue::BLACK];
        if depth_stencil.is_some() {
            clear_values.push(ClearValue::DEPTH_ONE);
        }

        engine_debug!(SOURCE, "Created {}x{} render target with {} attachment(s)",
            extent.width, extent.height, attachments.len());

        Ok(Self {
            device,
            commands,
            framebuffer,
            color,
            depth_stencil,
            render_pass,
            context,
            extent,
            clear_values,
            pipeline: None,
            state: RecordingState::Idle,
        })
    }

    // ===== PIPELINE =====

    /// Attach a graphics pipeline
    ///
    /// Injects this target's render pass into the pipeline, triggers its
    /// one-time native build, and binds it: immediately when recording,
    /// otherwise right after the render-pass begin of every later `bind()`.
    /// Errors from the pipeline build propagate unchanged.
    pub fn use_graphic_pipeline(&mut self, pipeline: Arc<dyn GraphicPipeline>) -> Result<()> {
        pipeline.attach_render_pass(Arc::clone(&self.render_pass));
        pipeline.build_native()?;

        let handle = pipeline.native_handle();
        self.pipeline = Some(pipeline);

        if self.state == RecordingState::Recording {
            self.commands.bind_pipeline(self.context, handle)?;
        }
        Ok(())
    }

    // ===== RECORDING SCOPE =====

    /// Open the render-pass recording scope (Idle -> Recording)
    pub fn bind(&mut self) -> Result<()> {
        if self.state == RecordingState::Recording {
            return Err(self.protocol_violation("bind() called while already recording"));
        }

        self.commands.begin_render_pass(self.context, &RenderPassBegin {
            framebuffer: self.framebuffer,
            render_pass: self.render_pass.native_handle(),
            extent: self.extent,
            clear_values: &self.clear_values,
        })?;
        self.state = RecordingState::Recording;

        if let Some(pipeline) = &self.pipeline {
            self.commands.bind_pipeline(self.context, pipeline.native_handle())?;
        }
        Ok(())
    }

    /// Close the render-pass recording scope (Recording -> Idle)
    ///
    /// The target returns to Idle even when ending the scope fails, so the
    /// next frame restarts with `bind()` instead of ending the scope twice.
    pub fn unbind(&mut self) -> Result<()> {
        self.require_recording("unbind()")?;
        self.state = RecordingState::Idle;
        self.commands.end_render_pass(self.context)
    }

    // ===== DRAW BINDING =====

    /// Bind the shader's descriptor set at `set_index`
    ///
    /// Silently does nothing when no pipeline is attached or when the
    /// pipeline's shader has been dropped.
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if the shader has no set at `set_index`.
    pub fn bind_uniform_sets(&mut self, set_index: u32) -> Result<()> {
        self.require_recording("bind_uniform_sets()")?;

        let Some(shader) = self.pipeline.as_ref().and_then(|pipeline| pipeline.shader()) else {
            return Ok(());
        };

        let set = shader.descriptor_set(set_index).ok_or_else(|| {
            engine_error!(SOURCE, "Descriptor set {} out of range ({} sets)",
                set_index, shader.descriptor_set_count());
            Error::InvalidResource(format!(
                "descriptor set {} out of range ({} sets)",
                set_index,
                shader.descriptor_set_count()
            ))
        })?;

        self.commands.bind_descriptor_set(self.context, shader.as_ref(), set_index, set)
    }

    /// Bind a vertex buffer
    pub fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer) -> Result<()> {
        self.require_recording("bind_vertex_buffer()")?;
        self.commands.bind_vertex_buffer(self.context, buffer)
    }

    /// Bind an index buffer
    pub fn bind_index_buffer(&mut self, buffer: &dyn Buffer) -> Result<()> {
        self.require_recording("bind_index_buffer()")?;
        self.commands.bind_index_buffer(self.context, buffer)
    }

    /// Record a non-indexed draw
    pub fn draw(&mut self, vertex_count: u32) -> Result<()> {
        self.require_recording("draw()")?;
        self.commands.draw(self.context, vertex_count)
    }

    /// Record an indexed draw
    pub fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        self.require_recording("draw_indexed()")?;
        self.commands.draw_indexed(self.context, index_count)
    }

    // ===== CLEAR VALUES =====

    /// Replace the clear values used by `bind()`
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if the count differs from the attachment count.
    pub fn set_clear_values(&mut self, clear_values: Vec<ClearValue>) -> Result<()> {
        if clear_values.len() != self.attachment_count() as usize {
            return Err(Error::InvalidResource(format!(
                "expected {} clear value(s), got {}",
                self.attachment_count(),
                clear_values.len()
            )));
        }
        self.clear_values = clear_values;
        Ok(())
    }

    pub fn clear_values(&self) -> &[ClearValue] {
        &self.clear_values
    }

    // ===== ACCESSORS =====

    /// Native framebuffer handle
    pub fn framebuffer(&self) -> FramebufferHandle {
        self.framebuffer
    }

    /// Framebuffer size (the color surface size at construction)
    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Native command context handle
    pub fn context(&self) -> ContextHandle {
        self.context
    }

    /// Native render pass handle
    pub fn render_pass_handle(&self) -> RenderPassHandle {
        self.render_pass.native_handle()
    }

    /// 1 (color only) or 2 (color + depth/stencil)
    pub fn attachment_count(&self) -> u32 {
        if self.depth_stencil.is_some() { 2 } else { 1 }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn pipeline(&self) -> Option<&Arc<dyn GraphicPipeline>> {
        self.pipeline.as_ref()
    }

    pub fn color_surface(&self) -> &Arc<dyn Surface> {
        &self.color
    }

    pub fn depth_stencil_surface(&self) -> Option<&Arc<dyn Surface>> {
        self.depth_stencil.as_ref()
    }

    // ===== INTERNAL =====

    fn require_recording(&self, operation: &str) -> Result<()> {
        if self.state == RecordingState::Recording {
            Ok(())
        } else {
            Err(self.protocol_violation(&format!("{} called outside bind()/unbind()", operation)))
        }
    }

    fn protocol_violation(&self, message: &str) -> Error {
        engine_warn!(SOURCE, "{}", message);
        Error::ProtocolViolation(message.to_string())
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        if !self.framebuffer.is_null() {
            self.device.destroy_framebuffer(self.framebuffer);
            self.framebuffer = FramebufferHandle::NULL;
        }

        if !self.context.is_null() {
            self.commands.free_context(self.context);
            self.context = ContextHandle::NULL;
        }

        engine_debug!(SOURCE, "Destroyed {}x{} render target", self.extent.width, self.extent.height);
    }
}

#[cfg(test)]
#[path = "render_target_tests.rs"]
mod tests;
