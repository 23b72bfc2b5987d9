/// Device trait - native framebuffer creation and destruction

use crate::error::Result;
use crate::device::{Extent2D, FramebufferHandle, RenderPassHandle, ViewHandle};

/// Descriptor for creating a framebuffer
#[derive(Debug, Clone, Copy)]
pub struct FramebufferDesc<'a> {
    /// Render pass the framebuffer is compatible with
    pub render_pass: RenderPassHandle,
    /// Attachment views, color first then depth/stencil
    pub attachments: &'a [ViewHandle],
    /// Width and height in pixels
    pub extent: Extent2D,
    /// Number of layers
    pub layers: u32,
}

/// Logical device
///
/// Injected into render targets instead of being inherited as ambient state.
pub trait Device: Send + Sync {
    /// Create a native framebuffer
    ///
    /// # Errors
    ///
    /// `Error::ResourceCreationError` when the platform rejects the parameters.
    fn create_framebuffer(&self, desc: &FramebufferDesc<'_>) -> Result<FramebufferHandle>;

    /// Destroy a framebuffer created by `create_framebuffer`
    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle);
}
