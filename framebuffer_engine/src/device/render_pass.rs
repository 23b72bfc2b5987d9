/// RenderPass trait - describes how a framebuffer's attachments are used

use crate::device::{RenderPassHandle, TextureFormat};

/// Render pass trait
///
/// An already-constructed render pass. The render target only needs its
/// native handle; attachment compatibility with the framebuffer is the
/// caller's contract and is reported by the platform at framebuffer creation.
pub trait RenderPass: Send + Sync {
    /// Native render pass handle
    fn native_handle(&self) -> RenderPassHandle;
}

/// Descriptor for creating a render pass
#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    /// Color attachments
    pub color_attachments: Vec<AttachmentDesc>,
    /// Optional depth/stencil attachment
    pub depth_stencil_attachment: Option<AttachmentDesc>,
}

impl RenderPassDesc {
    /// Number of attachments a compatible framebuffer must provide
    pub fn attachment_count(&self) -> u32 {
        self.color_attachments.len() as u32 + self.depth_stencil_attachment.is_some() as u32
    }
}

/// Descriptor for a single attachment in a render pass
#[derive(Debug, Clone)]
pub struct AttachmentDesc {
    /// Pixel format
    pub format: TextureFormat,
    /// Number of samples (1 = no MSAA)
    pub samples: u32,
    /// Load operation (what to do with existing content)
    pub load_op: LoadOp,
    /// Store operation (what to do with rendered content)
    pub store_op: StoreOp,
    /// Stencil load operation
    pub stencil_load_op: LoadOp,
    /// Stencil store operation
    pub stencil_store_op: StoreOp,
    /// Initial layout (how the attachment starts)
    pub initial_layout: ImageLayout,
    /// Final layout (how the attachment ends)
    pub final_layout: ImageLayout,
}

impl AttachmentDesc {
    /// Cleared color attachment, kept for sampling or readback afterwards
    pub fn color(format: TextureFormat) -> Self {
        Self {
            format,
            samples: 1,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            stencil_load_op: LoadOp::DontCare,
            stencil_store_op: StoreOp::DontCare,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::ColorAttachment,
        }
    }

    /// Cleared depth/stencil attachment, discarded at the end of the pass
    pub fn depth_stencil(format: TextureFormat) -> Self {
        Self {
            format,
            samples: 1,
            load_op: LoadOp::Clear,
            store_op: StoreOp::DontCare,
            stencil_load_op: if format.has_stencil() { LoadOp::Clear } else { LoadOp::DontCare },
            stencil_store_op: StoreOp::DontCare,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::DepthStencilAttachment,
        }
    }
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    /// Load existing content
    Load,
    /// Clear the content
    Clear,
    /// Don't care about existing content
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Store the rendered content
    Store,
    /// Don't care about storing the content
    DontCare,
}

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    /// Undefined layout (initial state)
    Undefined,
    /// Layout for color attachment
    ColorAttachment,
    /// Layout for depth/stencil attachment
    DepthStencilAttachment,
    /// Layout for shader read-only access
    ShaderReadOnly,
    /// Layout for transfer source
    TransferSrc,
    /// Layout for transfer destination
    TransferDst,
    /// Layout for presenting to swapchain
    PresentSrc,
}
