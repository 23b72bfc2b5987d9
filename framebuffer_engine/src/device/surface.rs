/// Surface trait - an image view usable as a framebuffer attachment

use crate::device::ViewHandle;

/// Width/height pair in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<(u32, u32)> for Extent2D {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl From<Extent2D> for (u32, u32) {
    fn from(extent: Extent2D) -> Self {
        (extent.width, extent.height)
    }
}

impl From<Extent2D> for glam::UVec2 {
    fn from(extent: Extent2D) -> Self {
        glam::UVec2::new(extent.width, extent.height)
    }
}

/// Attachment pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    D16_UNORM,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
    D32_FLOAT_S8_UINT,
}

impl TextureFormat {
    /// Whether this format has a depth component
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM
                | TextureFormat::D32_FLOAT
                | TextureFormat::D24_UNORM_S8_UINT
                | TextureFormat::D32_FLOAT_S8_UINT
        )
    }

    /// Whether this format has a stencil component
    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::D24_UNORM_S8_UINT | TextureFormat::D32_FLOAT_S8_UINT)
    }
}

/// Surface trait
///
/// A GPU image plus its view, seen from the render target: a native view
/// handle and a fixed extent. Color and depth/stencil attachments both
/// implement it.
pub trait Surface: Send + Sync {
    /// Native image view handle
    fn native_view(&self) -> ViewHandle;

    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;

    /// Pixel format
    fn format(&self) -> TextureFormat;

    /// Width and height together
    fn extent(&self) -> Extent2D {
        Extent2D::new(self.width(), self.height())
    }
}
