/// VulkanSurface - Vulkan implementation of the Surface trait
///
/// Either wraps an external image view (e.g. a swapchain image owned by the
/// presentation layer) or owns an attachment image allocated by the device.

use ash::vk;
use ash::vk::Handle;
use framebuffer_engine::fbe::device::{Surface, TextureFormat, ViewHandle};
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Image + allocation owned by an attachment surface
pub(crate) struct OwnedImage {
    pub(crate) image: vk::Image,
    pub(crate) allocation: Option<Allocation>,
}

/// Vulkan surface implementation
pub struct VulkanSurface {
    /// Shared GPU context
    ctx: Arc<GpuContext>,
    /// Image view used as a framebuffer attachment
    pub(crate) image_view: vk::ImageView,
    /// Owned image, `None` for external views
    owned: Option<OwnedImage>,
    width: u32,
    height: u32,
    format: TextureFormat,
}

impl VulkanSurface {
    /// Wrap an image view owned elsewhere (not destroyed on drop)
    pub(crate) fn external(
        ctx: Arc<GpuContext>,
        image_view: vk::ImageView,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Self {
        Self { ctx, image_view, owned: None, width, height, format }
    }

    /// Take ownership of an allocated image and its view
    pub(crate) fn owned(
        ctx: Arc<GpuContext>,
        image: OwnedImage,
        image_view: vk::ImageView,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Self {
        Self { ctx, image_view, owned: Some(image), width, height, format }
    }

    /// Whether this surface owns its image
    pub fn owns_image(&self) -> bool {
        self.owned.is_some()
    }

    /// Underlying Vulkan image view
    pub fn image_view(&self) -> vk::ImageView {
        self.image_view
    }
}

impl Surface for VulkanSurface {
    fn native_view(&self) -> ViewHandle {
        ViewHandle::from_raw(self.image_view.as_raw())
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

impl Drop for VulkanSurface {
    fn drop(&mut self) {
        let Some(mut owned) = self.owned.take() else {
            return;
        };

        unsafe {
            self.ctx.device.destroy_image_view(self.image_view, None);

            if let Some(allocation) = owned.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the image
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_image(owned.image, None);
        }
    }
}
