/// GpuContext - Shared GPU objects for all Vulkan wrappers
///
/// Every backend object (surfaces, buffers, shaders, pipelines, command
/// queues) holds an `Arc<GpuContext>`, so the instance and the logical device
/// outlive everything created from them. The last `Arc` tears them down.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::Mutex;

/// Shared GPU context
pub struct GpuContext {
    /// Vulkan loader (keeps the library loaded while the instance lives)
    _entry: ash::Entry,

    /// Vulkan instance
    pub(crate) instance: ash::Instance,

    /// Selected physical device
    pub(crate) physical_device: vk::PhysicalDevice,

    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue (queue access is externally synchronized)
    pub graphics_queue: Mutex<vk::Queue>,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Debug utils loader (validation only)
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    /// Debug messenger handle (validation only)
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        allocator: Allocator,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    ) -> Self {
        Self {
            _entry: entry,
            instance,
            physical_device,
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue: Mutex::new(graphics_queue),
            graphics_queue_family,
            debug_utils_loader,
            debug_messenger,
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Free VkDeviceMemory pages while the device is alive
            ManuallyDrop::drop(&mut self.allocator);

            // 2. Stop routing validation messages before the messenger goes away
            #[cfg(feature = "vulkan-validation")]
            crate::debug::cleanup_debug_config();

            // 3. Debug messenger BEFORE device and instance
            if let (Some(debug_utils), Some(messenger)) =
                (&self.debug_utils_loader, self.debug_messenger.take())
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            // 4. Device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
