/// VulkanDevice - Vulkan implementation of the Device trait
///
/// Headless bootstrap (no window, no presentation): instance, optional
/// validation messenger, first physical device with a graphics queue,
/// logical device and memory allocator. Also the factory for every other
/// backend object.

use ash::vk;
use ash::vk::Handle;
use framebuffer_engine::fbe::device::{
    BufferUsage, Config, Device, FramebufferDesc, FramebufferHandle, IndexType, RenderPassDesc,
    TextureFormat,
};
use framebuffer_engine::fbe::log::set_min_severity;
use framebuffer_engine::fbe::{Error, Result};
use framebuffer_engine::{engine_bail, engine_debug, engine_err, engine_error, engine_info};
use gpu_allocator::vulkan::{
    AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::MemoryLocation;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command::VulkanCommandQueue;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    aspect_mask, attachment_usage, buffer_usage_to_vk, format_to_vk, image_layout_to_vk,
    load_op_to_vk, sample_count_to_vk, store_op_to_vk,
};
use crate::vulkan_pipeline::{GraphicPipelineDesc, VulkanGraphicPipeline};
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_shader::{ShaderDesc, VulkanShader};
use crate::vulkan_surface::{OwnedImage, VulkanSurface};

fn init_failed(what: &str, e: impl std::fmt::Debug) -> Error {
    engine_error!("fbe::vulkan", "{}: {:?}", what, e);
    Error::InitializationFailed(format!("{}: {:?}", what, e))
}

/// Vulkan device implementation
pub struct VulkanDevice {
    /// Shared GPU context for all resources
    ctx: Arc<GpuContext>,
}

impl VulkanDevice {
    /// Create a headless Vulkan device
    ///
    /// Applies `config.log_severity` to the engine logger. Validation is only
    /// available when the crate is built with the `vulkan-validation` feature.
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` if any bootstrap step fails.
    pub fn new(config: Config) -> Result<Self> {
        set_min_severity(config.log_severity);

        #[cfg(feature = "vulkan-validation")]
        let enable_validation = config.enable_validation;
        #[cfg(not(feature = "vulkan-validation"))]
        let enable_validation = {
            if config.enable_validation {
                framebuffer_engine::engine_warn!("fbe::vulkan",
                    "Validation requested but the vulkan-validation feature is disabled");
            }
            false
        };

        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_failed("Failed to load Vulkan library", e))?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|e| init_failed("Invalid application name", e))?;
            let (major, minor, patch) = config.app_version;

            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"FramebufferEngine")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let mut extension_names = Vec::new();
            let mut layer_names = Vec::new();
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_failed("Failed to create instance", e))?;

            let (debug_utils_loader, debug_messenger) = if enable_validation {
                Self::create_debug_messenger(&entry, &instance, &config)?
            } else {
                (None, None)
            };

            // Pick the first physical device with a graphics queue family
            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| init_failed("Failed to enumerate physical devices", e))?;

            let selected = physical_devices.into_iter().find_map(|physical_device| {
                instance
                    .get_physical_device_queue_family_properties(physical_device)
                    .iter()
                    .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                    .map(|family| (physical_device, family as u32))
            });

            let Some((physical_device, graphics_family_index)) = selected else {
                engine_error!("fbe::vulkan", "No Vulkan-capable GPU with a graphics queue found");
                return Err(Error::InitializationFailed(
                    "No Vulkan-capable GPU with a graphics queue found".to_string(),
                ));
            };

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .queue_priorities(&queue_priorities)];

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_failed("Failed to create logical device", e))?;

            let graphics_queue = device.get_device_queue(graphics_family_index, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_failed("Failed to create GPU allocator", e))?;

            let ctx = Arc::new(GpuContext::new(
                entry,
                instance,
                physical_device,
                device,
                allocator,
                graphics_queue,
                graphics_family_index,
                debug_utils_loader,
                debug_messenger,
            ));

            let device = Self { ctx };
            engine_info!("fbe::vulkan", "Vulkan device created on {}", device.device_name());
            Ok(device)
        }
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &Config,
    ) -> Result<(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        crate::debug::init_debug_config(config.debug_severity);

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(crate::debug::severity_flags(config.debug_severity))
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = debug_utils
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| init_failed("Failed to create debug messenger", e))?;

        Ok((Some(debug_utils), Some(messenger)))
    }

    #[cfg(not(feature = "vulkan-validation"))]
    unsafe fn create_debug_messenger(
        _entry: &ash::Entry,
        _instance: &ash::Instance,
        _config: &Config,
    ) -> Result<(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>)> {
        Ok((None, None))
    }

    /// Physical device name
    pub fn device_name(&self) -> String {
        let properties = unsafe {
            self.ctx.instance.get_physical_device_properties(self.ctx.physical_device)
        };
        properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "Unknown GPU".to_string())
    }

    // ===== FACTORIES =====

    /// Create a render pass with one graphics subpass
    pub fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<VulkanRenderPass>> {
        let mut attachments = Vec::with_capacity(desc.attachment_count() as usize);
        let mut color_attachment_refs = Vec::with_capacity(desc.color_attachments.len());

        for attachment in desc.color_attachments.iter().chain(desc.depth_stencil_attachment.iter()) {
            attachments.push(vk::AttachmentDescription::default()
                .format(format_to_vk(attachment.format))
                .samples(sample_count_to_vk(attachment.samples))
                .load_op(load_op_to_vk(attachment.load_op))
                .store_op(store_op_to_vk(attachment.store_op))
                .stencil_load_op(load_op_to_vk(attachment.stencil_load_op))
                .stencil_store_op(store_op_to_vk(attachment.stencil_store_op))
                .initial_layout(image_layout_to_vk(attachment.initial_layout))
                .final_layout(image_layout_to_vk(attachment.final_layout)));
        }

        for index in 0..desc.color_attachments.len() {
            color_attachment_refs.push(vk::AttachmentReference::default()
                .attachment(index as u32)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL));
        }

        // Depth/stencil always follows the color attachments
        let depth_attachment_ref = desc.depth_stencil_attachment.as_ref().map(|_| {
            vk::AttachmentReference::default()
                .attachment(desc.color_attachments.len() as u32)
                .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        });

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_attachment_refs);

        if let Some(ref depth_ref) = depth_attachment_ref {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }

        let (stage_mask, access_mask) = if depth_attachment_ref.is_some() {
            (
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
        } else {
            (
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            )
        };

        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stage_mask)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stage_mask)
            .dst_access_mask(access_mask);

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        let render_pass = unsafe { self.ctx.device.create_render_pass(&render_pass_info, None) }
            .map_err(|e| engine_err!("fbe::vulkan", "Failed to create render pass: {:?}", e))?;

        Ok(Arc::new(VulkanRenderPass::new(
            Arc::clone(&self.ctx),
            render_pass,
            desc.attachment_count(),
            desc.color_attachments.len() as u32,
        )))
    }

    /// Allocate a device-local attachment image and its view
    pub fn create_attachment(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Arc<VulkanSurface>> {
        if width == 0 || height == 0 {
            engine_bail!("fbe::vulkan", "Attachment extent {}x{} is empty", width, height);
        }

        let vk_format = format_to_vk(format);
        let device = &self.ctx.device;

        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(vk_format)
                .extent(vk::Extent3D { width, height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(attachment_usage(format))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = device.create_image(&image_info, None)
                .map_err(|e| engine_err!("fbe::vulkan", "Failed to create {}x{} attachment image: {:?}", width, height, e))?;

            let requirements = device.get_image_memory_requirements(image);

            let allocation = self.ctx.allocator
                .lock()
                .map_err(|_| Error::BackendError("allocator lock poisoned".to_string()))
                .and_then(|mut allocator| {
                    allocator.allocate(&AllocationCreateDesc {
                        name: "attachment",
                        requirements,
                        location: MemoryLocation::GpuOnly,
                        linear: false,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_e| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        engine_error!("fbe::vulkan", "Out of GPU memory for attachment (required: {:.2} MB)", size_mb);
                        Error::OutOfMemory
                    })
                });

            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_image(image, None);
                    return Err(e);
                }
            };

            // From here the surface owns image + allocation, its Drop cleans up
            let mut owned = OwnedImage { image, allocation: Some(allocation) };

            let bind_result = match owned.allocation.as_ref() {
                Some(allocation) => device.bind_image_memory(image, allocation.memory(), allocation.offset()),
                None => Err(vk::Result::ERROR_UNKNOWN),
            };

            let view_result = bind_result.and_then(|_| {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(vk_format)
                    .components(vk::ComponentMapping::default())
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: aspect_mask(format),
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                device.create_image_view(&view_info, None)
            });

            match view_result {
                Ok(view) => Ok(Arc::new(VulkanSurface::owned(
                    Arc::clone(&self.ctx),
                    owned,
                    view,
                    width,
                    height,
                    format,
                ))),
                Err(e) => {
                    if let (Some(allocation), Ok(mut allocator)) =
                        (owned.allocation.take(), self.ctx.allocator.lock())
                    {
                        allocator.free(allocation).ok();
                    }
                    device.destroy_image(image, None);
                    Err(engine_err!("fbe::vulkan", "Failed to bind or view attachment image: {:?}", e))
                }
            }
        }
    }

    /// Wrap an image view owned elsewhere (e.g. a swapchain image)
    pub fn wrap_view(
        &self,
        image_view: vk::ImageView,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Arc<VulkanSurface> {
        Arc::new(VulkanSurface::external(Arc::clone(&self.ctx), image_view, width, height, format))
    }

    /// Create a host-visible buffer
    ///
    /// `index_type` is only used when the buffer is bound as an index buffer.
    pub fn create_buffer(
        &self,
        size: u64,
        usage: BufferUsage,
        index_type: IndexType,
    ) -> Result<Arc<VulkanBuffer>> {
        if size == 0 {
            engine_bail!("fbe::vulkan", "Buffer size must be non-zero");
        }

        let device = &self.ctx.device;

        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(buffer_usage_to_vk(usage) | vk::BufferUsageFlags::TRANSFER_DST)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("fbe::vulkan", "Failed to create buffer of size {} bytes: {:?}", size, e))?;

            let requirements = device.get_buffer_memory_requirements(buffer);

            let allocation = self.ctx.allocator
                .lock()
                .map_err(|_| Error::BackendError("allocator lock poisoned".to_string()))
                .and_then(|mut allocator| {
                    allocator.allocate(&AllocationCreateDesc {
                        name: "buffer",
                        requirements,
                        location: MemoryLocation::CpuToGpu,
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_e| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        engine_error!("fbe::vulkan", "Out of GPU memory for buffer (required: {:.2} MB)", size_mb);
                        Error::OutOfMemory
                    })
                });

            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
                device.destroy_buffer(buffer, None);
                engine_bail!("fbe::vulkan", "Failed to bind buffer memory: {:?}", e);
            }

            engine_debug!("fbe::vulkan", "Created {:?} buffer of {} bytes", usage, size);

            Ok(Arc::new(VulkanBuffer::new(
                Arc::clone(&self.ctx),
                buffer,
                allocation,
                size,
                usage,
                index_type,
            )))
        }
    }

    /// Create a shader from vertex + fragment SPIR-V
    pub fn create_shader(&self, desc: ShaderDesc<'_>) -> Result<Arc<VulkanShader>> {
        VulkanShader::create(Arc::clone(&self.ctx), desc).map(Arc::new)
    }

    /// Create a graphics pipeline (built lazily on first use by a render target)
    pub fn create_pipeline(
        &self,
        shader: &Arc<VulkanShader>,
        desc: GraphicPipelineDesc,
    ) -> Arc<VulkanGraphicPipeline> {
        Arc::new(VulkanGraphicPipeline::new(Arc::clone(&self.ctx), shader, desc))
    }

    /// Create a command pool + queue front-end
    pub fn create_command_queue(&self) -> Result<Arc<VulkanCommandQueue>> {
        VulkanCommandQueue::new(Arc::clone(&self.ctx)).map(Arc::new)
    }

    /// Wait for all GPU work to finish
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx.device
                .device_wait_idle()
                .map_err(|e| engine_err!("fbe::vulkan", "Failed to wait idle: {:?}", e))
        }
    }
}

impl Device for VulkanDevice {
    fn create_framebuffer(&self, desc: &FramebufferDesc<'_>) -> Result<FramebufferHandle> {
        let attachments: Vec<vk::ImageView> = desc.attachments
            .iter()
            .map(|view| vk::ImageView::from_raw(view.as_raw()))
            .collect();

        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(vk::RenderPass::from_raw(desc.render_pass.as_raw()))
            .attachments(&attachments)
            .width(desc.extent.width)
            .height(desc.extent.height)
            .layers(desc.layers);

        let framebuffer = unsafe { self.ctx.device.create_framebuffer(&framebuffer_info, None) }
            .map_err(|e| {
                engine_error!("fbe::vulkan", "Failed to create {}x{} framebuffer with {} attachment(s): {:?}",
                    desc.extent.width, desc.extent.height, attachments.len(), e);
                Error::ResourceCreationError(format!("vkCreateFramebuffer failed: {:?}", e))
            })?;

        Ok(FramebufferHandle::from_raw(framebuffer.as_raw()))
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        unsafe {
            self.ctx.device.destroy_framebuffer(vk::Framebuffer::from_raw(framebuffer.as_raw()), None);
        }
    }
}
