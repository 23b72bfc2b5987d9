//! Unit tests for Vulkan conversion functions
//!
//! Pure mappings between engine enums and Vulkan enums, no GPU required.

use super::*;

// ============================================================================
// TEXTURE FORMATS
// ============================================================================

#[test]
fn test_format_to_vk_color_formats() {
    assert_eq!(format_to_vk(TextureFormat::R8G8B8A8_SRGB), vk::Format::R8G8B8A8_SRGB);
    assert_eq!(format_to_vk(TextureFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(format_to_vk(TextureFormat::B8G8R8A8_SRGB), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(format_to_vk(TextureFormat::B8G8R8A8_UNORM), vk::Format::B8G8R8A8_UNORM);
}

#[test]
fn test_format_to_vk_depth_formats() {
    assert_eq!(format_to_vk(TextureFormat::D16_UNORM), vk::Format::D16_UNORM);
    // Engine "FLOAT" is Vulkan "SFLOAT"
    assert_eq!(format_to_vk(TextureFormat::D32_FLOAT), vk::Format::D32_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::D24_UNORM_S8_UINT), vk::Format::D24_UNORM_S8_UINT);
    assert_eq!(format_to_vk(TextureFormat::D32_FLOAT_S8_UINT), vk::Format::D32_SFLOAT_S8_UINT);
}

#[test]
fn test_aspect_mask_per_format_family() {
    assert_eq!(aspect_mask(TextureFormat::B8G8R8A8_UNORM), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_mask(TextureFormat::D32_FLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_mask(TextureFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

#[test]
fn test_attachment_usage_per_format_family() {
    assert!(attachment_usage(TextureFormat::R8G8B8A8_UNORM)
        .contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
    assert_eq!(
        attachment_usage(TextureFormat::D16_UNORM),
        vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
    );
}

// ============================================================================
// BUFFERS
// ============================================================================

#[test]
fn test_buffer_format_to_vk() {
    let cases = [
        (BufferFormat::R32_SFLOAT, vk::Format::R32_SFLOAT),
        (BufferFormat::R32G32_SFLOAT, vk::Format::R32G32_SFLOAT),
        (BufferFormat::R32G32B32_SFLOAT, vk::Format::R32G32B32_SFLOAT),
        (BufferFormat::R32G32B32A32_SFLOAT, vk::Format::R32G32B32A32_SFLOAT),
        (BufferFormat::R32_UINT, vk::Format::R32_UINT),
        (BufferFormat::R32G32_UINT, vk::Format::R32G32_UINT),
        (BufferFormat::R8G8B8A8_UNORM, vk::Format::R8G8B8A8_UNORM),
    ];

    for (format, expected) in cases {
        assert_eq!(buffer_format_to_vk(format), expected, "Buffer format mismatch for {:?}", format);
    }
}

#[test]
fn test_buffer_usage_and_index_type() {
    assert_eq!(buffer_usage_to_vk(BufferUsage::Vertex), vk::BufferUsageFlags::VERTEX_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Index), vk::BufferUsageFlags::INDEX_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Uniform), vk::BufferUsageFlags::UNIFORM_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Storage), vk::BufferUsageFlags::STORAGE_BUFFER);

    assert_eq!(index_type_to_vk(IndexType::U16), vk::IndexType::UINT16);
    assert_eq!(index_type_to_vk(IndexType::U32), vk::IndexType::UINT32);
}

// ============================================================================
// RENDER PASS STATE
// ============================================================================

#[test]
fn test_attachment_ops_to_vk() {
    assert_eq!(load_op_to_vk(LoadOp::Load), vk::AttachmentLoadOp::LOAD);
    assert_eq!(load_op_to_vk(LoadOp::Clear), vk::AttachmentLoadOp::CLEAR);
    assert_eq!(load_op_to_vk(LoadOp::DontCare), vk::AttachmentLoadOp::DONT_CARE);
    assert_eq!(store_op_to_vk(StoreOp::Store), vk::AttachmentStoreOp::STORE);
    assert_eq!(store_op_to_vk(StoreOp::DontCare), vk::AttachmentStoreOp::DONT_CARE);
}

#[test]
fn test_image_layout_to_vk() {
    assert_eq!(image_layout_to_vk(ImageLayout::Undefined), vk::ImageLayout::UNDEFINED);
    assert_eq!(image_layout_to_vk(ImageLayout::ColorAttachment), vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    assert_eq!(
        image_layout_to_vk(ImageLayout::DepthStencilAttachment),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    );
    assert_eq!(image_layout_to_vk(ImageLayout::ShaderReadOnly), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(image_layout_to_vk(ImageLayout::TransferSrc), vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
    assert_eq!(image_layout_to_vk(ImageLayout::TransferDst), vk::ImageLayout::TRANSFER_DST_OPTIMAL);
    assert_eq!(image_layout_to_vk(ImageLayout::PresentSrc), vk::ImageLayout::PRESENT_SRC_KHR);
}

#[test]
fn test_sample_count_fallback() {
    assert_eq!(sample_count_to_vk(1), vk::SampleCountFlags::TYPE_1);
    assert_eq!(sample_count_to_vk(4), vk::SampleCountFlags::TYPE_4);
    assert_eq!(sample_count_to_vk(3), vk::SampleCountFlags::TYPE_1);
}

// ============================================================================
// CLEAR VALUES AND RECTS
// ============================================================================

#[test]
fn test_clear_value_to_vk() {
    let color = clear_value_to_vk(&ClearValue::Color([0.25, 0.5, 0.75, 1.0]));
    // vk::ClearValue is a union: read back the field that was written
    assert_eq!(unsafe { color.color.float32 }, [0.25, 0.5, 0.75, 1.0]);

    let depth = clear_value_to_vk(&ClearValue::DEPTH_ONE);
    let depth_stencil = unsafe { depth.depth_stencil };
    assert_eq!(depth_stencil.depth, 1.0);
    assert_eq!(depth_stencil.stencil, 0);
}

#[test]
fn test_full_rect_and_viewport() {
    let extent = Extent2D::new(256, 128);

    let rect = full_rect(extent);
    assert_eq!((rect.offset.x, rect.offset.y), (0, 0));
    assert_eq!((rect.extent.width, rect.extent.height), (256, 128));

    let viewport = full_viewport(extent);
    assert_eq!((viewport.width, viewport.height), (256.0, 128.0));
    assert_eq!((viewport.min_depth, viewport.max_depth), (0.0, 1.0));
}
