//! Integration tests for RenderTarget on the Vulkan backend
//!
//! All tests require a GPU and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_render_target_tests -- --ignored


use framebuffer_engine::fbe::device::{BufferUsage, CommandSubmitter, Extent2D, IndexType, Surface};
use framebuffer_engine::fbe::{Error, RecordingState, RenderTarget};
use glam::Vec3;
use gpu_test_utils::{color_render_pass, depth_render_pass, get_test_device, COLOR_FORMAT, DEPTH_FORMAT};
use serial_test::serial;

// ============================================================================
// ATTACHMENTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_create_attachment() {
    let device = get_test_device();

    let color = device.create_attachment(256, 128, COLOR_FORMAT).unwrap();

    assert_eq!(color.extent(), Extent2D::new(256, 128));
    assert_eq!(color.format(), COLOR_FORMAT);
    assert!(color.owns_image());
    assert!(!color.native_view().is_null());
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_create_empty_attachment_fails() {
    let device = get_test_device();
    assert!(device.create_attachment(0, 64, COLOR_FORMAT).is_err());
}

// ============================================================================
// RENDER TARGET LIFECYCLE
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_render_target_color_only() {
    let device = get_test_device();
    let commands = device.create_command_queue().unwrap();
    let color = device.create_attachment(256, 256, COLOR_FORMAT).unwrap();

    let mut target = RenderTarget::new(
        device.clone(),
        commands.clone(),
        color,
        color_render_pass(&device),
    )
    .unwrap();

    assert_eq!(target.extent(), Extent2D::new(256, 256));
    assert!(!target.framebuffer().is_null());
    assert!(!target.context().is_null());

    target.bind().unwrap();
    assert_eq!(target.state(), RecordingState::Recording);
    target.unbind().unwrap();

    commands.submit(&[target.context()]).unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_render_target_with_depth() {
    let device = get_test_device();
    let commands = device.create_command_queue().unwrap();
    let color = device.create_attachment(128, 128, COLOR_FORMAT).unwrap();
    let depth = device.create_attachment(128, 128, DEPTH_FORMAT).unwrap();

    let mut target = RenderTarget::with_depth_stencil(
        device.clone(),
        commands.clone(),
        color,
        depth,
        depth_render_pass(&device),
    )
    .unwrap();

    assert_eq!(target.attachment_count(), 2);

    // Several frames through the same context
    for _ in 0..3 {
        target.bind().unwrap();
        target.unbind().unwrap();
        commands.submit(&[target.context()]).unwrap();
    }
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_render_target_extent_mismatch() {
    let device = get_test_device();
    let commands = device.create_command_queue().unwrap();
    let color = device.create_attachment(256, 256, COLOR_FORMAT).unwrap();
    let depth = device.create_attachment(128, 128, DEPTH_FORMAT).unwrap();

    let result = RenderTarget::with_depth_stencil(
        device.clone(),
        commands,
        color,
        depth,
        depth_render_pass(&device),
    );

    assert!(matches!(result.err(), Some(Error::ExtentMismatch { .. })));
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_render_target_drop_releases_resources() {
    let device = get_test_device();
    let commands = device.create_command_queue().unwrap();

    for _ in 0..8 {
        let color = device.create_attachment(64, 64, COLOR_FORMAT).unwrap();
        let mut target = RenderTarget::new(
            device.clone(),
            commands.clone(),
            color,
            color_render_pass(&device),
        )
        .unwrap();
        target.bind().unwrap();
        target.unbind().unwrap();
        commands.submit(&[target.context()]).unwrap();
    }

    device.wait_idle().unwrap();
}

// ============================================================================
// BUFFERS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_buffer_write() {
    let device = get_test_device();
    let vertices = [Vec3::new(0.0, -0.5, 0.0), Vec3::new(0.5, 0.5, 0.0), Vec3::new(-0.5, 0.5, 0.0)];

    let buffer = device.create_buffer(36, BufferUsage::Vertex, IndexType::U32).unwrap();
    buffer.write(0, &vertices).unwrap();

    // One byte past the end
    assert!(matches!(buffer.update(1, &[0u8; 36]), Err(Error::InvalidResource(_))));
}
