//! Error types for the framebuffer engine
//!
//! Every fallible operation of the core and of the backends returns
//! [`Result`]. Failures are immediate and never retried: creating a GPU
//! object again with the same parameters cannot succeed.

use std::fmt;

use crate::device::Extent2D;

/// Result type for framebuffer engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Framebuffer engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A native object (framebuffer, command context, image, ...) could not be created
    ResourceCreationError(String),

    /// Color and depth/stencil attachments do not share the same extent
    ExtentMismatch {
        color: Extent2D,
        depth_stencil: Extent2D,
    },

    /// A recording call was issued out of order (bind while recording, draw while idle, ...)
    ProtocolViolation(String),

    /// Invalid resource (null view, unknown descriptor set, expired shader, ...)
    InvalidResource(String),

    /// Backend-specific error (Vulkan, ...)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Initialization failed (device, queue, allocator)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ResourceCreationError(msg) => write!(f, "Resource creation failed: {}", msg),
            Error::ExtentMismatch { color, depth_stencil } => write!(
                f,
                "Extent mismatch: color attachment is {}x{}, depth/stencil attachment is {}x{}",
                color.width, color.height, depth_stencil.width, depth_stencil.height
            ),
            Error::ProtocolViolation(msg) => write!(f, "Protocol violation: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
