/*!
# Framebuffer Engine

Render targets for a low-level GPU API.

A `RenderTarget` owns a native framebuffer built from a color surface (and an
optional depth/stencil surface) against a render pass, plus one dedicated
primary command context. Each frame it is re-bound to open a render-pass
scope, records pipeline, descriptor-set, buffer and draw commands into its
context, and is unbound to close the scope.

## Architecture

- **Device**: creates and destroys native framebuffers
- **GraphicsCommand**: allocates contexts, records commands, submits them
- **Surface**: an attachable image view with a size and format
- **RenderPass**: a native render pass
- **GraphicPipeline**: a lazily built pipeline referencing its shader weakly
- **RenderTarget**: the framebuffer + context + draw-binding protocol

Backends (see `framebuffer_engine_vulkan`) implement the device traits.
*/

// Internal modules
mod error;
pub mod log;
pub mod device;
pub mod render_target;

// Main fbe namespace module
pub mod fbe {
    // Error types
    pub use crate::error::{Error, Result};

    // Render target
    pub use crate::render_target::{RecordingState, RenderTarget};

    // Logging sub-module (types and configuration, macros live at the crate root)
    pub mod log {
        pub use crate::log::{
            DefaultLogger, LogEntry, LogSeverity, Logger, min_severity, reset_logger,
            set_logger, set_min_severity,
        };
    }

    // Device sub-module with all collaborator traits and descriptors
    pub mod device {
        pub use crate::device::*;
    }
}

// Re-export math library at crate root
pub use glam;
