/// Device module - collaborator traits consumed by render targets

// Module declarations
pub mod handle;
pub mod surface;
pub mod render_pass;
pub mod buffer;
pub mod pipeline;
pub mod command;
pub mod device;
pub mod config;

// Re-export everything
pub use handle::*;
pub use surface::*;
pub use render_pass::*;
pub use buffer::*;
pub use pipeline::*;
pub use command::*;
pub use device::*;
pub use config::*;

// Mock device for tests (no GPU required)
#[cfg(test)]
pub mod mock_device;
