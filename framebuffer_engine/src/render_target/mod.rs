/// Render target module

pub mod render_target;

pub use render_target::*;
