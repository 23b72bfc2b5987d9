/// Native handles - typed wrappers around opaque 64-bit GPU object handles
///
/// Backends store their native handle value (e.g. `vk::Framebuffer::as_raw()`)
/// in these newtypes. Zero is the null sentinel, like `VK_NULL_HANDLE`.

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u64);

        impl $name {
            /// Null handle (no native object)
            pub const NULL: Self = Self(0);

            /// Wrap a raw native handle value
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Raw native handle value
            pub const fn as_raw(self) -> u64 {
                self.0
            }

            /// Whether this is the null handle
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

native_handle!(
    /// Image view handle of a surface attachment
    ViewHandle
);
native_handle!(
    /// Render pass handle
    RenderPassHandle
);
native_handle!(
    /// Framebuffer handle (owned by a RenderTarget)
    FramebufferHandle
);
native_handle!(
    /// Command context handle (a primary command buffer)
    ContextHandle
);
native_handle!(
    /// Command pool handle
    PoolHandle
);
native_handle!(
    /// Graphics pipeline handle
    PipelineHandle
);
native_handle!(
    /// Pipeline layout handle
    PipelineLayoutHandle
);
native_handle!(
    /// Buffer handle
    BufferHandle
);
native_handle!(
    /// Descriptor set handle
    DescriptorSetHandle
);
