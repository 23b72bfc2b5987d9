/// Buffer trait - vertex/index buffers consumed opaquely by draw recording

use crate::device::BufferHandle;

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
    /// Uniform/constant buffer
    Uniform,
    /// Storage buffer
    Storage,
}

/// Index type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 16-bit indices (max 65535 vertices)
    U16,
    /// 32-bit indices (max ~4 billion vertices)
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Vertex attribute data format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
    R32_UINT,
    R32G32_UINT,
    R8G8B8A8_UNORM,
}

impl BufferFormat {
    /// Size in bytes of one element
    pub fn size_bytes(&self) -> u32 {
        match self {
            BufferFormat::R32_SFLOAT | BufferFormat::R32_UINT | BufferFormat::R8G8B8A8_UNORM => 4,
            BufferFormat::R32G32_SFLOAT | BufferFormat::R32G32_UINT => 8,
            BufferFormat::R32G32B32_SFLOAT => 12,
            BufferFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

/// GPU buffer
pub trait Buffer: Send + Sync {
    /// Native buffer handle
    fn native_handle(&self) -> BufferHandle;

    /// Size in bytes
    fn size(&self) -> u64;

    /// What the buffer was created for
    fn usage(&self) -> BufferUsage;

    /// Element type when bound as an index buffer
    fn index_type(&self) -> IndexType {
        IndexType::U32
    }
}
