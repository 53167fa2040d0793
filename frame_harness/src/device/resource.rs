/// Resource states and heap kinds shared by buffers and textures

/// Memory residency of an allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapKind {
    /// CPU-writable, GPU-readable (staging, constant and streaming data)
    Upload,
    /// GPU-only memory (render targets, sampled textures)
    DeviceLocal,
}

impl HeapKind {
    pub fn is_cpu_visible(&self) -> bool {
        matches!(self, HeapKind::Upload)
    }
}

/// GPU access state of a resource
///
/// Transitions between states are recorded explicitly with
/// `CommandList::transition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Common,
    /// Any read state; required for upload-heap buffers
    GenericRead,
    VertexAndConstantBuffer,
    IndexBuffer,
    CopySource,
    CopyDest,
    PixelShaderResource,
    RenderTarget,
    DepthWrite,
    DepthRead,
    Present,
}
