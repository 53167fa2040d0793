/// Buffer trait and buffer descriptor

use std::any::Any;
use std::ptr::NonNull;

use crate::device::{HeapKind, ResourceState};
use crate::error::Result;

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes (must be > 0)
    pub size: u64,
    /// GPU state the buffer starts in
    pub initial_state: ResourceState,
    /// Heap the buffer lives in
    pub heap: HeapKind,
    /// Establish a persistent CPU write pointer at creation
    pub map_immediately: bool,
}

impl BufferDesc {
    /// CPU-visible upload buffer in the generic read state
    pub fn upload(size: u64, map_immediately: bool) -> Self {
        Self {
            size,
            initial_state: ResourceState::GenericRead,
            heap: HeapKind::Upload,
            map_immediately,
        }
    }

    /// Device-local buffer
    pub fn device_local(size: u64, initial_state: ResourceState) -> Self {
        Self {
            size,
            initial_state,
            heap: HeapKind::DeviceLocal,
            map_immediately: false,
        }
    }
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g., the Vulkan `Buffer`).
/// The allocation is released when the value is dropped. Map state is
/// tracked by `GpuBuffer`, not by the backend.
pub trait Buffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    /// Heap the buffer was allocated in
    fn heap(&self) -> HeapKind;

    /// CPU write pointer to the start of the buffer
    ///
    /// Valid for `size()` bytes until `unmap` or drop.
    fn map(&mut self) -> Result<NonNull<u8>>;

    /// Release the CPU write pointer (flushes writes where required)
    fn unmap(&mut self);

    fn as_any(&self) -> &dyn Any;
}
