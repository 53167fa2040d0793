/// ResourceFactory - GPU buffers and textures with explicit state and heap
///
/// Buffers and textures are returned as RAII owners (`GpuBuffer`,
/// `GpuTexture`). Dropping them releases the backend allocation. Buffers are
/// unmapped first.

use std::ptr::NonNull;

use crate::device::{
    Buffer, BufferDesc, HeapKind, ResourceState, Texture, TextureDesc, TextureDimension,
    TextureFormat, TextureInfo,
};
use crate::device_context::DeviceContext;
use crate::error::{Error, Result};
use crate::frame_sync::FrameSync;
use crate::{harness_debug, harness_error};

/// Required alignment of constant buffer sizes in bytes
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// Round a constant buffer size up to `CONSTANT_BUFFER_ALIGNMENT`
///
/// # Errors
///
/// `Error::InvalidDescriptor` if the rounded size does not fit in a `u64`.
pub fn align_constant_buffer_size(size: u64) -> Result<u64> {
    size.checked_add(CONSTANT_BUFFER_ALIGNMENT - 1)
        .map(|padded| padded & !(CONSTANT_BUFFER_ALIGNMENT - 1))
        .ok_or_else(|| {
            Error::InvalidDescriptor(format!(
                "constant buffer size {} cannot be aligned to {} bytes",
                size, CONSTANT_BUFFER_ALIGNMENT
            ))
        })
}

// ===== GPU BUFFER =====

/// CPU visibility state of a `GpuBuffer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Unmapped,
    Mapped,
    /// Allocation released; every further access fails
    Destroyed,
}

/// Owned GPU buffer
///
/// While `Mapped`, the buffer holds a CPU write pointer valid for `size()`
/// bytes. `destroy` (and `Drop`) unmap before releasing the allocation, so a
/// mapped pointer never outlives its buffer.
pub struct GpuBuffer {
    buffer: Option<Box<dyn Buffer>>,
    mapped: Option<NonNull<u8>>,
    state: BufferState,
    size: u64,
    heap: HeapKind,
    initial_state: ResourceState,
}

impl GpuBuffer {
    /// Establish the CPU write pointer
    ///
    /// # Errors
    ///
    /// `Error::InvalidBufferState` if the buffer is already mapped, destroyed,
    /// or lives in a device-local heap.
    pub fn map(&mut self) -> Result<()> {
        match self.state {
            BufferState::Mapped => {
                return Err(Error::InvalidBufferState("buffer is already mapped".to_string()));
            }
            BufferState::Destroyed => {
                return Err(Error::InvalidBufferState("buffer was destroyed".to_string()));
            }
            BufferState::Unmapped => {}
        }
        if !self.heap.is_cpu_visible() {
            return Err(Error::InvalidBufferState(
                "device-local buffers cannot be mapped".to_string(),
            ));
        }

        let buffer = self
            .buffer
            .as_mut()
            .ok_or_else(|| Error::InvalidBufferState("buffer was destroyed".to_string()))?;
        let ptr = buffer.map().map_err(|e| {
            harness_error!("harness::ResourceFactory", "Failed to map buffer ({} bytes): {}", self.size, e);
            Error::InvalidBufferState(format!("map failed: {}", e))
        })?;

        self.mapped = Some(ptr);
        self.state = BufferState::Mapped;
        Ok(())
    }

    /// Release the CPU write pointer
    ///
    /// # Errors
    ///
    /// `Error::InvalidBufferState` if the buffer is not mapped.
    pub fn unmap(&mut self) -> Result<()> {
        match self.state {
            BufferState::Mapped => {}
            BufferState::Unmapped => {
                return Err(Error::InvalidBufferState("buffer is not mapped".to_string()));
            }
            BufferState::Destroyed => {
                return Err(Error::InvalidBufferState("buffer was destroyed".to_string()));
            }
        }

        if let Some(buffer) = self.buffer.as_mut() {
            buffer.unmap();
        }
        self.mapped = None;
        self.state = BufferState::Unmapped;
        Ok(())
    }

    /// Copy `bytes` into the mapped buffer at `offset`
    pub fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let size = self.size;
        let end = offset
            .checked_add(bytes.len() as u64)
            .filter(|end| *end <= size)
            .ok_or_else(|| {
                Error::InvalidBufferState(format!(
                    "write of {} bytes at offset {} exceeds buffer size {}",
                    bytes.len(), offset, size
                ))
            })?;

        let slice = self.mapped_slice()?;
        slice[offset as usize..end as usize].copy_from_slice(bytes);
        Ok(())
    }

    /// The mapped memory as a byte slice
    pub fn mapped_slice(&mut self) -> Result<&mut [u8]> {
        match (self.state, self.mapped) {
            (BufferState::Mapped, Some(ptr)) => {
                // SAFETY: the backend guarantees `size` writable bytes at `ptr`
                // until unmap, and `&mut self` prevents both aliasing and unmap
                // for the lifetime of the slice.
                Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), self.size as usize) })
            }
            (BufferState::Destroyed, _) => {
                Err(Error::InvalidBufferState("buffer was destroyed".to_string()))
            }
            _ => Err(Error::InvalidBufferState("buffer is not mapped".to_string())),
        }
    }

    /// Unmap if mapped, then release the allocation
    ///
    /// Idempotent. Called by `Drop`.
    pub fn destroy(&mut self) {
        if self.state == BufferState::Destroyed {
            return;
        }
        if let Some(mut buffer) = self.buffer.take() {
            if self.state == BufferState::Mapped {
                buffer.unmap();
            }
            drop(buffer);
        }
        self.mapped = None;
        self.state = BufferState::Destroyed;
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn is_mapped(&self) -> bool {
        self.state == BufferState::Mapped
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn heap(&self) -> HeapKind {
        self.heap
    }

    /// State the buffer was created in
    pub fn initial_state(&self) -> ResourceState {
        self.initial_state
    }

    /// Backend buffer (None once destroyed)
    pub fn raw(&self) -> Option<&dyn Buffer> {
        self.buffer.as_deref()
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ===== GPU TEXTURE =====

/// Owned GPU texture
///
/// Tracks the resource state last recorded through the factory's upload path.
pub struct GpuTexture {
    texture: Box<dyn Texture>,
    state: ResourceState,
}

impl GpuTexture {
    pub fn info(&self) -> &TextureInfo {
        self.texture.info()
    }

    pub fn width(&self) -> u32 {
        self.texture.info().width
    }

    pub fn height(&self) -> u32 {
        self.texture.info().height
    }

    /// Current resource state
    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn raw(&self) -> &dyn Texture {
        self.texture.as_ref()
    }
}

// ===== IMAGE DATA =====

/// Decoded pixel data handed over by the asset layer
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// Tightly packed rows of `width * 4` bytes
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// RGBA8 image from tightly packed pixels
    pub fn rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::R8G8B8A8_UNORM,
            pixels,
        }
    }
}

fn is_rgba8(format: TextureFormat) -> bool {
    matches!(format, TextureFormat::R8G8B8A8_UNORM | TextureFormat::R8G8B8A8_SRGB)
}

// ===== VALIDATION =====

/// Check the creation preconditions of a texture descriptor
///
/// # Errors
///
/// `Error::InvalidDescriptor` for zero extents, levels or samples, for a
/// descriptor that is both a volume and an array, and for extents that do
/// not fit the dimension.
pub fn validate_texture_desc(desc: &TextureDesc) -> Result<()> {
    let fail = |reason: String| Err(Error::InvalidDescriptor(reason));

    if desc.width == 0 || desc.height == 0 {
        return fail(format!("texture extent {}x{} must be non-zero", desc.width, desc.height));
    }
    if desc.mip_levels == 0 {
        return fail("texture must have at least one mip level".to_string());
    }
    if desc.depth == 0 || desc.array_layers == 0 {
        return fail(format!(
            "depth ({}) and array layers ({}) must be at least 1",
            desc.depth, desc.array_layers
        ));
    }
    if desc.sample_count == 0 {
        return fail("sample count must be at least 1".to_string());
    }
    if desc.depth > 1 && desc.array_layers > 1 {
        return fail(format!(
            "texture cannot be both a volume (depth {}) and an array ({} layers)",
            desc.depth, desc.array_layers
        ));
    }

    match desc.dimension {
        TextureDimension::Tex1D if desc.height > 1 || desc.depth > 1 => fail(format!(
            "1D texture must have height and depth 1 (got {}x{})",
            desc.height, desc.depth
        )),
        TextureDimension::Tex2D if desc.depth > 1 => {
            fail(format!("2D texture must have depth 1 (got {})", desc.depth))
        }
        TextureDimension::Tex3D if desc.array_layers > 1 => fail(format!(
            "3D texture cannot have array layers (got {})",
            desc.array_layers
        )),
        _ => Ok(()),
    }
}

// ===== RESOURCE FACTORY =====

/// Creates buffers and textures on a `DeviceContext`
pub struct ResourceFactory<'a> {
    device: &'a DeviceContext,
}

impl<'a> ResourceFactory<'a> {
    pub fn new(device: &'a DeviceContext) -> Self {
        Self { device }
    }

    /// Allocate a linear buffer
    ///
    /// With `map_immediately`, the returned buffer is already `Mapped` and
    /// may stay mapped for its whole lifetime.
    ///
    /// # Errors
    ///
    /// * `Error::InvalidDescriptor` - zero size, or a device-local buffer asked to be mapped
    /// * `Error::ResourceAllocationFailed` - the backend allocation failed
    pub fn create_buffer(&self, desc: &BufferDesc) -> Result<GpuBuffer> {
        if desc.size == 0 {
            return Err(Error::InvalidDescriptor("buffer size must be greater than 0".to_string()));
        }
        if desc.map_immediately && !desc.heap.is_cpu_visible() {
            return Err(Error::InvalidDescriptor(
                "only upload-heap buffers can be mapped".to_string(),
            ));
        }

        let buffer = self.device.device().create_buffer(desc).map_err(|e| {
            harness_error!(
                "harness::ResourceFactory",
                "Failed to allocate {:?} buffer of {} bytes: {}",
                desc.heap, desc.size, e
            );
            match e {
                Error::ResourceAllocationFailed(_) => e,
                other => Error::ResourceAllocationFailed(other.to_string()),
            }
        })?;

        let mut buffer = GpuBuffer {
            buffer: Some(buffer),
            mapped: None,
            state: BufferState::Unmapped,
            size: desc.size,
            heap: desc.heap,
            initial_state: desc.initial_state,
        };

        if desc.map_immediately {
            buffer.map().map_err(|e| Error::ResourceAllocationFailed(e.to_string()))?;
        }

        harness_debug!(
            "harness::ResourceFactory",
            "created {:?} buffer ({} bytes, {:?})",
            desc.heap, desc.size, desc.initial_state
        );
        Ok(buffer)
    }

    /// Upload buffer holding `bytes` (vertex, index or constant data)
    ///
    /// The buffer is mapped, filled and unmapped before it is returned.
    pub fn create_initialized_buffer(
        &self,
        bytes: &[u8],
        initial_state: ResourceState,
    ) -> Result<GpuBuffer> {
        let mut buffer = self.create_buffer(&BufferDesc {
            size: bytes.len() as u64,
            initial_state,
            heap: HeapKind::Upload,
            map_immediately: true,
        })?;
        buffer.write(0, bytes)?;
        buffer.unmap()?;
        Ok(buffer)
    }

    /// Allocate an image resource
    ///
    /// # Errors
    ///
    /// * `Error::InvalidDescriptor` - see `validate_texture_desc`
    /// * `Error::ResourceAllocationFailed` - the backend allocation failed
    pub fn create_texture(&self, desc: &TextureDesc) -> Result<GpuTexture> {
        validate_texture_desc(desc).map_err(|e| {
            harness_error!("harness::ResourceFactory", "Rejected texture descriptor: {}", e);
            e
        })?;

        let texture = self.device.device().create_texture(desc).map_err(|e| {
            harness_error!(
                "harness::ResourceFactory",
                "Failed to allocate {}x{} {:?} texture: {}",
                desc.width, desc.height, desc.format, e
            );
            match e {
                Error::ResourceAllocationFailed(_) => e,
                other => Error::ResourceAllocationFailed(other.to_string()),
            }
        })?;

        harness_debug!(
            "harness::ResourceFactory",
            "created {:?} texture {}x{} ({:?})",
            desc.format, desc.width, desc.height, desc.initial_state
        );
        Ok(GpuTexture {
            texture,
            state: desc.initial_state,
        })
    }

    /// Copy decoded pixels into `texture` and make it shader-readable
    ///
    /// Blocks until the GPU has consumed the staging buffer. The texture must
    /// be an RGBA8 texture in the `CopyDest` state with the image's extent. It
    /// ends in `PixelShaderResource`.
    pub fn upload_texture(
        &self,
        frame_sync: &mut FrameSync,
        texture: &mut GpuTexture,
        image: &ImageData,
    ) -> Result<()> {
        let info = texture.info().clone();

        if !is_rgba8(image.format) || !is_rgba8(info.format) {
            return Err(Error::InvalidDescriptor(format!(
                "upload expects RGBA8 data and texture (got {:?} into {:?})",
                image.format, info.format
            )));
        }
        if image.width != info.width || image.height != info.height {
            return Err(Error::InvalidDescriptor(format!(
                "image is {}x{} but texture is {}x{}",
                image.width, image.height, info.width, info.height
            )));
        }
        let row_bytes = image.width as usize * 4;
        if image.pixels.len() != row_bytes * image.height as usize {
            return Err(Error::InvalidDescriptor(format!(
                "expected {} bytes of pixel data, got {}",
                row_bytes * image.height as usize,
                image.pixels.len()
            )));
        }
        if texture.state != ResourceState::CopyDest {
            return Err(Error::InvalidDescriptor(format!(
                "upload target must be in CopyDest state (is {:?})",
                texture.state
            )));
        }

        let footprint = self.device.device().upload_footprint(texture.raw());
        let required = footprint.row_pitch * (info.height as u64 - 1) + row_bytes as u64;
        if footprint.row_pitch < row_bytes as u64 || footprint.total_size < required {
            return Err(Error::ResourceAllocationFailed(format!(
                "upload footprint too small (pitch {}, {} bytes) for {}x{} image",
                footprint.row_pitch, footprint.total_size, image.width, image.height
            )));
        }

        let mut staging = self.create_buffer(&BufferDesc::upload(footprint.total_size, true))?;
        {
            let dst = staging.mapped_slice()?;
            let pitch = footprint.row_pitch as usize;
            for (row, src) in image.pixels.chunks_exact(row_bytes).enumerate() {
                let start = row * pitch;
                dst[start..start + row_bytes].copy_from_slice(src);
            }
        }
        staging.unmap()?;

        let staging_buffer = staging
            .raw()
            .ok_or_else(|| Error::InvalidBufferState("staging buffer was destroyed".to_string()))?;

        let mut list = self.device.device().create_command_list()?;
        list.reset()?;
        list.copy_buffer_to_texture(staging_buffer, texture.raw(), &footprint)?;
        list.transition(
            texture.raw(),
            ResourceState::CopyDest,
            ResourceState::PixelShaderResource,
        )?;
        list.close()?;

        let queue = self.device.queue();
        queue.submit(list.as_ref()).map_err(|e| {
            harness_error!("harness::ResourceFactory", "Texture upload submission failed: {}", e);
            e
        })?;
        frame_sync.wait_for_idle(queue)?;

        texture.state = ResourceState::PixelShaderResource;
        harness_debug!(
            "harness::ResourceFactory",
            "uploaded {}x{} texture ({} staging bytes)",
            info.width, info.height, footprint.total_size
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "resource_factory_tests.rs"]
mod tests;
