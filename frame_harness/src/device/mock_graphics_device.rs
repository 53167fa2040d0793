/// Mock graphics backend for unit tests (no GPU required)
///
/// Every backend trait is implemented over one shared `MockState`. Tests use
/// it to inject failures and to observe what the components asked the GPU
/// to do. The fence completes lazily: signaled values are reached only when
/// someone waits on them or when `MockGpu::complete_all` runs, so blocking
/// waits can be counted.

use std::any::Any;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard};

use raw_window_handle::{RawDisplayHandle, RawWindowHandle, XlibDisplayHandle, XlibWindowHandle};

use crate::device::{
    AdapterInfo, AdapterKind, Backend, Buffer, BufferDesc, CommandList, Feature, FeatureLevel,
    Fence, GpuPreference, GraphicsDevice, HeapKind, Queue, ResourceState, SurfaceHandle,
    Swapchain, SwapchainDesc, Texture, TextureDesc, TextureDimension, TextureFormat, TextureInfo,
    TextureUsage, UploadFootprint,
};
use crate::error::{Error, Result};
use crate::frame_sync::spin_wait;

/// Row pitch alignment used by the mock's upload footprint
pub const MOCK_ROW_PITCH_ALIGNMENT: u64 = 256;

// ============================================================================
// Shared state
// ============================================================================

#[derive(Debug, Default)]
pub struct FenceValues {
    pub completed: u64,
    pub signaled: u64,
}

/// Failure knobs, counters and event log shared by all mock objects
#[derive(Debug, Default)]
pub struct MockState {
    // Failure injection
    pub fail_high_performance_enumeration: bool,
    pub fail_device_creation: bool,
    pub fail_queue_creation: bool,
    pub fail_swapchain_creation: bool,
    pub fail_resize: bool,
    pub fail_reset: bool,
    pub fail_close: bool,
    pub fail_present: bool,
    pub fail_buffer_allocation: bool,
    pub fail_texture_allocation: bool,
    /// Number of upcoming acquires that report an out-of-date chain
    pub out_of_date_acquires: u32,

    // Configuration
    pub adapters: Vec<AdapterInfo>,
    pub tearing_supported: bool,
    /// Extent dictated by the window; `resize_buffers` uses it instead of the
    /// requested size when set
    pub window_extent: Option<(u32, u32)>,

    // Observations
    pub events: Vec<String>,
    pub work_serial: u64,
    pub submissions: u32,
    /// (interval, allow_tearing) of every present
    pub presents: Vec<(u32, bool)>,
    pub signals: Vec<u64>,
    pub blocking_waits: u32,
    pub live_buffers: usize,
    pub mapped_buffers: usize,
    /// Buffers dropped while still mapped
    pub leaked_mappings: usize,
    pub live_textures: usize,

    fences: Vec<Arc<Mutex<FenceValues>>>,
}

/// Handle on the shared mock state
#[derive(Debug, Clone, Default)]
pub struct MockGpu {
    state: Arc<Mutex<MockState>>,
}

impl MockGpu {
    /// One capable discrete adapter, one software adapter, tearing supported
    pub fn new() -> Self {
        let gpu = Self::default();
        {
            let mut state = gpu.state();
            state.adapters = vec![
                mock_adapter(0, "Mock Software Rasterizer", AdapterKind::Software, FeatureLevel::new(12, 1)),
                mock_adapter(1, "Mock Discrete GPU", AdapterKind::Discrete, FeatureLevel::new(12, 1)),
            ];
            state.tearing_supported = true;
        }
        gpu
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn backend(&self) -> MockBackend {
        MockBackend { gpu: self.clone() }
    }

    /// Let the GPU catch up with every signaled fence value
    pub fn complete_all(&self) {
        let state = self.state();
        for fence in &state.fences {
            let mut values = fence.lock().unwrap();
            values.completed = values.signaled;
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.state().events.clone()
    }

    pub fn clear_events(&self) {
        self.state().events.clear();
    }

    fn record(&self, event: impl Into<String>) {
        self.state().events.push(event.into());
    }
}

/// Adapter description for tests
pub fn mock_adapter(index: usize, name: &str, kind: AdapterKind, level: FeatureLevel) -> AdapterInfo {
    AdapterInfo {
        index,
        name: name.to_string(),
        kind,
        vendor_id: 0x1234,
        device_id: index as u32,
        feature_level: level,
        dedicated_video_memory: 0,
    }
}

/// Window handle the mock swapchain accepts (never dereferenced)
pub fn test_surface() -> SurfaceHandle {
    SurfaceHandle::new(
        RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0)),
        RawWindowHandle::Xlib(XlibWindowHandle::new(1)),
    )
}

// ============================================================================
// Mock Backend
// ============================================================================

pub struct MockBackend {
    pub gpu: MockGpu,
}

impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn minimum_feature_level(&self) -> FeatureLevel {
        FeatureLevel::new(11, 0)
    }

    fn enumerate_adapters(&self, preference: GpuPreference) -> Result<Vec<AdapterInfo>> {
        let state = self.gpu.state();
        if preference == GpuPreference::HighPerformance && state.fail_high_performance_enumeration {
            return Err(Error::BackendError("high-performance enumeration unsupported".to_string()));
        }

        let mut adapters = state.adapters.clone();
        if preference == GpuPreference::HighPerformance {
            adapters.sort_by_key(|a| match a.kind {
                AdapterKind::Discrete => 0,
                AdapterKind::Integrated => 1,
                AdapterKind::Virtual => 2,
                AdapterKind::Other => 3,
                AdapterKind::Software => 4,
            });
        }
        Ok(adapters)
    }

    fn create_device(
        &mut self,
        adapter: &AdapterInfo,
        _min_level: FeatureLevel,
    ) -> Result<Box<dyn GraphicsDevice>> {
        if self.gpu.state().fail_device_creation {
            return Err(Error::DeviceCreationFailed("injected device creation failure".to_string()));
        }
        self.gpu.record(format!("create_device {}", adapter.name));
        Ok(Box::new(MockGraphicsDevice {
            adapter: adapter.clone(),
            gpu: self.gpu.clone(),
        }))
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

pub struct MockGraphicsDevice {
    adapter: AdapterInfo,
    gpu: MockGpu,
}

impl GraphicsDevice for MockGraphicsDevice {
    fn adapter(&self) -> &AdapterInfo {
        &self.adapter
    }

    fn create_queue(&self) -> Result<Box<dyn Queue>> {
        if self.gpu.state().fail_queue_creation {
            return Err(Error::QueueCreationFailed("injected queue creation failure".to_string()));
        }
        Ok(Box::new(MockQueue { gpu: self.gpu.clone() }))
    }

    fn query_feature(&self, feature: Feature) -> bool {
        match feature {
            Feature::AllowTearing => self.gpu.state().tearing_supported,
        }
    }

    fn create_fence(&self, initial_value: u64) -> Result<Box<dyn Fence>> {
        let values = Arc::new(Mutex::new(FenceValues {
            completed: initial_value,
            signaled: initial_value,
        }));
        self.gpu.state().fences.push(values.clone());
        Ok(Box::new(MockFence {
            values,
            gpu: self.gpu.clone(),
        }))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList {
            open: false,
            commands: Vec::new(),
            gpu: self.gpu.clone(),
        }))
    }

    fn create_swapchain(
        &self,
        queue: &dyn Queue,
        _surface: &SurfaceHandle,
        desc: &SwapchainDesc,
    ) -> Result<Box<dyn Swapchain>> {
        if queue.as_any().downcast_ref::<MockQueue>().is_none() {
            return Err(Error::SurfaceCreationFailed("queue is not a mock queue".to_string()));
        }
        if self.gpu.state().fail_swapchain_creation {
            return Err(Error::SurfaceCreationFailed("injected swapchain failure".to_string()));
        }

        let mut swapchain = MockSwapchain {
            width: desc.width,
            height: desc.height,
            image_count: desc.image_count,
            format: desc.format,
            images: Vec::new(),
            current: None,
            next_index: 0,
            gpu: self.gpu.clone(),
        };
        swapchain.acquire_images()?;
        self.gpu.record(format!(
            "create_swapchain {}x{} x{}",
            desc.width, desc.height, desc.image_count
        ));
        Ok(Box::new(swapchain))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Box<dyn Buffer>> {
        let mut state = self.gpu.state();
        if state.fail_buffer_allocation {
            return Err(Error::ResourceAllocationFailed("injected buffer allocation failure".to_string()));
        }
        state.live_buffers += 1;
        state.events.push(format!("create_buffer {} {:?}", desc.size, desc.heap));
        Ok(Box::new(MockBuffer {
            size: desc.size,
            heap: desc.heap,
            data: vec![0; desc.size as usize],
            mapped: false,
            gpu: self.gpu.clone(),
        }))
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Box<dyn Texture>> {
        let mut state = self.gpu.state();
        if state.fail_texture_allocation {
            return Err(Error::ResourceAllocationFailed("injected texture allocation failure".to_string()));
        }
        state.live_textures += 1;
        state.events.push(format!(
            "create_texture {}x{} {:?}",
            desc.width, desc.height, desc.format
        ));
        let info = desc.info();
        let size = (info.width * info.height * info.depth_or_layers * info.format.bytes_per_texel()) as usize;
        Ok(Box::new(MockTexture {
            info,
            contents: Mutex::new(vec![0; size]),
            gpu: Some(self.gpu.clone()),
        }))
    }

    fn upload_footprint(&self, texture: &dyn Texture) -> UploadFootprint {
        let info = texture.info();
        let row_bytes = info.width as u64 * info.format.bytes_per_texel() as u64;
        let row_pitch = (row_bytes + MOCK_ROW_PITCH_ALIGNMENT - 1) / MOCK_ROW_PITCH_ALIGNMENT
            * MOCK_ROW_PITCH_ALIGNMENT;
        UploadFootprint {
            row_pitch,
            rows: info.height,
            slices: info.depth_or_layers,
            total_size: row_pitch * info.height as u64 * info.depth_or_layers as u64,
        }
    }
}

// ============================================================================
// Mock Queue
// ============================================================================

pub struct MockQueue {
    gpu: MockGpu,
}

impl Queue for MockQueue {
    fn submit(&self, list: &dyn CommandList) -> Result<()> {
        let list = list
            .as_any()
            .downcast_ref::<MockCommandList>()
            .ok_or_else(|| Error::SubmissionFailed("command list is not a mock list".to_string()))?;
        if list.open {
            return Err(Error::SubmissionFailed("command list is still open".to_string()));
        }

        let mut state = self.gpu.state();
        state.work_serial += 1;
        state.submissions += 1;
        state.events.push(format!("submit ({} commands)", list.commands.len()));
        Ok(())
    }

    fn signal(&self, fence: &dyn Fence, value: u64) -> Result<()> {
        let fence = fence
            .as_any()
            .downcast_ref::<MockFence>()
            .ok_or_else(|| Error::SubmissionFailed("fence is not a mock fence".to_string()))?;
        {
            let mut values = fence.values.lock().unwrap();
            if value <= values.signaled {
                return Err(Error::SubmissionFailed(format!(
                    "fence value {} does not exceed {}",
                    value, values.signaled
                )));
            }
            values.signaled = value;
        }

        let mut state = self.gpu.state();
        state.signals.push(value);
        state.events.push(format!("signal {}", value));
        Ok(())
    }

    fn work_serial(&self) -> u64 {
        self.gpu.state().work_serial
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Fence
// ============================================================================

pub struct MockFence {
    values: Arc<Mutex<FenceValues>>,
    gpu: MockGpu,
}

impl Fence for MockFence {
    fn completed_value(&self) -> Result<u64> {
        Ok(self.values.lock().unwrap().completed)
    }

    fn wait_until(&self, value: u64) -> Result<()> {
        {
            let mut values = self.values.lock().unwrap();
            if values.completed >= value {
                return Ok(());
            }
            if values.signaled < value {
                // A real GPU would never get there and the wait would hang
                return Err(Error::BackendError(format!(
                    "wait for fence value {} which was never signaled (last {})",
                    value, values.signaled
                )));
            }
            values.completed = values.signaled;
        }
        self.gpu.state().blocking_waits += 1;
        spin_wait(self, value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Buffer
// ============================================================================

pub struct MockBuffer {
    size: u64,
    heap: HeapKind,
    data: Vec<u8>,
    mapped: bool,
    gpu: MockGpu,
}

impl MockBuffer {
    /// Bytes written through the mapped pointer
    pub fn contents(&self) -> &[u8] {
        &self.data
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn heap(&self) -> HeapKind {
        self.heap
    }

    fn map(&mut self) -> Result<NonNull<u8>> {
        if !self.heap.is_cpu_visible() {
            return Err(Error::InvalidBufferState("device-local buffer".to_string()));
        }
        if !self.mapped {
            self.mapped = true;
            self.gpu.state().mapped_buffers += 1;
        }
        NonNull::new(self.data.as_mut_ptr())
            .ok_or_else(|| Error::BackendError("null mapping".to_string()))
    }

    fn unmap(&mut self) {
        if self.mapped {
            self.mapped = false;
            self.gpu.state().mapped_buffers -= 1;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        let mut state = self.gpu.state();
        if self.mapped {
            state.leaked_mappings += 1;
            state.mapped_buffers -= 1;
        }
        state.live_buffers -= 1;
        state.events.push(format!("destroy_buffer {}", self.size));
    }
}

// ============================================================================
// Mock Texture
// ============================================================================

pub struct MockTexture {
    info: TextureInfo,
    /// Tightly packed texels written by `copy_buffer_to_texture`
    pub contents: Mutex<Vec<u8>>,
    /// Set for factory-created textures (counted in `live_textures`)
    gpu: Option<MockGpu>,
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        if let Some(gpu) = &self.gpu {
            let mut state = gpu.state();
            state.live_textures -= 1;
            state.events.push(format!(
                "destroy_texture {}x{} {:?}",
                self.info.width, self.info.height, self.info.format
            ));
        }
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

pub struct MockCommandList {
    open: bool,
    pub commands: Vec<String>,
    gpu: MockGpu,
}

impl MockCommandList {
    fn push(&mut self, command: String) -> Result<()> {
        if !self.open {
            return Err(Error::InvalidCommandListState(format!(
                "'{}' recorded into a closed list",
                command
            )));
        }
        self.gpu.record(format!("cmd {}", command));
        self.commands.push(command);
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn reset(&mut self) -> Result<()> {
        if self.gpu.state().fail_reset {
            return Err(Error::CommandListResetFailed("injected reset failure".to_string()));
        }
        self.open = true;
        self.commands.clear();
        self.gpu.record("reset");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.gpu.state().fail_close {
            self.open = false;
            return Err(Error::CommandListCloseFailed("injected close failure".to_string()));
        }
        if !self.open {
            return Err(Error::CommandListCloseFailed("list is not open".to_string()));
        }
        self.open = false;
        self.gpu.record("close");
        Ok(())
    }

    fn transition(
        &mut self,
        texture: &dyn Texture,
        before: ResourceState,
        after: ResourceState,
    ) -> Result<()> {
        let info = texture.info();
        self.push(format!(
            "transition {}x{} {:?} -> {:?}",
            info.width, info.height, before, after
        ))
    }

    fn clear_render_target(&mut self, target: &dyn Texture, color: [f32; 4]) -> Result<()> {
        if !target.info().usage.contains(TextureUsage::RENDER_TARGET) {
            return Err(Error::InvalidCommandListState("clear of a non render target".to_string()));
        }
        self.push(format!("clear_render_target {:?}", color))
    }

    fn clear_depth_stencil(&mut self, target: &dyn Texture, depth: f32, stencil: u8) -> Result<()> {
        if !target.info().format.is_depth() {
            return Err(Error::InvalidCommandListState("depth clear of a color texture".to_string()));
        }
        self.push(format!("clear_depth_stencil {} {}", depth, stencil))
    }

    fn copy_buffer_to_texture(
        &mut self,
        src: &dyn Buffer,
        dst: &dyn Texture,
        footprint: &UploadFootprint,
    ) -> Result<()> {
        let src = src
            .as_any()
            .downcast_ref::<MockBuffer>()
            .ok_or_else(|| Error::BackendError("source is not a mock buffer".to_string()))?;
        let dst = dst
            .as_any()
            .downcast_ref::<MockTexture>()
            .ok_or_else(|| Error::BackendError("destination is not a mock texture".to_string()))?;

        let row_bytes = (dst.info.width * dst.info.format.bytes_per_texel()) as usize;
        {
            let mut contents = dst.contents.lock().unwrap();
            for row in 0..(footprint.rows * footprint.slices) as usize {
                let from = row * footprint.row_pitch as usize;
                contents[row * row_bytes..(row + 1) * row_bytes]
                    .copy_from_slice(&src.data[from..from + row_bytes]);
            }
        }
        self.push(format!("copy_buffer_to_texture {}x{}", dst.info.width, dst.info.height))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockCommandList {
    fn drop(&mut self) {
        self.gpu.record("destroy_command_list");
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

pub struct MockSwapchain {
    width: u32,
    height: u32,
    image_count: u32,
    format: TextureFormat,
    images: Vec<MockTexture>,
    current: Option<u32>,
    next_index: u32,
    gpu: MockGpu,
}

impl Swapchain for MockSwapchain {
    fn image_count(&self) -> u32 {
        self.image_count
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn current_image_index(&mut self) -> Result<u32> {
        if self.images.is_empty() {
            return Err(Error::BackendError("swapchain images are released".to_string()));
        }
        if self.current.is_none() {
            let mut state = self.gpu.state();
            if state.out_of_date_acquires > 0 {
                state.out_of_date_acquires -= 1;
                state.events.push("acquire out of date".to_string());
                return Err(Error::SurfaceOutOfDate("mock window extent changed".to_string()));
            }
        }
        Ok(*self.current.get_or_insert(self.next_index))
    }

    fn image(&self, index: u32) -> Option<&dyn Texture> {
        self.images.get(index as usize).map(|t| t as &dyn Texture)
    }

    fn release_images(&mut self) {
        if !self.images.is_empty() {
            self.images.clear();
            self.gpu.record("release_images");
        }
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.images.is_empty() {
            return Err(Error::SurfaceResizeFailed("images are still referenced".to_string()));
        }
        let (width, height) = {
            let state = self.gpu.state();
            if state.fail_resize {
                return Err(Error::SurfaceResizeFailed("injected resize failure".to_string()));
            }
            state.window_extent.unwrap_or((width, height))
        };
        self.width = width;
        self.height = height;
        self.current = None;
        self.next_index = 0;
        self.gpu.record(format!("resize_buffers {}x{}", width, height));
        Ok(())
    }

    fn acquire_images(&mut self) -> Result<()> {
        self.images = (0..self.image_count)
            .map(|_| MockTexture {
                info: TextureInfo {
                    dimension: TextureDimension::Tex2D,
                    format: self.format,
                    usage: TextureUsage::RENDER_TARGET,
                    initial_state: ResourceState::Present,
                    width: self.width,
                    height: self.height,
                    depth_or_layers: 1,
                    mip_levels: 1,
                    sample_count: 1,
                },
                contents: Mutex::new(Vec::new()),
                gpu: None,
            })
            .collect();
        self.gpu.record(format!("acquire_images {}", self.image_count));
        Ok(())
    }

    fn present(&mut self, queue: &dyn Queue, interval: u32, allow_tearing: bool) -> Result<()> {
        if queue.as_any().downcast_ref::<MockQueue>().is_none() {
            return Err(Error::SubmissionFailed("queue is not a mock queue".to_string()));
        }
        let index = self
            .current
            .take()
            .ok_or_else(|| Error::SubmissionFailed("present without an acquired image".to_string()))?;

        let mut state = self.gpu.state();
        if state.fail_present {
            return Err(Error::SubmissionFailed("injected present failure".to_string()));
        }
        state.work_serial += 1;
        state.presents.push((interval, allow_tearing));
        state.events.push(format!("present {} interval={} tearing={}", index, interval, allow_tearing));
        drop(state);

        self.next_index = (index + 1) % self.image_count;
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
