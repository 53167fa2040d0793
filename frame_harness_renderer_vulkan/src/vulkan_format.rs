/// Pure conversions between harness types and Vulkan enums
///
/// Nothing in here touches a device, so all of it is unit tested without a GPU.

use frame_harness::harness::device::{
    AdapterKind, FeatureLevel, GpuPreference, ResourceState, TextureDimension, TextureFormat,
    TextureUsage,
};
use ash::vk;

/// Convert TextureFormat to Vulkan format
pub(crate) fn format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::D16_UNORM => vk::Format::D16_UNORM,
        TextureFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
    }
}

/// Convert Vulkan format back to TextureFormat (None for formats the harness never creates)
pub(crate) fn vk_format_to_format(format: vk::Format) -> Option<TextureFormat> {
    match format {
        vk::Format::R8G8B8A8_SRGB => Some(TextureFormat::R8G8B8A8_SRGB),
        vk::Format::R8G8B8A8_UNORM => Some(TextureFormat::R8G8B8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(TextureFormat::B8G8R8A8_SRGB),
        vk::Format::B8G8R8A8_UNORM => Some(TextureFormat::B8G8R8A8_UNORM),
        vk::Format::D16_UNORM => Some(TextureFormat::D16_UNORM),
        vk::Format::D32_SFLOAT => Some(TextureFormat::D32_FLOAT),
        vk::Format::D24_UNORM_S8_UINT => Some(TextureFormat::D24_UNORM_S8_UINT),
        _ => None,
    }
}

/// Depth format used when the requested one has no optimal-tiling attachment support
///
/// D24S8 is missing on some vendors; D32S8 keeps the stencil plane.
pub(crate) fn depth_fallback(format: vk::Format) -> Option<vk::Format> {
    match format {
        vk::Format::D24_UNORM_S8_UINT => Some(vk::Format::D32_SFLOAT_S8_UINT),
        vk::Format::D16_UNORM => Some(vk::Format::D32_SFLOAT),
        _ => None,
    }
}

/// Image aspect of a texture format
pub(crate) fn aspect_mask(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.has_stencil() {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

pub(crate) fn image_type(dimension: TextureDimension) -> vk::ImageType {
    match dimension {
        TextureDimension::Tex1D => vk::ImageType::TYPE_1D,
        TextureDimension::Tex2D => vk::ImageType::TYPE_2D,
        TextureDimension::Tex3D => vk::ImageType::TYPE_3D,
    }
}

pub(crate) fn view_type(dimension: TextureDimension, array_layers: u32) -> vk::ImageViewType {
    match (dimension, array_layers > 1) {
        (TextureDimension::Tex1D, false) => vk::ImageViewType::TYPE_1D,
        (TextureDimension::Tex1D, true) => vk::ImageViewType::TYPE_1D_ARRAY,
        (TextureDimension::Tex2D, false) => vk::ImageViewType::TYPE_2D,
        (TextureDimension::Tex2D, true) => vk::ImageViewType::TYPE_2D_ARRAY,
        (TextureDimension::Tex3D, _) => vk::ImageViewType::TYPE_3D,
    }
}

pub(crate) fn sample_count_to_vk(count: u32) -> vk::SampleCountFlags {
    match count {
        2 => vk::SampleCountFlags::TYPE_2,
        4 => vk::SampleCountFlags::TYPE_4,
        8 => vk::SampleCountFlags::TYPE_8,
        16 => vk::SampleCountFlags::TYPE_16,
        _ => vk::SampleCountFlags::TYPE_1,
    }
}

pub(crate) fn texture_usage_to_vk(usage: TextureUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(TextureUsage::SAMPLED) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(TextureUsage::RENDER_TARGET) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(TextureUsage::DEPTH_STENCIL) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(TextureUsage::COPY_DST) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    if usage.contains(TextureUsage::COPY_SRC) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    flags
}

// ===== RESOURCE STATES =====

/// Layout, access and pipeline stage that realize a resource state on an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StateMapping {
    pub layout: vk::ImageLayout,
    pub access: vk::AccessFlags,
    pub stage: vk::PipelineStageFlags,
}

pub(crate) fn state_to_vk(state: ResourceState) -> StateMapping {
    let (layout, access, stage) = match state {
        ResourceState::Common => (
            vk::ImageLayout::GENERAL,
            vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
        ),
        ResourceState::GenericRead
        | ResourceState::VertexAndConstantBuffer
        | ResourceState::IndexBuffer => (
            vk::ImageLayout::GENERAL,
            vk::AccessFlags::MEMORY_READ,
            vk::PipelineStageFlags::ALL_COMMANDS,
        ),
        ResourceState::CopySource => (
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
        ),
        ResourceState::CopyDest => (
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        ResourceState::PixelShaderResource => (
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        ResourceState::RenderTarget => (
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        ResourceState::DepthWrite => (
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        ),
        ResourceState::DepthRead => (
            vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        // Present pairs with the acquire semaphore wait stage
        ResourceState::Present => (
            vk::ImageLayout::PRESENT_SRC_KHR,
            vk::AccessFlags::empty(),
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
    };
    StateMapping { layout, access, stage }
}

// ===== PRESENT MODE =====

/// Pick the present mode for an interval/tearing request among the surface's modes
///
/// Interval 0 with tearing wants IMMEDIATE, interval 0 without tearing wants
/// MAILBOX. Anything unavailable falls back to FIFO, which every surface has.
pub(crate) fn choose_present_mode(
    available: &[vk::PresentModeKHR],
    interval: u32,
    allow_tearing: bool,
) -> vk::PresentModeKHR {
    if interval == 0 {
        let wanted: &[vk::PresentModeKHR] = if allow_tearing {
            &[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX]
        } else {
            &[vk::PresentModeKHR::MAILBOX]
        };
        for mode in wanted {
            if available.contains(mode) {
                return *mode;
            }
        }
    }
    vk::PresentModeKHR::FIFO
}

/// Pick the surface format matching `wanted`, else any of the same family, else the first one
pub(crate) fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
    wanted: vk::Format,
) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|f| f.format == wanted)
        .or_else(|| available.iter().find(|f| vk_format_to_format(f.format).is_some()))
        .or_else(|| available.first())
        .copied()
}

/// Clamp the requested image count to the surface limits (max 0 = unbounded)
pub(crate) fn clamp_image_count(requested: u32, min: u32, max: u32) -> u32 {
    let count = requested.max(min);
    if max > 0 {
        count.min(max)
    } else {
        count
    }
}

// ===== ADAPTERS =====

pub(crate) fn adapter_kind(device_type: vk::PhysicalDeviceType) -> AdapterKind {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => AdapterKind::Discrete,
        vk::PhysicalDeviceType::INTEGRATED_GPU => AdapterKind::Integrated,
        vk::PhysicalDeviceType::VIRTUAL_GPU => AdapterKind::Virtual,
        vk::PhysicalDeviceType::CPU => AdapterKind::Software,
        _ => AdapterKind::Other,
    }
}

/// Rank used by the high-performance ordering (lower first)
fn performance_rank(kind: AdapterKind) -> u8 {
    match kind {
        AdapterKind::Discrete => 0,
        AdapterKind::Integrated => 1,
        AdapterKind::Virtual => 2,
        AdapterKind::Other => 3,
        AdapterKind::Software => 4,
    }
}

/// Order adapters for a preference; the sort is stable so driver order breaks ties
pub(crate) fn order_by_preference<T>(items: &mut [T], preference: GpuPreference, kind: impl Fn(&T) -> AdapterKind) {
    if preference == GpuPreference::HighPerformance {
        items.sort_by_key(|item| performance_rank(kind(item)));
    }
}

pub(crate) fn api_version_to_feature_level(api_version: u32) -> FeatureLevel {
    FeatureLevel::new(vk::api_version_major(api_version), vk::api_version_minor(api_version))
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
