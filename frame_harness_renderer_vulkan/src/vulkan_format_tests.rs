//! Unit tests for the Vulkan conversion functions
//!
//! Pure mappings only, no GPU required.

use super::*;
use ash::vk;
use frame_harness::harness::device::{
    AdapterKind, FeatureLevel, GpuPreference, ResourceState, TextureDimension, TextureFormat,
    TextureUsage,
};

// ============================================================================
// TEXTURE FORMAT CONVERSION TESTS
// ============================================================================

#[test]
fn test_format_to_vk_color_formats() {
    assert_eq!(format_to_vk(TextureFormat::R8G8B8A8_SRGB), vk::Format::R8G8B8A8_SRGB);
    assert_eq!(format_to_vk(TextureFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(format_to_vk(TextureFormat::B8G8R8A8_SRGB), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(format_to_vk(TextureFormat::B8G8R8A8_UNORM), vk::Format::B8G8R8A8_UNORM);
}

#[test]
fn test_format_to_vk_depth_formats() {
    assert_eq!(format_to_vk(TextureFormat::D16_UNORM), vk::Format::D16_UNORM);
    assert_eq!(format_to_vk(TextureFormat::D32_FLOAT), vk::Format::D32_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::D24_UNORM_S8_UINT), vk::Format::D24_UNORM_S8_UINT);
}

#[test]
fn test_vk_format_back_conversion() {
    for format in [
        TextureFormat::R8G8B8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM,
        TextureFormat::D32_FLOAT,
        TextureFormat::D24_UNORM_S8_UINT,
    ] {
        assert_eq!(vk_format_to_format(format_to_vk(format)), Some(format));
    }
    assert_eq!(vk_format_to_format(vk::Format::A2B10G10R10_UNORM_PACK32), None);
}

#[test]
fn test_depth_fallback_keeps_stencil() {
    assert_eq!(
        depth_fallback(vk::Format::D24_UNORM_S8_UINT),
        Some(vk::Format::D32_SFLOAT_S8_UINT)
    );
    assert_eq!(depth_fallback(vk::Format::D32_SFLOAT), None);
}

#[test]
fn test_aspect_mask() {
    assert_eq!(aspect_mask(TextureFormat::B8G8R8A8_UNORM), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_mask(TextureFormat::D32_FLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_mask(TextureFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

#[test]
fn test_view_type_for_arrays_and_volumes() {
    assert_eq!(view_type(TextureDimension::Tex2D, 1), vk::ImageViewType::TYPE_2D);
    assert_eq!(view_type(TextureDimension::Tex2D, 6), vk::ImageViewType::TYPE_2D_ARRAY);
    assert_eq!(view_type(TextureDimension::Tex1D, 4), vk::ImageViewType::TYPE_1D_ARRAY);
    assert_eq!(view_type(TextureDimension::Tex3D, 1), vk::ImageViewType::TYPE_3D);
}

#[test]
fn test_texture_usage_flags() {
    let flags = texture_usage_to_vk(TextureUsage::SAMPLED | TextureUsage::COPY_DST);
    assert_eq!(flags, vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST);

    let depth = texture_usage_to_vk(TextureUsage::DEPTH_STENCIL);
    assert_eq!(depth, vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT);
}

#[test]
fn test_sample_count_defaults_to_one() {
    assert_eq!(sample_count_to_vk(4), vk::SampleCountFlags::TYPE_4);
    assert_eq!(sample_count_to_vk(3), vk::SampleCountFlags::TYPE_1);
}

// ============================================================================
// RESOURCE STATE TESTS
// ============================================================================

#[test]
fn test_state_layouts() {
    assert_eq!(state_to_vk(ResourceState::Present).layout, vk::ImageLayout::PRESENT_SRC_KHR);
    assert_eq!(
        state_to_vk(ResourceState::RenderTarget).layout,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    );
    assert_eq!(
        state_to_vk(ResourceState::DepthWrite).layout,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    );
    assert_eq!(state_to_vk(ResourceState::CopyDest).layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
    assert_eq!(
        state_to_vk(ResourceState::PixelShaderResource).layout,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    );
}

#[test]
fn test_present_state_has_no_access() {
    let present = state_to_vk(ResourceState::Present);
    assert!(present.access.is_empty());
    assert_eq!(present.stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
}

#[test]
fn test_copy_dest_is_transfer_write() {
    let copy = state_to_vk(ResourceState::CopyDest);
    assert_eq!(copy.access, vk::AccessFlags::TRANSFER_WRITE);
    assert_eq!(copy.stage, vk::PipelineStageFlags::TRANSFER);
}

// ============================================================================
// PRESENTATION TESTS
// ============================================================================

#[test]
fn test_present_mode_vsync_is_fifo() {
    let all = [
        vk::PresentModeKHR::IMMEDIATE,
        vk::PresentModeKHR::MAILBOX,
        vk::PresentModeKHR::FIFO,
    ];
    assert_eq!(choose_present_mode(&all, 1, true), vk::PresentModeKHR::FIFO);
    assert_eq!(choose_present_mode(&all, 2, false), vk::PresentModeKHR::FIFO);
}

#[test]
fn test_present_mode_interval_zero() {
    let all = [
        vk::PresentModeKHR::IMMEDIATE,
        vk::PresentModeKHR::MAILBOX,
        vk::PresentModeKHR::FIFO,
    ];
    assert_eq!(choose_present_mode(&all, 0, true), vk::PresentModeKHR::IMMEDIATE);
    assert_eq!(choose_present_mode(&all, 0, false), vk::PresentModeKHR::MAILBOX);
}

#[test]
fn test_present_mode_fallbacks() {
    let mailbox_only = [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO];
    assert_eq!(choose_present_mode(&mailbox_only, 0, true), vk::PresentModeKHR::MAILBOX);

    let fifo_only = [vk::PresentModeKHR::FIFO];
    assert_eq!(choose_present_mode(&fifo_only, 0, true), vk::PresentModeKHR::FIFO);
}

#[test]
fn test_surface_format_choice() {
    let srgb = vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_SRGB,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    let unorm = vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    let odd = vk::SurfaceFormatKHR {
        format: vk::Format::A2B10G10R10_UNORM_PACK32,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };

    assert_eq!(
        choose_surface_format(&[srgb, unorm], vk::Format::B8G8R8A8_UNORM).map(|f| f.format),
        Some(vk::Format::B8G8R8A8_UNORM)
    );
    assert_eq!(
        choose_surface_format(&[odd, srgb], vk::Format::R8G8B8A8_UNORM).map(|f| f.format),
        Some(vk::Format::B8G8R8A8_SRGB)
    );
    assert_eq!(
        choose_surface_format(&[odd], vk::Format::R8G8B8A8_UNORM).map(|f| f.format),
        Some(vk::Format::A2B10G10R10_UNORM_PACK32)
    );
    assert!(choose_surface_format(&[], vk::Format::R8G8B8A8_UNORM).is_none());
}

#[test]
fn test_clamp_image_count() {
    assert_eq!(clamp_image_count(3, 2, 8), 3);
    assert_eq!(clamp_image_count(1, 2, 8), 2);
    assert_eq!(clamp_image_count(5, 2, 4), 4);
    // max_image_count 0 means no upper limit
    assert_eq!(clamp_image_count(5, 2, 0), 5);
}

// ============================================================================
// ADAPTER TESTS
// ============================================================================

#[test]
fn test_adapter_kind_cpu_is_software() {
    assert_eq!(adapter_kind(vk::PhysicalDeviceType::CPU), AdapterKind::Software);
    assert_eq!(adapter_kind(vk::PhysicalDeviceType::DISCRETE_GPU), AdapterKind::Discrete);
    assert_eq!(adapter_kind(vk::PhysicalDeviceType::OTHER), AdapterKind::Other);
}

#[test]
fn test_high_performance_order_is_stable() {
    let mut adapters = vec![
        ("llvmpipe", AdapterKind::Software),
        ("igpu", AdapterKind::Integrated),
        ("dgpu-a", AdapterKind::Discrete),
        ("dgpu-b", AdapterKind::Discrete),
    ];
    order_by_preference(&mut adapters, GpuPreference::HighPerformance, |a| a.1);
    let names: Vec<&str> = adapters.iter().map(|a| a.0).collect();
    assert_eq!(names, vec!["dgpu-a", "dgpu-b", "igpu", "llvmpipe"]);
}

#[test]
fn test_unspecified_keeps_driver_order() {
    let mut adapters = vec![("llvmpipe", AdapterKind::Software), ("dgpu", AdapterKind::Discrete)];
    order_by_preference(&mut adapters, GpuPreference::Unspecified, |a| a.1);
    assert_eq!(adapters[0].0, "llvmpipe");
}

#[test]
fn test_api_version_to_feature_level() {
    let level = api_version_to_feature_level(vk::make_api_version(0, 1, 3, 250));
    assert_eq!(level, FeatureLevel::new(1, 3));
    assert!(level >= FeatureLevel::new(1, 3));
    assert!(api_version_to_feature_level(vk::API_VERSION_1_2) < FeatureLevel::new(1, 3));
}
