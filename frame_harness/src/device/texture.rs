/// Texture trait, texture descriptor, and texture info

use std::any::Any;

use bitflags::bitflags;

use crate::device::{HeapKind, ResourceState};

/// Texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    D16_UNORM,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
}

impl TextureFormat {
    /// Size of one texel in bytes
    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            TextureFormat::D16_UNORM => 2,
            _ => 4,
        }
    }

    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM | TextureFormat::D32_FLOAT | TextureFormat::D24_UNORM_S8_UINT
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::D24_UNORM_S8_UINT)
    }

    /// sRGB view of a UNORM color format (identity for everything else)
    pub fn srgb_view(&self) -> TextureFormat {
        match self {
            TextureFormat::R8G8B8A8_UNORM => TextureFormat::R8G8B8A8_SRGB,
            TextureFormat::B8G8R8A8_UNORM => TextureFormat::B8G8R8A8_SRGB,
            other => *other,
        }
    }
}

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    Tex1D,
    Tex2D,
    Tex3D,
}

bitflags! {
    /// How a texture may be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLED = 1 << 0;
        const RENDER_TARGET = 1 << 1;
        const DEPTH_STENCIL = 1 << 2;
        const COPY_DST = 1 << 3;
        const COPY_SRC = 1 << 4;
    }
}

/// Optimized clear value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u8 },
}

/// Memory layout of the texture's texels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureLayout {
    /// Driver-chosen (tiled) layout
    Unknown,
    /// Linear rows
    RowMajor,
}

// ===== TEXTURE DESC =====

/// Descriptor for creating a texture
///
/// `depth` and `array_layers` are mutually exclusive: a texture is either a
/// 3-D volume or an array, never both.
#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub dimension: TextureDimension,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub initial_state: ResourceState,
    pub heap: HeapKind,
    pub width: u32,
    pub height: u32,
    /// Depth in texels (3-D textures only, otherwise 1)
    pub depth: u32,
    pub mip_levels: u32,
    /// Number of array layers (1 = not an array)
    pub array_layers: u32,
    pub sample_count: u32,
    pub sample_quality: u32,
    pub clear_value: Option<ClearValue>,
    pub layout: TextureLayout,
}

impl TextureDesc {
    /// Single-level 2-D texture sampled by shaders, filled through the upload path
    pub fn texture_2d(format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            dimension: TextureDimension::Tex2D,
            format,
            usage: TextureUsage::SAMPLED | TextureUsage::COPY_DST,
            initial_state: ResourceState::CopyDest,
            heap: HeapKind::DeviceLocal,
            width,
            height,
            depth: 1,
            mip_levels: 1,
            array_layers: 1,
            sample_count: 1,
            sample_quality: 0,
            clear_value: None,
            layout: TextureLayout::Unknown,
        }
    }

    /// Depth/stencil target cleared to depth 1.0 / stencil 0
    pub fn depth_stencil(format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            dimension: TextureDimension::Tex2D,
            format,
            usage: TextureUsage::DEPTH_STENCIL,
            initial_state: ResourceState::DepthWrite,
            heap: HeapKind::DeviceLocal,
            width,
            height,
            depth: 1,
            mip_levels: 1,
            array_layers: 1,
            sample_count: 1,
            sample_quality: 0,
            clear_value: Some(ClearValue::DepthStencil { depth: 1.0, stencil: 0 }),
            layout: TextureLayout::Unknown,
        }
    }

    /// Read-only view of the properties a created texture reports
    pub fn info(&self) -> TextureInfo {
        TextureInfo {
            dimension: self.dimension,
            format: self.format,
            usage: self.usage,
            initial_state: self.initial_state,
            width: self.width,
            height: self.height,
            depth_or_layers: self.depth.max(self.array_layers),
            mip_levels: self.mip_levels,
            sample_count: self.sample_count,
        }
    }
}

// ===== TEXTURE INFO =====

/// Read-only properties of a created texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    pub dimension: TextureDimension,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub initial_state: ResourceState,
    pub width: u32,
    pub height: u32,
    /// Depth for 3-D textures, layer count otherwise
    pub depth_or_layers: u32,
    pub mip_levels: u32,
    pub sample_count: u32,
}

/// Staging layout for uploading the top mip of a texture
///
/// `total_size` is the device's required size for the staging buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadFootprint {
    /// Byte offset between consecutive rows in the staging buffer
    pub row_pitch: u64,
    /// Rows per slice
    pub rows: u32,
    /// Depth slices or array layers
    pub slices: u32,
    /// Required staging buffer size in bytes
    pub total_size: u64,
}

// ===== TEXTURE TRAIT =====

/// Texture resource trait
///
/// Implemented by backend-specific texture types and by presentation chain
/// images. Owned textures are destroyed when dropped.
pub trait Texture: Send + Sync {
    fn info(&self) -> &TextureInfo;

    fn as_any(&self) -> &dyn Any;
}
