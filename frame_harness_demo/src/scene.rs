/// Demo scene - CPU-side data uploaded to the GPU through the harness
///
/// A textured cube: interleaved vertices, 16-bit indices, a checkerboard
/// texture and the per-frame constants.

use bytemuck::{Pod, Zeroable};
use frame_harness::harness::device::{BufferDesc, HeapKind, ResourceState, TextureDesc, TextureFormat};
use frame_harness::harness::{
    align_constant_buffer_size, GpuBuffer, GpuTexture, GraphicsContext, ImageData, Result,
};
use frame_harness::harness_info;
use glam::{Mat3, Mat4, Vec2, Vec3};

pub const CHECKERBOARD_SIZE: u32 = 256;
pub const CHECKERBOARD_CELL: u32 = 32;

/// Interleaved vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub tex_coord: Vec2,
}

/// Scene constant buffer contents
///
/// Vec3 members are padded to 16 bytes so the matrices start on a 16-byte
/// boundary, matching HLSL/GLSL constant buffer packing.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneData {
    pub sun_direction: Vec3,
    _pad0: f32,
    pub camera_position: Vec3,
    _pad1: f32,
    pub view_projection: Mat4,
    pub model: Mat4,
    /// Inverse transpose of the model's upper 3x3
    pub normal: Mat4,
}

/// Perspective camera looking at a point
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub aspect_ratio: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            forward: (target - position).normalize(),
            up: Vec3::Y,
            fov_y: 60.0,
            aspect_ratio: 1.0,
            z_near: 0.1,
            z_far: 100.0,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        let projection = Mat4::perspective_rh(
            self.fov_y.to_radians(),
            self.aspect_ratio,
            self.z_near,
            self.z_far,
        );
        let view = Mat4::look_at_rh(self.position, self.position + self.forward, self.up);
        projection * view
    }
}

/// Sun direction from azimuth/zenith angles in degrees
pub fn sun_direction(azimuth: f32, zenith: f32) -> Vec3 {
    let (azimuth, zenith) = (azimuth.to_radians(), zenith.to_radians());
    Vec3::new(
        azimuth.cos() * zenith.sin(),
        zenith.cos(),
        azimuth.sin() * zenith.sin(),
    )
    .normalize()
}

impl SceneData {
    /// Constants for a cube rotated `angle_degrees` around Y
    pub fn new(camera: &Camera, sun: Vec3, angle_degrees: f32) -> Self {
        let model = Mat4::from_rotation_y(angle_degrees.to_radians());
        let normal = Mat4::from_mat3(Mat3::from_mat4(model).inverse().transpose());
        Self {
            sun_direction: sun,
            _pad0: 0.0,
            camera_position: camera.position,
            _pad1: 0.0,
            view_projection: camera.view_projection(),
            model,
            normal,
        }
    }
}

/// RGBA8 checkerboard alternating white and dark grey cells
pub fn checkerboard(size: u32, cell: u32) -> ImageData {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let light = ((x / cell) + (y / cell)) % 2 == 0;
            let value = if light { 255 } else { 48 };
            pixels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    ImageData::rgba8(size, size, pixels)
}

/// Unit cube with one quad per face (24 vertices, 36 indices)
pub fn cube() -> (Vec<Vertex>, Vec<u16>) {
    // (normal, tangent) per face
    let faces = [
        (Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_X, Vec3::Z),
        (Vec3::Y, Vec3::X),
        (Vec3::NEG_Y, Vec3::X),
        (Vec3::Z, Vec3::X),
        (Vec3::NEG_Z, Vec3::NEG_X),
    ];
    let corners = [
        Vec2::new(-1.0, -1.0),
        Vec2::new(1.0, -1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(-1.0, 1.0),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, tangent) in faces {
        let bitangent = normal.cross(tangent);
        let base = vertices.len() as u16;
        for corner in corners {
            vertices.push(Vertex {
                position: (normal + tangent * corner.x + bitangent * corner.y) * 0.5,
                color: normal.abs(),
                normal,
                tangent,
                tex_coord: (corner + Vec2::ONE) * 0.5,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

/// GPU resources of the demo scene
pub struct DemoScene {
    camera: Camera,
    sun: Vec3,
    /// Persistently mapped scene constants
    constants: GpuBuffer,
    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
    index_count: u32,
    texture: GpuTexture,
}

impl DemoScene {
    pub fn create(context: &mut GraphicsContext) -> Result<Self> {
        let (vertices, indices) = cube();

        let (constants, vertex_buffer, index_buffer, mut texture) = {
            let factory = context.factory();
            let constants = factory.create_buffer(&BufferDesc {
                size: align_constant_buffer_size(std::mem::size_of::<SceneData>() as u64)?,
                initial_state: ResourceState::GenericRead,
                heap: HeapKind::Upload,
                map_immediately: true,
            })?;
            let vertex_buffer = factory.create_initialized_buffer(
                bytemuck::cast_slice(&vertices),
                ResourceState::VertexAndConstantBuffer,
            )?;
            let index_buffer = factory
                .create_initialized_buffer(bytemuck::cast_slice(&indices), ResourceState::IndexBuffer)?;
            let texture = factory.create_texture(&TextureDesc::texture_2d(
                TextureFormat::R8G8B8A8_UNORM,
                CHECKERBOARD_SIZE,
                CHECKERBOARD_SIZE,
            ))?;
            (constants, vertex_buffer, index_buffer, texture)
        };

        let image = checkerboard(CHECKERBOARD_SIZE, CHECKERBOARD_CELL);
        context.upload_texture(&mut texture, &image)?;

        harness_info!(
            "demo",
            "scene ready: {} vertices, {} indices, {}x{} texture",
            vertices.len(), indices.len(), CHECKERBOARD_SIZE, CHECKERBOARD_SIZE
        );

        Ok(Self {
            camera: Camera::looking_at(Vec3::new(2.0, 2.0, -5.0), Vec3::ZERO),
            sun: sun_direction(45.0, 45.0),
            constants,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            texture,
        })
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Bytes of GPU memory held by the scene
    pub fn resident_bytes(&self) -> u64 {
        let texture = self.texture.info();
        let texel_bytes = texture.format.bytes_per_texel() as u64;
        self.constants.size()
            + self.vertex_buffer.size()
            + self.index_buffer.size()
            + texture.width as u64 * texture.height as u64 * texel_bytes
    }

    /// Write this frame's constants (the GPU is idle when this runs)
    pub fn update(&mut self, time_ms: f64, aspect_ratio: f32) -> Result<()> {
        self.camera.aspect_ratio = aspect_ratio;
        let angle = (time_ms / 100.0) as f32;
        let data = SceneData::new(&self.camera, self.sun, angle);
        self.constants.write(0, bytemuck::bytes_of(&data))
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
