use crate::Core;
use bytemuck::{Pod, Zeroable};

/// Something a program buffer can draw: the full-screen quad or user
/// geometry, matching the reference's toy-buffer / geometry-buffer split.
pub trait Geometry {
    fn vertex_buffer_layout(&self) -> wgpu::VertexBufferLayout<'static>;
    fn draw<'pass>(&'pass self, pass: &mut wgpu::RenderPass<'pass>);
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct QuadVertex {
    position: [f32; 3],
    tex_coord: [f32; 2],
}

const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, -1.0, 0.0], tex_coord: [0.0, 1.0] },
    QuadVertex { position: [1.0, -1.0, 0.0], tex_coord: [1.0, 1.0] },
    QuadVertex { position: [1.0, 1.0, 0.0], tex_coord: [1.0, 0.0] },
    QuadVertex { position: [-1.0, 1.0, 0.0], tex_coord: [0.0, 0.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// A fixed two-triangle full-screen quad, shared across every `ToyBuffer`
/// via the render context (spec §4.7 `screen_quad()`).
pub struct ScreenQuad {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

impl ScreenQuad {
    pub fn new(core: &Core) -> Self {
        use wgpu::util::DeviceExt;
        let vertex_buffer = core.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("screen-quad/vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = core.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("screen-quad/indices"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self { vertex_buffer, index_buffer }
    }
}

impl Geometry for ScreenQuad {
    fn vertex_buffer_layout(&self) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x3, offset: 0, shader_location: 0 },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                },
            ],
        }
    }

    fn draw<'pass>(&'pass self, pass: &mut wgpu::RenderPass<'pass>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
    }
}
