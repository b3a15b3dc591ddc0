//! Mesh and material definitions for the showcase model.
//!
//! A [`Model`] is a flat list of meshes plus the materials they reference.
//! Each [`Material`] binds five maps (base colour, normal, roughness,
//! metalness, emissive) together with its scalar factors. Materials start
//! with whatever the glTF ships plus neutral fallbacks; once the showcase
//! maps finish loading the material is rebuilt, which is the GPU-side
//! refresh.

use wgpu::util::DeviceExt;

use crate::data_structures::texture::Texture;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// One drawable primitive batch with a material reference.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
}

/// Scalar material factors, mirrored into a uniform buffer.
///
/// `roughness` and `metalness` multiply their map samples; `emissive`
/// tints the emissive map.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub roughness: f32,
    pub metalness: f32,
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use padding fields here
    _padding: [f32; 2],
    pub emissive: [f32; 3],
    _padding2: f32,
}

impl MaterialUniform {
    pub fn new(roughness: f32, metalness: f32, emissive: [f32; 3]) -> Self {
        Self {
            roughness,
            metalness,
            _padding: [0.0; 2],
            emissive,
            _padding2: 0.0,
        }
    }

    /// Factors used once the showcase maps are applied: both scalars at 1.0
    /// and a full-white emissive tint.
    pub fn showcase() -> Self {
        Self::new(1.0, 1.0, [1.0, 1.0, 1.0])
    }
}

/// The complete texture set of one material.
///
/// Every slot always holds a texture; slots without a decoded image carry a
/// 1x1 neutral fallback so the pipeline layout never changes.
#[derive(Clone, Debug)]
pub struct MaterialMaps {
    pub base_color: Texture,
    pub normal: Texture,
    pub roughness: Texture,
    pub metalness: Texture,
    pub emissive: Texture,
}

impl MaterialMaps {
    /// All-fallback set: white base/roughness/metalness, flat normal, black emissive.
    pub fn neutral(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            base_color: Texture::create_solid(device, queue, [255; 4], true, "fallback base color"),
            normal: Texture::create_default_normal_map(device, queue),
            roughness: Texture::create_solid(device, queue, [255; 4], false, "fallback roughness"),
            metalness: Texture::create_solid(device, queue, [255; 4], false, "fallback metalness"),
            emissive: Texture::create_solid(device, queue, [0, 0, 0, 255], true, "fallback emissive"),
        }
    }
}

pub struct Material {
    pub name: String,
    pub maps: MaterialMaps,
    pub uniform: MaterialUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("uniform", &self.uniform)
            .finish()
    }
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        maps: MaterialMaps,
        uniform: MaterialUniform,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} material factors")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = mk_bind_group(device, name, &maps, &buffer, layout);

        Self {
            name: name.to_string(),
            maps,
            uniform,
            buffer,
            bind_group,
        }
    }

    /// Swap in newly decoded maps and factors.
    ///
    /// Bind groups are immutable, so the refresh recreates the group from
    /// the new views; the next frame picks it up without pipeline changes.
    pub fn apply_maps(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        maps: MaterialMaps,
        uniform: MaterialUniform,
        layout: &wgpu::BindGroupLayout,
    ) {
        self.maps = maps;
        self.uniform = uniform;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
        self.bind_group = mk_bind_group(device, &self.name, &self.maps, &self.buffer, layout);
    }
}

fn mk_bind_group(
    device: &wgpu::Device,
    name: &str,
    maps: &MaterialMaps,
    buffer: &wgpu::Buffer,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::BindGroup {
    let sampler_of = |texture: &Texture| {
        texture
            .sampler
            .clone()
            .unwrap_or_else(|| crate::data_structures::texture::create_default_sampler(device))
    };
    let base_sampler = sampler_of(&maps.base_color);
    let normal_sampler = sampler_of(&maps.normal);
    let roughness_sampler = sampler_of(&maps.roughness);
    let metalness_sampler = sampler_of(&maps.metalness);
    let emissive_sampler = sampler_of(&maps.emissive);

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&maps.base_color.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&base_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&maps.normal.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(&normal_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::TextureView(&maps.roughness.view),
            },
            wgpu::BindGroupEntry {
                binding: 5,
                resource: wgpu::BindingResource::Sampler(&roughness_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 6,
                resource: wgpu::BindingResource::TextureView(&maps.metalness.view),
            },
            wgpu::BindGroupEntry {
                binding: 7,
                resource: wgpu::BindingResource::Sampler(&metalness_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 8,
                resource: wgpu::BindingResource::TextureView(&maps.emissive.view),
            },
            wgpu::BindGroupEntry {
                binding: 9,
                resource: wgpu::BindingResource::Sampler(&emissive_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 10,
                resource: buffer.as_entire_binding(),
            },
        ],
        label: Some(&format!("{name} material bind group")),
    })
}

#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

/// Render-pass extension for drawing a [`Model`] mesh by mesh.
pub trait DrawModel<'a> {
    fn draw_mesh(
        &mut self,
        mesh: &'a Mesh,
        material: &'a Material,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
        environment_bind_group: &'a wgpu::BindGroup,
    );

    fn draw_model(
        &mut self,
        model: &'a Model,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
        environment_bind_group: &'a wgpu::BindGroup,
    );
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(
        &mut self,
        mesh: &'b Mesh,
        material: &'b Material,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
        environment_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.set_bind_group(3, environment_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, 0..1);
    }

    fn draw_model(
        &mut self,
        model: &'b Model,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
        environment_bind_group: &'b wgpu::BindGroup,
    ) {
        for mesh in &model.meshes {
            let material = &model.materials[mesh.material.min(model.materials.len() - 1)];
            self.draw_mesh(
                mesh,
                material,
                camera_bind_group,
                light_bind_group,
                environment_bind_group,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn showcase_factors_are_unity_with_white_emissive() {
        let uniform = MaterialUniform::showcase();
        assert_eq!(uniform.roughness, 1.0);
        assert_eq!(uniform.metalness, 1.0);
        assert_eq!(uniform.emissive, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn material_uniform_is_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<MaterialUniform>() % 16, 0);
    }
}
