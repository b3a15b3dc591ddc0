use std::io::{BufReader, Cursor};

use cgmath::{InnerSpace, Matrix4, One, Rotation, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        bounds::Aabb,
        instance::Instance,
        model::{self, MaterialMaps, MaterialUniform},
        texture::Texture,
    },
    resources::texture::{load_binary, load_texture},
};

/**
 * This module contains all logic for fetching and decoding external assets.
 */
pub mod environment;
pub mod texture;

/// Load a glTF model into a flat mesh list, baking the node hierarchy's
/// transforms into the vertex data. Returns the model together with the
/// axis-aligned bounding box of all baked positions.
///
/// Fetch progress over the document's buffers is reported as a fractional
/// percentage; it has no behavioral effect.
pub async fn load_model_gltf(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<(model::Model, Aabb)> {
    let gltf_text = load_binary(file_name).await?;
    let gltf_cursor = Cursor::new(gltf_text);
    let gltf_reader = BufReader::new(gltf_cursor);
    let gltf = gltf::Gltf::from_reader(gltf_reader)?;

    // Load buffers
    let total = gltf.buffers().len().max(1);
    let mut buffer_data = Vec::new();
    for (loaded, buffer) in gltf.buffers().enumerate() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                if let Some(blob) = gltf.blob.as_deref() {
                    buffer_data.push(blob.into());
                };
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_binary(uri).await?;
                buffer_data.push(bin);
            }
        }
        log::info!(
            "{}: {:.0}% loaded",
            file_name,
            (loaded + 1) as f32 / total as f32 * 100.0
        );
    }

    // Load materials
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let base_color = match pbr.base_color_texture().map(|tex| tex.texture().source().source()) {
            Some(gltf::image::Source::View { view, mime_type }) => Texture::from_bytes(
                device,
                queue,
                &buffer_data[view.buffer().index()],
                file_name,
                mime_type.split('/').last(),
                false,
            )?,
            Some(gltf::image::Source::Uri { uri, mime_type }) => {
                let format = mime_type.and_then(|mt| mt.split('/').last());
                load_texture(uri, false, device, queue, format).await?
            }
            None => Texture::create_solid(device, queue, [255; 4], true, "fallback base color"),
        };
        let normal = match material
            .normal_texture()
            .map(|tex| tex.texture().source().source())
        {
            Some(gltf::image::Source::View { view, mime_type }) => Texture::from_bytes(
                device,
                queue,
                &buffer_data[view.buffer().index()],
                file_name,
                mime_type.split('/').last(),
                true,
            )?,
            Some(gltf::image::Source::Uri { uri, mime_type }) => {
                let format = mime_type.and_then(|mt| mt.split('/').last());
                load_texture(uri, true, device, queue, format).await?
            }
            None => Texture::create_default_normal_map(device, queue),
        };

        let neutral = MaterialMaps::neutral(device, queue);
        let maps = MaterialMaps {
            base_color,
            normal,
            ..neutral
        };
        // The showcase maps replace these later; until then the glTF's own
        // scalar factors apply.
        let uniform = MaterialUniform::new(
            pbr.roughness_factor(),
            pbr.metallic_factor(),
            material.emissive_factor(),
        );
        let name = material.name().unwrap_or("unnamed material");
        materials.push(model::Material::new(device, name, maps, uniform, layout));
    }
    if materials.is_empty() {
        materials.push(model::Material::new(
            device,
            file_name,
            MaterialMaps::neutral(device, queue),
            MaterialUniform::new(1.0, 1.0, [0.0; 3]),
            layout,
        ));
    }

    // Flatten the node hierarchy: every mesh's vertices are baked with the
    // node's world transform, so one instance buffer drives the whole model.
    let mut meshes = Vec::new();
    let mut aabb = Aabb::empty();
    for scene in gltf.scenes() {
        for node in scene.nodes() {
            collect_meshes(
                node,
                Matrix4::from_scale(1.0),
                cgmath::Quaternion::one(),
                &buffer_data,
                device,
                &mut meshes,
                &mut aabb,
            );
        }
    }

    let model = model::Model { meshes, materials };
    Ok((model, aabb))
}

fn collect_meshes(
    node: gltf::scene::Node,
    parent_matrix: Matrix4<f32>,
    parent_rotation: cgmath::Quaternion<f32>,
    buf: &Vec<Vec<u8>>,
    device: &wgpu::Device,
    meshes: &mut Vec<model::Mesh>,
    aabb: &mut Aabb,
) {
    let decomposed = node.transform().decomposed();
    let local = Instance {
        position: decomposed.0.into(),
        rotation: decomposed.1.into(),
        scale: decomposed.2.into(),
    };
    let world_matrix = parent_matrix * local.to_matrix();
    let world_rotation = parent_rotation * local.rotation;

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buf[buffer.index()]));

            let mut vertices = Vec::new();
            if let Some(vertex_attribute) = reader.read_positions() {
                vertex_attribute.for_each(|vertex| {
                    let baked = world_matrix * cgmath::Vector4::new(vertex[0], vertex[1], vertex[2], 1.0);
                    let position = Vector3::new(baked.x, baked.y, baked.z);
                    aabb.extend(position);
                    vertices.push(model::ModelVertex {
                        position: position.into(),
                        tex_coords: Default::default(),
                        normal: Default::default(),
                        tangent: Default::default(),
                        bitangent: Default::default(),
                    })
                });
            }
            if let Some(normal_attribute) = reader.read_normals() {
                for (i, normal) in normal_attribute.enumerate() {
                    let rotated = world_rotation.rotate_vector(normal.into());
                    vertices[i].normal = rotated.normalize().into();
                }
            }
            if let Some(tex_coord_attribute) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
                for (i, tex_coord) in tex_coord_attribute.enumerate() {
                    vertices[i].tex_coords = tex_coord;
                }
            }
            let mut has_tangents = false;
            if let Some(tangent_attribute) = reader.read_tangents() {
                has_tangents = true;
                for (i, tangent) in tangent_attribute.enumerate() {
                    // GLTF represents tangents as vec4 where the 4th elem can be used to calculate the bitangent
                    let tangent: cgmath::Vector4<f32> = tangent.into();
                    let rotated = world_rotation.rotate_vector(tangent.truncate());
                    vertices[i].tangent = rotated.into();
                    let normal: Vector3<f32> = vertices[i].normal.into();
                    let bitangent = normal.cross(rotated) * tangent[3];
                    vertices[i].bitangent = bitangent.into();
                }
            }

            let mut indices = Vec::new();
            if let Some(indices_raw) = reader.read_indices() {
                indices.append(&mut indices_raw.into_u32().collect::<Vec<u32>>());
            }

            if !has_tangents {
                compute_tangents(&mut vertices, &indices);
            }

            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Vertex Buffer", mesh.name())),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", mesh.name())),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            let mat_idx = primitive.material().index().unwrap_or(0);

            meshes.push(model::Mesh {
                name: mesh.name().unwrap_or("unknown_mesh").to_string(),
                vertex_buffer,
                index_buffer,
                num_elements: indices.len() as u32,
                material: mat_idx,
            });
        }
    }

    for child in node.children() {
        collect_meshes(child, world_matrix, world_rotation, buf, device, meshes, aabb);
    }
}

/**
 * Not every glTF export ships tangents, but they are required for normal
 * maps to work correctly, so missing ones are derived from the triangles'
 * UV edges.
 */
fn compute_tangents(vertices: &mut [model::ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in indices.chunks(3) {
        if c.len() < 3 {
            continue;
        }
        let v0 = vertices[c[0] as usize];
        let v1 = vertices[c[1] as usize];
        let v2 = vertices[c[2] as usize];

        let pos0: Vector3<f32> = v0.position.into();
        let pos1: Vector3<f32> = v1.position.into();
        let pos2: Vector3<f32> = v2.position.into();

        let uv0: cgmath::Vector2<f32> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<f32> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<f32> = v2.tex_coords.into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solving delta_pos = delta_uv.x * T + delta_uv.y * B for both edges
        // gives the tangent and bitangent.
        let denom = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if denom.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / denom;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // The bitangent is flipped to enable right-handed normal maps with
        // the wgpu texture coordinate system.
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for &idx in c {
            let v = &mut vertices[idx as usize];
            v.tangent = (tangent + Vector3::from(v.tangent)).into();
            v.bitangent = (bitangent + Vector3::from(v.bitangent)).into();
            triangles_included[idx as usize] += 1;
        }
    }

    // Average the accumulated tangents/bitangents
    for (i, n) in triangles_included.into_iter().enumerate() {
        if n == 0 {
            continue;
        }
        let denom = 1.0 / n as f32;
        let v = &mut vertices[i];
        v.tangent = (Vector3::from(v.tangent) * denom).into();
        v.bitangent = (Vector3::from(v.bitangent) * denom).into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(position: [f32; 3], tex_coords: [f32; 2]) -> model::ModelVertex {
        model::ModelVertex {
            position,
            tex_coords,
            normal: [0.0, 0.0, 1.0],
            tangent: [0.0; 3],
            bitangent: [0.0; 3],
        }
    }

    #[test]
    fn tangents_follow_the_uv_axes() {
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
            vertex([1.0, 0.0, 0.0], [1.0, 0.0]),
            vertex([0.0, 1.0, 0.0], [0.0, 1.0]),
        ];
        compute_tangents(&mut vertices, &[0, 1, 2]);

        for v in &vertices {
            let tangent: Vector3<f32> = v.tangent.into();
            // U increases along +x, so the tangent does too.
            assert!(tangent.x > 0.9);
            assert!(tangent.y.abs() < 1e-5);
        }
    }

    #[test]
    fn degenerate_uv_triangles_are_skipped() {
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0], [0.5, 0.5]),
            vertex([1.0, 0.0, 0.0], [0.5, 0.5]),
            vertex([0.0, 1.0, 0.0], [0.5, 0.5]),
        ];
        compute_tangents(&mut vertices, &[0, 1, 2]);
        for v in &vertices {
            assert_eq!(v.tangent, [0.0; 3]);
        }
    }
}
