//! The global illumination/reflection source.
//!
//! One equirectangular HDR image, fetched and decoded once, immutable
//! thereafter. Until the real map arrives the scene renders against a 1x1
//! black placeholder so the pipeline layout never changes.

use crate::data_structures::texture::Texture;
use crate::resources::texture::load_binary;

/// The environment map and its bind group.
#[derive(Debug)]
pub struct Environment {
    pub texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

impl Environment {
    pub fn new(device: &wgpu::Device, texture: Texture, layout: &wgpu::BindGroupLayout) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            }],
            label: Some("environment_bind_group"),
        });
        Self {
            texture,
            bind_group,
        }
    }

    /// A 1x1 black stand-in used before the real map has loaded.
    pub fn placeholder(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("placeholder environment"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Texture::ENVIRONMENT_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let black = [0.0f32; 4];
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            bytemuck::cast_slice(&black),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(16),
                rows_per_image: Some(1),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self::new(
            device,
            Texture {
                texture,
                view,
                sampler: None,
            },
            layout,
        )
    }
}

/// Fetch and decode the Radiance-HDR environment map.
///
/// The returned texture is already marked equirectangular by construction:
/// the shader's direction-to-texel mapping is the only way it is ever read.
pub async fn load_environment_map(
    source: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let data = load_binary(source).await?;
    Texture::from_hdr_bytes(device, queue, &data, source)
}
