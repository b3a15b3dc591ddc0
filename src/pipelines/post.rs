//! The post-processing chain.
//!
//! [`EffectChain`] owns an ordered pair of render passes: the base scene pass
//! (always first) draws into an offscreen colour+depth target, then the RGB
//! chromatic-shift pass reads that target and writes the swapchain view. The
//! pass list is fixed after construction; the only runtime reconfiguration is
//! [`EffectChain::set_size`].

use crate::data_structures::texture::Texture;
use crate::pipelines::model::mk_render_pipeline;

/// Chromatic shift strength of the showcase look.
pub const RGB_SHIFT_AMOUNT: f32 = 0.00115;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShiftUniform {
    pub amount: f32,
    pub angle: f32,
    _padding: [f32; 2],
}

impl ShiftUniform {
    pub fn new(amount: f32, angle: f32) -> Self {
        Self {
            amount,
            angle,
            _padding: [0.0; 2],
        }
    }
}

impl Default for ShiftUniform {
    fn default() -> Self {
        Self::new(RGB_SHIFT_AMOUNT, 0.0)
    }
}

/// The image-space chromatic-shift pass.
struct RgbShiftPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
}

impl RgbShiftPass {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat, input: &Texture) -> Self {
        use wgpu::util::DeviceExt;

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
                label: Some("rgb_shift_bind_group_layout"),
            });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("RGB Shift Uniform Buffer"),
            contents: bytemuck::cast_slice(&[ShiftUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("RGB Shift Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = wgpu::ShaderModuleDescriptor {
            label: Some("RGB Shift Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("rgb_shift.wgsl").into()),
        };

        // No depth and no vertex buffers: the pass draws one oversized
        // fullscreen triangle generated from the vertex index.
        let pipeline = mk_render_pipeline(device, &layout, format, None, None, &[], shader);

        let bind_group = Self::mk_bind_group(device, &bind_group_layout, &sampler, &uniform_buffer, input);

        Self {
            pipeline,
            bind_group_layout,
            bind_group,
            sampler,
            uniform_buffer,
        }
    }

    fn mk_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        uniform_buffer: &wgpu::Buffer,
        input: &Texture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
            label: Some("rgb_shift_bind_group"),
        })
    }

    /// Re-point the pass at a recreated scene target.
    fn rebind(&mut self, device: &wgpu::Device, input: &Texture) {
        self.bind_group = Self::mk_bind_group(
            device,
            &self.bind_group_layout,
            &self.sampler,
            &self.uniform_buffer,
            input,
        );
    }
}

pub struct EffectChain {
    scene_target: Texture,
    depth_target: Texture,
    shift: RgbShiftPass,
    size: (u32, u32),
    format: wgpu::TextureFormat,
    pub clear_colour: wgpu::Color,
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectChain")
            .field("size", &self.size)
            .field("format", &self.format)
            .finish()
    }
}

impl EffectChain {
    pub fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        let size = (config.width.max(1), config.height.max(1));
        let scene_target = mk_scene_target(device, config.format, size);
        let depth_target =
            Texture::create_depth_texture(device, [size.0, size.1], "effect_chain_depth");
        let shift = RgbShiftPass::new(device, config.format, &scene_target);

        Self {
            scene_target,
            depth_target,
            shift,
            size,
            format: config.format,
            // The showcase scene renders on a transparent page background.
            clear_colour: wgpu::Color::TRANSPARENT,
        }
    }

    /// Resize every pass's internal buffers.
    ///
    /// A call with the current size is a no-op; the intermediate targets and
    /// the shift pass's input binding survive untouched.
    pub fn set_size(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let size = (width.max(1), height.max(1));
        if size == self.size {
            return;
        }
        self.size = size;
        self.scene_target = mk_scene_target(device, self.format, size);
        self.depth_target =
            Texture::create_depth_texture(device, [size.0, size.1], "effect_chain_depth");
        self.shift.rebind(device, &self.scene_target);
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Draw all passes in order into `surface_view`.
    ///
    /// The base scene pass always runs first; `draw_scene` receives the pass
    /// with colour and depth attachments already bound and records whatever
    /// the scene currently holds.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        draw_scene: impl FnOnce(&mut wgpu::RenderPass<'_>),
    ) {
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.scene_target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_target.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            draw_scene(&mut render_pass);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("RGB Shift Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.shift.pipeline);
            render_pass.set_bind_group(0, &self.shift.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }
    }
}

fn mk_scene_target(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    size: (u32, u32),
) -> Texture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("effect_chain_scene_target"),
        size: wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Texture {
        texture,
        view,
        sampler: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shift_matches_the_showcase_amount() {
        let uniform = ShiftUniform::default();
        assert_eq!(uniform.amount, 0.00115);
        assert_eq!(uniform.angle, 0.0);
    }

    #[test]
    fn shift_uniform_is_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<ShiftUniform>() % 16, 0);
    }
}
