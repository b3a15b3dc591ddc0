//! Scene illumination: one ambient and one directional light.
//!
//! The light set is fixed for the lifetime of the scene; the uniform is
//! written once at startup and never touched again.

use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    pub direction: [f32; 3],
    pub directional_intensity: f32,
    pub directional_color: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: f32,
}

impl LightUniform {
    pub fn new(
        ambient_color: [f32; 3],
        ambient_intensity: f32,
        direction: [f32; 3],
        directional_color: [f32; 3],
        directional_intensity: f32,
    ) -> Self {
        Self {
            ambient_color,
            ambient_intensity,
            direction,
            directional_intensity,
            directional_color,
            _padding: 0.0,
        }
    }

    /// The showcase defaults: half-strength white ambient plus a white
    /// directional light shining from (5, 5, 5) toward the origin.
    pub fn showcase() -> Self {
        Self::new([1.0; 3], 0.5, [5.0, 5.0, 5.0], [1.0; 3], 1.0)
    }
}

pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl std::fmt::Debug for LightResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightResources")
            .field("uniform", &self.uniform)
            .finish()
    }
}

impl LightResources {
    pub fn new(device: &wgpu::Device, uniform: LightUniform) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_uniform_is_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<LightUniform>() % 16, 0);
    }

    #[test]
    fn showcase_lights_match_the_scene_defaults() {
        let uniform = LightUniform::showcase();
        assert_eq!(uniform.ambient_intensity, 0.5);
        assert_eq!(uniform.directional_intensity, 1.0);
        assert_eq!(uniform.direction, [5.0, 5.0, 5.0]);
    }
}
