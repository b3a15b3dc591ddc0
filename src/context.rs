use std::sync::Arc;

use anyhow::Context as _;
use cgmath::Deg;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, Projection},
    pipelines::{
        light::{LightResources, LightUniform},
        model::mk_model_pipeline,
    },
    resources::{
        environment::Environment,
        texture::{environment_layout, material_layout},
    },
};

/// Central GPU and window context.
///
/// Owns the surface, device and queue, the fixed camera and light bundles,
/// the model pipeline and the bind group layouts the asset pipeline needs to
/// assemble materials.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub model_pipeline: wgpu::RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
    pub environment_layout: wgpu::BindGroupLayout,
    /// Black 1x1 stand-in bound until the real environment map arrives.
    pub placeholder_environment: Environment,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        log::info!("surface configuration");
        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders assume an Srgb surface texture; picking a different
        // format would make all colors come out darker.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        // A fixed camera on the z axis looking at the origin; the model-load
        // handler dollies it in once there is something to frame.
        let camera = Camera::new((0.0, 0.0, 5.0), Deg(-90.0), Deg(0.0));
        let projection = Projection::new(config.width, config.height, Deg(45.0), 0.1, 1000.0);
        let camera = CameraResources::new(&device, camera, &projection);

        let light = LightResources::new(&device, LightUniform::showcase());

        let material_layout = material_layout(&device);
        let environment_layout = environment_layout(&device);
        let placeholder_environment = Environment::placeholder(&device, &queue, &environment_layout);

        let model_pipeline = mk_model_pipeline(
            &device,
            config.format,
            &material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
            &environment_layout,
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            model_pipeline,
            material_layout,
            environment_layout,
            placeholder_environment,
        })
    }
}
