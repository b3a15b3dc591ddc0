//! The application event loop.
//!
//! The viewer is a winit `ApplicationHandler` with a user-event channel:
//! window and GPU context come up first, the asset pipeline runs as one
//! background task, and every completed load stage arrives back on the loop
//! as a [`ViewerEvent`]. The redraw handler is the
//! render loop: it reschedules itself every frame and draws whatever the
//! scene currently holds through the post-processing chain.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window (the `canvas` element on the web) and the GPU context
//! 2. the asset pipeline task is spawned and publishes its stages
//! 3. `window_event` feeds resize, pointer and redraw events
//! 4. each redraw advances the rotation tween and renders through the effect chain

use std::{fmt::Debug, iter, sync::Arc};

use instant::{Duration, Instant};

#[cfg(feature = "integration-tests")]
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    context::Context,
    data_structures::model::DrawModel,
    data_structures::texture::Texture,
    interaction::InteractionController,
    loader::{self, AssetSources, ShowcaseMaps},
    pipelines::post::EffectChain,
    resources::environment::Environment,
    scene::{Scene, SceneModel},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Outcome of one validated frame in an integration test.
#[cfg(feature = "integration-tests")]
pub enum ImageTestResult {
    Passed,
    Waiting,
    Failed,
}

/// Per-frame validation hook used by the feature-gated integration tests:
/// inspects the scene and the frame read back from the GPU.
#[cfg(feature = "integration-tests")]
pub type RenderValidator = Box<
    dyn FnMut(
        &Scene,
        &image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error>,
>;

/// Events published to the event loop from asynchronous work.
///
/// `Initialized` finishes the web platform's async startup; the remaining
/// variants are the asset pipeline's stage completions, applied in order by
/// the scene's load-stage machine.
pub enum ViewerEvent {
    #[allow(dead_code)]
    Initialized {
        state: AppState,
        sources: AssetSources,
    },
    EnvironmentLoaded(Texture),
    ModelLoaded(Box<SceneModel>),
    ShowcaseMapsLoaded(ShowcaseMaps),
    #[cfg(feature = "integration-tests")]
    Exit,
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { .. } => f.write_str("Initialized"),
            Self::EnvironmentLoaded(_) => f.write_str("EnvironmentLoaded"),
            Self::ModelLoaded(_) => f.write_str("ModelLoaded"),
            Self::ShowcaseMapsLoaded(maps) => f.debug_tuple("ShowcaseMapsLoaded").field(maps).finish(),
            #[cfg(feature = "integration-tests")]
            Self::Exit => f.write_str("Exit"),
        }
    }
}

/// Application state bundle: GPU context, scene, interaction and post chain.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    pub scene: Scene,
    pub interaction: InteractionController,
    chain: EffectChain,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>) -> Self {
        let ctx = match Context::new(window).await {
            Ok(ctx) => ctx,
            Err(e) => panic!(
                "App initialization failed. Cannot create the main context: {}",
                e
            ),
        };
        let chain = EffectChain::new(&ctx.device, &ctx.config);
        Self {
            ctx,
            scene: Scene::new(),
            interaction: InteractionController::new(),
            chain,
            is_surface_configured: false,
        }
    }

    /// Viewport update: surface, projection aspect and post-chain targets.
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.is_surface_configured = true;
            self.ctx.projection.resize(width, height);
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.chain.set_size(&self.ctx.device, width, height);
        }
    }

    #[cfg(feature = "integration-tests")]
    fn padded_size(&self) -> (u32, u32) {
        // Buffer readback requires 256-byte row alignment.
        let width = self.ctx.config.width;
        let height = self.ctx.config.height;
        (
            width + (256 - width % 256),
            height + (256 - height % 256),
        )
    }

    #[cfg(feature = "integration-tests")]
    fn mk_test_texture(&self) -> wgpu::Texture {
        let (width, height) = self.padded_size();
        self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Readback Test Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.ctx.config.format,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    fn render(
        &mut self,
        dt: Duration,
        #[cfg(feature = "integration-tests")] validator: &mut Option<RenderValidator>,
        #[cfg(feature = "integration-tests")] async_runtime: &Runtime,
        #[cfg(feature = "integration-tests")] proxy: &EventLoopProxy<ViewerEvent>,
    ) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        // Advance the pointer tween and push the new orientation.
        if let Some(rotation) = self.interaction.advance(dt.as_secs_f32()) {
            if let Some(model) = self.scene.model.as_mut() {
                model.set_rotation(rotation);
                model.write_to_buffer(&self.ctx.queue);
            }
        }

        {
            let Context {
                camera,
                queue,
                projection,
                ..
            } = &mut self.ctx;
            camera.write_to_buffer(queue, projection);
        }

        let output = self.ctx.surface.get_current_texture()?;
        #[cfg(not(feature = "integration-tests"))]
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        #[cfg(feature = "integration-tests")]
        let test_texture = self.mk_test_texture();
        #[cfg(feature = "integration-tests")]
        let view = test_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });

        let ctx = &self.ctx;
        let scene = &self.scene;
        self.chain.render(&mut encoder, &view, |render_pass| {
            if let Some(model) = &scene.model {
                let environment = scene
                    .environment
                    .as_ref()
                    .unwrap_or(&ctx.placeholder_environment);
                render_pass.set_pipeline(&ctx.model_pipeline);
                render_pass.set_vertex_buffer(1, model.instance_buffer.slice(..));
                render_pass.draw_model(
                    &model.model,
                    &ctx.camera.bind_group,
                    &ctx.light.bind_group,
                    &environment.bind_group,
                );
            }
        });

        #[cfg(feature = "integration-tests")]
        let output_buffer = {
            let u32_size = std::mem::size_of::<u32>() as u32;
            let (width, height) = self.padded_size();
            let output_buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                size: (u32_size * width * height) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                label: None,
                mapped_at_creation: false,
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &test_texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &output_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(u32_size * width),
                        rows_per_image: Some(height),
                    },
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
            output_buffer
        };

        self.ctx.queue.submit(iter::once(encoder.finish()));

        #[cfg(feature = "integration-tests")]
        if let Some(validate) = validator.as_mut() {
            let fut_img = async {
                let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
                let buffer_slice = output_buffer.slice(..);
                buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                    tx.send(result).unwrap();
                });
                self.ctx
                    .device
                    .poll(wgpu::PollType::Wait {
                        submission_index: None,
                        timeout: Some(Duration::from_secs(3)),
                    })
                    .unwrap();
                rx.receive().await.unwrap().unwrap();
                let data = buffer_slice.get_mapped_range();
                let (width, height) = self.padded_size();
                image::ImageBuffer::<image::Rgba<u8>, _>::from_raw(width, height, data).unwrap()
            };
            let img = async_runtime.block_on(fut_img);
            match validate(&self.scene, &img) {
                Err(e) => panic!("{}", e),
                Ok(ImageTestResult::Failed) => panic!("Assertion failed"),
                Ok(ImageTestResult::Passed) => proxy
                    .send_event(ViewerEvent::Exit)
                    .expect("Assertions passed but the winit event-loop could not safely exit"),
                Ok(ImageTestResult::Waiting) => (),
            }
        }

        output.present();
        Ok(())
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    state: Option<AppState>,
    // Taken in `resumed`; `Option` so a second resume cannot restart the pipeline.
    sources: Option<AssetSources>,
    last_time: Instant,
    #[cfg(feature = "integration-tests")]
    validator: Option<RenderValidator>,
}

impl App {
    fn new(
        event_loop: &EventLoop<ViewerEvent>,
        sources: AssetSources,
        #[cfg(feature = "integration-tests")] validator: Option<RenderValidator>,
    ) -> Self {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new().unwrap();
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            sources: Some(sources),
            last_time: Instant::now(),
            #[cfg(feature = "integration-tests")]
            validator,
        }
    }
}

fn spawn_loader(
    #[cfg(not(target_arch = "wasm32"))] async_runtime: &tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    ctx: &Context,
    sources: AssetSources,
) {
    // Device and queue clones only bump the internal refcounts.
    let load = loader::run(
        ctx.device.clone(),
        ctx.queue.clone(),
        ctx.material_layout.clone(),
        sources,
        proxy,
    );
    #[cfg(not(target_arch = "wasm32"))]
    {
        async_runtime.spawn(load);
    }
    #[cfg(target_arch = "wasm32")]
    {
        wasm_bindgen_futures::spawn_local(load);
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("vitrine");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        let sources = match self.sources.take() {
            Some(sources) => sources,
            None => return,
        };

        let init_future = AppState::new(window);

        #[cfg(not(target_arch = "wasm32"))]
        {
            let state = self.async_runtime.block_on(init_future);
            spawn_loader(
                &self.async_runtime,
                self.proxy.clone(),
                &state.ctx,
                sources,
            );
            self.state = Some(state);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let state = init_future.await;
                assert!(
                    proxy
                        .send_event(ViewerEvent::Initialized { state, sources })
                        .is_ok()
                );
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Initialized { state, sources } => {
                // This is the message from our wasm `spawn_local`
                self.state = Some(state);

                // Important: Trigger a resize and redraw now that we are initialized
                let state = self.state.as_mut().unwrap();
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                spawn_loader(
                    #[cfg(not(target_arch = "wasm32"))]
                    &self.async_runtime,
                    self.proxy.clone(),
                    &state.ctx,
                    sources,
                );
                state.ctx.window.request_redraw();
            }
            ViewerEvent::EnvironmentLoaded(texture) => {
                if let Some(state) = &mut self.state {
                    let environment =
                        Environment::new(&state.ctx.device, texture, &state.ctx.environment_layout);
                    state.scene.set_environment(environment);
                    log::info!("environment map ready");
                }
            }
            ViewerEvent::ModelLoaded(model) => {
                if let Some(state) = &mut self.state {
                    state.scene.set_model(*model);
                    // Dolly in now that there is something to frame.
                    state.ctx.camera.camera.position.z = 2.0;
                    log::info!("model ready");
                }
            }
            ViewerEvent::ShowcaseMapsLoaded(maps) => {
                if let Some(state) = &mut self.state {
                    let AppState { ctx, scene, .. } = state;
                    scene.apply_showcase_maps(&ctx.device, &ctx.queue, maps, &ctx.material_layout);
                    log::info!("showcase maps applied");
                }
            }
            #[cfg(feature = "integration-tests")]
            ViewerEvent::Exit => {
                event_loop.exit();
            }
        }
        #[cfg(not(feature = "integration-tests"))]
        let _ = event_loop;
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::CursorMoved { position, .. } => {
                let current_rotation = state.scene.model.as_ref().map(|m| m.rotation);
                state.interaction.pointer_moved(
                    position.x,
                    position.y,
                    state.ctx.config.width as f32,
                    state.ctx.config.height as f32,
                    current_rotation,
                );
            }
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                match state.render(
                    dt,
                    #[cfg(feature = "integration-tests")]
                    &mut self.validator,
                    #[cfg(feature = "integration-tests")]
                    &self.async_runtime,
                    #[cfg(feature = "integration-tests")]
                    &self.proxy,
                ) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Launch the viewer with the given asset sources.
///
/// Blocks until the window closes (never, on the web).
pub fn run(sources: AssetSources) -> anyhow::Result<()> {
    run_inner(
        sources,
        #[cfg(feature = "integration-tests")]
        None,
    )
}

/// Launch the viewer with a per-frame readback validator; used by the
/// windowed integration tests.
#[cfg(feature = "integration-tests")]
pub fn run_with_validator(sources: AssetSources, validator: RenderValidator) -> anyhow::Result<()> {
    run_inner(sources, Some(validator))
}

fn run_inner(
    sources: AssetSources,
    #[cfg(feature = "integration-tests")] validator: Option<RenderValidator>,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<ViewerEvent> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        EventLoop::with_user_event()
            .with_any_thread(true)
            .build()
            .expect("Failed to create an event loop")
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<ViewerEvent> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        EventLoop::with_user_event()
            .with_any_thread(true)
            .build()
            .expect("Failed to create an event loop")
    };

    #[cfg(not(feature = "integration-tests"))]
    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(
        &event_loop,
        sources,
        #[cfg(feature = "integration-tests")]
        validator,
    );

    event_loop.run_app(&mut app)?;

    Ok(())
}

/// Web entry point: starts the viewer on the page's `canvas` element.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    if let Err(e) = run(AssetSources::default()) {
        log::error!("viewer failed to start: {e}");
    }
}
