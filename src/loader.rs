//! The staged asset pipeline.
//!
//! One structured async task replaces the original's nested load callbacks:
//! environment map first, then the model (gated on the environment's
//! success), then the four showcase maps concurrently. Each completed stage
//! is published to the event loop as a user event; the event handlers are
//! the only writers of the shared [`crate::scene::Scene`].

use futures::join;
use winit::event_loop::EventLoopProxy;

use crate::app::ViewerEvent;
use crate::data_structures::bounds::fit_transform;
use crate::data_structures::texture::Texture;
use crate::resources::environment::load_environment_map;
use crate::resources::texture::load_texture;
use crate::resources::load_model_gltf;
use crate::scene::SceneModel;

/// Everything the viewer fetches, addressed as relative paths except for the
/// remote environment map. This is the whole configuration surface.
#[derive(Clone, Debug)]
pub struct AssetSources {
    pub environment: String,
    pub model: String,
    pub roughness_map: String,
    pub normal_map: String,
    pub metalness_map: String,
    pub emissive_map: String,
}

impl Default for AssetSources {
    fn default() -> Self {
        #[cfg(target_arch = "wasm32")]
        let environment =
            "https://dl.polyhaven.org/file/ph-assets/HDRIs/hdr/2k/industrial_sunset_02_puresky_2k.hdr"
                .to_string();
        // The native build reads the mirrored copy that build.rs places in
        // the assets directory.
        #[cfg(not(target_arch = "wasm32"))]
        let environment = "industrial_sunset_02_puresky_2k.hdr".to_string();

        Self {
            environment,
            model: "DamagedHelmet.gltf".to_string(),
            roughness_map: "DamagedHelmet_roughness.jpg".to_string(),
            normal_map: "DamagedHelmet_normal.jpg".to_string(),
            metalness_map: "DamagedHelmet_metallic.jpg".to_string(),
            emissive_map: "DamagedHelmet_emissive.jpg".to_string(),
        }
    }
}

/// The four maps every material is dressed with once they arrive.
///
/// A `None` slot means that map's fetch failed; the material keeps its
/// current texture there. No retry and no user-visible error surface: this
/// degrade-gracefully behavior is deliberate.
#[derive(Debug, Default)]
pub struct ShowcaseMaps {
    pub roughness: Option<Texture>,
    pub normal: Option<Texture>,
    pub metalness: Option<Texture>,
    pub emissive: Option<Texture>,
}

/// Run the full pipeline, publishing each stage through `proxy`.
///
/// The device and queue are internally ref-counted, so the task creates GPU
/// resources directly and ships only finished structures to the event loop.
pub async fn run(
    device: wgpu::Device,
    queue: wgpu::Queue,
    material_layout: wgpu::BindGroupLayout,
    sources: AssetSources,
    proxy: EventLoopProxy<ViewerEvent>,
) {
    // Stage 1: the environment map gates everything behind it.
    let environment = match load_environment_map(&sources.environment, &device, &queue).await {
        Ok(texture) => texture,
        Err(e) => {
            log::error!("failed to load environment map {}: {e}", sources.environment);
            return;
        }
    };
    if proxy
        .send_event(ViewerEvent::EnvironmentLoaded(environment))
        .is_err()
    {
        // Event loop is gone; nothing left to deliver to.
        return;
    }

    // Stage 2: the model.
    let (model, aabb) = match load_model_gltf(&sources.model, &device, &queue, &material_layout).await
    {
        Ok(loaded) => loaded,
        Err(e) => {
            log::error!("failed to load model {}: {e}", sources.model);
            return;
        }
    };
    let scene_model = SceneModel::new(&device, model, fit_transform(&aabb));
    if proxy
        .send_event(ViewerEvent::ModelLoaded(Box::new(scene_model)))
        .is_err()
    {
        return;
    }

    // Stage 3: the showcase maps, fetched concurrently. Failed slots stay
    // None and the material keeps its fallback there.
    let (roughness, normal, metalness, emissive) = join!(
        load_texture(&sources.roughness_map, true, &device, &queue, None),
        load_texture(&sources.normal_map, true, &device, &queue, None),
        load_texture(&sources.metalness_map, true, &device, &queue, None),
        load_texture(&sources.emissive_map, false, &device, &queue, None),
    );
    let maps = ShowcaseMaps {
        roughness: roughness.ok(),
        normal: normal.ok(),
        metalness: metalness.ok(),
        emissive: emissive.ok(),
    };
    let _ = proxy.send_event(ViewerEvent::ShowcaseMapsLoaded(maps));
}
