//! The single scene-state struct and its load-stage machine.
//!
//! All renderable state lives in one [`Scene`] owned by the event loop and
//! mutated only through setters, so there is no hidden global "current
//! model" reference. The asset pipeline advances [`LoadStage`] one external
//! completion signal at a time.

use cgmath::{Euler, Quaternion, Rad, Vector3, Zero};
use wgpu::util::DeviceExt;

use crate::data_structures::{
    instance::Instance,
    model::{MaterialMaps, MaterialUniform, Model},
};
use crate::loader::ShowcaseMaps;
use crate::resources::environment::Environment;

/// Progress of the one-shot asset pipeline.
///
/// Transitions are strictly forward: each stage is triggered by exactly one
/// external completion signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadStage {
    Unloaded,
    EnvironmentReady,
    ModelReady,
    TexturesApplied,
}

impl Default for LoadStage {
    fn default() -> Self {
        LoadStage::Unloaded
    }
}

impl LoadStage {
    /// The stage this one hands over to, if any.
    pub fn next(self) -> Option<LoadStage> {
        match self {
            LoadStage::Unloaded => Some(LoadStage::EnvironmentReady),
            LoadStage::EnvironmentReady => Some(LoadStage::ModelReady),
            LoadStage::ModelReady => Some(LoadStage::TexturesApplied),
            LoadStage::TexturesApplied => None,
        }
    }

    /// Move to `to` if it is the legal successor; out-of-order signals are
    /// refused and reported to the caller.
    pub fn advance_to(&mut self, to: LoadStage) -> bool {
        if self.next() == Some(to) {
            *self = to;
            true
        } else {
            false
        }
    }
}

/// The loaded mesh hierarchy plus its presentation transform.
///
/// Position and scale are written once by the asset pipeline (centering and
/// fitting); the rotation is rewritten every frame while a pointer tween is
/// in flight.
#[derive(Debug)]
pub struct SceneModel {
    pub model: Model,
    pub transform: Instance,
    /// Per-axis Euler rotation in radians, the quantity the tween targets.
    pub rotation: Vector3<f32>,
    pub instance_buffer: wgpu::Buffer,
}

impl SceneModel {
    pub fn new(device: &wgpu::Device, model: Model, transform: Instance) -> Self {
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Instance Buffer"),
            contents: bytemuck::cast_slice(&[transform.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            model,
            transform,
            rotation: Vector3::zero(),
            instance_buffer,
        }
    }

    /// Set the per-axis rotation, folding it into the transform quaternion.
    pub fn set_rotation(&mut self, rotation: Vector3<f32>) {
        self.rotation = rotation;
        self.transform.rotation = Quaternion::from(Euler::new(
            Rad(rotation.x),
            Rad(rotation.y),
            Rad(rotation.z),
        ));
    }

    /// Push the current transform to the GPU.
    pub fn write_to_buffer(&self, queue: &wgpu::Queue) {
        queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&[self.transform.to_raw()]),
        );
    }
}

/// Container of all renderable/illuminating entities.
///
/// Exactly one camera and the fixed light set live in the GPU context; the
/// scene itself holds what the asset pipeline delivers: at most one model
/// and at most one environment map.
#[derive(Debug, Default)]
pub struct Scene {
    pub environment: Option<Environment>,
    pub model: Option<SceneModel>,
    pub stage: LoadStage,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the environment map. Set once, immutable thereafter.
    pub fn set_environment(&mut self, environment: Environment) {
        if !self.stage.advance_to(LoadStage::EnvironmentReady) {
            log::warn!("environment map arrived out of order (stage {:?})", self.stage);
            return;
        }
        self.environment = Some(environment);
    }

    /// Install the loaded model.
    pub fn set_model(&mut self, model: SceneModel) {
        if !self.stage.advance_to(LoadStage::ModelReady) {
            log::warn!("model arrived out of order (stage {:?})", self.stage);
            return;
        }
        self.model = Some(model);
    }

    /// Dress every material with the showcase maps that made it.
    ///
    /// Slots whose fetch failed keep their current texture; the factors move
    /// to 1.0 with a white emissive tint either way.
    pub fn apply_showcase_maps(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        maps: ShowcaseMaps,
        layout: &wgpu::BindGroupLayout,
    ) {
        if !self.stage.advance_to(LoadStage::TexturesApplied) {
            log::warn!("showcase maps arrived out of order (stage {:?})", self.stage);
            return;
        }
        let Some(scene_model) = self.model.as_mut() else {
            return;
        };
        for material in &mut scene_model.model.materials {
            let current = &material.maps;
            let dressed = MaterialMaps {
                base_color: current.base_color.clone(),
                normal: maps.normal.clone().unwrap_or_else(|| current.normal.clone()),
                roughness: maps
                    .roughness
                    .clone()
                    .unwrap_or_else(|| current.roughness.clone()),
                metalness: maps
                    .metalness
                    .clone()
                    .unwrap_or_else(|| current.metalness.clone()),
                emissive: maps
                    .emissive
                    .clone()
                    .unwrap_or_else(|| current.emissive.clone()),
            };
            material.apply_maps(device, queue, dressed, MaterialUniform::showcase(), layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_strictly_forward() {
        let mut stage = LoadStage::Unloaded;
        assert!(stage.advance_to(LoadStage::EnvironmentReady));
        assert!(stage.advance_to(LoadStage::ModelReady));
        assert!(stage.advance_to(LoadStage::TexturesApplied));
        assert_eq!(stage, LoadStage::TexturesApplied);
        assert_eq!(stage.next(), None);
    }

    #[test]
    fn out_of_order_signals_are_refused() {
        let mut stage = LoadStage::Unloaded;
        assert!(!stage.advance_to(LoadStage::ModelReady));
        assert!(!stage.advance_to(LoadStage::TexturesApplied));
        assert_eq!(stage, LoadStage::Unloaded);

        // Repeating a completed stage is refused too.
        assert!(stage.advance_to(LoadStage::EnvironmentReady));
        assert!(!stage.advance_to(LoadStage::EnvironmentReady));
        assert_eq!(stage, LoadStage::EnvironmentReady);
    }

    #[test]
    fn a_fresh_scene_is_empty() {
        let scene = Scene::new();
        assert!(scene.environment.is_none());
        assert!(scene.model.is_none());
        assert_eq!(scene.stage, LoadStage::Unloaded);
    }
}
