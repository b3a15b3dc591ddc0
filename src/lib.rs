//! vitrine
//!
//! A lightweight, cross-platform single-model showcase viewer for native and
//! WASM targets. The crate loads an HDR environment map and a glTF model,
//! dresses every mesh with a set of showcase PBR maps, renders the scene
//! through a small post-processing chain and eases the model's orientation
//! toward the pointer. The surface is intentionally small: one scene, one
//! model, one effect chain.
//!
//! High-level modules
//! - `app`: the winit event loop, per-frame rendering and resize handling
//! - `camera`: camera types and uniforms for view/projection
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: viewer data models (meshes, materials, textures, bounds)
//! - `interaction`: pointer-driven rotation targeting
//! - `loader`: the staged asset pipeline (environment, model, showcase maps)
//! - `pipelines`: render pipeline definitions (model, lights, post chain)
//! - `resources`: helpers to fetch and decode external assets
//! - `scene`: the single scene-state struct and its load-stage machine
//! - `tween`: time-eased interpolation toward a retargetable goal
//!

pub mod app;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod interaction;
pub mod loader;
pub mod pipelines;
pub mod resources;
pub mod scene;
pub mod tween;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::WindowEvent;
pub use wgpu::*;
