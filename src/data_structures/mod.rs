//! Viewer data structures: models, materials, textures and bounds.
//!
//! This module contains the core data types for scene representation:
//!
//! - `model` contains mesh and material definitions, GPU resources for the showcase model
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds the model's transformation and its GPU layout
//! - `bounds` is the axis-aligned bounding box used for centering/scaling

pub mod bounds;
pub mod instance;
pub mod model;
pub mod texture;
