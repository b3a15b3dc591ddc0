//! Axis-aligned bounding boxes for model centering and scaling.

use cgmath::{InnerSpace, Vector3};

use crate::data_structures::instance::Instance;

/// Diagonal length every loaded model is scaled to fit.
pub const FIT_TARGET_SIZE: f32 = 2.0;

/// The smallest axis-aligned box containing a set of points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    /// An empty box that any `extend` will snap onto.
    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Grow the box to contain `point`.
    pub fn extend(&mut self, point: Vector3<f32>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// True until at least one point was added.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Length of the box diagonal, the "size" used for uniform fitting.
    pub fn diagonal(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        (self.max - self.min).magnitude()
    }
}

impl FromIterator<Vector3<f32>> for Aabb {
    fn from_iter<T: IntoIterator<Item = Vector3<f32>>>(iter: T) -> Self {
        let mut aabb = Aabb::empty();
        for point in iter {
            aabb.extend(point);
        }
        aabb
    }
}

/// Transform that presents a model in the viewport: translated so the box
/// center sits at the origin and uniformly scaled so the box diagonal maps
/// to [`FIT_TARGET_SIZE`] units.
///
/// A degenerate box (no points, or a single point) keeps unit scale.
pub fn fit_transform(aabb: &Aabb) -> Instance {
    let diagonal = aabb.diagonal();
    let scale = if diagonal > 0.0 {
        FIT_TARGET_SIZE / diagonal
    } else {
        1.0
    };
    let mut instance = Instance::new();
    instance.position = -aabb.center();
    instance.scale = Vector3::new(scale, scale, scale);
    instance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_tracks_min_and_max() {
        let aabb: Aabb = [
            Vector3::new(1.0, -2.0, 0.5),
            Vector3::new(-3.0, 4.0, 0.0),
            Vector3::new(0.0, 0.0, -1.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(aabb.min, Vector3::new(-3.0, -2.0, -1.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 4.0, 0.5));
        assert_eq!(aabb.center(), Vector3::new(-1.0, 1.0, -0.25));
    }

    #[test]
    fn fit_scale_maps_diagonal_to_target_size() {
        let aabb: Aabb = [Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0)]
            .into_iter()
            .collect();

        let fitted = fit_transform(&aabb);
        let diagonal = aabb.diagonal();
        assert!((diagonal - 12.0f32.sqrt()).abs() < 1e-6);
        assert!((fitted.scale.x * diagonal - FIT_TARGET_SIZE).abs() < 1e-6);
        // Known-box end-to-end numbers: diagonal ~3.464 so scale ~0.577.
        assert!((fitted.scale.x - 0.577).abs() < 1e-3);
        assert_eq!(fitted.scale.x, fitted.scale.y);
        assert_eq!(fitted.scale.y, fitted.scale.z);
    }

    #[test]
    fn fit_position_is_negated_center() {
        let aabb: Aabb = [Vector3::new(2.0, 4.0, -6.0), Vector3::new(4.0, 8.0, -2.0)]
            .into_iter()
            .collect();

        let fitted = fit_transform(&aabb);
        assert_eq!(fitted.position, -aabb.center());
        assert_eq!(fitted.position, Vector3::new(-3.0, -6.0, 4.0));
    }

    #[test]
    fn degenerate_box_keeps_unit_scale() {
        let aabb: Aabb = [Vector3::new(1.0, 1.0, 1.0)].into_iter().collect();
        let fitted = fit_transform(&aabb);
        assert_eq!(fitted.scale, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(fitted.position, Vector3::new(-1.0, -1.0, -1.0));

        let empty = Aabb::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.diagonal(), 0.0);
        assert_eq!(fit_transform(&empty).scale.x, 1.0);
    }
}
