//! Pointer-driven rotation targeting.
//!
//! Every pointer move maps the cursor's normalized viewport position onto a
//! pair of bounded rotation angles and retargets the in-flight tween. Events
//! never queue: a new one interrupts whatever motion is still running. With
//! no model loaded the controller stays idle.

use std::f32::consts::PI;

use cgmath::Vector3;

use crate::tween::Tween;

/// Full pointer travel maps to a fifth of a half turn per axis.
pub const ROTATION_RANGE: f32 = PI * 0.2;

/// Seconds a rotation takes to settle.
pub const TWEEN_DURATION: f32 = 0.7;

/// Rotation target for a pointer at (x, y) in a w x h viewport.
///
/// The vertical pointer axis tilts the model (rotation about x), the
/// horizontal axis turns it (rotation about y). Each angle is bounded by
/// half of [`ROTATION_RANGE`] in either direction.
pub fn rotation_target(x: f64, y: f64, width: f32, height: f32) -> Vector3<f32> {
    let tilt = (y as f32 / height - 0.5) * ROTATION_RANGE;
    let turn = (x as f32 / width - 0.5) * ROTATION_RANGE;
    Vector3::new(tilt, turn, 0.0)
}

/// Maps pointer movement to a smoothed rotation on the scene model.
#[derive(Debug, Default)]
pub struct InteractionController {
    tween: Option<Tween>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a pointer-move event.
    ///
    /// `current_rotation` is the model's rotation, or `None` while no model
    /// is loaded, in which case the event is a no-op.
    pub fn pointer_moved(
        &mut self,
        x: f64,
        y: f64,
        width: f32,
        height: f32,
        current_rotation: Option<Vector3<f32>>,
    ) {
        let Some(rotation) = current_rotation else {
            return;
        };
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let target = rotation_target(x, y, width, height);
        let tween = self.tween.get_or_insert_with(|| Tween::idle(rotation));
        tween.retarget(target, TWEEN_DURATION);
    }

    /// Advance the in-flight motion and return the rotation to apply, or
    /// `None` once everything has settled.
    pub fn advance(&mut self, dt: f32) -> Option<Vector3<f32>> {
        let tween = self.tween.as_mut()?;
        let value = tween.advance(dt);
        if tween.is_settled() {
            // Deliver the final value once, then go idle.
            self.tween = None;
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_are_bounded_across_the_viewport() {
        let bound = PI * 0.1 + 1e-6;
        for (w, h) in [(800.0, 600.0), (1920.0, 1080.0), (100.0, 900.0)] {
            for xi in 0..=10 {
                for yi in 0..=10 {
                    let x = w as f64 * xi as f64 / 10.0;
                    let y = h as f64 * yi as f64 / 10.0;
                    let target = rotation_target(x, y, w, h);
                    assert!(target.x.abs() <= bound, "tilt out of range: {}", target.x);
                    assert!(target.y.abs() <= bound, "turn out of range: {}", target.y);
                    assert_eq!(target.z, 0.0);
                }
            }
        }
    }

    #[test]
    fn center_of_viewport_is_rest_orientation() {
        let target = rotation_target(400.0, 300.0, 800.0, 600.0);
        assert!(target.x.abs() < 1e-6);
        assert!(target.y.abs() < 1e-6);
    }

    #[test]
    fn corners_hit_the_extremes() {
        let target = rotation_target(800.0, 600.0, 800.0, 600.0);
        assert!((target.x - PI * 0.1).abs() < 1e-6);
        assert!((target.y - PI * 0.1).abs() < 1e-6);

        let target = rotation_target(0.0, 0.0, 800.0, 600.0);
        assert!((target.x + PI * 0.1).abs() < 1e-6);
        assert!((target.y + PI * 0.1).abs() < 1e-6);
    }

    #[test]
    fn pointer_events_without_a_model_are_noops() {
        let mut controller = InteractionController::new();
        controller.pointer_moved(100.0, 100.0, 800.0, 600.0, None);
        assert!(controller.advance(1.0).is_none());
    }

    #[test]
    fn rapid_events_retarget_instead_of_queueing() {
        let mut controller = InteractionController::new();
        let rotation = Some(Vector3::new(0.0, 0.0, 0.0));

        controller.pointer_moved(0.0, 0.0, 800.0, 600.0, rotation);
        controller.advance(0.1);
        // Second event 0.1 s in, well before the 0.7 s tween completes.
        controller.pointer_moved(800.0, 600.0, 800.0, 600.0, rotation);

        let mut last = Vector3::new(0.0, 0.0, 0.0);
        while let Some(value) = controller.advance(0.1) {
            last = value;
        }
        // Only the second target is reached.
        let expected = rotation_target(800.0, 600.0, 800.0, 600.0);
        assert!((last.x - expected.x).abs() < 1e-5);
        assert!((last.y - expected.y).abs() < 1e-5);
    }

    #[test]
    fn controller_goes_idle_after_settling() {
        let mut controller = InteractionController::new();
        controller.pointer_moved(800.0, 300.0, 800.0, 600.0, Some(Vector3::new(0.0, 0.0, 0.0)));
        while controller.advance(0.25).is_some() {}
        // Settled and drained; no further values until the next event.
        assert!(controller.advance(0.25).is_none());
    }
}
