//! Time-eased interpolation toward a retargetable goal.
//!
//! A [`Tween`] carries a value from wherever it currently is toward a target
//! over a fixed duration with a cubic ease-out curve. Retargeting restarts
//! the motion from the current in-flight value, so a burst of pointer events
//! never queues: the last target wins.

use cgmath::Vector3;

/// Cubic ease-out: fast start, smooth landing.
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

/// An interruptible interpolation of a `Vector3` value.
#[derive(Clone, Debug)]
pub struct Tween {
    from: Vector3<f32>,
    to: Vector3<f32>,
    duration: f32,
    elapsed: f32,
}

impl Tween {
    /// A tween that rests at `value` until the first retarget.
    pub fn idle(value: Vector3<f32>) -> Self {
        Self {
            from: value,
            to: value,
            duration: 0.0,
            elapsed: 0.0,
        }
    }

    /// The current in-flight value.
    pub fn value(&self) -> Vector3<f32> {
        if self.duration <= 0.0 || self.elapsed >= self.duration {
            return self.to;
        }
        let eased = ease_out_cubic(self.elapsed / self.duration);
        self.from + (self.to - self.from) * eased
    }

    pub fn target(&self) -> Vector3<f32> {
        self.to
    }

    pub fn is_settled(&self) -> bool {
        self.duration <= 0.0 || self.elapsed >= self.duration
    }

    /// Interrupt the motion and head for a new target.
    ///
    /// The new segment starts at the current in-flight value, not at the old
    /// target, so interrupted motions never snap.
    pub fn retarget(&mut self, to: Vector3<f32>, duration: f32) {
        self.from = self.value();
        self.to = to;
        self.duration = duration.max(0.0);
        self.elapsed = 0.0;
    }

    /// Advance time and return the new value.
    pub fn advance(&mut self, dt: f32) -> Vector3<f32> {
        if !self.is_settled() {
            self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
        }
        self.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    fn vec(x: f32, y: f32, z: f32) -> Vector3<f32> {
        Vector3::new(x, y, z)
    }

    #[test]
    fn ease_out_is_monotone_and_clamped() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(-1.0), 0.0);
        assert_eq!(ease_out_cubic(2.0), 1.0);
        let mut last = 0.0;
        for i in 1..=100 {
            let v = ease_out_cubic(i as f32 / 100.0);
            assert!(v >= last);
            last = v;
        }
    }

    #[test]
    fn reaches_target_at_duration() {
        let mut tween = Tween::idle(vec(0.0, 0.0, 0.0));
        tween.retarget(vec(1.0, 2.0, 3.0), 0.7);
        assert!(!tween.is_settled());

        tween.advance(0.35);
        let mid = tween.value();
        assert!(mid.magnitude() > 0.0);
        assert!(mid.magnitude() < vec(1.0, 2.0, 3.0).magnitude());

        tween.advance(0.35);
        assert!(tween.is_settled());
        assert_eq!(tween.value(), vec(1.0, 2.0, 3.0));

        // Advancing past the end stays put.
        tween.advance(10.0);
        assert_eq!(tween.value(), vec(1.0, 2.0, 3.0));
    }

    #[test]
    fn rapid_retargets_are_last_event_wins() {
        let mut tween = Tween::idle(vec(0.0, 0.0, 0.0));
        tween.retarget(vec(1.0, 0.0, 0.0), 0.7);
        tween.advance(0.1);
        // Second event arrives before the first finishes.
        tween.retarget(vec(0.0, 1.0, 0.0), 0.7);
        tween.advance(0.7);

        // Only the second target is reached; the first is abandoned mid-flight.
        assert_eq!(tween.value(), vec(0.0, 1.0, 0.0));
        assert_eq!(tween.target(), vec(0.0, 1.0, 0.0));
    }

    #[test]
    fn retarget_resumes_from_in_flight_value() {
        let mut tween = Tween::idle(vec(0.0, 0.0, 0.0));
        tween.retarget(vec(1.0, 0.0, 0.0), 1.0);
        tween.advance(0.5);
        let in_flight = tween.value();
        assert!(in_flight.x > 0.0 && in_flight.x < 1.0);

        tween.retarget(vec(-1.0, 0.0, 0.0), 1.0);
        // Immediately after the interrupt the value has not snapped anywhere.
        assert_eq!(tween.value(), in_flight);
    }

    #[test]
    fn zero_duration_snaps() {
        let mut tween = Tween::idle(vec(0.0, 0.0, 0.0));
        tween.retarget(vec(4.0, 5.0, 6.0), 0.0);
        assert!(tween.is_settled());
        assert_eq!(tween.value(), vec(4.0, 5.0, 6.0));
    }
}
