//! End-to-end properties of the pure viewer logic: model fitting, pointer
//! targeting and tween retargeting, exercised together the way the event
//! loop drives them.

use cgmath::Vector3;

use vitrine::data_structures::bounds::{Aabb, FIT_TARGET_SIZE, fit_transform};
use vitrine::interaction::{InteractionController, TWEEN_DURATION, rotation_target};

#[test]
fn known_bounding_box_is_centered_and_fitted() {
    // The unit-cube box from (-1,-1,-1) to (1,1,1): diagonal ~3.464.
    let aabb: Aabb = [
        Vector3::new(-1.0, -1.0, -1.0),
        Vector3::new(1.0, 1.0, 1.0),
    ]
    .into_iter()
    .collect();

    let fitted = fit_transform(&aabb);

    assert!((aabb.diagonal() - 3.464).abs() < 1e-3);
    assert!((fitted.scale.x - 0.577).abs() < 1e-3);
    assert!((fitted.scale.x * aabb.diagonal() - FIT_TARGET_SIZE).abs() < 1e-5);
    // The box was already centered, so the position stays at the origin.
    assert_eq!(fitted.position, Vector3::new(0.0, 0.0, 0.0));
}

#[test]
fn off_center_model_is_shifted_by_its_negated_center() {
    let aabb: Aabb = [Vector3::new(3.0, 5.0, 7.0), Vector3::new(5.0, 9.0, 11.0)]
        .into_iter()
        .collect();

    let fitted = fit_transform(&aabb);
    assert_eq!(fitted.position, -aabb.center());
    assert!((fitted.scale.x * aabb.diagonal() - FIT_TARGET_SIZE).abs() < 1e-5);
}

#[test]
fn two_rapid_pointer_events_settle_on_the_second_target_only() {
    let mut controller = InteractionController::new();
    let rotation = Some(Vector3::new(0.0, 0.0, 0.0));
    let (w, h) = (1280.0, 720.0);

    // First event at t = 0 toward the top-left corner.
    controller.pointer_moved(0.0, 0.0, w, h, rotation);
    // 0.1 s of frames later the second event retargets mid-flight.
    controller.advance(0.1);
    controller.pointer_moved(1280.0, 720.0, w, h, rotation);

    // Drain well past the tween duration.
    let mut frames = 0;
    let mut last = Vector3::new(0.0, 0.0, 0.0);
    while let Some(value) = controller.advance(1.0 / 60.0) {
        last = value;
        frames += 1;
        assert!(frames < 10_000, "tween never settled");
    }
    assert!(frames as f32 / 60.0 >= TWEEN_DURATION);

    let second_target = rotation_target(1280.0, 720.0, w, h);
    assert!((last.x - second_target.x).abs() < 1e-5);
    assert!((last.y - second_target.y).abs() < 1e-5);

    let first_target = rotation_target(0.0, 0.0, w, h);
    // The abandoned first target points the other way entirely.
    assert!((last.x - first_target.x).abs() > 0.1);
}

#[test]
fn pointer_storm_without_a_model_never_panics_or_produces_motion() {
    let mut controller = InteractionController::new();
    for i in 0..1000 {
        controller.pointer_moved((i % 640) as f64, (i % 480) as f64, 640.0, 480.0, None);
    }
    assert!(controller.advance(1.0).is_none());
}
