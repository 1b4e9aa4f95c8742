//! The cinematic orbit: circle invariant, the pinned end-to-end vector,
//! and the force-disabled interactive input.

use drydock::camera::{Camera, CameraInput, OrbitController};

#[test]
fn orbit_stays_on_its_circle() {
    let mut camera = Camera::new((5.0, 5.0, 7.0));
    let radius_squared =
        camera.position.x * camera.position.x + camera.position.z * camera.position.z;
    let orbit = OrbitController::new(0.05);

    for i in 0..1000 {
        orbit.update(&mut camera, i as f32 * 0.016);
        let actual =
            camera.position.x * camera.position.x + camera.position.z * camera.position.z;
        assert!(
            (actual - radius_squared).abs() < 1e-2,
            "left the orbit circle at step {i}: {actual} vs {radius_squared}"
        );
        assert_eq!(camera.position.y, 5.0);
    }
}

#[test]
fn orbit_position_at_ten_seconds() {
    // radius from (100, 10) is sqrt(100^2 + 10^2) = 100.499;
    // at speed 0.05 and t = 10 the angle is 0.5 rad.
    let mut camera = Camera::new((100.0, 2.0, 10.0));
    let orbit = OrbitController::new(0.05);

    orbit.update(&mut camera, 10.0);

    assert!(
        (camera.position.x - 48.19).abs() < 1e-2,
        "x = {}",
        camera.position.x
    );
    assert!(
        (camera.position.z - 88.17).abs() < 1e-2,
        "z = {}",
        camera.position.z
    );
}

#[test]
fn orbit_is_restart_safe() {
    // The angle comes from absolute elapsed time, so a fresh controller
    // evaluated once lands exactly where many small steps do.
    let orbit = OrbitController::new(0.05);

    let mut stepped = Camera::new((5.0, 5.0, 7.0));
    for i in 1..=625 {
        orbit.update(&mut stepped, i as f32 * 0.016);
    }

    let mut direct = Camera::new((5.0, 5.0, 7.0));
    orbit.update(&mut direct, 10.0);

    assert!((stepped.position.x - direct.position.x).abs() < 1e-3);
    assert!((stepped.position.z - direct.position.z).abs() < 1e-3);
}

#[test]
fn external_dolly_permanently_changes_the_orbit() {
    // The radius is recomputed from the live position each frame, so a
    // one-off external move sticks for the rest of the session.
    let mut camera = Camera::new((3.0, 5.0, 4.0));
    let orbit = OrbitController::new(0.05);

    orbit.update(&mut camera, 1.0);
    camera.position.x *= 2.0;
    camera.position.z *= 2.0;
    orbit.update(&mut camera, 2.0);

    let radius =
        (camera.position.x * camera.position.x + camera.position.z * camera.position.z).sqrt();
    assert!((radius - 10.0).abs() < 1e-3, "radius = {radius}");
}

#[test]
fn disabled_input_discards_scroll() {
    let mut camera = Camera::new((5.0, 5.0, 7.0));
    let before = camera.position;

    let mut input = CameraInput::new(3.0, 20.0);
    input.handle_window_events(&winit::event::WindowEvent::MouseWheel {
        device_id: winit::event::DeviceId::dummy(),
        delta: winit::event::MouseScrollDelta::LineDelta(0.0, 2.0),
        phase: winit::event::TouchPhase::Moved,
    });
    input.set_enabled(false);
    input.apply(&mut camera);

    assert_eq!(camera.position, before);
}

#[test]
fn enabled_input_dollies_within_the_clamp() {
    let mut camera = Camera::new((0.0, 0.0, 10.0));
    let mut input = CameraInput::new(3.0, 20.0);

    // A huge scroll-in still stops at the near clamp.
    input.handle_window_events(&winit::event::WindowEvent::MouseWheel {
        device_id: winit::event::DeviceId::dummy(),
        delta: winit::event::MouseScrollDelta::LineDelta(0.0, 100.0),
        phase: winit::event::TouchPhase::Moved,
    });
    input.apply(&mut camera);

    assert!((camera.position.z - 3.0).abs() < 1e-4, "z = {}", camera.position.z);
}
