//! Scene-graph behaviour: transform propagation, callback ordering, and
//! the isolation property — a failed asset (an empty node) in one subtree
//! never changes what the animators in a sibling subtree produce.

use std::{cell::RefCell, rc::Rc};

use cgmath::Vector3;
use drydock::{
    animate::{phase_from_x, FrameCallbacks, Hover},
    instance::Instance,
    scene::{Node, NodeKind, Scene},
};

fn hover_scene(with_failed_sibling: bool) -> (Scene, FrameCallbacks, drydock::scene::NodeId) {
    let mut scene = Scene::new();
    let mut callbacks = FrameCallbacks::new();

    if with_failed_sibling {
        // The degraded form of a ship whose asset never loaded.
        let wreck = scene.add(
            Scene::ROOT,
            "wreck",
            NodeKind::Group,
            Instance::at(Vector3::new(-4.0, 0.0, 0.0)),
        );
        scene.add(wreck, "hull", NodeKind::Empty, Instance::default());
    }

    let ship = scene.add(
        Scene::ROOT,
        "ship",
        NodeKind::Group,
        Instance::at(Vector3::new(2.8, 0.0, 0.0)),
    );
    let hover = Hover::new(0.0, phase_from_x(2.8));
    callbacks.register(
        ship,
        Box::new(move |node: &mut Node, t: f32| {
            node.local.position.y = hover.eval(t);
        }),
    );

    (scene, callbacks, ship)
}

#[test]
fn failed_sibling_does_not_change_animator_output() {
    let (mut plain, mut plain_cb, plain_ship) = hover_scene(false);
    let (mut degraded, mut degraded_cb, degraded_ship) = hover_scene(true);

    for i in 0..100 {
        let t = i as f32 * 0.37;
        plain_cb.run(&mut plain.root, t);
        degraded_cb.run(&mut degraded.root, t);

        let a = plain.root.find(plain_ship).unwrap().local.position.y;
        let b = degraded.root.find(degraded_ship).unwrap().local.position.y;
        assert_eq!(a, b, "sibling failure leaked into the animator at t = {t}");
    }
}

#[test]
fn empty_nodes_produce_no_draw_calls() {
    let (mut scene, _, _) = hover_scene(true);
    scene.update_world_transforms();
    let batches = scene.collect();
    assert!(batches.opaque.is_empty());
    assert!(batches.decor.is_empty());
}

#[test]
fn callbacks_run_in_registration_order() {
    let mut scene = Scene::new();
    let mut callbacks = FrameCallbacks::new();
    let node = scene.add(Scene::ROOT, "probe", NodeKind::Group, Instance::default());

    let order = Rc::new(RefCell::new(Vec::new()));
    for tag in ["first", "second", "third"] {
        let order = order.clone();
        callbacks.register(
            node,
            Box::new(move |_: &mut Node, _: f32| {
                order.borrow_mut().push(tag);
            }),
        );
    }

    callbacks.run(&mut scene.root, 0.0);
    callbacks.run(&mut scene.root, 1.0);
    assert_eq!(
        *order.borrow(),
        vec!["first", "second", "third", "first", "second", "third"]
    );
}

#[test]
fn callback_for_a_detached_node_is_dropped_without_side_effects() {
    let mut scene = Scene::new();
    let mut callbacks = FrameCallbacks::new();

    let doomed = scene.add(Scene::ROOT, "doomed", NodeKind::Group, Instance::default());
    let survivor = scene.add(
        Scene::ROOT,
        "survivor",
        NodeKind::Group,
        Instance::at(Vector3::new(1.0, 0.0, 0.0)),
    );

    let hover = Hover::new(0.0, phase_from_x(1.0));
    callbacks.register(
        doomed,
        Box::new(|node: &mut Node, _| {
            node.local.position.y = 99.0;
        }),
    );
    callbacks.register(
        survivor,
        Box::new(move |node: &mut Node, t: f32| {
            node.local.position.y = hover.eval(t);
        }),
    );
    assert_eq!(callbacks.len(), 2);

    // Unmount: the subtree detaches and drops.
    drop(scene.root.remove_child(doomed));

    callbacks.run(&mut scene.root, 4.2);
    assert_eq!(callbacks.len(), 1, "the stale callback should be dropped");
    let y = scene.root.find(survivor).unwrap().local.position.y;
    assert_eq!(y, hover.eval(4.2));
}

#[test]
fn nodes_are_reachable_by_name() {
    let (scene, _, ship) = hover_scene(true);
    assert_eq!(drydock::showcase::find_named(&scene.root, "ship"), Some(ship));
    assert!(drydock::showcase::find_named(&scene.root, "hull").is_some());
    assert_eq!(drydock::showcase::find_named(&scene.root, "missing"), None);
}

#[test]
fn world_transforms_follow_animated_locals() {
    let (mut scene, mut callbacks, ship) = hover_scene(false);
    let hover = Hover::new(0.0, phase_from_x(2.8));

    callbacks.run(&mut scene.root, 7.3);
    scene.update_world_transforms();

    let world = scene.root.find(ship).unwrap().world().clone();
    assert_eq!(world.position.y, hover.eval(7.3));
    assert_eq!(world.position.x, 2.8);
}
