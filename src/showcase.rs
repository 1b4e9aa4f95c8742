//! The showcase scene: the main ship and its fighter escort on a lit deck,
//! drifting dust and far nebula sprites, under the fixed light rig.
//!
//! Everything here is compile-time data plus the wiring of animators to
//! nodes. Frame callbacks are registered in a fixed order (main ship hover,
//! accent hue, then per fighter: sway, engine pulse), which pins the
//! per-frame mutation order.

use cgmath::{Deg, Quaternion, Rotation3, Vector3};

use crate::{
    animate::{phase_from_x, FighterSway, FrameCallbacks, Hover, HueDrift, Pulse},
    assets::{self, AssetLibrary},
    context::Context,
    instance::Instance,
    lights,
    model::MaterialParams,
    scene::{MeshInstance, Node, NodeId, NodeKind, ParticleCloud, Scene},
};

pub const MAIN_SHIP: &str = "models/main_ship.glb";
pub const FIGHTER: &str = "models/fighter.glb";
pub const ASSET_PATHS: &[&str] = &[MAIN_SHIP, FIGHTER];

const MAIN_SHIP_SCALE: f32 = 1.0;
// Fighters sit at a quarter of the main ship's scale.
const FIGHTER_SCALE: f32 = 0.25;

const FIGHTER_POSTS: [(Vector3<f32>, f32); 3] = [
    (Vector3::new(2.8, 0.6, -1.6), -35.0),
    (Vector3::new(-3.2, 0.3, 1.2), 140.0),
    (Vector3::new(1.8, -0.4, 2.6), 20.0),
];

const DUST_COUNT: usize = 120;
const NEBULA_COUNT: usize = 6;

/// Assemble the scene tree and its frame callbacks.
///
/// A missing asset degrades its node to [`NodeKind::Empty`]; the animators
/// stay registered on the surrounding group, so a failed load changes
/// nothing about how sibling subtrees behave.
pub fn build(ctx: &Context, assets: &mut AssetLibrary) -> (Scene, FrameCallbacks) {
    let mut scene = Scene::new();
    let mut callbacks = FrameCallbacks::new();

    build_deck(ctx, assets, &mut scene);
    build_main_ship(ctx, assets, &mut scene, &mut callbacks);
    build_fighters(ctx, assets, &mut scene, &mut callbacks);
    build_light_rig(&mut scene);
    build_decorations(ctx, assets, &mut scene);

    log::info!(
        "scene built: {} frame callbacks registered",
        callbacks.len()
    );
    (scene, callbacks)
}

fn build_deck(ctx: &Context, assets: &mut AssetLibrary, scene: &mut Scene) {
    let deck = assets.insert(
        "generated/deck",
        assets::deck_plane(
            &ctx.device,
            &ctx.queue,
            &ctx.material_layout,
            50.0,
            [0x16, 0x1e, 0x26],
            MaterialParams {
                metallic: Some(0.2),
                roughness: Some(0.8),
            },
        ),
    );
    let mut mesh = MeshInstance::new(&ctx.device, deck);
    mesh.casts_shadow = false;
    scene.add(
        Scene::ROOT,
        "deck",
        NodeKind::Mesh(mesh),
        Instance::at(Vector3::new(0.0, -0.5, 0.0)),
    );
}

fn build_main_ship(
    ctx: &Context,
    assets: &AssetLibrary,
    scene: &mut Scene,
    callbacks: &mut FrameCallbacks,
) {
    let ship = scene.add(
        Scene::ROOT,
        "main ship",
        NodeKind::Group,
        Instance::default(),
    );

    let hull_kind = match assets.get(MAIN_SHIP) {
        Some(asset) => NodeKind::Mesh(MeshInstance::new(&ctx.device, asset)),
        None => NodeKind::Empty,
    };
    scene.add(
        ship,
        "hull",
        hull_kind,
        Instance::at_scaled(Vector3::new(0.0, 0.0, 0.0), MAIN_SHIP_SCALE),
    );

    let accent = scene.add(
        ship,
        "accent light",
        NodeKind::Light(lights::accent()),
        Instance::at(Vector3::new(0.0, 1.2, 0.0)),
    );

    // Gentle bobbing of the whole ship group.
    let hover = Hover::new(0.0, phase_from_x(0.0));
    callbacks.register(
        ship,
        Box::new(move |node: &mut Node, t: f32| {
            node.local.position.y = hover.eval(t);
        }),
    );

    // Throttled hue rotation on the accent light; colour holds between
    // evaluations.
    let drift = HueDrift::new(190.0, 12.0);
    callbacks.register(
        accent,
        Box::new(move |node: &mut Node, t: f32| {
            if let Some(hue) = drift.eval(t) {
                if let Some(light) = node.light_mut() {
                    light.color = crate::animate::hue_to_rgb(hue);
                }
            }
        }),
    );
}

fn build_fighters(
    ctx: &Context,
    assets: &AssetLibrary,
    scene: &mut Scene,
    callbacks: &mut FrameCallbacks,
) {
    let fighter_asset = assets.get(FIGHTER);

    for (index, (post, yaw_deg)) in FIGHTER_POSTS.iter().enumerate() {
        let yaw = Quaternion::from_angle_y(Deg(*yaw_deg));
        let mut local = Instance::at(*post);
        local.rotation = yaw;
        let group = scene.add(
            Scene::ROOT,
            &format!("fighter {index}"),
            NodeKind::Group,
            local,
        );

        let body_kind = match &fighter_asset {
            Some(asset) => NodeKind::Mesh(MeshInstance::new(&ctx.device, asset.clone())),
            None => NodeKind::Empty,
        };
        scene.add(
            group,
            "body",
            body_kind,
            Instance::at_scaled(Vector3::new(0.0, 0.0, 0.0), FIGHTER_SCALE),
        );

        let glow = scene.add(
            group,
            "engine glow",
            NodeKind::Light(lights::engine_glow()),
            Instance::at(Vector3::new(0.0, 0.1, -0.6)),
        );

        // Phase from the spawn x keeps the three fighters out of lockstep.
        let phase = phase_from_x(post.x);
        let sway = FighterSway::new(*post, phase);
        callbacks.register(
            group,
            Box::new(move |node: &mut Node, t: f32| {
                node.local.position = sway.eval_position(t);
                node.local.rotation = yaw * sway.eval_roll(t);
            }),
        );

        let pulse = Pulse::new(lights::engine_glow().intensity, 0.35, 2.0).with_phase(phase);
        callbacks.register(
            glow,
            Box::new(move |node: &mut Node, t: f32| {
                if let Some(light) = node.light_mut() {
                    light.intensity = pulse.eval(t);
                }
            }),
        );
    }
}

fn build_light_rig(scene: &mut Scene) {
    let rig = scene.add(Scene::ROOT, "light rig", NodeKind::Group, Instance::default());
    for (name, position, descriptor) in lights::global_rig() {
        scene.add(
            rig,
            name,
            NodeKind::Light(descriptor),
            Instance::at(position),
        );
    }
}

fn build_decorations(ctx: &Context, assets: &mut AssetLibrary, scene: &mut Scene) {
    let dust_sprite = assets.insert(
        "generated/dust",
        assets::sprite_quad(
            &ctx.device,
            &ctx.queue,
            &ctx.material_layout,
            [0xbf, 0xe8, 0xff, 0x50],
        ),
    );
    let nebula_sprite = assets.insert(
        "generated/nebula",
        assets::sprite_quad(
            &ctx.device,
            &ctx.queue,
            &ctx.material_layout,
            [0x4c, 0x6f, 0xb8, 0x30],
        ),
    );

    scene.add(
        Scene::ROOT,
        "dust",
        NodeKind::Particles(ParticleCloud::new(
            &ctx.device,
            dust_sprite,
            &scatter_shell(0x00d5_57a1, DUST_COUNT, 6.0, 18.0, 0.03, 0.09),
        )),
        Instance::default(),
    );
    scene.add(
        Scene::ROOT,
        "nebula",
        NodeKind::Particles(ParticleCloud::new(
            &ctx.device,
            nebula_sprite,
            &scatter_shell(0x0b1e_77c3, NEBULA_COUNT, 20.0, 28.0, 6.0, 12.0),
        )),
        Instance::default(),
    );
}

/// Deterministic scatter of sprite transforms in a spherical shell.
/// Seeded so the decoration layout is identical every run.
fn scatter_shell(
    seed: u32,
    count: usize,
    min_radius: f32,
    max_radius: f32,
    min_scale: f32,
    max_scale: f32,
) -> Vec<Instance> {
    let mut rng = Lcg(seed);
    (0..count)
        .map(|_| {
            let theta = rng.next() * std::f32::consts::TAU;
            // Flattened toward the deck plane.
            let height = (rng.next() - 0.3) * max_radius * 0.6;
            let radius = min_radius + rng.next() * (max_radius - min_radius);
            let scale = min_scale + rng.next() * (max_scale - min_scale);

            let mut instance = Instance::at_scaled(
                Vector3::new(theta.cos() * radius, height, theta.sin() * radius),
                scale,
            );
            instance.rotation = Quaternion::from_angle_y(Deg(rng.next() * 360.0))
                * Quaternion::from_angle_z(Deg(rng.next() * 360.0));
            instance
        })
        .collect()
}

struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.0 >> 8) as f32 / 16_777_216.0
    }
}

/// Look a node up by name; placement and tests use this instead of
/// keeping ids around.
pub fn find_named(node: &Node, name: &str) -> Option<NodeId> {
    if node.name == name {
        return Some(node.id());
    }
    node.children.iter().find_map(|c| find_named(c, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_is_deterministic() {
        let a = scatter_shell(42, 16, 5.0, 10.0, 0.1, 0.2);
        let b = scatter_shell(42, 16, 5.0, 10.0, 0.1, 0.2);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.position, y.position);
            assert_eq!(x.scale, y.scale);
        }
    }

    #[test]
    fn scatter_respects_the_shell() {
        for instance in scatter_shell(7, 64, 6.0, 18.0, 0.03, 0.09) {
            let planar =
                (instance.position.x.powi(2) + instance.position.z.powi(2)).sqrt();
            assert!((6.0..=18.0).contains(&planar), "radius {planar}");
            assert!((0.03..=0.09).contains(&instance.scale.x));
        }
    }

    #[test]
    fn fighter_posts_have_distinct_phases() {
        let phases: Vec<f32> = FIGHTER_POSTS
            .iter()
            .map(|(post, _)| phase_from_x(post.x))
            .collect();
        assert!(phases[0] != phases[1] && phases[1] != phases[2] && phases[0] != phases[2]);
    }
}
