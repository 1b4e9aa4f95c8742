//! The typed scene graph.
//!
//! A scene is one tree of [`Node`]s with parent-owns-child lifetime:
//! dropping a node drops its whole subtree, so detaching can never leave a
//! dangling reference. Each node carries a local transform and the world
//! transform computed from it; traversal is a plain recursive walk, both
//! for transform propagation and for collecting the frame's draw calls and
//! lights.
//!
//! Node payloads:
//! - `Group` — pure hierarchy,
//! - `Mesh` — one placed copy of a shared asset with its own instance buffer,
//! - `Particles` — many pre-composed copies of a shared asset (dust, nebulae),
//! - `Light` — a light rig entry,
//! - `Empty` — the degraded state of a failed asset load; renders nothing
//!   and isolates the failure from sibling subtrees.

use crate::{
    assets::AssetHandle,
    instance::{Instance, InstanceRaw},
    lights::{LightDescriptor, PlacedLight},
    model::Model,
};

pub type NodeId = u32;

/// One placed, shadow-annotated copy of a loaded asset.
///
/// The vertex/index/material data stays in the shared handle; the node owns
/// only its per-copy GPU state, so mutating this copy cannot leak into
/// other copies of the same asset.
pub struct MeshInstance {
    pub asset: AssetHandle,
    pub instance_buffer: wgpu::Buffer,
    pub casts_shadow: bool,
    pub receives_shadow: bool,
}

impl MeshInstance {
    pub fn new(device: &wgpu::Device, asset: AssetHandle) -> Self {
        use wgpu::util::DeviceExt;
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh instance buffer"),
            contents: bytemuck::cast_slice(&[Instance::default().to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            asset,
            instance_buffer,
            casts_shadow: true,
            receives_shadow: true,
        }
    }
}

/// A static cloud of decorative copies sharing one geometry and material.
///
/// The per-copy transforms are composed once at build time and the buffer
/// is never rewritten; repeated decorative elements reference the shared
/// asset instead of owning anything per element.
pub struct ParticleCloud {
    pub asset: AssetHandle,
    pub instance_buffer: wgpu::Buffer,
    pub count: u32,
}

impl ParticleCloud {
    pub fn new(device: &wgpu::Device, asset: AssetHandle, transforms: &[Instance]) -> Self {
        use wgpu::util::DeviceExt;
        let raw: Vec<InstanceRaw> = transforms.iter().map(Instance::to_raw).collect();
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("particle cloud instance buffer"),
            contents: bytemuck::cast_slice(&raw),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            asset,
            instance_buffer,
            count: transforms.len() as u32,
        }
    }
}

pub enum NodeKind {
    Group,
    Mesh(MeshInstance),
    Particles(ParticleCloud),
    Light(LightDescriptor),
    Empty,
}

pub struct Node {
    id: NodeId,
    pub name: String,
    pub local: Instance,
    world: Instance,
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// World transform as of the last propagation pass.
    pub fn world(&self) -> &Instance {
        &self.world
    }

    pub fn add_child(&mut self, child: Node) -> NodeId {
        let id = child.id;
        self.children.push(child);
        id
    }

    /// Detach a direct child subtree; the caller owns (and usually drops) it.
    pub fn remove_child(&mut self, id: NodeId) -> Option<Node> {
        let idx = self.children.iter().position(|c| c.id == id)?;
        Some(self.children.remove(idx))
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Recompute world transforms for this subtree from the parent's world.
    pub fn update_world_transforms(&mut self, parent_world: &Instance) {
        self.world = parent_world * &self.local;
        for child in &mut self.children {
            child.update_world_transforms(&self.world);
        }
    }

    /// Upload the world transform of every mesh node in this subtree.
    /// Particle buffers are static and skipped.
    pub fn write_instance_buffers(&self, queue: &wgpu::Queue) {
        if let NodeKind::Mesh(mesh) = &self.kind {
            queue.write_buffer(
                &mesh.instance_buffer,
                0,
                bytemuck::cast_slice(&[self.world.to_raw()]),
            );
        }
        for child in &self.children {
            child.write_instance_buffers(queue);
        }
    }

    /// Gather draw calls and placed lights for this subtree.
    pub fn collect<'a>(&'a self, out: &mut FrameBatches<'a>) {
        match &self.kind {
            NodeKind::Mesh(mesh) => out.opaque.push(DrawCall {
                model: &mesh.asset,
                instances: &mesh.instance_buffer,
                count: 1,
            }),
            NodeKind::Particles(cloud) => out.decor.push(DrawCall {
                model: &cloud.asset,
                instances: &cloud.instance_buffer,
                count: cloud.count,
            }),
            NodeKind::Light(descriptor) => out.lights.push(PlacedLight {
                position: self.world.position,
                descriptor: descriptor.clone(),
            }),
            NodeKind::Group | NodeKind::Empty => (),
        }
        for child in &self.children {
            child.collect(out);
        }
    }

    /// The light descriptor of this node, if it is a light.
    pub fn light_mut(&mut self) -> Option<&mut LightDescriptor> {
        match &mut self.kind {
            NodeKind::Light(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

pub struct DrawCall<'a> {
    pub model: &'a Model,
    pub instances: &'a wgpu::Buffer,
    pub count: u32,
}

/// Everything one frame needs from the graph, gathered in a single walk.
#[derive(Default)]
pub struct FrameBatches<'a> {
    pub opaque: Vec<DrawCall<'a>>,
    pub decor: Vec<DrawCall<'a>>,
    pub lights: Vec<PlacedLight>,
}

/// The scene: a root group node plus the id allocator for new nodes.
pub struct Scene {
    pub root: Node,
    next_id: NodeId,
}

impl Scene {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            root: Node {
                id: Self::ROOT,
                name: "root".to_string(),
                local: Instance::default(),
                world: Instance::default(),
                kind: NodeKind::Group,
                children: Vec::new(),
            },
            next_id: 1,
        }
    }

    /// Build a detached node with a fresh id; attach it via
    /// [`Node::add_child`] or [`Scene::add`].
    pub fn node(&mut self, name: &str, kind: NodeKind) -> Node {
        let id = self.next_id;
        self.next_id += 1;
        Node {
            id,
            name: name.to_string(),
            local: Instance::default(),
            world: Instance::default(),
            kind,
            children: Vec::new(),
        }
    }

    /// Build a node and attach it under `parent` in one step. An unknown
    /// parent attaches at the root and logs a warning.
    pub fn add(&mut self, parent: NodeId, name: &str, kind: NodeKind, local: Instance) -> NodeId {
        let mut node = self.node(name, kind);
        node.local = local;
        let id = node.id;
        match self.root.find_mut(parent) {
            Some(parent_node) => {
                parent_node.add_child(node);
            }
            None => {
                log::warn!("parent node {parent} not found, attaching {name:?} at the root");
                self.root.add_child(node);
            }
        }
        id
    }

    /// Run the recursive transform pass from the root.
    pub fn update_world_transforms(&mut self) {
        let identity = Instance::default();
        self.root.update_world_transforms(&identity);
    }

    /// Gather this frame's draw calls and lights.
    pub fn collect(&self) -> FrameBatches<'_> {
        let mut out = FrameBatches {
            opaque: Vec::new(),
            decor: Vec::new(),
            lights: Vec::new(),
        };
        self.root.collect(&mut out);
        out
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    #[test]
    fn world_transforms_compose_down_the_tree() {
        let mut scene = Scene::new();
        let wing = scene.add(
            Scene::ROOT,
            "wing",
            NodeKind::Group,
            Instance::at(Vector3::new(0.0, 1.0, 0.0)),
        );
        let fighter = scene.add(
            wing,
            "fighter",
            NodeKind::Group,
            Instance::at(Vector3::new(3.0, 0.0, 0.0)),
        );

        scene.update_world_transforms();

        let node = scene.root.find(fighter).unwrap();
        assert_eq!(node.world().position, Vector3::new(3.0, 1.0, 0.0));
    }

    #[test]
    fn removing_a_child_detaches_the_whole_subtree() {
        let mut scene = Scene::new();
        let wing = scene.add(Scene::ROOT, "wing", NodeKind::Group, Instance::default());
        let fighter = scene.add(wing, "fighter", NodeKind::Group, Instance::default());

        let detached = scene.root.remove_child(wing).unwrap();
        assert!(detached.find(fighter).is_some());
        assert!(scene.root.find(fighter).is_none());
    }

    #[test]
    fn unknown_parent_falls_back_to_root() {
        let mut scene = Scene::new();
        let id = scene.add(999, "stray", NodeKind::Group, Instance::default());
        assert!(scene.root.children.iter().any(|c| c.id() == id));
    }

    #[test]
    fn collect_places_lights_at_world_position() {
        let mut scene = Scene::new();
        let rig = scene.add(
            Scene::ROOT,
            "rig",
            NodeKind::Group,
            Instance::at(Vector3::new(0.0, 2.0, 0.0)),
        );
        scene.add(
            rig,
            "bounce",
            NodeKind::Light(crate::lights::LightDescriptor::point([1.0; 3], 0.3, 8.0)),
            Instance::at(Vector3::new(0.0, 0.2, 0.0)),
        );

        scene.update_world_transforms();
        let batches = scene.collect();
        assert_eq!(batches.lights.len(), 1);
        assert_eq!(batches.lights[0].position, Vector3::new(0.0, 2.2, 0.0));
    }
}
