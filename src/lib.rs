//! drydock
//!
//! A cinematic spaceship showcase: the viewer loads a main ship and its
//! fighter escort, stages them on a lit deck inside a dusty nebula, and
//! renders continuously while the camera orbits the scene. Runs natively
//! and in the browser (wasm) on the same wgpu/winit stack.
//!
//! High-level modules
//! - `animate`: pure time-driven animators and the frame-callback registry
//! - `assets`: obj/glTF loading and the preloaded asset library
//! - `camera`: orbit controller, projection and camera GPU resources
//! - `composer`: the application event loop and per-frame pipeline
//! - `context`: the explicitly owned GPU/window context
//! - `instance`: local/world transforms and their instanced GPU layout
//! - `lights`: light descriptors, the rig tables and GPU packing
//! - `model`: mesh/material/model types and their draw calls
//! - `pipelines`: render pipeline construction and WGSL shaders
//! - `scene`: the typed scene-graph tree
//! - `showcase`: the concrete scene this viewer stages
//! - `texture`: texture creation, samplers and the depth target
//!

pub mod animate;
pub mod assets;
pub mod camera;
pub mod composer;
pub mod context;
pub mod instance;
pub mod lights;
pub mod model;
pub mod pipelines;
pub mod scene;
pub mod showcase;
pub mod texture;

pub use composer::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point; the page provides a canvas with id `canvas`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    if let Err(e) = run() {
        log::error!("viewer exited with an error: {e}");
    }
}
