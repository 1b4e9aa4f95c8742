//! Asset loading: files to shared [`Model`] handles.
//!
//! Native builds read from the `assets/` directory next to the executable;
//! wasm builds fetch the same paths relative to the page origin. Both obj
//! and glTF sources end up as the same [`Model`] type, shared behind an
//! `Arc` so any number of scene nodes can reference one load.
//!
//! The [`AssetLibrary`] is the isolation boundary: each preload either
//! resolves to a handle or is recorded as failed with a warning, and a
//! failed asset degrades its scene nodes to empties instead of taking the
//! viewer down.

use std::{
    collections::HashMap,
    io::{BufReader, Cursor},
    sync::Arc,
};

use wgpu::util::DeviceExt;

use crate::{
    model::{Material, MaterialParams, Mesh, Model, ModelVertex},
    texture::Texture,
};

/// Shared, immutable reference to one loaded asset.
pub type AssetHandle = Arc<Model>;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> reqwest::Url {
    let window = web_sys::window().unwrap();
    let location = window.location();
    let origin = location.origin().unwrap();
    let base = reqwest::Url::parse(&format!("{}/assets/", origin)).unwrap();
    base.join(file_name).unwrap()
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name);
        reqwest::get(url).await?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        std::fs::read_to_string(path)?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name);
        reqwest::get(url).await?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        std::fs::read(path)?
    };

    Ok(data)
}

pub async fn load_texture(
    file_name: &str,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let data = load_binary(file_name).await?;
    Texture::from_bytes(
        device,
        queue,
        &data,
        file_name,
        file_name.rsplit('.').next(),
        is_normal_map,
    )
}

/// Ship hulls read best under the cyan rig at mid metalness/roughness, so
/// factors the source file declares are pinned to 0.5. Factors the source
/// never declared are left absent rather than invented.
fn stage_tuned(params: MaterialParams) -> MaterialParams {
    MaterialParams {
        metallic: params.metallic.map(|_| 0.5),
        roughness: params.roughness.map(|_| 0.5),
    }
}

/// Load a Wavefront obj (plus its mtl) into a model.
pub async fn load_obj_model(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<Model> {
    let obj_text = load_string(file_name).await?;
    let obj_cursor = Cursor::new(obj_text);
    let mut obj_reader = BufReader::new(obj_cursor);

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| async move {
            match load_string(&p).await {
                Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                Err(_) => Err(tobj::LoadError::OpenFileFailed),
            }
        },
    )
    .await?;

    let mut materials = Vec::new();
    for m in obj_materials? {
        let diffuse_texture = match &m.diffuse_texture {
            Some(path) => load_texture(path, false, device, queue).await?,
            None => {
                // mtl with plain colours and no map: bake the diffuse colour
                // into a single pixel.
                let rgb = m.diffuse.unwrap_or([1.0, 1.0, 1.0]);
                let pixel = [
                    (rgb[0] * 255.0) as u8,
                    (rgb[1] * 255.0) as u8,
                    (rgb[2] * 255.0) as u8,
                    255,
                ];
                Texture::from_pixel(device, queue, pixel, true, &m.name)
            }
        };
        let normal_texture = match &m.normal_texture {
            Some(path) => load_texture(path, true, device, queue).await?,
            None => Texture::create_default_normal_map(device, queue),
        };
        // obj has no metalness; map specular shininess onto roughness.
        let params = stage_tuned(MaterialParams {
            metallic: None,
            roughness: m.shininess.map(|s| 1.0 - (s / 1000.0).clamp(0.0, 1.0)),
        });
        materials.push(Material::new(
            device,
            &m.name,
            diffuse_texture,
            normal_texture,
            params,
            layout,
        ));
    }
    if materials.is_empty() {
        materials.push(fallback_material(device, queue, layout));
    }

    let meshes = models
        .iter()
        .map(|m| {
            let mut vertices: Vec<ModelVertex> = (0..m.mesh.positions.len() / 3)
                .map(|i| ModelVertex {
                    position: [
                        m.mesh.positions[i * 3],
                        m.mesh.positions[i * 3 + 1],
                        m.mesh.positions[i * 3 + 2],
                    ],
                    tex_coords: [
                        m.mesh.texcoords.get(i * 2).copied().unwrap_or(0.0),
                        1.0 - m.mesh.texcoords.get(i * 2 + 1).copied().unwrap_or(0.0),
                    ],
                    normal: [
                        m.mesh.normals.get(i * 3).copied().unwrap_or(0.0),
                        m.mesh.normals.get(i * 3 + 1).copied().unwrap_or(0.0),
                        m.mesh.normals.get(i * 3 + 2).copied().unwrap_or(0.0),
                    ],
                    tangent: [0.0; 3],
                    bitangent: [0.0; 3],
                })
                .collect();
            compute_tangents(&mut vertices, &m.mesh.indices);
            upload_mesh(
                device,
                file_name,
                &vertices,
                &m.mesh.indices,
                m.mesh.material_id.unwrap_or(0),
            )
        })
        .collect();

    Ok(Model { meshes, materials })
}

/// Load a glTF/glb file into a model. The node hierarchy is flattened; the
/// scene graph above decides placement, not the source file.
pub async fn load_gltf_model(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<Model> {
    let bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_reader(BufReader::new(Cursor::new(bytes)))?;

    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                if let Some(blob) = gltf.blob.as_deref() {
                    buffer_data.push(blob.into());
                }
            }
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_binary(uri).await?);
            }
        }
    }

    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let diffuse_texture = match pbr.base_color_texture() {
            Some(info) => {
                gltf_texture(device, queue, &info.texture(), &buffer_data, false).await?
            }
            None => {
                let c = pbr.base_color_factor();
                let pixel = [
                    (c[0] * 255.0) as u8,
                    (c[1] * 255.0) as u8,
                    (c[2] * 255.0) as u8,
                    255,
                ];
                Texture::from_pixel(device, queue, pixel, true, "base color")
            }
        };
        let normal_texture = match material.normal_texture() {
            Some(info) => gltf_texture(device, queue, &info.texture(), &buffer_data, true).await?,
            None => Texture::create_default_normal_map(device, queue),
        };
        let params = stage_tuned(MaterialParams {
            metallic: Some(pbr.metallic_factor()),
            roughness: Some(pbr.roughness_factor()),
        });
        let name = material.name().unwrap_or(file_name);
        materials.push(Material::new(
            device,
            name,
            diffuse_texture,
            normal_texture,
            params,
            layout,
        ));
    }
    if materials.is_empty() {
        materials.push(fallback_material(device, queue, layout));
    }

    let mut meshes = Vec::new();
    for mesh in gltf.meshes() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffer_data[buffer.index()]));
            let positions: Vec<[f32; 3]> = match reader.read_positions() {
                Some(iter) => iter.collect(),
                None => continue,
            };
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);
            let tex_coords: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|iter| iter.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let mut vertices: Vec<ModelVertex> = positions
                .iter()
                .zip(normals.iter())
                .zip(tex_coords.iter())
                .map(|((&position, &normal), &tex_coords)| ModelVertex {
                    position,
                    tex_coords,
                    normal,
                    tangent: [0.0; 3],
                    bitangent: [0.0; 3],
                })
                .collect();
            compute_tangents(&mut vertices, &indices);

            let name = mesh.name().unwrap_or(file_name);
            meshes.push(upload_mesh(
                device,
                name,
                &vertices,
                &indices,
                primitive.material().index().unwrap_or(0),
            ));
        }
    }

    Ok(Model { meshes, materials })
}

async fn gltf_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &gltf::Texture<'_>,
    buffer_data: &[Vec<u8>],
    is_normal_map: bool,
) -> anyhow::Result<Texture> {
    match texture.source().source() {
        gltf::image::Source::View { view, .. } => {
            let start = view.offset();
            let end = start + view.length();
            let bytes = &buffer_data[view.buffer().index()][start..end];
            Texture::from_bytes(device, queue, bytes, "embedded", None, is_normal_map)
        }
        gltf::image::Source::Uri { uri, .. } => {
            load_texture(uri, is_normal_map, device, queue).await
        }
    }
}

fn fallback_material(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> Material {
    Material::new(
        device,
        "fallback",
        Texture::from_pixel(device, queue, [200, 200, 200, 255], true, "fallback"),
        Texture::create_default_normal_map(device, queue),
        MaterialParams::default(),
        layout,
    )
}

/// Accumulate per-triangle tangents/bitangents and average them per vertex.
/// Obj files never carry tangent frames and glTF only sometimes does, so we
/// always derive them from the UV layout.
fn compute_tangents(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in indices.chunks(3) {
        if c.len() < 3 {
            continue;
        }
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        let pos0: cgmath::Vector3<f32> = vertices[i0].position.into();
        let pos1: cgmath::Vector3<f32> = vertices[i1].position.into();
        let pos2: cgmath::Vector3<f32> = vertices[i2].position.into();
        let uv0: cgmath::Vector2<f32> = vertices[i0].tex_coords.into();
        let uv1: cgmath::Vector2<f32> = vertices[i1].tex_coords.into();
        let uv2: cgmath::Vector2<f32> = vertices[i2].tex_coords.into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() < f32::EPSILON {
            // Degenerate UVs give no tangent direction.
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // Flipped so right-handed normal maps work with wgpu's texture
        // coordinate system.
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for &i in &[i0, i1, i2] {
            vertices[i].tangent =
                (tangent + cgmath::Vector3::from(vertices[i].tangent)).into();
            vertices[i].bitangent =
                (bitangent + cgmath::Vector3::from(vertices[i].bitangent)).into();
            triangles_included[i] += 1;
        }
    }

    for (i, n) in triangles_included.into_iter().enumerate() {
        if n == 0 {
            continue;
        }
        let denom = 1.0 / n as f32;
        let v = &mut vertices[i];
        v.tangent = (cgmath::Vector3::from(v.tangent) * denom).into();
        v.bitangent = (cgmath::Vector3::from(v.bitangent) * denom).into();
    }
}

fn upload_mesh(
    device: &wgpu::Device,
    name: &str,
    vertices: &[ModelVertex],
    indices: &[u32],
    material: usize,
) -> Mesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{name} vertex buffer")),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{name} index buffer")),
        contents: bytemuck::cast_slice(indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    Mesh {
        name: name.to_string(),
        vertex_buffer,
        index_buffer,
        num_elements: indices.len() as u32,
        material,
    }
}

/// Pick a loader from the file extension.
pub async fn load_model(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<Model> {
    match file_name.rsplit('.').next() {
        Some("obj") => load_obj_model(file_name, device, queue, layout).await,
        Some("gltf") | Some("glb") => load_gltf_model(file_name, device, queue, layout).await,
        other => anyhow::bail!("unsupported mesh format: {other:?} ({file_name})"),
    }
}

/// Preloaded assets keyed by source path. One load per path; every scene
/// node placing that asset shares the same handle.
#[derive(Default)]
pub struct AssetLibrary {
    loaded: HashMap<String, AssetHandle>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every path before the scene mounts, so nothing pops in later.
    ///
    /// A failed load is logged and recorded as absent; it does not abort
    /// the other loads, and looking the path up later yields `None`.
    pub async fn preload(
        &mut self,
        paths: &[&str],
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) {
        let loads = paths
            .iter()
            .map(|path| load_model(path, device, queue, layout));
        for (path, result) in paths.iter().zip(futures::future::join_all(loads).await) {
            match result {
                Ok(model) => {
                    log::info!(
                        "loaded {path}: {} meshes, {} materials",
                        model.meshes.len(),
                        model.materials.len()
                    );
                    self.loaded.insert(path.to_string(), Arc::new(model));
                }
                Err(err) => {
                    log::warn!("failed to load {path}, its nodes will stay empty: {err:#}");
                }
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<AssetHandle> {
        self.loaded.get(path).cloned()
    }

    /// Register a generated model under a path-like key (quads for dust and
    /// nebula sprites use this).
    pub fn insert(&mut self, key: &str, model: Model) -> AssetHandle {
        let handle = Arc::new(model);
        self.loaded.insert(key.to_string(), handle.clone());
        handle
    }
}

/// A unit quad facing +z, used for the instanced dust and nebula sprites.
/// One soft radial texture is generated in memory; no file involved.
pub fn sprite_quad(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    tint: [u8; 4],
) -> Model {
    let vertices = [
        sprite_vertex([-0.5, -0.5, 0.0], [0.0, 1.0]),
        sprite_vertex([0.5, -0.5, 0.0], [1.0, 1.0]),
        sprite_vertex([0.5, 0.5, 0.0], [1.0, 0.0]),
        sprite_vertex([-0.5, 0.5, 0.0], [0.0, 0.0]),
    ];
    let indices: [u32; 6] = [0, 1, 2, 0, 2, 3];

    let diffuse = Texture::radial_sprite(device, queue, 64, tint);
    let normal = Texture::create_default_normal_map(device, queue);
    let material = Material::new(
        device,
        "sprite",
        diffuse,
        normal,
        MaterialParams::default(),
        layout,
    );

    let mesh = upload_mesh(device, "sprite quad", &vertices, &indices, 0);
    Model {
        meshes: vec![mesh],
        materials: vec![material],
    }
}

/// A flat deck plane in the xz plane, facing up. Receives the rig's light
/// and grounds the ships visually; plain colour, no maps.
pub fn deck_plane(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    size: f32,
    color: [u8; 3],
    params: MaterialParams,
) -> Model {
    let h = size / 2.0;
    let vertices = [
        deck_vertex([-h, 0.0, -h], [0.0, 0.0]),
        deck_vertex([-h, 0.0, h], [0.0, 1.0]),
        deck_vertex([h, 0.0, h], [1.0, 1.0]),
        deck_vertex([h, 0.0, -h], [1.0, 0.0]),
    ];
    let indices: [u32; 6] = [0, 1, 2, 0, 2, 3];

    let diffuse = Texture::from_pixel(
        device,
        queue,
        [color[0], color[1], color[2], 255],
        true,
        "deck",
    );
    let normal = Texture::create_default_normal_map(device, queue);
    let material = Material::new(device, "deck", diffuse, normal, params, layout);

    let mesh = upload_mesh(device, "deck plane", &vertices, &indices, 0);
    Model {
        meshes: vec![mesh],
        materials: vec![material],
    }
}

fn deck_vertex(position: [f32; 3], tex_coords: [f32; 2]) -> ModelVertex {
    ModelVertex {
        position,
        tex_coords,
        normal: [0.0, 1.0, 0.0],
        tangent: [1.0, 0.0, 0.0],
        bitangent: [0.0, 0.0, 1.0],
    }
}

fn sprite_vertex(position: [f32; 3], tex_coords: [f32; 2]) -> ModelVertex {
    ModelVertex {
        position,
        tex_coords,
        normal: [0.0, 0.0, 1.0],
        tangent: [1.0, 0.0, 0.0],
        bitangent: [0.0, 1.0, 0.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tangents_are_averaged_over_shared_vertices() {
        let mut vertices = vec![
            sprite_vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
            sprite_vertex([1.0, 0.0, 0.0], [1.0, 0.0]),
            sprite_vertex([0.0, 1.0, 0.0], [0.0, 1.0]),
            sprite_vertex([1.0, 1.0, 0.0], [1.0, 1.0]),
        ];
        for v in &mut vertices {
            v.tangent = [0.0; 3];
            v.bitangent = [0.0; 3];
        }
        compute_tangents(&mut vertices, &[0, 1, 2, 2, 1, 3]);
        // Axis-aligned UVs: tangent follows +x on every vertex.
        for v in &vertices {
            assert!(v.tangent[0] > 0.9, "tangent {:?}", v.tangent);
            assert!(v.tangent[1].abs() < 1e-5);
        }
    }

    #[test]
    fn degenerate_uvs_leave_tangents_zero() {
        let mut vertices = vec![
            sprite_vertex([0.0, 0.0, 0.0], [0.5, 0.5]),
            sprite_vertex([1.0, 0.0, 0.0], [0.5, 0.5]),
            sprite_vertex([0.0, 1.0, 0.0], [0.5, 0.5]),
        ];
        for v in &mut vertices {
            v.tangent = [0.0; 3];
            v.bitangent = [0.0; 3];
        }
        compute_tangents(&mut vertices, &[0, 1, 2]);
        assert_eq!(vertices[0].tangent, [0.0; 3]);
    }

    #[test]
    fn stage_tuning_only_touches_declared_factors() {
        let declared = stage_tuned(MaterialParams {
            metallic: Some(0.9),
            roughness: Some(0.1),
        });
        assert_eq!(declared.metallic, Some(0.5));
        assert_eq!(declared.roughness, Some(0.5));

        let absent = stage_tuned(MaterialParams::default());
        assert_eq!(absent.metallic, None);
        assert_eq!(absent.roughness, None);
    }
}
