// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene assembly and binary glTF export
//!
//! The pipeline works in a Z-up frame; [`Scene::to_y_up`] turns everything
//! into the Y-up frame glTF viewers expect before export.

use crate::assets::Texture;
use crate::error::{ReconstructError, Result};
use floorplan_geometry::{apply_transform, Matrix4, Mesh, Vector3};
use rustc_hash::FxHashMap;
use serde_json::{json, Value};
use std::path::Path;

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const COMPONENT_FLOAT: u32 = 5126;
const COMPONENT_UNSIGNED_INT: u32 = 5125;

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub mesh: Mesh,
    /// Index into [`Scene::textures`]
    pub texture: Option<usize>,
}

/// Ordered collection of named meshes plus the textures they reference
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub textures: Vec<Texture>,
}

impl Scene {
    pub fn new(textures: Vec<Texture>) -> Self {
        Self {
            nodes: Vec::new(),
            textures,
        }
    }

    pub fn push(&mut self, name: impl Into<String>, mesh: Mesh, texture: Option<usize>) {
        self.nodes.push(SceneNode {
            name: name.into(),
            mesh,
            texture,
        });
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rotate every mesh by -90° about X: (x, y, z) becomes (x, z, -y)
    pub fn to_y_up(&mut self) {
        let rotation = Matrix4::from_axis_angle(&Vector3::x_axis(), -std::f64::consts::FRAC_PI_2);
        for node in &mut self.nodes {
            apply_transform(&mut node.mesh, &rotation);
        }
    }

    /// Write the scene as a GLB file, creating parent directories
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let glb = self.to_glb()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ReconstructError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, &glb)?;

        tracing::info!(
            objects = self.nodes.iter().filter(|n| !n.mesh.is_empty()).count(),
            bytes = glb.len(),
            path = %path.display(),
            "exported scene"
        );
        Ok(())
    }

    /// Encode the scene as a binary glTF 2.0 container.
    ///
    /// Empty meshes are left out; a scene without any geometry is an error.
    pub fn to_glb(&self) -> Result<Vec<u8>> {
        let nodes: Vec<&SceneNode> = self.nodes.iter().filter(|n| !n.mesh.is_empty()).collect();
        if nodes.is_empty() {
            return Err(ReconstructError::EmptyScene);
        }

        let mut builder = GltfBuilder::default();

        for texture in &self.textures {
            builder.add_image(texture);
        }

        let mut materials = vec![json!({
            "name": "Default",
            "pbrMetallicRoughness": {
                "baseColorFactor": [0.8, 0.8, 0.8, 1.0],
                "metallicFactor": 0.0,
                "roughnessFactor": 0.9
            }
        })];
        let mut texture_materials: FxHashMap<usize, usize> = FxHashMap::default();

        let mut meshes = Vec::with_capacity(nodes.len());
        let mut gltf_nodes = Vec::with_capacity(nodes.len());

        for (index, node) in nodes.iter().enumerate() {
            let material = match node.texture.filter(|&t| t < self.textures.len()) {
                Some(texture) => *texture_materials.entry(texture).or_insert_with(|| {
                    materials.push(json!({
                        "name": format!("Floor_{}", texture),
                        "pbrMetallicRoughness": {
                            "baseColorTexture": { "index": texture },
                            "metallicFactor": 0.0,
                            "roughnessFactor": 0.9
                        }
                    }));
                    materials.len() - 1
                }),
                None => 0,
            };

            let mut primitive = builder.add_mesh(&node.mesh);
            primitive["material"] = json!(material);

            meshes.push(json!({ "name": node.name, "primitives": [primitive] }));
            gltf_nodes.push(json!({ "name": node.name, "mesh": index }));
        }

        let mut gltf = json!({
            "asset": { "version": "2.0", "generator": "floorplan-reconstruct" },
            "scene": 0,
            "scenes": [{ "nodes": (0..nodes.len()).collect::<Vec<_>>() }],
            "nodes": gltf_nodes,
            "meshes": meshes,
            "materials": materials,
            "accessors": builder.accessors,
            "bufferViews": builder.views,
            "buffers": [{ "byteLength": builder.buffer.len() }],
        });

        if !self.textures.is_empty() {
            gltf["images"] = Value::Array(builder.images);
            gltf["samplers"] = json!([{ "magFilter": 9729, "minFilter": 9987, "wrapS": 10497, "wrapT": 10497 }]);
            gltf["textures"] = Value::Array(
                (0..self.textures.len())
                    .map(|i| json!({ "sampler": 0, "source": i }))
                    .collect(),
            );
        }

        let json_bytes = serde_json::to_vec(&gltf)?;
        Ok(write_container(json_bytes, builder.buffer))
    }
}

/// Accumulates the binary buffer and the JSON entries describing it
#[derive(Default)]
struct GltfBuilder {
    buffer: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
    images: Vec<Value>,
}

impl GltfBuilder {
    fn add_view(&mut self, bytes: &[u8], target: Option<u32>) -> usize {
        pad_to_four(&mut self.buffer, 0);
        let offset = self.buffer.len();
        self.buffer.extend_from_slice(bytes);

        let mut view = json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": bytes.len(),
        });
        if let Some(target) = target {
            view["target"] = json!(target);
        }
        self.views.push(view);
        self.views.len() - 1
    }

    fn add_floats(&mut self, values: &[f32], kind: &str, components: usize) -> usize {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = self.add_view(&bytes, Some(ARRAY_BUFFER));

        self.accessors.push(json!({
            "bufferView": view,
            "componentType": COMPONENT_FLOAT,
            "count": values.len() / components,
            "type": kind,
        }));
        self.accessors.len() - 1
    }

    /// POSITION accessors must carry bounds
    fn add_positions(&mut self, positions: &[f32]) -> usize {
        let index = self.add_floats(positions, "VEC3", 3);
        self.accessors[index]["min"] = json!(component_bounds(positions, 3, f32::min, f32::MAX));
        self.accessors[index]["max"] = json!(component_bounds(positions, 3, f32::max, f32::MIN));
        index
    }

    fn add_indices(&mut self, indices: &[u32]) -> usize {
        let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        let view = self.add_view(&bytes, Some(ELEMENT_ARRAY_BUFFER));
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": COMPONENT_UNSIGNED_INT,
            "count": indices.len(),
            "type": "SCALAR",
        }));
        self.accessors.len() - 1
    }

    /// Returns the primitive object; the caller sets its material
    fn add_mesh(&mut self, mesh: &Mesh) -> Value {
        let position = self.add_positions(&mesh.positions);
        let normal = self.add_floats(&mesh.normals, "VEC3", 3);

        let mut attributes = json!({ "POSITION": position, "NORMAL": normal });
        if mesh.has_uvs() {
            attributes["TEXCOORD_0"] = json!(self.add_floats(&mesh.uvs, "VEC2", 2));
        }

        let indices = self.add_indices(&mesh.indices);
        json!({ "attributes": attributes, "indices": indices, "mode": 4 })
    }

    fn add_image(&mut self, texture: &Texture) {
        let view = self.add_view(&texture.bytes, None);
        self.images.push(json!({
            "name": texture
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            "bufferView": view,
            "mimeType": texture.mime_type(),
        }));
    }
}

fn component_bounds(
    values: &[f32],
    components: usize,
    pick: fn(f32, f32) -> f32,
    init: f32,
) -> Vec<f32> {
    let mut bounds = vec![init; components];
    for chunk in values.chunks_exact(components) {
        for (bound, &v) in bounds.iter_mut().zip(chunk) {
            *bound = pick(*bound, v);
        }
    }
    bounds
}

fn pad_to_four(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

fn write_container(mut json_chunk: Vec<u8>, mut bin_chunk: Vec<u8>) -> Vec<u8> {
    pad_to_four(&mut json_chunk, b' ');
    pad_to_four(&mut bin_chunk, 0);

    let total = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let mut out = Vec::with_capacity(total);

    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_chunk);

    out.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&bin_chunk);

    out
}
