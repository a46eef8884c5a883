// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Door/window models and floor textures
//!
//! Models are Wavefront OBJ files (positions and faces only); textures are
//! PNG or JPEG images that are embedded as-is in the exported scene.

use crate::error::{ReconstructError, Result};
use floorplan_geometry::{Mesh, Point3, Vector3};
use image::ImageFormat;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File locations of every external asset a run needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetPaths {
    pub door_model: PathBuf,
    pub window_model: PathBuf,
    #[serde(default)]
    pub floor_textures: Vec<PathBuf>,
}

/// A loaded OBJ model
#[derive(Debug, Clone)]
pub struct AssetModel {
    pub path: PathBuf,
    pub mesh: Mesh,
}

impl AssetModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ReconstructError::Asset {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mesh = parse_obj(&source).map_err(|reason| ReconstructError::Asset {
            path: path.to_path_buf(),
            reason,
        })?;

        tracing::debug!(
            path = %path.display(),
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "loaded model"
        );

        Ok(Self {
            path: path.to_path_buf(),
            mesh,
        })
    }

    /// Edge lengths of the model's bounding box
    pub fn extents(&self) -> Vector3<f64> {
        self.mesh.extents()
    }

    /// True when the file name marks a small window variant
    pub fn is_small_variant(&self) -> bool {
        self.path.to_string_lossy().to_lowercase().contains("small")
    }
}

/// An encoded floor texture
#[derive(Debug, Clone)]
pub struct Texture {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let texture_error = |reason: String| ReconstructError::Texture {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = std::fs::read(path).map_err(|e| texture_error(e.to_string()))?;
        Self::from_bytes(path, bytes).map_err(texture_error)
    }

    fn from_bytes(path: &Path, bytes: Vec<u8>) -> std::result::Result<Self, String> {
        let format = image::guess_format(&bytes).map_err(|e| e.to_string())?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
            return Err(format!("unsupported image format {:?}", format));
        }

        let decoded =
            image::load_from_memory_with_format(&bytes, format).map_err(|e| e.to_string())?;

        Ok(Self {
            path: path.to_path_buf(),
            width: decoded.width(),
            height: decoded.height(),
            bytes,
            format,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "image/jpeg",
            _ => "image/png",
        }
    }
}

/// Every asset of a run, loaded and validated up front
#[derive(Debug, Clone)]
pub struct AssetLibrary {
    pub door: AssetModel,
    pub window: AssetModel,
    /// Distinct textures, in first-seen order
    pub textures: Vec<Texture>,
}

impl AssetLibrary {
    pub fn load(paths: &AssetPaths) -> Result<Self> {
        let door = AssetModel::load(&paths.door_model)?;
        let window = AssetModel::load(&paths.window_model)?;

        let mut seen: FxHashSet<&Path> = FxHashSet::default();
        let mut textures = Vec::with_capacity(paths.floor_textures.len());
        for path in &paths.floor_textures {
            if !seen.insert(path.as_path()) {
                continue;
            }
            textures.push(Texture::load(path)?);
        }

        tracing::info!(
            door = %door.path.display(),
            window = %window.path.display(),
            textures = textures.len(),
            "assets loaded"
        );

        Ok(Self {
            door,
            window,
            textures,
        })
    }
}

/// Parse the geometry of a Wavefront OBJ file.
///
/// Reads `v` and `f` records; texture and normal references in faces are
/// ignored, negative (relative) indices are resolved, polygons are fanned.
/// Each triangle gets its own vertices with a flat normal.
pub fn parse_obj(source: &str) -> std::result::Result<Mesh, String> {
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut faces: Vec<[usize; 3]> = Vec::new();

    for (line_no, line) in source.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coords: Vec<f64> = tokens
                    .take(3)
                    .map(|t| t.parse::<f64>())
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
                if coords.len() != 3 {
                    return Err(format!("line {}: vertex needs 3 coordinates", line_no + 1));
                }
                positions.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let indices: Vec<usize> = tokens
                    .map(|t| resolve_index(t, positions.len()))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
                if indices.len() < 3 {
                    return Err(format!("line {}: face needs 3 vertices", line_no + 1));
                }
                for i in 1..indices.len() - 1 {
                    faces.push([indices[0], indices[i], indices[i + 1]]);
                }
            }
            _ => {}
        }
    }

    if faces.is_empty() {
        return Err("model has no faces".to_string());
    }

    let mut mesh = Mesh::with_capacity(faces.len() * 3, faces.len() * 3);
    for [a, b, c] in faces {
        let (pa, pb, pc) = (positions[a], positions[b], positions[c]);
        let Some(normal) = (pb - pa).cross(&(pc - pa)).try_normalize(1e-12) else {
            continue;
        };
        let base = mesh.vertex_count() as u32;
        mesh.add_vertex(pa, normal);
        mesh.add_vertex(pb, normal);
        mesh.add_vertex(pc, normal);
        mesh.add_triangle(base, base + 1, base + 2);
    }

    if mesh.is_empty() {
        return Err("model has only degenerate faces".to_string());
    }
    Ok(mesh)
}

fn resolve_index(token: &str, vertex_count: usize) -> std::result::Result<usize, String> {
    let raw = token.split('/').next().unwrap_or_default();
    let value: i64 = raw
        .parse()
        .map_err(|_| format!("bad face index '{}'", token))?;

    let resolved = if value > 0 {
        value - 1
    } else if value < 0 {
        vertex_count as i64 + value
    } else {
        return Err("face index 0 is invalid".to_string());
    };

    if resolved < 0 || resolved as usize >= vertex_count {
        return Err(format!("face index {} out of range", value));
    }
    Ok(resolved as usize)
}
