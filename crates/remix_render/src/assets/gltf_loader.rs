//! glTF loader for 3D scenes
//!
//! Loads `.glb` (and self-contained `.gltf`) files and flattens every mesh
//! primitive reachable from the scene's node hierarchy into one [`Mesh`].
//! Node transforms are accumulated parent to child and baked into the vertex
//! data; each primitive keeps its material through a [`MaterialGroup`].

use std::path::Path;

use gltf::mesh::Mode;

use crate::foundation::math::Mat4;
use crate::render::{Material, MaterialGroup, Mesh, Vertex};

use super::{image_loader, AssetLoadError, AssetResult};

/// glTF scene loader
pub struct GltfLoader;

impl GltfLoader {
    /// Load a scene file and merge it into a single mesh
    ///
    /// # Errors
    /// * [`AssetLoadError::NotFound`] if `path` does not exist
    /// * [`AssetLoadError::UnsupportedFormat`] for anything but `.glb` / `.gltf`
    /// * [`AssetLoadError::Parse`] if the container is corrupt
    /// * [`AssetLoadError::EmptyScene`] if no triangles remain after merging
    pub fn load<P: AsRef<Path>>(path: P) -> AssetResult<Mesh> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AssetLoadError::NotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let (document, buffers, images) = match extension.as_deref() {
            Some("glb") => {
                let bytes = std::fs::read(path).map_err(|source| AssetLoadError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                gltf::import_slice(&bytes)?
            }
            Some("gltf") => gltf::import(path)?,
            _ => return Err(AssetLoadError::UnsupportedFormat(path.to_path_buf())),
        };

        log::debug!(
            "Parsed {:?}: {} meshes, {} nodes, {} materials, {} images",
            path,
            document.meshes().len(),
            document.nodes().len(),
            document.materials().len(),
            images.len()
        );

        let mesh = merge_document(&document, &buffers, &images)?;
        log::info!(
            "Loaded {:?}: {} vertices, {} triangles, {} materials",
            path,
            mesh.vertices.len(),
            mesh.triangle_count(),
            mesh.materials.len()
        );
        Ok(mesh)
    }

    /// Load a binary glTF container from memory
    pub fn load_from_slice(bytes: &[u8]) -> AssetResult<Mesh> {
        let (document, buffers, images) = gltf::import_slice(bytes)?;
        merge_document(&document, &buffers, &images)
    }
}

fn merge_document(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> AssetResult<Mesh> {
    let mut merger = SceneMerger::new(document, buffers, images);

    if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
        for node in scene.nodes() {
            merger.visit_node(&node, &Mat4::identity())?;
        }
    } else {
        log::warn!("Document has no scene; merging every mesh untransformed");
        for mesh in document.meshes() {
            merger.add_mesh(&mesh, &Mat4::identity())?;
        }
    }

    if merger.skipped_primitives > 0 {
        log::warn!("Skipped {} non-triangle primitives", merger.skipped_primitives);
    }

    let mesh = merger.mesh;
    if mesh.is_empty() {
        return Err(AssetLoadError::EmptyScene);
    }
    Ok(mesh)
}

/// Accumulates primitives into one mesh, deduplicating materials and textures
struct SceneMerger<'a> {
    buffers: &'a [gltf::buffer::Data],
    images: &'a [gltf::image::Data],
    mesh: Mesh,
    material_slots: Vec<Option<usize>>,
    default_material: Option<usize>,
    texture_slots: Vec<Option<Option<usize>>>,
    skipped_primitives: usize,
}

impl<'a> SceneMerger<'a> {
    fn new(document: &gltf::Document, buffers: &'a [gltf::buffer::Data], images: &'a [gltf::image::Data]) -> Self {
        Self {
            buffers,
            images,
            mesh: Mesh::default(),
            material_slots: vec![None; document.materials().len()],
            default_material: None,
            texture_slots: vec![None; images.len()],
            skipped_primitives: 0,
        }
    }

    fn visit_node(&mut self, node: &gltf::Node<'_>, parent: &Mat4) -> AssetResult<()> {
        let world = parent * Mat4::from(node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            self.add_mesh(&mesh, &world)?;
        }
        for child in node.children() {
            self.visit_node(&child, &world)?;
        }
        Ok(())
    }

    fn add_mesh(&mut self, mesh: &gltf::Mesh<'_>, world: &Mat4) -> AssetResult<()> {
        for primitive in mesh.primitives() {
            self.add_primitive(mesh.index(), &primitive, world)?;
        }
        Ok(())
    }

    fn add_primitive(&mut self, mesh_index: usize, primitive: &gltf::Primitive<'_>, world: &Mat4) -> AssetResult<()> {
        let invalid = |reason: String| AssetLoadError::InvalidGeometry {
            mesh: mesh_index,
            primitive: primitive.index(),
            reason,
        };

        let mode = primitive.mode();
        if !matches!(mode, Mode::Triangles | Mode::TriangleStrip | Mode::TriangleFan) {
            log::warn!(
                "Mesh {} primitive {} uses {:?}; only triangles are rendered",
                mesh_index,
                primitive.index(),
                mode
            );
            self.skipped_primitives += 1;
            return Ok(());
        }

        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| invalid("missing POSITION attribute".to_string()))?
            .collect();
        let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);

        let material = primitive.material();
        let uv_set = material
            .pbr_metallic_roughness()
            .base_color_texture()
            .map_or(0, |info| info.tex_coord());
        let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(uv_set).map(|tc| tc.into_f32().collect());
        let colors: Option<Vec<[f32; 4]>> = reader.read_colors(0).map(|c| c.into_rgba_f32().collect());

        let raw_indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => {
                let count = u32::try_from(positions.len())
                    .map_err(|_| invalid(format!("{} vertices exceed the index range", positions.len())))?;
                (0..count).collect()
            }
        };

        if mode == Mode::Triangles && raw_indices.len() % 3 != 0 {
            log::warn!(
                "Mesh {} primitive {}: {} indices is not a multiple of three; trailing indices dropped",
                mesh_index,
                primitive.index(),
                raw_indices.len()
            );
        }
        let indices = triangulate(mode, &raw_indices);
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(invalid(format!("index {bad} out of range for {} vertices", positions.len())));
        }
        if indices.is_empty() {
            return Ok(());
        }

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, position)| Vertex {
                position: *position,
                normal: normals.as_ref().and_then(|n| n.get(i)).copied().unwrap_or([0.0; 3]),
                tex_coord: uvs.as_ref().and_then(|t| t.get(i)).copied().unwrap_or([0.0; 2]),
                color: colors.as_ref().and_then(|c| c.get(i)).copied().unwrap_or([1.0; 4]),
            })
            .collect();

        let mut part = Mesh::new(vertices, indices);
        if normals.is_none() {
            log::debug!("Generating normals for mesh {} primitive {}", mesh_index, primitive.index());
            part.generate_normals();
        }
        part.transform(world);

        let material_index = self.material_index(&material);
        self.push_part(part, material_index).map_err(invalid)
    }

    fn push_part(&mut self, part: Mesh, material: usize) -> Result<(), String> {
        let vertex_offset = index_offset(self.mesh.vertices.len(), part.vertices.len())?;
        let first_index = self.mesh.indices.len();
        let index_count = part.indices.len();

        self.mesh.vertices.extend(part.vertices);
        self.mesh.indices.extend(part.indices.iter().map(|i| i + vertex_offset));

        match self.mesh.groups.last_mut() {
            Some(last) if last.material == material && last.first_index + last.index_count == first_index => {
                last.index_count += index_count;
            }
            _ => self.mesh.groups.push(MaterialGroup { first_index, index_count, material }),
        }
        Ok(())
    }

    fn material_index(&mut self, material: &gltf::Material<'_>) -> usize {
        let Some(source_index) = material.index() else {
            if let Some(slot) = self.default_material {
                return slot;
            }
            let slot = self.mesh.materials.len();
            self.mesh.materials.push(Material::default());
            self.default_material = Some(slot);
            return slot;
        };

        if let Some(Some(slot)) = self.material_slots.get(source_index) {
            return *slot;
        }

        let pbr = material.pbr_metallic_roughness();
        let base_color_texture = pbr
            .base_color_texture()
            .and_then(|info| self.texture_index(info.texture().source().index()));

        let slot = self.mesh.materials.len();
        self.mesh.materials.push(Material {
            name: material.name().map(str::to_string),
            base_color: pbr.base_color_factor(),
            base_color_texture,
        });
        if let Some(entry) = self.material_slots.get_mut(source_index) {
            *entry = Some(slot);
        }
        slot
    }

    fn texture_index(&mut self, image_index: usize) -> Option<usize> {
        if let Some(Some(cached)) = self.texture_slots.get(image_index) {
            return *cached;
        }

        let converted = self.images.get(image_index).and_then(image_loader::texture_from_gltf);
        let slot = converted.map(|texture| {
            self.mesh.textures.push(texture);
            self.mesh.textures.len() - 1
        });
        if slot.is_none() {
            log::warn!("Image {} cannot be used as a texture; using base colour only", image_index);
        }
        if let Some(entry) = self.texture_slots.get_mut(image_index) {
            *entry = Some(slot);
        }
        slot
    }
}

/// Expand strips and fans into a triangle list
/// Offset for a part's indices once appended after `existing` vertices
fn index_offset(existing: usize, added: usize) -> Result<u32, String> {
    existing
        .checked_add(added)
        .and_then(|total| u32::try_from(total).ok())
        .and_then(|_| u32::try_from(existing).ok())
        .ok_or_else(|| format!("merged mesh exceeds the u32 index range ({existing} + {added} vertices)"))
}

fn triangulate(mode: Mode, indices: &[u32]) -> Vec<u32> {
    match mode {
        Mode::TriangleStrip => (0..indices.len().saturating_sub(2))
            .flat_map(|i| {
                if i % 2 == 0 {
                    [indices[i], indices[i + 1], indices[i + 2]]
                } else {
                    [indices[i + 1], indices[i], indices[i + 2]]
                }
            })
            .collect(),
        Mode::TriangleFan => (1..indices.len().saturating_sub(1))
            .flat_map(|i| [indices[0], indices[i], indices[i + 1]])
            .collect(),
        _ => indices[..indices.len() - indices.len() % 3].to_vec(),
    }
}
