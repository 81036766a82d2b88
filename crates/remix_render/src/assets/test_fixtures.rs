//! In-memory binary glTF containers for tests

#![allow(missing_docs, clippy::cast_possible_truncation)]

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use crate::foundation::math::Vec3;
use crate::render::Mesh;

const COMPONENT_F32: u32 = 5126;
const COMPONENT_U32: u32 = 5125;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// One glTF primitive's attribute data
#[derive(Debug, Clone, Default)]
pub struct Primitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub indices: Option<Vec<u32>>,
    /// glTF topology code; triangles when `None`
    pub mode: Option<u32>,
    pub material: Option<usize>,
}

impl Primitive {
    /// Primitive carrying a mesh's positions, normals, UVs and indices
    pub fn from_mesh(mesh: &Mesh) -> Self {
        Self {
            positions: mesh.vertices.iter().map(|v| v.position).collect(),
            normals: Some(mesh.vertices.iter().map(|v| v.normal).collect()),
            uvs: Some(mesh.vertices.iter().map(|v| v.tex_coord).collect()),
            colors: None,
            indices: Some(mesh.indices.clone()),
            mode: None,
            material: None,
        }
    }

    /// Same primitive drawn with a material
    pub fn with_material(mut self, material: usize) -> Self {
        self.material = Some(material);
        self
    }
}

/// Assembles a GLB (JSON chunk + BIN chunk) from meshes, nodes and materials
#[derive(Debug, Default)]
pub struct GlbBuilder {
    bin: Vec<u8>,
    buffer_views: Vec<Value>,
    accessors: Vec<Value>,
    meshes: Vec<Value>,
    nodes: Vec<Value>,
    materials: Vec<Value>,
    textures: Vec<Value>,
    images: Vec<Value>,
    roots: Vec<usize>,
}

impl GlbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_view(&mut self, bytes: &[u8], target: Option<u32>) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let mut view = json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": bytes.len(),
        });
        if let Some(target) = target {
            view["target"] = json!(target);
        }
        self.bin.extend_from_slice(bytes);
        self.buffer_views.push(view);
        self.buffer_views.len() - 1
    }

    fn push_float_accessor<const N: usize>(&mut self, data: &[[f32; N]], kind: &str, with_bounds: bool) -> usize {
        let bytes: Vec<u8> = data.iter().flatten().flat_map(|c| c.to_le_bytes()).collect();
        let view = self.push_view(&bytes, Some(TARGET_ARRAY_BUFFER));
        let mut accessor = json!({
            "bufferView": view,
            "componentType": COMPONENT_F32,
            "count": data.len(),
            "type": kind,
        });
        if with_bounds {
            let mut min = [f32::MAX; N];
            let mut max = [f32::MIN; N];
            for item in data {
                for c in 0..N {
                    min[c] = min[c].min(item[c]);
                    max[c] = max[c].max(item[c]);
                }
            }
            accessor["min"] = json!(min.to_vec());
            accessor["max"] = json!(max.to_vec());
        }
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    fn push_index_accessor(&mut self, indices: &[u32]) -> usize {
        let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        let view = self.push_view(&bytes, Some(TARGET_ELEMENT_ARRAY_BUFFER));
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": COMPONENT_U32,
            "count": indices.len(),
            "type": "SCALAR",
        }));
        self.accessors.len() - 1
    }

    /// Add a mesh made of `primitives`, returning its index
    pub fn add_mesh(&mut self, primitives: &[Primitive]) -> usize {
        let mut encoded = Vec::new();
        for primitive in primitives {
            let mut attributes = Map::new();
            attributes.insert("POSITION".into(), json!(self.push_float_accessor(&primitive.positions, "VEC3", true)));
            if let Some(normals) = &primitive.normals {
                attributes.insert("NORMAL".into(), json!(self.push_float_accessor(normals, "VEC3", false)));
            }
            if let Some(uvs) = &primitive.uvs {
                attributes.insert("TEXCOORD_0".into(), json!(self.push_float_accessor(uvs, "VEC2", false)));
            }
            if let Some(colors) = &primitive.colors {
                attributes.insert("COLOR_0".into(), json!(self.push_float_accessor(colors, "VEC4", false)));
            }

            let mut entry = json!({ "attributes": attributes });
            if let Some(indices) = &primitive.indices {
                entry["indices"] = json!(self.push_index_accessor(indices));
            }
            if let Some(mode) = primitive.mode {
                entry["mode"] = json!(mode);
            }
            if let Some(material) = primitive.material {
                entry["material"] = json!(material);
            }
            encoded.push(entry);
        }

        self.meshes.push(json!({ "primitives": encoded }));
        self.meshes.len() - 1
    }

    /// Add an embedded PNG texture, returning the texture index
    pub fn add_png_texture(&mut self, png: &[u8]) -> usize {
        let view = self.push_view(png, None);
        self.images.push(json!({ "bufferView": view, "mimeType": "image/png" }));
        self.textures.push(json!({ "source": self.images.len() - 1 }));
        self.textures.len() - 1
    }

    /// Add a material, returning its index
    pub fn add_material(&mut self, base_color: [f32; 4], texture: Option<usize>) -> usize {
        let mut pbr = json!({ "baseColorFactor": base_color.to_vec() });
        if let Some(texture) = texture {
            pbr["baseColorTexture"] = json!({ "index": texture });
        }
        self.materials.push(json!({ "pbrMetallicRoughness": pbr }));
        self.materials.len() - 1
    }

    /// Add a node, returning its index
    pub fn add_node(&mut self, mesh: Option<usize>, translation: [f32; 3], children: Vec<usize>) -> usize {
        let mut node = json!({ "translation": translation.to_vec() });
        if let Some(mesh) = mesh {
            node["mesh"] = json!(mesh);
        }
        if !children.is_empty() {
            node["children"] = json!(children);
        }
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Make a node a root of the default scene
    pub fn add_root(&mut self, node: usize) {
        self.roots.push(node);
    }

    /// Serialize to GLB bytes
    pub fn build(&self) -> Vec<u8> {
        let mut bin = self.bin.clone();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let mut root = json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": self.roots }],
        });
        for (key, items) in [
            ("nodes", &self.nodes),
            ("meshes", &self.meshes),
            ("accessors", &self.accessors),
            ("bufferViews", &self.buffer_views),
            ("materials", &self.materials),
            ("textures", &self.textures),
            ("images", &self.images),
        ] {
            if !items.is_empty() {
                root[key] = json!(items);
            }
        }
        if !bin.is_empty() {
            root["buffers"] = json!([{ "byteLength": bin.len() }]);
        }

        let mut json_bytes = serde_json::to_vec(&root).unwrap();
        while json_bytes.len() % 4 != 0 {
            json_bytes.push(b' ');
        }

        let bin_chunk_len = if bin.is_empty() { 0 } else { 8 + bin.len() };
        let total_len = 12 + 8 + json_bytes.len() + bin_chunk_len;

        let mut glb = Vec::with_capacity(total_len);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total_len as u32).to_le_bytes());

        glb.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
        glb.extend_from_slice(&0x4E4F_534Au32.to_le_bytes()); // "JSON"
        glb.extend_from_slice(&json_bytes);

        if !bin.is_empty() {
            glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
            glb.extend_from_slice(&0x004E_4942u32.to_le_bytes()); // "BIN\0"
            glb.extend_from_slice(&bin);
        }
        glb
    }
}

/// Single cube of side `side` centred at `center`, baked into the vertices
pub fn cube_glb(center: [f32; 3], side: f32) -> Vec<u8> {
    let mut builder = GlbBuilder::new();
    let mesh = builder.add_mesh(&[Primitive::from_mesh(&Mesh::cube(Vec3::from(center), side))]);
    let node = builder.add_node(Some(mesh), [0.0; 3], Vec::new());
    builder.add_root(node);
    builder.build()
}

/// Three unit cubes across a two-level hierarchy
///
/// Root A at (4, 0, 0) with child at (0, 2, 0) relative to it; root B at
/// (-2, 0, 0) with a red material. Merged bounds are
/// (-2.5, -0.5, -0.5) .. (4.5, 2.5, 0.5).
pub fn multi_node_glb() -> Vec<u8> {
    let mut builder = GlbBuilder::new();
    let unit = Primitive::from_mesh(&Mesh::cube(Vec3::zeros(), 1.0));
    let red = builder.add_material([1.0, 0.0, 0.0, 1.0], None);

    let plain_cube = builder.add_mesh(&[unit.clone()]);
    let red_cube = builder.add_mesh(&[unit.with_material(red)]);

    let child = builder.add_node(Some(plain_cube), [0.0, 2.0, 0.0], Vec::new());
    let root_a = builder.add_node(Some(plain_cube), [4.0, 0.0, 0.0], vec![child]);
    let root_b = builder.add_node(Some(red_cube), [-2.0, 0.0, 0.0], Vec::new());
    builder.add_root(root_a);
    builder.add_root(root_b);
    builder.build()
}

/// 2x2 PNG checkerboard (red, green / blue, white)
pub fn checker_png() -> Vec<u8> {
    let mut image = image::RgbaImage::new(2, 2);
    image.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
    image.put_pixel(1, 0, image::Rgba([0, 255, 0, 255]));
    image.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
    image.put_pixel(1, 1, image::Rgba([255, 255, 255, 255]));

    let mut png = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    png
}

/// Unit quad in the XY plane with a checker texture and no normals
pub fn textured_quad_glb() -> Vec<u8> {
    let mut builder = GlbBuilder::new();
    let texture = builder.add_png_texture(&checker_png());
    let material = builder.add_material([1.0, 1.0, 1.0, 1.0], Some(texture));
    let mesh = builder.add_mesh(&[Primitive {
        positions: vec![[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [0.5, 0.5, 0.0], [-0.5, 0.5, 0.0]],
        uvs: Some(vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]),
        indices: Some(vec![0, 1, 2, 2, 3, 0]),
        material: Some(material),
        ..Primitive::default()
    }]);
    let node = builder.add_node(Some(mesh), [0.0; 3], Vec::new());
    builder.add_root(node);
    builder.build()
}

/// Write fixture bytes into `dir`
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
