//! Mesh representation for 3D models
//!
//! After loading, a scene is always a single `Mesh`: every glTF primitive of
//! every node is flattened into one vertex/index buffer, with per-face
//! material assignment kept through `MaterialGroup` index ranges.

use crate::foundation::math::{Mat4, Vec3, utils};

/// 3D vertex data structure for rendering
///
/// Position, normal, texture coordinate and vertex colour. The layout is
/// `#[repr(C)]` and plain-old-data so vertex buffers can be viewed as bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in 3D space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],

    /// Linear RGBA vertex colour, multiplied into the material colour
    pub color: [f32; 4],
}

impl Vertex {
    /// Create a new white vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    /// Position as a vector
    pub fn position_vec(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    /// Normal as a vector
    pub fn normal_vec(&self) -> Vec3 {
        Vec3::from(self.normal)
    }
}

/// Decoded RGBA8 texture image
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Tightly packed RGBA8 rows, top row first
    pub pixels: Vec<[u8; 4]>,
}

impl Texture {
    /// Create a texture from packed RGBA pixels
    ///
    /// Returns `None` when the pixel count does not match the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<[u8; 4]>) -> Option<Self> {
        (width > 0 && height > 0 && pixels.len() == (width as usize) * (height as usize))
            .then_some(Self { width, height, pixels })
    }

    /// Single-colour texture
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; (width as usize) * (height as usize)],
        }
    }

    /// Bilinear sample with repeat wrapping, returning linear [0, 1] RGBA
    ///
    /// glTF UV space has (0, 0) at the top-left of the image, which matches the
    /// row order of `pixels`.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let u = if u.is_finite() { u - u.floor() } else { 0.0 };
        let v = if v.is_finite() { v - v.floor() } else { 0.0 };

        let x = u * self.width as f32 - 0.5;
        let y = v * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let wrap = |value: f32, size: u32| -> usize {
            (value as i64).rem_euclid(i64::from(size)) as usize
        };
        let texel = |tx: f32, ty: f32| -> [f32; 4] {
            let idx = wrap(ty, self.height) * self.width as usize + wrap(tx, self.width);
            let p = self.pixels[idx];
            [
                f32::from(p[0]) / 255.0,
                f32::from(p[1]) / 255.0,
                f32::from(p[2]) / 255.0,
                f32::from(p[3]) / 255.0,
            ]
        };

        let c00 = texel(x0, y0);
        let c10 = texel(x0 + 1.0, y0);
        let c01 = texel(x0, y0 + 1.0);
        let c11 = texel(x0 + 1.0, y0 + 1.0);

        let mut out = [0.0; 4];
        for channel in 0..4 {
            let top = utils::lerp(c00[channel], c10[channel], fx);
            let bottom = utils::lerp(c01[channel], c11[channel], fx);
            out[channel] = utils::lerp(top, bottom, fy);
        }
        out
    }
}

/// Surface description used by the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Material name from the source asset, if any
    pub name: Option<String>,
    /// Linear RGBA base colour factor
    pub base_color: [f32; 4],
    /// Index into `Mesh::textures` of the base colour texture
    pub base_color_texture: Option<usize>,
}

impl Default for Material {
    /// Untextured light grey, the fallback for primitives without a material
    fn default() -> Self {
        Self {
            name: None,
            base_color: [0.8, 0.8, 0.8, 1.0],
            base_color_texture: None,
        }
    }
}

/// Contiguous run of triangles sharing one material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialGroup {
    /// First index (into `Mesh::indices`) of the run
    pub first_index: usize,
    /// Number of indices in the run (a multiple of three)
    pub index_count: usize,
    /// Index into `Mesh::materials`
    pub material: usize,
}

/// 3D mesh containing vertices and indices for rendering
///
/// The single renderable unit of a loaded scene. Triangles are stored as an
/// index list; `groups` partition that list by material.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex data
    pub vertices: Vec<Vertex>,

    /// Index data for triangles
    pub indices: Vec<u32>,

    /// Material runs over `indices`
    pub groups: Vec<MaterialGroup>,

    /// Materials referenced by `groups`
    pub materials: Vec<Material>,

    /// Textures referenced by `materials`
    pub textures: Vec<Texture>,
}

impl Mesh {
    /// Create a new single-material mesh
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let groups = if indices.is_empty() {
            Vec::new()
        } else {
            vec![MaterialGroup { first_index: 0, index_count: indices.len(), material: 0 }]
        };

        Self {
            vertices,
            indices,
            groups,
            materials: vec![Material::default()],
            textures: Vec::new(),
        }
    }

    /// Create a cube mesh of the given side length centred at `center`
    ///
    /// Each face has its own four vertices with outward normals and a full
    /// 0..1 UV square, so lighting differs per face.
    pub fn cube(center: Vec3, side: f32) -> Self {
        let h = side * 0.5;
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // normal, u axis, v axis
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u_axis, v_axis) in faces {
            let n = Vec3::from(normal);
            let u = Vec3::from(u_axis);
            let v = Vec3::from(v_axis);
            let base = u32::try_from(vertices.len()).unwrap_or(u32::MAX);
            for (su, sv, uv) in [(-1.0, -1.0, [0.0, 1.0]), (1.0, -1.0, [1.0, 1.0]), (1.0, 1.0, [1.0, 0.0]), (-1.0, 1.0, [0.0, 0.0])] {
                let p = center + (n + u * su + v * sv) * h;
                vertices.push(Vertex::new(p.into(), normal, uv));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self::new(vertices, indices)
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True when the mesh has no drawable triangles
    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0 || self.vertices.is_empty()
    }

    /// Material at `index`, or the default material when out of range
    pub fn material(&self, index: usize) -> &Material {
        self.materials.get(index).unwrap_or(&DEFAULT_MATERIAL)
    }

    /// Material used by the triangle starting at `first_index`
    pub fn material_for_index(&self, first_index: usize) -> &Material {
        self.groups
            .iter()
            .find(|g| first_index >= g.first_index && first_index < g.first_index + g.index_count)
            .map_or(&DEFAULT_MATERIAL, |g| self.material(g.material))
    }

    /// Translate every vertex
    pub fn translate(&mut self, offset: Vec3) {
        for vertex in &mut self.vertices {
            vertex.position = (vertex.position_vec() + offset).into();
        }
    }

    /// Uniformly scale every vertex about the origin
    pub fn scale(&mut self, factor: f32) {
        for vertex in &mut self.vertices {
            vertex.position = (vertex.position_vec() * factor).into();
        }
    }

    /// Apply an affine transform to positions and normals
    pub fn transform(&mut self, model: &Mat4) {
        let normal_matrix = utils::normal_matrix(model);
        for vertex in &mut self.vertices {
            let p = model.transform_point(&vertex.position_vec().into());
            vertex.position = p.coords.into();
            let n = normal_matrix * vertex.normal_vec();
            vertex.normal = n.try_normalize(f32::EPSILON).unwrap_or(n).into();
        }
    }

    /// Recompute smooth vertex normals from area-weighted face normals
    ///
    /// Vertices not referenced by any triangle keep a +Y normal.
    pub fn generate_normals(&mut self) {
        let mut accumulated = vec![Vec3::zeros(); self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= self.vertices.len() || b >= self.vertices.len() || c >= self.vertices.len() {
                continue;
            }
            let pa = self.vertices[a].position_vec();
            let pb = self.vertices[b].position_vec();
            let pc = self.vertices[c].position_vec();
            // Cross product length is twice the area, so larger faces weigh more
            let face_normal = (pb - pa).cross(&(pc - pa));
            accumulated[a] += face_normal;
            accumulated[b] += face_normal;
            accumulated[c] += face_normal;
        }

        for (vertex, normal) in self.vertices.iter_mut().zip(accumulated) {
            vertex.normal = normal
                .try_normalize(1e-12)
                .unwrap_or_else(Vec3::y)
                .into();
        }
    }
}

static DEFAULT_MATERIAL: Material = Material {
    name: None,
    base_color: [0.8, 0.8, 0.8, 1.0],
    base_color_texture: None,
};
