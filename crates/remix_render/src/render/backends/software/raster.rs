//! Triangle rasterisation and shading
//!
//! Triangles are transformed to clip space, clipped against the near plane,
//! then scan-converted with edge functions over their screen bounding box.
//! Attributes are interpolated perspective-correctly through `1/w`. There is
//! no back-face culling: scanned assets are frequently open or inconsistently
//! wound, so both sides are drawn and the shading normal is turned towards
//! the viewer.

use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};
use crate::render::{LightingEnvironment, Material, Mesh, Texture, Vertex};

use super::framebuffer::Framebuffer;

/// Per-capture inputs shared by every triangle
#[derive(Debug, Clone, Copy)]
pub struct ShadingContext<'a> {
    /// World to clip transform
    pub view_projection: Mat4,
    /// Camera position in world space
    pub eye: Vec3,
    /// Lights visible to the scene
    pub lighting: &'a LightingEnvironment,
}

/// Counters from one draw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    /// Triangles read from the mesh
    pub triangles: usize,
    /// Triangles discarded entirely by near clipping or zero screen area
    pub rejected: usize,
    /// Fragments that passed the depth test
    pub fragments: usize,
}

impl std::ops::AddAssign for RasterStats {
    fn add_assign(&mut self, rhs: Self) {
        self.triangles += rhs.triangles;
        self.rejected += rhs.rejected;
        self.fragments += rhs.fragments;
    }
}

#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    clip: Vec4,
    world: Vec3,
    normal: Vec3,
    uv: Vec2,
    color: Vec4,
}

impl ClipVertex {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            clip: self.clip.lerp(&other.clip, t),
            world: self.world.lerp(&other.world, t),
            normal: self.normal.lerp(&other.normal, t),
            uv: self.uv.lerp(&other.uv, t),
            color: self.color.lerp(&other.color, t),
        }
    }
}

/// Draw every material group of `mesh`
pub fn draw_mesh(framebuffer: &mut Framebuffer, mesh: &Mesh, ctx: &ShadingContext<'_>) -> RasterStats {
    let mut stats = RasterStats::default();

    for group in &mesh.groups {
        let Some(indices) = mesh.indices.get(group.first_index..group.first_index + group.index_count) else {
            log::warn!("Material group {:?} exceeds the index buffer; skipped", group);
            continue;
        };
        let material = mesh.material(group.material);
        let texture = material.base_color_texture.and_then(|t| mesh.textures.get(t));

        for tri in indices.chunks_exact(3) {
            stats.triangles += 1;
            let fetched = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices.get(i as usize));
            let [Some(a), Some(b), Some(c)] = fetched else {
                stats.rejected += 1;
                continue;
            };

            let to_clip = |v: &Vertex| {
                let p = v.position_vec();
                ClipVertex {
                    clip: ctx.view_projection * Vec4::new(p.x, p.y, p.z, 1.0),
                    world: p,
                    normal: v.normal_vec(),
                    uv: Vec2::from(v.tex_coord),
                    color: Vec4::from(v.color),
                }
            };

            let polygon = clip_near(&[to_clip(a), to_clip(b), to_clip(c)]);
            if polygon.len() < 3 {
                stats.rejected += 1;
                continue;
            }

            for i in 1..polygon.len() - 1 {
                let fragments = rasterize_triangle(
                    framebuffer,
                    [polygon[0], polygon[i], polygon[i + 1]],
                    material,
                    texture,
                    ctx,
                );
                stats.fragments += fragments;
            }
        }
    }

    stats
}

/// Clip a triangle against `z >= 0` in clip space (the near plane)
fn clip_near(triangle: &[ClipVertex; 3]) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let a = triangle[i];
        let b = triangle[(i + 1) % 3];
        let a_inside = a.clip.z >= 0.0;
        let b_inside = b.clip.z >= 0.0;

        if a_inside {
            out.push(a);
        }
        if a_inside != b_inside {
            let t = a.clip.z / (a.clip.z - b.clip.z);
            out.push(a.lerp(&b, t));
        }
    }
    out
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rasterize_triangle(
    framebuffer: &mut Framebuffer,
    vertices: [ClipVertex; 3],
    material: &Material,
    texture: Option<&Texture>,
    ctx: &ShadingContext<'_>,
) -> usize {
    let width = framebuffer.width() as f32;
    let height = framebuffer.height() as f32;

    let inv_w = vertices.map(|v| 1.0 / v.clip.w);
    let screen = [0, 1, 2].map(|i| {
        let ndc = vertices[i].clip.xyz() * inv_w[i];
        (Vec2::new((ndc.x + 1.0) * 0.5 * width, (ndc.y + 1.0) * 0.5 * height), ndc.z)
    });
    let [(s0, z0), (s1, z1), (s2, z2)] = screen;

    let area = edge(s0, s1, s2);
    if !area.is_finite() || area.abs() < 1e-12 {
        return 0;
    }

    let min_x = s0.x.min(s1.x).min(s2.x).floor().max(0.0);
    let min_y = s0.y.min(s1.y).min(s2.y).floor().max(0.0);
    let max_x = s0.x.max(s1.x).max(s2.x).ceil().min(width - 1.0);
    let max_y = s0.y.max(s1.y).max(s2.y).ceil().min(height - 1.0);
    if min_x > max_x || min_y > max_y {
        return 0;
    }

    let mut fragments = 0;
    for py in min_y as u32..=max_y as u32 {
        for px in min_x as u32..=max_x as u32 {
            let p = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
            // Dividing by the signed area makes interior weights positive for either winding
            let b0 = edge(s1, s2, p) / area;
            let b1 = edge(s2, s0, p) / area;
            let b2 = edge(s0, s1, p) / area;
            if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                continue;
            }

            let depth = b0 * z0 + b1 * z1 + b2 * z2;
            if !(0.0..=1.0).contains(&depth) || !framebuffer.passes_depth(px, py, depth) {
                continue;
            }

            let p0 = b0 * inv_w[0];
            let p1 = b1 * inv_w[1];
            let p2 = b2 * inv_w[2];
            let sum = p0 + p1 + p2;
            let (p0, p1, p2) = (p0 / sum, p1 / sum, p2 / sum);

            let [v0, v1, v2] = &vertices;
            let world = v0.world * p0 + v1.world * p1 + v2.world * p2;
            let normal = v0.normal * p0 + v1.normal * p1 + v2.normal * p2;
            let uv = v0.uv * p0 + v1.uv * p1 + v2.uv * p2;
            let color = v0.color * p0 + v1.color * p1 + v2.color * p2;

            let rgba = shade(material, texture, uv, color, world, normal, ctx);
            if framebuffer.write_if_nearer(px, py, depth, rgba) {
                fragments += 1;
            }
        }
    }
    fragments
}

fn shade(
    material: &Material,
    texture: Option<&Texture>,
    uv: Vec2,
    vertex_color: Vec4,
    world: Vec3,
    normal: Vec3,
    ctx: &ShadingContext<'_>,
) -> [u8; 4] {
    let mut base = Vec4::from(material.base_color).component_mul(&vertex_color);
    if let Some(texture) = texture {
        let [r, g, b, a] = texture.sample(uv.x, uv.y);
        base = base.component_mul(&Vec4::new(srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a));
    }

    let to_eye = ctx.eye - world;
    let mut n = normal
        .try_normalize(1e-12)
        .or_else(|| to_eye.try_normalize(1e-12))
        .unwrap_or_else(Vec3::z);
    if n.dot(&to_eye) < 0.0 {
        n = -n;
    }

    let lit = base.xyz().component_mul(&ctx.lighting.irradiance(world, n));
    [encode_srgb(lit.x), encode_srgb(lit.y), encode_srgb(lit.z), 255]
}

/// sRGB-encoded channel in [0, 1] to linear
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear channel to an sRGB byte, clamping out-of-range values
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode_srgb(linear: f32) -> u8 {
    let c = if linear.is_finite() { linear.clamp(0.0, 1.0) } else { 0.0 };
    let encoded = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round() as u8
}
