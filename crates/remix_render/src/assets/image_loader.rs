//! Image conversion utilities for texture data
//!
//! glTF images arrive already decoded in whatever channel layout the source
//! file used; the renderer only samples RGBA8.

use gltf::image::Format;

use crate::assets::{AssetLoadError, AssetResult};
use crate::render::Texture;

/// Convert a decoded glTF image to an RGBA8 texture
///
/// Returns `None` for layouts the renderer cannot sample; the caller falls
/// back to the material's base colour factor.
pub fn texture_from_gltf(data: &gltf::image::Data) -> Option<Texture> {
    let (channels, channel_size) = layout(data.format)?;
    let stride = channels * channel_size;
    let expected = (data.width as usize) * (data.height as usize) * stride;
    if data.pixels.len() < expected {
        log::warn!(
            "Image data too short: {} bytes for {}x{} {:?}",
            data.pixels.len(),
            data.width,
            data.height,
            data.format
        );
        return None;
    }

    let pixels = data.pixels[..expected]
        .chunks_exact(stride)
        .map(|texel| {
            let channel = |i: usize| read_channel(&texel[i * channel_size..(i + 1) * channel_size]);
            match channels {
                1 => {
                    let l = channel(0);
                    [l, l, l, 255]
                }
                2 => {
                    let l = channel(0);
                    [l, l, l, channel(1)]
                }
                3 => [channel(0), channel(1), channel(2), 255],
                _ => [channel(0), channel(1), channel(2), channel(3)],
            }
        })
        .collect();

    Texture::new(data.width, data.height, pixels)
}

/// Decode an encoded image (PNG) into an RGBA8 texture
pub fn texture_from_bytes(bytes: &[u8]) -> AssetResult<Texture> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|e| AssetLoadError::Image(e.to_string()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    log::debug!("Decoded image {}x{} from memory", width, height);

    let pixels = rgba.pixels().map(|p| p.0).collect();
    Texture::new(width, height, pixels)
        .ok_or_else(|| AssetLoadError::Image(format!("empty image {width}x{height}")))
}

/// (channel count, bytes per channel)
#[allow(unreachable_patterns)]
fn layout(format: Format) -> Option<(usize, usize)> {
    match format {
        Format::R8 => Some((1, 1)),
        Format::R8G8 => Some((2, 1)),
        Format::R8G8B8 => Some((3, 1)),
        Format::R8G8B8A8 => Some((4, 1)),
        Format::R16 => Some((1, 2)),
        Format::R16G16 => Some((2, 2)),
        Format::R16G16B16 => Some((3, 2)),
        Format::R16G16B16A16 => Some((4, 2)),
        Format::R32G32B32FLOAT => Some((3, 4)),
        Format::R32G32B32A32FLOAT => Some((4, 4)),
        other => {
            log::warn!("Unsupported texture format {:?}", other);
            None
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn read_channel(bytes: &[u8]) -> u8 {
    match *bytes {
        [b] => b,
        [lo, hi] => (u16::from_le_bytes([lo, hi]) >> 8) as u8,
        [a, b, c, d] => {
            let v = f32::from_le_bytes([a, b, c, d]);
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        _ => 0,
    }
}
