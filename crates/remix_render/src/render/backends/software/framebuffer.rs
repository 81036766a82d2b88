//! Colour and depth targets for the software backend

use image::RgbaImage;

use crate::render::{RenderError, RenderResult};

/// RGBA8 colour buffer plus a 32-bit depth buffer of the same size
#[derive(Debug)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    color: Vec<[u8; 4]>,
    depth: Vec<f32>,
}

impl Framebuffer {
    /// Allocate a framebuffer, reporting allocation failure instead of aborting
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InitializationFailed(format!(
                "invalid framebuffer size {width}x{height}"
            )));
        }

        let pixel_count = usize::try_from(u64::from(width) * u64::from(height)).map_err(|_| {
            RenderError::InitializationFailed(format!("framebuffer {width}x{height} exceeds address space"))
        })?;

        let mut color = Vec::new();
        color.try_reserve_exact(pixel_count).map_err(|e| {
            RenderError::InitializationFailed(format!("cannot allocate {width}x{height} colour buffer: {e}"))
        })?;
        color.resize(pixel_count, [0; 4]);

        let mut depth = Vec::new();
        depth.try_reserve_exact(pixel_count).map_err(|e| {
            RenderError::InitializationFailed(format!("cannot allocate {width}x{height} depth buffer: {e}"))
        })?;
        depth.resize(pixel_count, f32::INFINITY);

        log::debug!("Allocated {}x{} framebuffer", width, height);
        Ok(Self { width, height, color, depth })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill colour with `background` and reset depth to the far plane
    pub fn clear(&mut self, background: [u8; 4]) {
        self.color.fill(background);
        self.depth.fill(f32::INFINITY);
    }

    /// Write `rgba` at (x, y) if `depth` is nearer than what is stored
    ///
    /// Returns whether the fragment passed the depth test. Out-of-range
    /// coordinates are ignored.
    pub fn write_if_nearer(&mut self, x: u32, y: u32, depth: f32, rgba: [u8; 4]) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.width as usize + x as usize;
        if depth < self.depth[idx] {
            self.depth[idx] = depth;
            self.color[idx] = rgba;
            true
        } else {
            false
        }
    }

    /// Depth test without writing
    pub fn passes_depth(&self, x: u32, y: u32, depth: f32) -> bool {
        x < self.width && y < self.height && depth < self.depth[y as usize * self.width as usize + x as usize]
    }

    /// Colour at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.width && y < self.height).then(|| self.color[y as usize * self.width as usize + x as usize])
    }

    /// Copy the colour buffer into an image
    pub fn to_image(&self) -> RenderResult<RgbaImage> {
        let bytes: &[u8] = bytemuck::cast_slice(&self.color);
        RgbaImage::from_raw(self.width, self.height, bytes.to_vec()).ok_or_else(|| {
            RenderError::RenderingFailed("colour buffer does not match framebuffer size".to_string())
        })
    }
}
