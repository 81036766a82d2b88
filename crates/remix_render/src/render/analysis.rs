//! Rendered view sanity checks
//!
//! A capture that shows nothing but background usually means the camera
//! missed the object (bad framing, broken normalization) rather than a render
//! failure, so the multi-view loop logs a warning instead of failing the view.

use std::path::Path;

use image::RgbaImage;

/// Fraction of non-background pixels below which a view counts as sparse
pub const SPARSE_COVERAGE: f32 = 0.005;

/// Fraction of non-background pixels above which the object overfills the frame
pub const SATURATED_COVERAGE: f32 = 0.98;

/// What a rendered view most likely shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClassification {
    /// Object visible with background around it
    RenderedObject,
    /// Only background colour
    Blank,
    /// A handful of object pixels; the object is tiny or mostly off-screen
    Sparse,
    /// Object fills the whole frame; the camera is probably too close or inside it
    Saturated,
}

/// Pixel statistics for one rendered view
#[derive(Debug, Clone, PartialEq)]
pub struct ViewAnalysis {
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Pixel count
    pub total_pixels: usize,
    /// Fraction of pixels that differ from the background colour
    pub coverage: f32,
    /// Fraction of pixels that are not grey
    pub colored_ratio: f32,
    /// Mean of (r + g + b) / 3 over all pixels
    pub avg_brightness: u8,
    /// Classification derived from the ratios above
    pub likely_content: ContentClassification,
}

impl ViewAnalysis {
    /// True unless the view is blank
    pub fn has_content(&self) -> bool {
        self.likely_content != ContentClassification::Blank
    }
}

/// Analyze a rendered image against the background it was cleared to
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn analyze_image(image: &RgbaImage, background: [u8; 4]) -> ViewAnalysis {
    let (width, height) = image.dimensions();
    let total_pixels = (width as usize) * (height as usize);

    let mut covered = 0usize;
    let mut colored = 0usize;
    let mut total_brightness = 0u64;

    for pixel in image.pixels() {
        let [r, g, b, _a] = pixel.0;
        total_brightness += (u64::from(r) + u64::from(g) + u64::from(b)) / 3;
        if pixel.0[..3] != background[..3] {
            covered += 1;
        }
        if r != g || g != b {
            colored += 1;
        }
    }

    let denominator = total_pixels.max(1);
    let coverage = covered as f32 / denominator as f32;
    let colored_ratio = colored as f32 / denominator as f32;
    let avg_brightness = (total_brightness / denominator as u64) as u8;

    ViewAnalysis {
        width,
        height,
        total_pixels,
        coverage,
        colored_ratio,
        avg_brightness,
        likely_content: classify_content(covered, coverage),
    }
}

/// Load a PNG from disk and analyze it
pub fn analyze_file(path: &Path, background: [u8; 4]) -> Result<ViewAnalysis, image::ImageError> {
    let image = image::open(path)?.to_rgba8();
    Ok(analyze_image(&image, background))
}

fn classify_content(covered: usize, coverage: f32) -> ContentClassification {
    if covered == 0 {
        ContentClassification::Blank
    } else if coverage < SPARSE_COVERAGE {
        ContentClassification::Sparse
    } else if coverage > SATURATED_COVERAGE {
        ContentClassification::Saturated
    } else {
        ContentClassification::RenderedObject
    }
}

impl std::fmt::Display for ViewAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "View Analysis:")?;
        writeln!(f, "  Dimensions: {}x{}", self.width, self.height)?;
        writeln!(f, "  Total pixels: {}", self.total_pixels)?;
        writeln!(f, "  Object coverage: {:.1}%", self.coverage * 100.0)?;
        writeln!(f, "  Colored pixels: {:.1}%", self.colored_ratio * 100.0)?;
        writeln!(f, "  Average brightness: {}/255", self.avg_brightness)?;
        write!(f, "  Content classification: {:?}", self.likely_content)
    }
}
