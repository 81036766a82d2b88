//! Configuration system
//!
//! Render jobs run with fixed defaults (640x480, 60 degree vertical field of
//! view); everything here can be overridden from a TOML or RON file.

pub use serde::{Serialize, Deserialize};

use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        match extension_of(path).as_deref() {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match extension_of(path).as_deref() {
            Some("toml") => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside its permitted range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// # Render Configuration
///
/// Parameters of one multi-view render job. Missing fields fall back to the
/// defaults, so a config file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output image width in pixels
    pub width: u32,
    /// Output image height in pixels
    pub height: u32,
    /// Vertical field of view in degrees
    pub field_of_view_degrees: f32,
    /// Camera distance as a multiple of the scene's bounding radius
    pub camera_distance_factor: f32,
    /// Clear colour (RGBA) of every view
    pub background: [u8; 4],
    /// Intensity of each light in the six-directional rig
    pub light_intensity: f32,
    /// Ambient term added before directional lighting
    pub ambient_intensity: f32,
    /// Scale the centred scene so its bounding radius becomes 1
    pub rescale_to_unit: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            field_of_view_degrees: 60.0,
            camera_distance_factor: 2.5,
            background: [255, 255, 255, 255],
            light_intensity: 0.6,
            ambient_intensity: 0.25,
            rescale_to_unit: false,
        }
    }
}

impl Config for RenderConfig {}

impl RenderConfig {
    /// Set the output resolution
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the vertical field of view in degrees
    pub fn with_field_of_view(mut self, degrees: f32) -> Self {
        self.field_of_view_degrees = degrees;
        self
    }

    /// Set the clear colour
    pub fn with_background(mut self, rgba: [u8; 4]) -> Self {
        self.background = rgba;
        self
    }

    /// Output resolution as `(width, height)`
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }

        if !(self.field_of_view_degrees > 0.0 && self.field_of_view_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "field of view must be in (0, 180) degrees, got {}",
                self.field_of_view_degrees
            )));
        }

        if !(self.camera_distance_factor > 0.0) || !self.camera_distance_factor.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "camera distance factor must be positive, got {}",
                self.camera_distance_factor
            )));
        }

        if self.light_intensity < 0.0 || self.ambient_intensity < 0.0 {
            return Err(ConfigError::Invalid("light intensities cannot be negative".to_string()));
        }

        Ok(())
    }
}
