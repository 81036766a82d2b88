//! Lighting system
//!
//! The render loop does not rely on material-intrinsic lighting, so every render
//! session gets the same explicit rig: six equal directional lights on the
//! ±X, ±Y and ±Z axes, all aimed at the origin. Every face of the object is
//! lit from at least one side and no view ends up in self-shadow.

use crate::foundation::math::Vec3;

/// Light types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// Directional light (like sunlight)
    Directional,
    /// Point light (like a lightbulb)
    Point,
}

/// Light source
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Light type
    pub light_type: LightType,
    /// Light position (point lights, and the nominal origin of directional rig lights)
    pub position: Vec3,
    /// Direction the light travels (directional lights)
    pub direction: Vec3,
    /// Light color
    pub color: Vec3,
    /// Light intensity
    pub intensity: f32,
    /// Light range (for point lights)
    pub range: f32,
}

impl Light {
    /// Create a directional light
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional,
            position: Vec3::zeros(),
            direction: direction.normalize(),
            color,
            intensity,
            range: 0.0,
        }
    }

    /// Create a directional light placed at `position` and aimed at `focal_point`
    pub fn directional_towards(position: Vec3, focal_point: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            position,
            ..Self::directional(focal_point - position, color, intensity)
        }
    }

    /// Create a point light
    pub fn point(position: Vec3, color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            light_type: LightType::Point,
            position,
            direction: Vec3::zeros(),
            color,
            intensity,
            range,
        }
    }

    /// Unit vector from a surface point towards the light, and the attenuation there
    pub fn incident(&self, surface: Vec3) -> (Vec3, f32) {
        match self.light_type {
            LightType::Directional => (-self.direction, 1.0),
            LightType::Point => {
                let to_light = self.position - surface;
                let distance = to_light.norm();
                if distance <= f32::EPSILON {
                    return (Vec3::zeros(), 0.0);
                }
                let falloff = if self.range > 0.0 {
                    (1.0 - distance / self.range).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                (to_light / distance, falloff * falloff)
            }
        }
    }
}

/// Lighting environment containing multiple lights
#[derive(Debug, Clone, PartialEq)]
pub struct LightingEnvironment {
    /// List of lights in the scene
    pub lights: Vec<Light>,
    /// Ambient light color
    pub ambient_color: Vec3,
    /// Ambient light intensity
    pub ambient_intensity: f32,
}

impl LightingEnvironment {
    /// Create a new empty lighting environment
    pub fn new() -> Self {
        Self {
            lights: Vec::new(),
            ambient_color: Vec3::new(1.0, 1.0, 1.0),
            ambient_intensity: 0.1,
        }
    }

    /// Add a light to the environment
    pub fn add_light(mut self, light: Light) -> Self {
        self.lights.push(light);
        self
    }

    /// Set ambient lighting
    pub fn with_ambient(mut self, color: Vec3, intensity: f32) -> Self {
        self.ambient_color = color;
        self.ambient_intensity = intensity;
        self
    }

    /// Six white directional lights on the coordinate axes, aimed at the origin
    ///
    /// `distance` only places the nominal light positions; directional lights
    /// do not attenuate.
    pub fn six_directional(distance: f32, intensity: f32, ambient_intensity: f32) -> Self {
        let white = Vec3::new(1.0, 1.0, 1.0);
        [Vec3::x(), -Vec3::x(), Vec3::y(), -Vec3::y(), Vec3::z(), -Vec3::z()]
            .into_iter()
            .fold(Self::new().with_ambient(white, ambient_intensity), |env, axis| {
                env.add_light(Light::directional_towards(axis * distance, Vec3::zeros(), white, intensity))
            })
    }

    /// Lambert irradiance (RGB) arriving at a surface point with unit normal `normal`
    pub fn irradiance(&self, surface: Vec3, normal: Vec3) -> Vec3 {
        self.lights.iter().fold(self.ambient_color * self.ambient_intensity, |acc, light| {
            let (to_light, attenuation) = light.incident(surface);
            let lambert = normal.dot(&to_light).max(0.0);
            acc + light.color * (light.intensity * attenuation * lambert)
        })
    }
}

impl Default for LightingEnvironment {
    fn default() -> Self {
        Self::new()
    }
}
