//! Surface materials as seen by the tracer.
//!
//! Only the options that change how rays travel live here. How a surface is
//! lit is decided by the renderer's shader, which reads `color`, `specular`
//! and `hardness`.

use serde::{Deserialize, Serialize};

use crate::{Color, SceneError, SceneResult};

/// Mirror reflection settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mirror {
    /// Reflected amount (0 disables the mirror ray)
    pub reflectivity: f32,

    /// Tint applied to the reflected colour
    pub tint: Color,

    /// Fresnel power; 0 keeps the reflectivity constant at every angle
    pub fresnel: f32,

    /// Fresnel blend factor
    pub fresnel_blend: f32,
}

impl Default for Mirror {
    fn default() -> Self {
        Self {
            reflectivity: 1.0,
            tint: Color::ONE,
            fresnel: 0.0,
            fresnel_blend: 1.25,
        }
    }
}

/// How light passes through a surface with `alpha < 1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Transparency {
    #[default]
    Opaque,
    /// Rays continue straight through
    ZTransparent,
    /// Rays are bent by the index of refraction
    Raytraced { ior: f32 },
}

impl Transparency {
    pub fn is_transparent(&self) -> bool {
        !matches!(self, Transparency::Opaque)
    }
}

/// How shadows cast onto this surface treat transparent occluders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowMode {
    /// Any occluder blocks the light
    #[default]
    Opaque,
    /// Occluders let light through according to their alpha and filter
    AlphaAware,
}

/// A surface material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Material name
    pub name: String,

    /// Diffuse color (RGB, 0-1)
    pub color: Color,

    /// Opacity (0=transparent, 1=opaque)
    pub alpha: f32,

    /// Specular intensity
    pub specular: f32,

    /// Specular exponent
    pub hardness: f32,

    /// How much of the material colour tints transmitted light (0-1)
    pub filter: f32,

    /// Back-lit diffuse amount
    pub translucency: f32,

    /// Faces with this material are stored in the octree
    pub traceable: bool,

    /// Wire-only faces are never traced
    pub wire: bool,

    pub mirror: Option<Mirror>,
    pub transparency: Transparency,
    pub shadow_mode: ShadowMode,

    /// Mirror recursion budget for rays leaving this surface
    pub ray_depth: u8,

    /// Transparency recursion budget for rays leaving this surface
    pub ray_depth_tra: u8,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            color: Color::new(0.8, 0.8, 0.8),
            alpha: 1.0,
            specular: 0.5,
            hardness: 50.0,
            filter: 0.0,
            translucency: 0.0,
            traceable: true,
            wire: false,
            mirror: None,
            transparency: Transparency::Opaque,
            shadow_mode: ShadowMode::Opaque,
            ray_depth: 2,
            ray_depth_tra: 2,
        }
    }
}

impl Material {
    /// Create a new material with just a name and diffuse color.
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
            ..Default::default()
        }
    }

    /// Make the material a mirror with the given reflectivity.
    pub fn with_mirror(mut self, reflectivity: f32) -> Self {
        self.mirror = Some(Mirror {
            reflectivity,
            ..Default::default()
        });
        self
    }

    /// Make the material refractive glass.
    pub fn with_glass(mut self, alpha: f32, ior: f32) -> Self {
        self.alpha = alpha;
        self.transparency = Transparency::Raytraced { ior };
        self
    }

    pub fn with_shadow_mode(mut self, mode: ShadowMode) -> Self {
        self.shadow_mode = mode;
        self
    }

    /// True when faces with this material go into the octree.
    pub fn is_traceable(&self) -> bool {
        self.traceable && !self.wire
    }

    pub(crate) fn validate(&self) -> SceneResult<()> {
        if let Transparency::Raytraced { ior } = self.transparency {
            if !(ior.is_finite() && ior > 0.0) {
                return Err(SceneError::InvalidIor(ior));
            }
        }
        Ok(())
    }
}
