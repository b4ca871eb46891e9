use octrace_math::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::Color;

/// Where a light sits and what shape it has.
///
/// Directions point the way the light travels, from the lamp into the scene.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    Point {
        position: Vec3,
    },
    Sun {
        direction: Vec3,
    },
    Hemi {
        direction: Vec3,
    },
    /// Rectangle centred on `position`; the first two columns of
    /// `orientation` span its plane.
    Area {
        position: Vec3,
        orientation: Mat3,
        size_x: f32,
        size_y: f32,
    },
}

/// How the jitter pattern of an area light changes from pixel to pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleMode {
    /// Same pattern everywhere
    #[default]
    Constant,
    /// One of four offset patterns, picked by pixel parity
    Dither,
    /// A random offset of the pattern per pixel
    Jitter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub energy: f32,

    /// Shadow rays per shading point (area lights only)
    pub samples: u32,
    pub sampling: SampleMode,

    /// Sharpen soft shadows by taking the square root of the lit fraction
    pub umbra: bool,

    /// Only faces in these layers cast shadows from this light
    pub layer: Option<u32>,
}

impl Light {
    fn with_kind(kind: LightKind) -> Self {
        Self {
            kind,
            color: Color::ONE,
            energy: 1.0,
            samples: 1,
            sampling: SampleMode::Constant,
            umbra: false,
            layer: None,
        }
    }

    pub fn point(position: Vec3) -> Self {
        Self::with_kind(LightKind::Point { position })
    }

    pub fn sun(direction: Vec3) -> Self {
        Self::with_kind(LightKind::Sun {
            direction: direction.normalize_or_zero(),
        })
    }

    pub fn hemi(direction: Vec3) -> Self {
        Self::with_kind(LightKind::Hemi {
            direction: direction.normalize_or_zero(),
        })
    }

    /// Square area light in the plane of `orientation`'s x and y axes.
    pub fn area(position: Vec3, orientation: Mat3, size: f32, samples: u32) -> Self {
        Self {
            samples,
            ..Self::with_kind(LightKind::Area {
                position,
                orientation,
                size_x: size,
                size_y: size,
            })
        }
    }

    pub fn with_color(mut self, color: Color, energy: f32) -> Self {
        self.color = color;
        self.energy = energy;
        self
    }

    pub fn with_sampling(mut self, sampling: SampleMode) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = Some(layer);
        self
    }

    /// Layer mask used for shadow rays.
    pub fn layer_mask(&self) -> u32 {
        self.layer.unwrap_or(u32::MAX)
    }

    /// True when shadows from this light are sampled over an area.
    pub fn is_soft(&self) -> bool {
        matches!(self.kind, LightKind::Area { .. }) && self.samples >= 2
    }

    /// Unit vector from `point` towards the light.
    pub fn direction_from(&self, point: Vec3) -> Vec3 {
        match self.kind {
            LightKind::Point { position } | LightKind::Area { position, .. } => {
                (position - point).normalize_or_zero()
            }
            LightKind::Sun { direction } | LightKind::Hemi { direction } => -direction,
        }
    }
}
