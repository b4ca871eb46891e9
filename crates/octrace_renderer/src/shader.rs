//! Local shading and sky capabilities used by the tracer.

use glam::Vec3;
use octrace_core::{AoColor, Color, Face, FaceId, LightKind, Material, ShadowMode, World};

use crate::context::RayContext;
use crate::intersect::QuadHalf;
use crate::trace::Tracer;

/// A surface point about to be shaded.
///
/// `view` is the unit direction of the incoming ray. `facenor` and `vn`
/// face the viewer (`facenor.dot(view) <= 0`); `vn` is the interpolated
/// normal on smooth faces and `facenor` otherwise.
#[derive(Clone, Copy, Debug)]
pub struct ShadeInput<'a> {
    pub face_id: FaceId,
    pub face: &'a Face,
    pub material: &'a Material,
    pub co: Vec3,
    pub view: Vec3,
    pub facenor: Vec3,
    pub vn: Vec3,
    pub u: f32,
    pub v: f32,
    pub half: QuadHalf,

    /// Shaded for a camera ray rather than a traced one
    pub primary: bool,
}

/// Output of local shading.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShadeResult {
    pub diff: Color,
    pub spec: Color,
    pub alpha: f32,
}

impl ShadeResult {
    pub fn color(&self) -> Color {
        self.diff + self.spec
    }
}

/// Lighting model evaluated at every hit.
pub trait SurfaceShader: Send + Sync {
    /// Lit diffuse and specular colour. Shadows are available through
    /// `tracer.compute_shadow`.
    fn shade(&self, shi: &ShadeInput<'_>, tracer: &Tracer<'_>, ctx: &mut RayContext) -> ShadeResult;

    /// Unlit surface colour, used for light passing through transparent
    /// occluders.
    fn shade_color(&self, shi: &ShadeInput<'_>) -> ShadeResult {
        ShadeResult {
            diff: shi.material.color,
            spec: Color::ZERO,
            alpha: shi.material.alpha,
        }
    }

    /// Mirror strength factor at the view angle.
    fn fresnel(&self, view: Vec3, vn: Vec3, blend: f32, power: f32) -> f32 {
        fresnel_fac(view, vn, blend, power)
    }
}

/// `blend + (1 - blend) * (1 + |cos|)^power`, clamped to `[0, 1]`. A power
/// of 0 disables the effect.
pub fn fresnel_fac(view: Vec3, vn: Vec3, blend: f32, power: f32) -> f32 {
    if power == 0.0 {
        return 1.0;
    }
    let t = 1.0 + view.dot(vn).abs();
    (blend + (1.0 - blend) * t.powf(power)).clamp(0.0, 1.0)
}

/// Background seen by rays that leave the scene.
pub trait Sky: Send + Sync {
    fn color(&self, direction: Vec3) -> Color;
}

impl Sky for World {
    fn color(&self, direction: Vec3) -> Color {
        self.sky_blend(direction)
    }
}

/// A constant background.
impl Sky for Color {
    fn color(&self, _direction: Vec3) -> Color {
        *self
    }
}

/// Lambert diffuse with Phong highlights, shadowed by the tracer.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhongShader;

impl SurfaceShader for PhongShader {
    fn shade(&self, shi: &ShadeInput<'_>, tracer: &Tracer<'_>, ctx: &mut RayContext) -> ShadeResult {
        let material = shi.material;
        let mut diff = Color::ZERO;
        let mut spec = Color::ZERO;

        for (index, light) in tracer.scene().lights().iter().enumerate() {
            let radiance = light.color * light.energy;
            let to_light = light.direction_from(shi.co);
            let ndl = shi.vn.dot(to_light);

            // Hemi lights wrap around and cast no shadows
            if let LightKind::Hemi { .. } = light.kind {
                diff += material.color * radiance * (0.5 + 0.5 * ndl);
                continue;
            }
            if ndl <= 0.0 {
                continue;
            }

            let shadow = tracer.compute_shadow(shi, index, ctx);
            let visible = match material.shadow_mode {
                ShadowMode::AlphaAware => shadow.truncate() * shadow.w,
                ShadowMode::Opaque => Vec3::splat(shadow.w),
            };
            if visible == Vec3::ZERO {
                continue;
            }

            diff += material.color * radiance * visible * ndl;
            let half = (to_light - shi.view).normalize_or_zero();
            let highlight = shi.vn.dot(half).max(0.0).powf(material.hardness);
            spec += material.specular * highlight * radiance * visible;
        }

        if let Some(settings) = tracer.scene().world.ambient_occlusion {
            if let Some(ao) = tracer.ambient_occlusion(shi, ctx) {
                let light = match settings.color {
                    AoColor::Plain => Vec3::splat(ao.w),
                    AoColor::SkyColor | AoColor::SkyTexture => ao.truncate(),
                };
                diff += settings.energy * material.color * light;
            }
        }

        ShadeResult {
            diff,
            spec,
            alpha: material.alpha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresnel_disabled() {
        assert_eq!(fresnel_fac(Vec3::Z, -Vec3::Z, 1.25, 0.0), 1.0);
    }

    #[test]
    fn test_fresnel_grazing_reflects_more() {
        let vn = Vec3::Y;
        let head_on = fresnel_fac(-Vec3::Y, vn, 1.25, 2.0);
        let grazing = fresnel_fac(Vec3::new(1.0, -0.05, 0.0).normalize(), vn, 1.25, 2.0);

        assert!((head_on - 0.25).abs() < 1e-5);
        assert!(grazing > 0.9);
        assert!((0.0..=1.0).contains(&grazing));
    }

    #[test]
    fn test_sky_colors() {
        let world = World::default();
        assert_eq!(Sky::color(&world, Vec3::Y), world.zenith);
        assert_eq!(Sky::color(&world, -Vec3::Y), world.horizon);
        assert_eq!(Sky::color(&Color::splat(0.3), Vec3::X), Color::splat(0.3));
    }
}
