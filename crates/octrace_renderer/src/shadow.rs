//! Shadow rays towards lights.
//!
//! Hard shadows cast one ray; soft area lights cast one per jitter sample.
//! Surfaces with alpha-aware shadows follow the ray through transparent
//! occluders and return the filtered light colour.

use glam::{Mat3, Vec2, Vec3, Vec4};
use octrace_core::{Color, FaceId, LightKind, SampleMode, ShadowMode};
use rand::Rng;

use crate::context::RayContext;
use crate::isect::{DdaMode, Isect};
use crate::shader::ShadeInput;
use crate::trace::Tracer;

/// Transparent occluders followed past the first one.
pub const DEPTH_SHADOW_TRA: u32 = 10;

/// Pass the light `shadfac` through an occluder of colour `col`.
///
/// The filter tints only the light going through the transparent part.
pub fn add_alpha_light(shadfac: &mut Vec4, col: Color, alpha: f32, filter: f32) {
    let tint = Color::ONE + filter * (col - Color::ONE);
    let rgb = alpha * col + tint * (1.0 - alpha) * shadfac.truncate();
    *shadfac = rgb.extend((1.0 - alpha) * shadfac.w);
}

/// Shared settings of the shadow rays of one shading point.
struct ShadowRay {
    start: Vec3,
    origin: FaceId,
    mode: DdaMode,
    layer: u32,
}

impl<'a> Tracer<'a> {
    /// Light from light `index` reaching `shi`.
    ///
    /// `w` is the unoccluded fraction, 1 meaning fully lit. When the
    /// surface material has alpha-aware shadows, `rgb` is the light colour
    /// left after transparent occluders; otherwise it is 1.
    pub fn compute_shadow(&self, shi: &ShadeInput<'_>, index: usize, ctx: &mut RayContext) -> Vec4 {
        let lights = self.scene().lights();
        let Some(light) = lights.get(index) else {
            log::warn!("Shadow requested for unknown light {} ({} lights)", index, lights.len());
            return Vec4::ONE;
        };
        ctx.ensure_lights(lights.len());

        let ray = ShadowRay {
            start: if shi.face.smooth {
                shi.co + self.shadow_bias * shi.vn
            } else {
                shi.co
            },
            origin: shi.face_id,
            mode: match shi.material.shadow_mode {
                ShadowMode::AlphaAware => DdaMode::ShadowTransparent,
                ShadowMode::Opaque => DdaMode::Shadow,
            },
            layer: light.layer_mask(),
        };
        let mut last_hit = if shi.primary {
            ctx.shadow_cache[index]
        } else {
            None
        };

        let (target, plane) = match light.kind {
            LightKind::Point { position } => (position, None),
            LightKind::Area {
                position,
                orientation,
                ..
            } => (position, Some(orientation)),
            LightKind::Sun { direction } | LightKind::Hemi { direction } => {
                (shi.co - self.octree.size() * direction, None)
            }
        };

        let table = self.jitter.get(index).and_then(Option::as_ref);
        let result = match (table, plane) {
            (Some(table), Some(orientation)) if light.is_soft() => {
                let mut points = std::mem::take(&mut ctx.jitter[index]);
                let pattern: &[Vec2] = match light.sampling {
                    SampleMode::Constant => table.phase(0),
                    SampleMode::Dither => {
                        let (x, y) = ctx.pixel();
                        table.dithered(x, y)
                    }
                    SampleMode::Jitter => {
                        let pixel = ctx.pixel();
                        if !points.is_for(pixel) {
                            let shift = Vec2::new(ctx.rng.gen(), ctx.rng.gen());
                            table.shift_into(shift, &mut points.items);
                            points.pixel = Some(pixel);
                        }
                        &points.items
                    }
                };
                let lit = self.area_shadow(&ray, target, orientation, pattern, light.umbra, &mut last_hit, ctx);
                ctx.jitter[index] = points;
                lit
            }
            _ => self.shadow_sample(&ray, target, &mut last_hit, ctx),
        };

        if shi.primary {
            ctx.shadow_cache[index] = last_hit;
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn area_shadow(
        &self,
        ray: &ShadowRay,
        center: Vec3,
        orientation: Mat3,
        pattern: &[Vec2],
        umbra: bool,
        last_hit: &mut Option<FaceId>,
        ctx: &mut RayContext,
    ) -> Vec4 {
        if pattern.is_empty() {
            return Vec4::ONE;
        }

        let mut sum = Vec4::ZERO;
        let mut blocked = 0usize;
        for p in pattern {
            let end = center + orientation * p.extend(0.0);
            let sample = self.shadow_sample(ray, end, last_hit, ctx);
            if ray.mode == DdaMode::ShadowTransparent {
                sum += sample;
            } else if sample.w == 0.0 {
                blocked += 1;
            }
        }

        let count = pattern.len() as f32;
        if ray.mode == DdaMode::ShadowTransparent {
            return sum / count;
        }
        let lit = 1.0 - blocked as f32 / count;
        Vec4::ONE.with_w(if umbra { lit.sqrt() } else { lit })
    }

    /// One shadow ray from the shading point to `end`.
    fn shadow_sample(
        &self,
        ray: &ShadowRay,
        end: Vec3,
        last_hit: &mut Option<FaceId>,
        ctx: &mut RayContext,
    ) -> Vec4 {
        let mut is = Isect::new(ray.start, end, ray.mode, Some(ray.origin))
            .with_layer(ray.layer)
            .with_last_hit(*last_hit);

        let result = if ray.mode == DdaMode::ShadowTransparent {
            self.shadow_transparent(&mut is, DEPTH_SHADOW_TRA, ctx);
            is.col
        } else if self.octree.cast(&mut is, &mut ctx.stats) {
            Vec4::ONE.with_w(0.0)
        } else {
            Vec4::ONE
        };
        *last_hit = is.last_hit;
        result
    }

    /// Follow `is` through up to `depth + 1` occluders, filtering
    /// `is.col` at each one. Stops once no light is left.
    fn shadow_transparent(&self, is: &mut Isect, depth: u32, ctx: &mut RayContext) {
        is.col = Vec4::ONE;
        for remaining in (0..=depth).rev() {
            if !self.octree.cast(is, &mut ctx.stats) {
                return;
            }
            let Some(shi) = self.shade_input(is, false) else {
                return;
            };
            let shr = self.shader.shade_color(&shi);
            add_alpha_light(&mut is.col, shr.diff, shr.alpha, shi.material.filter);

            if remaining == 0 || is.col.w <= 0.0 {
                return;
            }
            is.start = shi.co;
            is.origin = Some(shi.face_id);
        }
    }
}
