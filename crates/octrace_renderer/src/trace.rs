//! Recursive mirror and refraction tracing.
//!
//! A surface that is transparent, a mirror, or both sends secondary rays
//! whose colours are blended over its local shading. Two budgets bound the
//! recursion: `TraceDepth::mirror` gates reflected rays and
//! `TraceDepth::transparency` gates transmitted ones. Both shrink by one at
//! every level.

use glam::{Vec2, Vec3, Vec4};
use octrace_core::{Color, Face, FaceId, LightKind, Material, Scene, Transparency};
use octrace_math::Ray;

use crate::ao::AoSphere;
use crate::context::RayContext;
use crate::intersect::{barycentric_corners, FaceHit};
use crate::isect::{DdaMode, Isect};
use crate::jitter::JitterTable;
use crate::octree::Octree;
use crate::renderer::RenderConfig;
use crate::shader::{ShadeInput, ShadeResult, Sky, SurfaceShader};

/// Remaining recursion for each kind of secondary ray.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceDepth {
    pub mirror: u8,
    pub transparency: u8,
}

impl TraceDepth {
    /// No secondary rays at all.
    pub const ZERO: TraceDepth = TraceDepth {
        mirror: 0,
        transparency: 0,
    };

    pub fn new(mirror: u8, transparency: u8) -> Self {
        Self {
            mirror,
            transparency,
        }
    }

    pub fn uniform(depth: u8) -> Self {
        Self::new(depth, depth)
    }

    /// Budgets a material grants to the rays leaving it.
    pub fn of(material: &Material) -> Self {
        Self::new(material.ray_depth, material.ray_depth_tra)
    }

    pub fn any(self) -> bool {
        self.mirror > 0 || self.transparency > 0
    }

    /// Budgets one level down.
    pub fn child(self) -> Self {
        Self::new(
            self.mirror.saturating_sub(1),
            self.transparency.saturating_sub(1),
        )
    }
}

/// Mirror direction of `view` about `n`.
///
/// With an interpolated normal the reflection can end up behind the face;
/// passing the flat `facet` normal (facing the viewer) pulls it back just
/// in front.
pub fn reflection(view: Vec3, n: Vec3, facet: Option<Vec3>) -> Vec3 {
    let mut r = view - 2.0 * n.dot(view) * n;
    if let Some(facet) = facet {
        let f = r.dot(facet);
        if f < 0.0 {
            r -= (f - 0.01) * facet;
        }
    }
    r
}

/// Snell refraction of the unit `view` through a surface with normal `n`.
///
/// A normal facing the viewer means the ray enters the medium of index
/// `ior`; facing away, it leaves it. Returns `None` on total internal
/// reflection.
pub fn refraction(view: Vec3, n: Vec3, ior: f32) -> Option<Vec3> {
    let (eta, n) = if view.dot(n) < 0.0 {
        (1.0 / ior, n)
    } else {
        (ior, -n)
    };
    let cos_i = -view.dot(n);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k <= 0.0 {
        return None;
    }
    Some(eta * view + (eta * cos_i - k.sqrt()) * n)
}

/// Shades rays against an octree.
///
/// Immutable once built and shared by all render threads; per-thread state
/// goes through `RayContext`.
pub struct Tracer<'a> {
    pub(crate) octree: &'a Octree<'a>,
    pub(crate) shader: &'a dyn SurfaceShader,
    pub(crate) sky: &'a dyn Sky,

    /// Sample tables of soft lights, by light index
    pub(crate) jitter: Vec<Option<JitterTable>>,
    pub(crate) ao_sphere: Option<AoSphere>,
    pub(crate) shadow_bias: f32,
}

impl<'a> Tracer<'a> {
    pub fn new(
        octree: &'a Octree<'a>,
        shader: &'a dyn SurfaceShader,
        sky: &'a dyn Sky,
        config: &RenderConfig,
    ) -> Self {
        let scene = octree.scene();
        let jitter = scene
            .lights()
            .iter()
            .map(|light| match light.kind {
                LightKind::Area { size_x, size_y, .. } if light.is_soft() => {
                    Some(JitterTable::new(light.samples, Vec2::new(size_x, size_y)))
                }
                _ => None,
            })
            .collect();
        let ao_sphere = scene
            .world
            .ambient_occlusion
            .filter(|_| config.ambient_occlusion)
            .map(|settings| AoSphere::new(settings.samples));

        Self {
            octree,
            shader,
            sky,
            jitter,
            ao_sphere,
            shadow_bias: config.shadow_bias,
        }
    }

    pub fn octree(&self) -> &'a Octree<'a> {
        self.octree
    }

    pub fn scene(&self) -> &'a Scene {
        self.octree.scene()
    }

    /// A fresh per-thread context sized for this scene.
    pub fn context(&self, seed: u64) -> RayContext {
        RayContext::new(self.scene().lights().len(), seed)
    }

    /// Colour seen along `direction` from `start`, with up to `depth`
    /// further levels of secondary rays. `origin` is the face `start` lies
    /// on, if any.
    ///
    /// The alpha channel is the coverage: 1 for opaque surfaces, 0 for the
    /// sky.
    pub fn trace_color(
        &self,
        start: Vec3,
        direction: Vec3,
        depth: TraceDepth,
        origin: Option<FaceId>,
        ctx: &mut RayContext,
    ) -> Vec4 {
        self.trace_ray(start, direction, depth, origin, false, ctx)
    }

    /// Shade a camera ray, including its secondary rays.
    pub fn trace_primary(&self, ray: &Ray, ctx: &mut RayContext) -> Vec4 {
        let direction = ray.direction.normalize_or_zero();
        let reach = (ray.origin - self.octree.bounds().centroid()).length() + self.octree.size();
        let mut is = Isect::new(ray.origin, ray.segment_end(reach), DdaMode::Mirror, None);

        if !self.octree.cast(&mut is, &mut ctx.stats) {
            return self.sky.color(direction).extend(0.0);
        }
        let Some(shi) = self.shade_input(&is, true) else {
            return self.sky.color(direction).extend(0.0);
        };

        let mut shr = self.shade_surface(&shi, ctx);
        self.ray_trace(&shi, &mut shr, ctx);
        shr.color().extend(shr.alpha)
    }

    /// Blend mirror and transmitted light over an already shaded surface.
    ///
    /// Secondary rays get the budgets of the surface material.
    pub fn ray_trace(&self, shi: &ShadeInput<'a>, shr: &mut ShadeResult, ctx: &mut RayContext) {
        let material = shi.material;
        let depth = TraceDepth::of(material);
        let origin = Some(shi.face_id);

        if material.transparency.is_transparent() && shr.alpha != 1.0 {
            let tracol = match material.transparency {
                Transparency::Raytraced { ior } => match refraction(shi.view, shi.vn, ior) {
                    Some(dir) => self.trace_ray(shi.co, dir, depth, origin, true, ctx),
                    None => Vec4::ZERO,
                },
                _ => self.trace_ray(shi.co, shi.view, depth, origin, false, ctx),
            };
            let coverage = blend_transmission(shi, shr, tracol);
            shr.alpha = coverage;
        }

        let mirror = self.mirror_factor(shi);
        if mirror != 0.0 {
            let facet = shi.face.smooth.then_some(shi.facenor);
            let dir = reflection(shi.view, shi.vn, facet);
            let mircol = self.trace_ray(shi.co, dir, depth, origin, false, ctx);
            shr.diff = mirror * self.mirror_tint(shi) * (Color::ONE - shr.spec) * mircol.truncate()
                + (1.0 - mirror) * shr.diff;
        }
    }

    /// `inside` is set while the ray travels through a refracting solid;
    /// it flips the normal used for the next refraction.
    fn trace_ray(
        &self,
        start: Vec3,
        direction: Vec3,
        depth: TraceDepth,
        origin: Option<FaceId>,
        inside: bool,
        ctx: &mut RayContext,
    ) -> Vec4 {
        ctx.stats.traced += 1;
        let direction = direction.normalize_or_zero();
        let mut is = Isect::new(
            start,
            start + self.octree.size() * direction,
            DdaMode::Mirror,
            origin,
        );

        if !self.octree.cast(&mut is, &mut ctx.stats) {
            return self.sky.color(direction).extend(0.0);
        }
        let Some(shi) = self.shade_input(&is, false) else {
            return self.sky.color(direction).extend(0.0);
        };

        let mut shr = self.shade_surface(&shi, ctx);
        let material = shi.material;
        let child = depth.child();
        let origin = Some(shi.face_id);

        let coverage = if depth.transparency > 0
            && material.transparency.is_transparent()
            && shr.alpha != 1.0
        {
            let tracol = match material.transparency {
                Transparency::Raytraced { ior } => {
                    let n = if inside { -shi.vn } else { shi.vn };
                    match refraction(shi.view, n, ior) {
                        Some(dir) => self.trace_ray(shi.co, dir, child, origin, !inside, ctx),
                        None => Vec4::ZERO,
                    }
                }
                _ => self.trace_ray(shi.co, shi.view, child, origin, false, ctx),
            };
            let alpha = shr.alpha;
            let coverage = blend_transmission(&shi, &mut shr, tracol);
            shr.spec *= alpha;
            coverage
        } else {
            1.0
        };

        let mirror = if depth.mirror > 0 {
            self.mirror_factor(&shi)
        } else {
            0.0
        };
        let rgb = if mirror != 0.0 {
            let dir = reflection(shi.view, shi.vn, None);
            let mircol = self.trace_ray(shi.co, dir, child, origin, false, ctx);
            mirror * self.mirror_tint(&shi) * (Color::ONE - shr.spec) * mircol.truncate()
                + (1.0 - mirror) * shr.diff
                + shr.spec
        } else {
            shr.color()
        };
        rgb.extend(coverage)
    }

    /// Local shading plus back-lit translucency.
    pub(crate) fn shade_surface(&self, shi: &ShadeInput<'a>, ctx: &mut RayContext) -> ShadeResult {
        let mut shr = self.shader.shade(shi, self, ctx);
        let translucency = shi.material.translucency;
        if translucency != 0.0 {
            let back = ShadeInput {
                vn: -shi.vn,
                facenor: -shi.facenor,
                ..*shi
            };
            shr.diff += translucency * self.shader.shade(&back, self, ctx).diff;
        }
        shr
    }

    /// Shading point of the hit in `is`.
    pub(crate) fn shade_input(&self, is: &Isect, primary: bool) -> Option<ShadeInput<'a>> {
        let face_id = is.face?;
        let scene = self.scene();
        let face = scene.face(face_id);
        let view = is.vec.normalize_or_zero();
        let facenor = if face.normal.dot(view) > 0.0 {
            -face.normal
        } else {
            face.normal
        };
        let vn = if face.smooth {
            self.smooth_normal(face, is, facenor)
        } else {
            facenor
        };

        Some(ShadeInput {
            face_id,
            face,
            material: scene.face_material(face),
            co: is.hit_point(),
            view,
            facenor,
            vn,
            u: is.u,
            v: is.v,
            half: is.half,
            primary,
        })
    }

    fn smooth_normal(&self, face: &Face, is: &Isect, facenor: Vec3) -> Vec3 {
        let scene = self.scene();
        let mut indices = [0u32; 4];
        for (slot, index) in indices.iter_mut().zip(face.indices()) {
            *slot = index;
        }
        let weights = FaceHit {
            labda: is.labda,
            u: is.u,
            v: is.v,
            half: is.half,
        }
        .weights();

        let n: Vec3 = barycentric_corners(is.half, face.is_quad())
            .iter()
            .zip(weights)
            .map(|(&corner, w)| w * scene.vertex_normal(indices[corner]))
            .sum();
        let n = n.normalize_or_zero();
        if n == Vec3::ZERO {
            facenor
        } else if n.dot(facenor) < 0.0 {
            -n
        } else {
            n
        }
    }

    fn mirror_factor(&self, shi: &ShadeInput<'_>) -> f32 {
        match shi.material.mirror {
            Some(mirror) if mirror.reflectivity != 0.0 => {
                mirror.reflectivity
                    * self
                        .shader
                        .fresnel(shi.view, shi.vn, mirror.fresnel_blend, mirror.fresnel)
            }
            _ => 0.0,
        }
    }

    fn mirror_tint(&self, shi: &ShadeInput<'_>) -> Color {
        shi.material.mirror.map_or(Color::ONE, |mirror| mirror.tint)
    }
}

/// Mix transmitted light `tracol` into `shr.diff` by the surface alpha,
/// tinted by the material filter. Returns the combined coverage.
fn blend_transmission(shi: &ShadeInput<'_>, shr: &mut ShadeResult, tracol: Vec4) -> f32 {
    let material = shi.material;
    let f = shr.alpha;
    let tint = Color::ONE + material.filter * (material.color - Color::ONE);
    shr.diff = f * shr.diff + (1.0 - f) * tint * tracol.truncate();
    (1.0 - f) * tracol.w + f
}
