//! Ambient occlusion.
//!
//! Occlusion is sampled over a fixed, evenly spread set of directions on
//! the sphere. Each pixel rotates the set randomly, and only directions in
//! the hemisphere above the surface are cast.

use std::f32::consts::TAU;

use glam::{Mat3, Vec3, Vec4};
use octrace_core::AoColor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::context::RayContext;
use crate::isect::{DdaMode, Isect};
use crate::shader::ShadeInput;
use crate::trace::Tracer;

/// Largest pattern resolution; the sphere has `2 * res^2` directions.
pub const MAX_AO_RESOLUTION: u32 = 16;

const RELAX_ITERATIONS: usize = 16;

/// Directions spread evenly over the unit sphere.
#[derive(Clone, Debug)]
pub struct AoSphere {
    directions: Vec<Vec3>,
}

impl AoSphere {
    pub fn new(samples: u32) -> Self {
        let res = samples.clamp(1, MAX_AO_RESOLUTION);
        let count = 2 * res * res;
        let mut rng = StdRng::seed_from_u64(count as u64);
        let mut directions: Vec<Vec3> = (0..count).map(|_| random_on_sphere(&mut rng)).collect();

        for _ in 0..RELAX_ITERATIONS {
            for i in 0..directions.len() {
                directions[i] = spread(&directions, directions[i]);
            }
        }
        Self { directions }
    }

    pub fn directions(&self) -> &[Vec3] {
        &self.directions
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    /// Write a randomly rotated copy of the pattern into `out`.
    pub fn rotate_into(&self, rng: &mut StdRng, out: &mut Vec<Vec3>) {
        let rotation = Mat3::from_rotation_z(rng.gen_range(0.0..TAU))
            * Mat3::from_rotation_y(rng.gen_range(0.0..TAU));
        out.clear();
        out.extend(self.directions.iter().map(|&d| rotation * d));
    }
}

fn random_on_sphere(rng: &mut StdRng) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..1.0);
    let r = (1.0 - z * z).max(0.0).sqrt();
    let a = TAU * rng.gen::<f32>();
    Vec3::new(r * a.cos(), r * a.sin(), z)
}

/// Move `v` away from the other directions and back onto the sphere.
fn spread(sphere: &[Vec3], v: Vec3) -> Vec3 {
    let push: Vec3 = sphere
        .iter()
        .map(|&p| v - p)
        .filter(|f| f.length_squared() != 0.0)
        .map(|f| f / f.length_squared())
        .sum();
    let moved = (v + 0.5 * push).normalize_or_zero();
    if moved == Vec3::ZERO {
        v
    } else {
        moved
    }
}

impl<'a> Tracer<'a> {
    /// Occlusion at `shi`: `w` is the unoccluded fraction of the
    /// hemisphere. With sky colouring, `rgb` is the average sky seen
    /// through the open directions, scaled by `w`.
    ///
    /// `None` when the world has no occlusion settings or the render
    /// disabled it.
    pub fn ambient_occlusion(&self, shi: &ShadeInput<'_>, ctx: &mut RayContext) -> Option<Vec4> {
        let settings = self.scene().world.ambient_occlusion?;
        let sphere = self.ao_sphere.as_ref()?;

        let pixel = ctx.pixel();
        let mut directions = std::mem::take(&mut ctx.ao);
        if !directions.is_for(pixel) {
            sphere.rotate_into(&mut ctx.rng, &mut directions.items);
            directions.pixel = Some(pixel);
        }

        // The bias keeps smooth faces from looking flat
        let (bias, normal) = if shi.face.smooth {
            (settings.bias, shi.vn)
        } else {
            (0.0, shi.facenor)
        };

        let mut occlusion = 0.0;
        let mut cast = 0usize;
        let mut sky = Vec3::ZERO;
        let mut open = 0usize;
        let mut last_hit = None;
        for &dir in &directions.items {
            if dir.dot(normal) <= bias {
                continue;
            }
            cast += 1;

            let end = shi.co + settings.distance * dir;
            let mut is = Isect::new(shi.co, end, DdaMode::Shadow, Some(shi.face_id)).with_last_hit(last_hit);
            if self.octree.cast(&mut is, &mut ctx.stats) {
                occlusion += match settings.falloff {
                    Some(falloff) => {
                        let labda = is.hit_point().distance(shi.co) / settings.distance;
                        (-labda * falloff).exp()
                    }
                    None => 1.0,
                };
            } else {
                match settings.color {
                    AoColor::Plain => {}
                    AoColor::SkyColor => {
                        sky += self.scene().world.sky_blend(dir);
                        open += 1;
                    }
                    AoColor::SkyTexture => {
                        sky += self.sky.color(dir);
                        open += 1;
                    }
                }
            }
            last_hit = is.last_hit;
        }
        ctx.ao = directions;

        let lit = if cast == 0 {
            1.0
        } else {
            1.0 - occlusion / cast as f32
        };
        let rgb = if open > 0 {
            sky * (lit / open as f32)
        } else {
            Vec3::ZERO
        };
        Some(rgb.extend(lit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::QuadHalf;
    use crate::octree::{Octree, OctreeConfig};
    use crate::renderer::RenderConfig;
    use crate::shader::PhongShader;
    use crate::testutil::{add_quad, grey_scene, square_xy};
    use octrace_core::{AoSettings, Color, FaceId, Scene};

    #[test]
    fn test_sphere_size() {
        assert_eq!(AoSphere::new(5).len(), 50);
        assert_eq!(AoSphere::new(40).len(), 2 * 16 * 16);
        assert_eq!(AoSphere::new(0).len(), 2);
    }

    #[test]
    fn test_sphere_is_even() {
        let sphere = AoSphere::new(5);
        assert!(sphere
            .directions()
            .iter()
            .all(|d| (d.length() - 1.0).abs() < 1e-4));

        for axis in [Vec3::X, Vec3::Y, Vec3::Z, -Vec3::X, -Vec3::Y, -Vec3::Z] {
            let above = sphere.directions().iter().filter(|d| d.dot(axis) > 0.0).count();
            assert!((17..=33).contains(&above), "{above} of 50 above {axis:?}");
        }
    }

    #[test]
    fn test_rotation_keeps_directions_unit() {
        let sphere = AoSphere::new(4);
        let mut rng = StdRng::seed_from_u64(3);
        let mut out = Vec::new();
        sphere.rotate_into(&mut rng, &mut out);

        assert_eq!(out.len(), sphere.len());
        assert!(out.iter().all(|d| (d.length() - 1.0).abs() < 1e-4));
    }

    fn floor_scene(settings: AoSettings, ceiling: bool) -> (Scene, FaceId) {
        let (mut scene, grey) = grey_scene();
        scene.world.ambient_occlusion = Some(settings);
        let floor = add_quad(&mut scene, grey, square_xy(Vec3::ZERO, 20.0));
        if ceiling {
            add_quad(&mut scene, grey, square_xy(Vec3::Z, 20.0));
        }
        (scene, floor)
    }

    fn occlusion(scene: &Scene, floor: FaceId) -> Option<Vec4> {
        let octree = Octree::build(scene, &OctreeConfig::default().with_resolution(64)).unwrap();
        let tracer = Tracer::new(&octree, &PhongShader, &Color::ZERO, &RenderConfig::default());
        let mut ctx = tracer.context(11);
        let face = scene.face(floor);
        let shi = ShadeInput {
            face_id: floor,
            face,
            material: scene.face_material(face),
            co: Vec3::new(0.3, 0.2, 0.0),
            view: -Vec3::Z,
            facenor: Vec3::Z,
            vn: Vec3::Z,
            u: 0.0,
            v: 0.0,
            half: QuadHalf::First,
            primary: true,
        };
        tracer.ambient_occlusion(&shi, &mut ctx)
    }

    #[test]
    fn test_open_floor_is_unoccluded() {
        let (scene, floor) = floor_scene(AoSettings::default(), false);
        let ao = occlusion(&scene, floor).unwrap();
        assert_eq!(ao.w, 1.0);
        assert_eq!(ao.truncate(), Vec3::ZERO);
    }

    #[test]
    fn test_ceiling_occludes() {
        let (scene, floor) = floor_scene(AoSettings::default(), true);
        let ao = occlusion(&scene, floor).unwrap();
        assert!(ao.w < 0.5, "{ao:?}");

        // With falloff, distant hits count for less
        let settings = AoSettings {
            falloff: Some(2.0),
            ..Default::default()
        };
        let (scene, floor) = floor_scene(settings, true);
        let faded = occlusion(&scene, floor).unwrap();
        assert!(faded.w > ao.w);
    }

    #[test]
    fn test_sky_colored_occlusion() {
        let settings = AoSettings {
            color: AoColor::SkyColor,
            ..Default::default()
        };
        let (scene, floor) = floor_scene(settings, false);
        let ao = occlusion(&scene, floor).unwrap();
        let world = scene.world;

        // An average of horizon/zenith blends over the upper hemisphere
        for c in 0..3 {
            assert!(ao[c] >= world.zenith[c].min(world.horizon[c]) - 1e-4);
            assert!(ao[c] <= world.zenith[c].max(world.horizon[c]) + 1e-4);
        }
        assert!(ao.z > 0.0);
    }

    #[test]
    fn test_disabled_by_render_config() {
        let (scene, floor) = floor_scene(AoSettings::default(), false);
        let octree = Octree::build(&scene, &OctreeConfig::default()).unwrap();
        let config = RenderConfig {
            ambient_occlusion: false,
            ..Default::default()
        };
        let tracer = Tracer::new(&octree, &PhongShader, &Color::ZERO, &config);
        let face = scene.face(floor);
        let shi = ShadeInput {
            face_id: floor,
            face,
            material: scene.face_material(face),
            co: Vec3::ZERO,
            view: -Vec3::Z,
            facenor: Vec3::Z,
            vn: Vec3::Z,
            u: 0.0,
            v: 0.0,
            half: QuadHalf::First,
            primary: true,
        };

        assert_eq!(tracer.ambient_occlusion(&shi, &mut tracer.context(0)), None);
    }
}
