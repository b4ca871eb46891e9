//! 3D-DDA traversal of the octree.
//!
//! A cast clips its segment to the octree bounds, then walks the grid cells
//! the segment crosses in order. Each non-empty cell gets the OcVal of the
//! piece of segment inside it; candidates whose masks miss it are skipped
//! without an exact test. Shadow casts stop at the first hit; the other
//! modes stop at the first cell holding a hit, rejecting hits that lie
//! beyond the cell so the closest one wins.

use glam::{IVec3, Vec3};
use octrace_core::FaceId;

use crate::intersect::{intersect_face, line_crosses_face, FaceVerts, QuadHalf};
use crate::isect::{DdaMode, Isect, SelfHitGuard};
use crate::ocval::OcVal;
use crate::octree::Octree;
use crate::stats::RayStats;

/// Hits closer than this (in segment parameter) to a neighbour of the
/// origin face are checked against the origin face first.
const SELF_HIT_LABDA: f32 = 0.1;

/// A segment to cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayQuery {
    pub start: Vec3,
    pub end: Vec3,
    pub mode: DdaMode,
    pub origin: Option<FaceId>,
    pub layer: u32,
}

impl RayQuery {
    pub fn new(start: Vec3, end: Vec3, mode: DdaMode) -> Self {
        Self {
            start,
            end,
            mode,
            origin: None,
            layer: u32::MAX,
        }
    }

    pub fn with_origin(mut self, origin: FaceId) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }
}

/// Result of `Octree::cast_ray`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub face: FaceId,
    /// Position along the queried segment, in (0, 1)
    pub labda: f32,
    pub u: f32,
    pub v: f32,
    pub half: QuadHalf,
    pub point: Vec3,
}

/// Cell walk state: per axis, the segment parameter of the next boundary.
struct DdaWalk {
    cell: IVec3,
    labda: Vec3,
    ld: Vec3,
    step: IVec3,
}

impl DdaWalk {
    /// `d` is `o1 - o2`, the reversed segment in grid units.
    fn new(o1: Vec3, d: Vec3, cell: IVec3) -> Self {
        let mut walk = DdaWalk {
            cell,
            labda: Vec3::ONE,
            ld: Vec3::ZERO,
            step: IVec3::ZERO,
        };
        for axis in 0..3 {
            let c = cell[axis] as f32;
            if d[axis] < -f32::EPSILON {
                walk.ld[axis] = -1.0 / d[axis];
                walk.labda[axis] = (c - o1[axis] + 1.0) * walk.ld[axis];
                walk.step[axis] = 1;
            } else if d[axis] > f32::EPSILON {
                walk.ld[axis] = 1.0 / d[axis];
                walk.labda[axis] = (o1[axis] - c) * walk.ld[axis];
                walk.step[axis] = -1;
            }
        }
        walk
    }

    /// Cross the nearest boundary; equal boundaries are crossed together.
    fn advance(&mut self) {
        let l = self.labda;
        let axes = if l.x == l.y && l.y == l.z {
            [true, true, true]
        } else if l.x == l.y {
            if l.y < l.z {
                [true, true, false]
            } else {
                [false, false, true]
            }
        } else if l.y == l.z {
            if l.x < l.y {
                [true, false, false]
            } else {
                [false, true, true]
            }
        } else if l.x == l.z {
            if l.y < l.x {
                [false, true, false]
            } else {
                [true, false, true]
            }
        } else if l.x < l.y && l.x < l.z {
            [true, false, false]
        } else if l.y < l.z {
            [false, true, false]
        } else {
            [false, false, true]
        };

        for axis in 0..3 {
            if axes[axis] {
                self.labda[axis] += self.ld[axis];
                self.cell[axis] += self.step[axis];
            }
        }
    }
}

impl<'s> Octree<'s> {
    /// Cast `is` through the octree. Returns true on a hit, with the face,
    /// `labda`, `u`, `v` and quad half filled in.
    pub fn cast(&self, is: &mut Isect, stats: &mut RayStats) -> bool {
        stats.rays += 1;
        if self.is_empty() || !is.start.is_finite() || !is.end.is_finite() {
            return false;
        }
        is.guard = SelfHitGuard::default();

        if is.mode == DdaMode::Shadow {
            if let Some(last) = is.last_hit {
                if Some(last) != is.origin && self.scene().face(last).layer & is.layer != 0 {
                    is.face = Some(last);
                    is.vec = is.end - is.start;
                    if self.check_hit(is, last) {
                        stats.hits += 1;
                        return true;
                    }
                }
            }
        }

        let Some(range) = self.bounds().clip_segment(is.start, is.end) else {
            stats.clip_rejects += 1;
            return false;
        };
        let ld = is.end - is.start;
        if range.max < 1.0 {
            is.end = is.start + range.max * ld;
        }
        if range.min > 0.0 {
            is.start += range.min * ld;
        }
        is.vec = is.end - is.start;

        let o1 = self.to_grid(is.start);
        let o2 = self.to_grid(is.end);
        let first = o1.as_ivec3();

        if first == o2.as_ivec3() {
            stats.cells_visited += 1;
            if let Some(node) = self.lookup(first) {
                is.ddalabda = 1.0;
                let ocval = OcVal::from_segment(o1, o2, first);
                if self.test_node(is, node, ocval, stats) {
                    stats.hits += 1;
                    return true;
                }
            }
        } else {
            let d = o1 - o2;
            let mut walk = DdaWalk::new(o1, d, first);
            let mut labda_in = 0.0;
            let mut ddalabda = walk.labda.min_element();

            // A segment inside the grid crosses at most 3 * res boundaries
            for _ in 0..3 * self.resolution() + 3 {
                stats.cells_visited += 1;
                if let Some(node) = self.lookup(walk.cell) {
                    let ocval = OcVal::from_segment(o1 - labda_in * d, o1 - ddalabda * d, walk.cell);
                    is.ddalabda = ddalabda;
                    if self.test_node(is, node, ocval, stats) {
                        stats.hits += 1;
                        return true;
                    }
                }

                let labda_o = ddalabda;
                walk.advance();
                ddalabda = walk.labda.min_element();
                if ddalabda == labda_o || labda_o >= 1.0 {
                    break;
                }
                labda_in = labda_o;
            }
        }

        is.last_hit = None;
        false
    }

    /// Cast a segment and report the hit, if any.
    pub fn cast_ray(&self, query: &RayQuery, stats: &mut RayStats) -> Option<RayHit> {
        let mut is =
            Isect::new(query.start, query.end, query.mode, query.origin).with_layer(query.layer);
        if !self.cast(&mut is, stats) {
            return None;
        }

        let face = is.face?;
        let point = is.hit_point();
        let segment = query.end - query.start;
        Some(RayHit {
            face,
            labda: (point - query.start).dot(segment) / segment.length_squared(),
            u: is.u,
            v: is.v,
            half: is.half,
            point,
        })
    }

    /// Test the faces of one leaf against the segment piece `ocval`.
    fn test_node(&self, is: &mut Isect, node: u32, ocval: OcVal, stats: &mut RayStats) -> bool {
        if is.mode == DdaMode::Shadow {
            for (face, mask) in self.node_entries(node) {
                if Some(face) == is.origin || self.scene().face(face).layer & is.layer == 0 {
                    continue;
                }
                if !mask.overlaps(&ocval) {
                    stats.mask_rejects += 1;
                    continue;
                }
                stats.mask_accepts += 1;
                is.face = Some(face);
                if self.check_hit(is, face) {
                    is.last_hit = Some(face);
                    return true;
                }
            }
            return false;
        }

        is.labda = 1.0;
        let mut probe = *is;
        let mut found = false;
        for (face, mask) in self.node_entries(node) {
            if Some(face) == is.origin {
                continue;
            }
            if !mask.overlaps(&ocval) {
                stats.mask_rejects += 1;
                continue;
            }
            stats.mask_accepts += 1;
            probe.face = Some(face);
            if self.check_hit(&mut probe, face) {
                if probe.labda < is.labda {
                    *is = probe;
                }
                found = true;
            }
        }
        found
    }

    /// Exact test of one face, with the cell-exit and self-hit rules.
    fn check_hit(&self, is: &mut Isect, id: FaceId) -> bool {
        let scene = self.scene();
        let face = scene.face(id);
        let Some(hit) = intersect_face(is.start, is.vec, &FaceVerts::of(scene, face)) else {
            return false;
        };
        is.labda = hit.labda;
        is.u = hit.u;
        is.v = hit.v;
        is.half = hit.half;

        if is.mode != DdaMode::Shadow && hit.labda > is.ddalabda {
            return false;
        }
        if is.guard.tested && is.guard.crosses_origin {
            return true;
        }
        if hit.labda < SELF_HIT_LABDA {
            if let Some(origin_id) = is.origin {
                let origin = scene.face(origin_id);
                if face.shares_vertex(origin) {
                    if !is.guard.tested {
                        is.guard.tested = true;
                        is.guard.crosses_origin =
                            line_crosses_face(is.start, is.vec, &FaceVerts::of(scene, origin));
                    }
                    return is.guard.crosses_origin;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::octree::OctreeConfig;
    use crate::testutil::{add_quad, add_tri, grey_scene, square_xy};
    use octrace_core::{Mesh, Scene};

    fn build(scene: &Scene) -> Octree<'_> {
        Octree::build(scene, &OctreeConfig::default().with_resolution(64)).unwrap()
    }

    /// Five 2x2 squares stacked along z at 0..4.
    fn stack() -> (Scene, Vec<FaceId>) {
        let (mut scene, grey) = grey_scene();
        let ids = (0..5)
            .map(|i| add_quad(&mut scene, grey, square_xy(Vec3::new(0.0, 0.0, i as f32), 1.0)))
            .collect();
        (scene, ids)
    }

    #[test]
    fn test_miss_outside_bounds_is_clipped() {
        let (mut scene, grey) = grey_scene();
        scene.add_mesh(&Mesh::cube(Vec3::ZERO, 1.0), grey, false).unwrap();
        let octree = build(&scene);

        let mut stats = RayStats::default();
        let query = RayQuery::new(Vec3::new(5.0, 5.0, -10.0), Vec3::new(5.0, 5.0, 10.0), DdaMode::Mirror);

        assert!(octree.cast_ray(&query, &mut stats).is_none());
        assert_eq!(stats.clip_rejects, 1);
        assert_eq!(stats.cells_visited, 0);
    }

    #[test]
    fn test_empty_octree_misses() {
        let (scene, _) = grey_scene();
        let octree = build(&scene);
        let mut stats = RayStats::default();
        let query = RayQuery::new(Vec3::splat(-1.0), Vec3::splat(1.0), DdaMode::Shadow);

        assert!(octree.cast_ray(&query, &mut stats).is_none());
        assert_eq!(stats.cells_visited, 0);
    }

    #[test]
    fn test_non_finite_segment_misses() {
        let (scene, _) = stack();
        let octree = build(&scene);
        let mut stats = RayStats::default();
        let query = RayQuery::new(Vec3::new(0.1, 0.1, 10.0), Vec3::new(f32::NAN, 0.1, -10.0), DdaMode::Mirror);

        assert!(octree.cast_ray(&query, &mut stats).is_none());
    }

    #[test]
    fn test_closest_hit() {
        let (scene, ids) = stack();
        let octree = build(&scene);
        let mut stats = RayStats::default();

        let down = RayQuery::new(Vec3::new(0.1, 0.2, 10.0), Vec3::new(0.1, 0.2, -10.0), DdaMode::Mirror);
        let hit = octree.cast_ray(&down, &mut stats).unwrap();
        assert_eq!(hit.face, ids[4]);
        assert!((hit.labda - 0.3).abs() < 0.001);
        assert!((hit.point - Vec3::new(0.1, 0.2, 4.0)).length() < 0.001);

        let up = RayQuery::new(Vec3::new(0.1, 0.2, -10.0), Vec3::new(0.1, 0.2, 10.0), DdaMode::ShadowTransparent);
        assert_eq!(octree.cast_ray(&up, &mut stats).unwrap().face, ids[0]);

        // Oblique, starting between layers
        let oblique = RayQuery::new(Vec3::new(-0.5, 0.0, 2.5), Vec3::new(0.5, 0.3, -0.5), DdaMode::Mirror);
        assert_eq!(octree.cast_ray(&oblique, &mut stats).unwrap().face, ids[2]);
    }

    #[test]
    fn test_shadow_stops_at_first_hit() {
        let (mut scene, grey) = grey_scene();
        // Corners that widen the bounds to about [-5, 5]
        add_tri(&mut scene, grey, [Vec3::splat(-5.0), Vec3::new(-4.9, -5.0, -5.0), Vec3::new(-5.0, -4.9, -5.0)]);
        add_tri(&mut scene, grey, [Vec3::splat(5.0), Vec3::new(4.9, 5.0, 5.0), Vec3::new(5.0, 4.9, 5.0)]);
        // Three nearly coincident squares inside a single cell
        let center = Vec3::new(0.4, 0.4, 0.4);
        let layers: Vec<FaceId> = (0..3)
            .map(|i| {
                let c = center + Vec3::new(0.0, 0.0, 0.001 * i as f32);
                add_quad(&mut scene, grey, square_xy(c, 0.05))
            })
            .collect();
        let octree = build(&scene);

        let start = Vec3::new(0.4, 0.4, 3.0);
        let end = Vec3::new(0.4, 0.4, -3.0);

        let mut mirror_stats = RayStats::default();
        let mirror = octree
            .cast_ray(&RayQuery::new(start, end, DdaMode::Mirror), &mut mirror_stats)
            .unwrap();
        assert_eq!(mirror.face, layers[2]);
        assert_eq!(mirror_stats.mask_accepts, 3);

        let mut shadow_stats = RayStats::default();
        assert!(octree
            .cast_ray(&RayQuery::new(start, end, DdaMode::Shadow), &mut shadow_stats)
            .is_some());
        assert_eq!(shadow_stats.mask_accepts, 1);
        assert_eq!(shadow_stats.cells_visited, mirror_stats.cells_visited);
    }

    #[test]
    fn test_shadow_layers() {
        let (mut scene, ids) = stack();
        for id in &ids {
            scene.set_face_layer(*id, 0b01);
        }
        let octree = build(&scene);
        let mut stats = RayStats::default();
        let start = Vec3::new(0.1, 0.2, 10.0);
        let end = Vec3::new(0.1, 0.2, -10.0);

        let other_layer = RayQuery::new(start, end, DdaMode::Shadow).with_layer(0b10);
        assert!(octree.cast_ray(&other_layer, &mut stats).is_none());

        let same_layer = RayQuery::new(start, end, DdaMode::Shadow).with_layer(0b11);
        assert!(octree.cast_ray(&same_layer, &mut stats).is_some());

        // Layers only restrict shadow casts
        let mirror = RayQuery::new(start, end, DdaMode::Mirror).with_layer(0b10);
        assert!(octree.cast_ray(&mirror, &mut stats).is_some());
    }

    #[test]
    fn test_origin_face_is_skipped() {
        let (scene, ids) = stack();
        let octree = build(&scene);
        let mut stats = RayStats::default();

        // Leaving the top square downwards hits the next one
        let query = RayQuery::new(Vec3::new(0.1, 0.2, 4.0), Vec3::new(0.1, 0.2, -10.0), DdaMode::Mirror)
            .with_origin(ids[4]);
        assert_eq!(octree.cast_ray(&query, &mut stats).unwrap().face, ids[3]);
    }

    #[test]
    fn test_last_hit_is_tried_first() {
        let (scene, ids) = stack();
        let octree = build(&scene);
        let mut stats = RayStats::default();

        let mut is = Isect::new(Vec3::new(0.1, 0.2, 10.0), Vec3::new(0.1, 0.2, -10.0), DdaMode::Shadow, None)
            .with_last_hit(Some(ids[1]));
        assert!(octree.cast(&mut is, &mut stats));
        assert_eq!(is.face, Some(ids[1]));
        assert_eq!(stats.cells_visited, 0);

        // A miss clears the cache
        let mut is = Isect::new(Vec3::new(5.0, 5.0, 10.0), Vec3::new(5.0, 5.0, -10.0), DdaMode::Shadow, None)
            .with_last_hit(Some(ids[1]));
        assert!(!octree.cast(&mut is, &mut stats));
        assert_eq!(is.last_hit, None);
    }

    #[test]
    fn test_short_segment_in_one_cell() {
        let (scene, ids) = stack();
        let octree = build(&scene);
        let mut stats = RayStats::default();

        let query = RayQuery::new(Vec3::new(0.3, 0.3, 2.01), Vec3::new(0.3, 0.3, 1.99), DdaMode::Mirror);
        let hit = octree.cast_ray(&query, &mut stats).unwrap();
        assert_eq!(hit.face, ids[2]);
        assert_eq!(stats.cells_visited, 1);
    }

    /// Two quads folded along the edge x = 0: `flat` lies in z = 0 for
    /// x <= 0, `ramp` rises as z = 0.5 x for x >= 0.
    fn folded_pair() -> (Scene, FaceId, FaceId, FaceId) {
        let (mut scene, grey) = grey_scene();
        let p = |scene: &mut Scene, x: f32, y: f32, z: f32| scene.add_vertex(Vec3::new(x, y, z), None);
        let a = p(&mut scene, -1.0, 0.0, 0.0);
        let b = p(&mut scene, 0.0, 0.0, 0.0);
        let c = p(&mut scene, 0.0, 1.0, 0.0);
        let d = p(&mut scene, -1.0, 1.0, 0.0);
        let e = p(&mut scene, 1.0, 0.0, 0.5);
        let f = p(&mut scene, 1.0, 1.0, 0.5);
        let flat = scene.add_face(&[a, b, c, d], grey).unwrap();
        let ramp = scene.add_face(&[b, e, f, c], grey).unwrap();
        let unrelated = add_tri(
            &mut scene,
            grey,
            [Vec3::new(-1.0, 0.0, 0.4), Vec3::new(-0.9, 0.0, 0.4), Vec3::new(-1.0, 0.1, 0.4)],
        );
        (scene, flat, ramp, unrelated)
    }

    #[test]
    fn test_self_shadow_suppressed_near_shared_edge() {
        let (scene, flat, ramp, unrelated) = folded_pair();
        let octree = build(&scene);
        let mut stats = RayStats::default();

        // Shading point that rounding pushed just past the edge of `flat`,
        // under `ramp`
        let start = Vec3::new(0.001, 0.5, 0.0);
        let end = Vec3::new(0.001, 0.5, 10.0);

        let from_flat = RayQuery::new(start, end, DdaMode::Shadow).with_origin(flat);
        assert!(octree.cast_ray(&from_flat, &mut stats).is_none());

        // Without a neighbouring origin the ramp is a genuine hit
        let from_nowhere = RayQuery::new(start, end, DdaMode::Shadow);
        assert_eq!(octree.cast_ray(&from_nowhere, &mut stats).unwrap().face, ramp);

        let from_unrelated = RayQuery::new(start, end, DdaMode::Shadow).with_origin(unrelated);
        assert_eq!(octree.cast_ray(&from_unrelated, &mut stats).unwrap().face, ramp);
    }
}
