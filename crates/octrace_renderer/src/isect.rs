//! Per-cast intersection state.

use glam::{Vec3, Vec4};
use octrace_core::FaceId;

use crate::intersect::QuadHalf;

/// What a cast is looking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DdaMode {
    /// Any hit will do; layer masks apply
    Shadow,
    /// Closest hit
    Mirror,
    /// Closest hit, for chaining through transparent occluders
    ShadowTransparent,
}

/// Memo of the reversed-segment test against the origin face; computed at
/// most once per cast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SelfHitGuard {
    pub tested: bool,
    pub crosses_origin: bool,
}

/// Input and output of one octree cast.
///
/// `labda`, `u` and `v` are relative to the segment as clipped to the
/// octree bounds; `start` and `end` are updated by the clip.
#[derive(Clone, Copy, Debug)]
pub struct Isect {
    pub start: Vec3,
    pub end: Vec3,
    pub vec: Vec3,
    pub mode: DdaMode,

    /// Face the segment starts on; never reported as a hit
    pub origin: Option<FaceId>,

    /// Occluder layer mask (shadow mode only)
    pub layer: u32,

    /// Running RGBA transmittance for transparent shadows
    pub col: Vec4,

    pub face: Option<FaceId>,
    pub labda: f32,
    pub u: f32,
    pub v: f32,
    pub half: QuadHalf,

    /// Face that last blocked a shadow ray; tried first on the next cast
    pub last_hit: Option<FaceId>,

    /// Exit parameter of the cell being tested
    pub(crate) ddalabda: f32,
    pub(crate) guard: SelfHitGuard,
}

impl Isect {
    pub fn new(start: Vec3, end: Vec3, mode: DdaMode, origin: Option<FaceId>) -> Self {
        Self {
            start,
            end,
            vec: end - start,
            mode,
            origin,
            layer: u32::MAX,
            col: Vec4::ONE,
            face: None,
            labda: 0.0,
            u: 0.0,
            v: 0.0,
            half: QuadHalf::First,
            last_hit: None,
            ddalabda: 1.0,
            guard: SelfHitGuard::default(),
        }
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_last_hit(mut self, last_hit: Option<FaceId>) -> Self {
        self.last_hit = last_hit;
        self
    }

    /// Point of the current hit.
    pub fn hit_point(&self) -> Vec3 {
        self.start + self.labda * self.vec
    }
}
