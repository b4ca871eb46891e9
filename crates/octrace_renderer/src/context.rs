//! Per-worker tracing state.

use glam::{Vec2, Vec3};
use octrace_core::FaceId;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::stats::RayStats;

/// Buffer tied to the pixel it was filled for.
#[derive(Clone, Debug, Default)]
pub(crate) struct PixelScratch<T> {
    pub pixel: Option<(u32, u32)>,
    pub items: Vec<T>,
}

impl<T> PixelScratch<T> {
    /// True when the buffer already holds the data for `pixel`.
    pub fn is_for(&self, pixel: (u32, u32)) -> bool {
        self.pixel == Some(pixel)
    }
}

/// Mutable state one rendering thread carries through its rays.
///
/// Nothing in here is shared: every rayon task builds its own context, so
/// the octree and tracer can stay immutable.
#[derive(Clone, Debug)]
pub struct RayContext {
    pub stats: RayStats,
    pixel: (u32, u32),

    /// Last shadow occluder per light, for camera-ray shading
    pub(crate) shadow_cache: Vec<Option<FaceId>>,
    pub(crate) jitter: Vec<PixelScratch<Vec2>>,
    pub(crate) ao: PixelScratch<Vec3>,
    pub(crate) rng: StdRng,
}

impl RayContext {
    pub fn new(light_count: usize, seed: u64) -> Self {
        Self {
            stats: RayStats::default(),
            pixel: (0, 0),
            shadow_cache: vec![None; light_count],
            jitter: vec![PixelScratch::default(); light_count],
            ao: PixelScratch::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pixel being shaded; picks dither phases and per-pixel jitter.
    pub fn pixel(&self) -> (u32, u32) {
        self.pixel
    }

    pub fn set_pixel(&mut self, x: u32, y: u32) {
        self.pixel = (x, y);
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Make room for per-light state of `count` lights.
    pub(crate) fn ensure_lights(&mut self, count: usize) {
        if self.shadow_cache.len() < count {
            self.shadow_cache.resize(count, None);
            self.jitter.resize_with(count, PixelScratch::default);
        }
    }

    /// Forget cached shadow occluders.
    pub fn clear_shadow_cache(&mut self) {
        self.shadow_cache.iter_mut().for_each(|slot| *slot = None);
    }
}
