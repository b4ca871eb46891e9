//! Image rendering on top of the tracer.
//!
//! Buckets are rendered in parallel with rayon. Every bucket gets its own
//! `RayContext`, seeded from the render seed and the bucket index, so a
//! render is reproducible regardless of thread scheduling.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec4;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bucket::{generate_buckets, render_bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::context::RayContext;
use crate::error::{RenderError, RenderResult};
use crate::octree::OctreeConfig;
use crate::stats::RayStats;
use crate::{Camera, Tracer};

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Camera rays per pixel; more than one jitters them inside the pixel
    pub samples_per_pixel: u32,
    /// Bucket edge length in pixels
    pub bucket_size: u32,
    pub octree: OctreeConfig,
    /// Offset of shadow ray starts along the normal of smooth faces
    pub shadow_bias: f32,
    /// Use the world's ambient occlusion settings, if any
    pub ambient_occlusion: bool,
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 1,
            bucket_size: DEFAULT_BUCKET_SIZE,
            octree: OctreeConfig::default(),
            shadow_bias: 0.001,
            ambient_occlusion: true,
            seed: 0,
        }
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a colour to 8-bit RGBA; alpha is the coverage.
pub fn color_to_rgba(color: Vec4) -> [u8; 4] {
    let channel = |x: f32| (255.0 * linear_to_gamma(x).clamp(0.0, 1.0)) as u8;
    [
        channel(color.x),
        channel(color.y),
        channel(color.z),
        (255.0 * color.w.clamp(0.0, 1.0)) as u8,
    ]
}

/// Render a single pixel, averaging `samples_per_pixel` camera rays.
pub fn render_pixel(
    tracer: &Tracer<'_>,
    camera: &Camera,
    x: u32,
    y: u32,
    config: &RenderConfig,
    ctx: &mut RayContext,
) -> Vec4 {
    ctx.set_pixel(x, y);
    if config.samples_per_pixel <= 1 {
        return tracer.trace_primary(&camera.get_ray(x, y), ctx);
    }

    let mut sum = Vec4::ZERO;
    for _ in 0..config.samples_per_pixel {
        let ray = camera.get_jittered_ray(x, y, &mut ctx.rng);
        sum += tracer.trace_primary(&ray, ctx);
    }
    sum / config.samples_per_pixel as f32
}

/// RGBA float image.
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec4>,
}

impl ImageBuffer {
    /// Create a new, fully transparent image buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec4::ZERO; (width * height) as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Vec4) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Copy a rendered bucket into place.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for (i, color) in result.pixels.iter().enumerate() {
            let i = i as u32;
            self.set(bucket.x + i % bucket.width, bucket.y + i / bucket.width, *color);
        }
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.width * self.height * 4) as usize);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }

    /// Write the image as a PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        image::save_buffer(
            path,
            &self.to_rgba(),
            self.width,
            self.height,
            image::ColorType::Rgba8,
        )?;
        Ok(())
    }
}

/// A finished render.
pub struct RenderOutput {
    pub image: ImageBuffer,
    pub stats: RayStats,
}

/// Render the whole image in parallel buckets.
pub fn render(tracer: &Tracer<'_>, camera: &Camera, config: &RenderConfig) -> RenderResult<RenderOutput> {
    render_with_cancel(tracer, camera, config, &AtomicBool::new(false))
}

/// Like `render`, but gives up with `RenderError::Cancelled` once `cancel`
/// is set. The flag is checked before each bucket.
pub fn render_with_cancel(
    tracer: &Tracer<'_>,
    camera: &Camera,
    config: &RenderConfig,
    cancel: &AtomicBool,
) -> RenderResult<RenderOutput> {
    let (width, height) = (camera.image_width, camera.image_height);
    let buckets = generate_buckets(width, height, config.bucket_size.max(1));

    let results = buckets
        .par_iter()
        .map(|bucket| {
            if cancel.load(Ordering::Relaxed) {
                return Err(RenderError::Cancelled);
            }
            let result = render_bucket(bucket, tracer, camera, config);
            log::debug!("bucket {} done ({} pixels)", bucket.index, bucket.pixel_count());
            Ok(result)
        })
        .collect::<RenderResult<Vec<_>>>()?;

    let mut image = ImageBuffer::new(width, height);
    let mut stats = RayStats::default();
    for result in &results {
        image.write_bucket(result);
        stats += result.stats;
    }

    log::info!(
        "rendered {}x{} in {} buckets: {} rays, {} hits, {} traced",
        width,
        height,
        results.len(),
        stats.rays,
        stats.hits,
        stats.traced
    );
    Ok(RenderOutput { image, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::octree::Octree;
    use crate::shader::PhongShader;
    use crate::testutil::{add_quad, grey_scene, square_xy};
    use glam::Vec3;
    use octrace_core::{Color, Light, Scene};

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_color_to_rgba() {
        assert_eq!(color_to_rgba(Vec4::new(1.0, 0.25, 4.0, 1.0)), [255, 127, 255, 255]);
        assert_eq!(color_to_rgba(Vec4::new(-1.0, 0.0, 0.0, 0.0)), [0, 0, 0, 0]);
    }

    #[test]
    fn test_config_from_json() {
        let config: RenderConfig =
            serde_json::from_str(r#"{ "samples_per_pixel": 4, "octree": { "resolution": 256 } }"#).unwrap();

        assert_eq!(config.samples_per_pixel, 4);
        assert_eq!(config.octree.resolution, 256);
        assert_eq!(config.bucket_size, DEFAULT_BUCKET_SIZE);
        assert!(config.ambient_occlusion);
    }

    /// A lit floor filling the lower half of the view.
    fn floor_scene() -> Scene {
        let (mut scene, grey) = grey_scene();
        add_quad(&mut scene, grey, square_xy(Vec3::ZERO, 5.0));
        scene.add_light(Light::sun(Vec3::new(0.2, 0.1, -1.0))).unwrap();
        scene
    }

    fn camera() -> Camera {
        let mut camera = Camera::new()
            .with_resolution(24, 16)
            .with_position(Vec3::new(0.0, -6.0, 2.0), Vec3::new(0.0, 0.0, 0.5), Vec3::Z)
            .with_fov(50.0);
        camera.initialize();
        camera
    }

    #[test]
    fn test_render_is_deterministic() {
        let scene = floor_scene();
        let config = RenderConfig {
            samples_per_pixel: 2,
            bucket_size: 8,
            ..Default::default()
        };
        let octree = Octree::build(&scene, &config.octree).unwrap();
        let ambient = Color::splat(0.2);
        let tracer = Tracer::new(&octree, &PhongShader, &ambient, &config);
        let camera = camera();

        let first = render(&tracer, &camera, &config).unwrap();
        let second = render(&tracer, &camera, &config).unwrap();

        assert_eq!(first.image.pixels, second.image.pixels);
        assert_eq!(first.stats, second.stats);
        assert_eq!(first.image.to_rgba().len(), 24 * 16 * 4);

        // Bottom row sees the floor, top row the sky
        assert_eq!(first.image.get(12, 15).w, 1.0);
        assert_eq!(first.image.get(12, 0), Vec4::new(0.2, 0.2, 0.2, 0.0));
    }

    #[test]
    fn test_cancelled_render() {
        let scene = floor_scene();
        let config = RenderConfig::default();
        let octree = Octree::build(&scene, &config.octree).unwrap();
        let tracer = Tracer::new(&octree, &PhongShader, &Color::ZERO, &config);

        let result = render_with_cancel(&tracer, &camera(), &config, &AtomicBool::new(true));
        assert!(matches!(result, Err(RenderError::Cancelled)));
    }
}
