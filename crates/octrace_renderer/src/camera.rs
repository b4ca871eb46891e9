//! Pinhole camera for primary rays.

use glam::Vec3;
use octrace_math::Ray;
use rand::{Rng, RngCore};

/// Image plane one unit in front of the eye, in world space.
#[derive(Clone, Copy, Debug, Default)]
struct Projection {
    /// Centre of pixel (0, 0)
    first_pixel: Vec3,
    /// Step to the next column
    step_x: Vec3,
    /// Step to the next row (downwards)
    step_y: Vec3,
}

/// Camera generating rays through pixel centres.
///
/// Configure with the `with_*` builders, then call `initialize` before
/// asking for rays.
#[derive(Clone, Debug)]
pub struct Camera {
    pub image_width: u32,
    pub image_height: u32,

    eye: Vec3,
    target: Vec3,
    up: Vec3,

    /// Vertical field of view in degrees
    vfov: f32,

    projection: Projection,
}

impl Camera {
    /// 320x240 camera at the origin looking down -Z.
    pub fn new() -> Self {
        Self {
            image_width: 320,
            image_height: 240,
            eye: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            vfov: 60.0,
            projection: Projection::default(),
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    /// Place the eye at `eye`, looking at `target` with `up` roughly up.
    pub fn with_position(mut self, eye: Vec3, target: Vec3, up: Vec3) -> Self {
        self.eye = eye;
        self.target = target;
        self.up = up;
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    /// Recompute the image plane after changing settings.
    pub fn initialize(&mut self) {
        let width = self.image_width.max(1) as f32;
        let height = self.image_height.max(1) as f32;

        let forward = (self.target - self.eye).normalize_or_zero();
        let right = forward.cross(self.up).normalize_or_zero();
        let down = forward.cross(right);

        let half_height = (0.5 * self.vfov.to_radians()).tan();
        let half_width = half_height * width / height;

        let step_x = (2.0 * half_width / width) * right;
        let step_y = (2.0 * half_height / height) * down;
        let top_left = self.eye + forward - half_width * right - half_height * down;

        self.projection = Projection {
            first_pixel: top_left + 0.5 * (step_x + step_y),
            step_x,
            step_y,
        };
    }

    /// Ray through the centre of pixel (x, y); row 0 is the top.
    pub fn get_ray(&self, x: u32, y: u32) -> Ray {
        self.ray_through(x as f32, y as f32)
    }

    /// Ray through a uniformly random point of pixel (x, y).
    pub fn get_jittered_ray(&self, x: u32, y: u32, rng: &mut dyn RngCore) -> Ray {
        let dx = rng.gen::<f32>() - 0.5;
        let dy = rng.gen::<f32>() - 0.5;
        self.ray_through(x as f32 + dx, y as f32 + dy)
    }

    fn ray_through(&self, x: f32, y: f32) -> Ray {
        let p = &self.projection;
        let on_plane = p.first_pixel + x * p.step_x + y * p.step_y;
        Ray::new(self.eye, on_plane - self.eye)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn looking_down_neg_z(size: u32, vfov: f32) -> Camera {
        let mut camera = Camera::new()
            .with_resolution(size, size)
            .with_position(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y)
            .with_fov(vfov);
        camera.initialize();
        camera
    }

    #[test]
    fn test_centre_ray_looks_at_target() {
        let mut camera = Camera::new()
            .with_resolution(101, 51)
            .with_position(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 2.0, -7.0), Vec3::Y);
        camera.initialize();

        let ray = camera.get_ray(50, 25);
        assert_eq!(ray.origin, camera.eye());
        assert!((ray.direction.normalize() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_field_of_view_spreads_corners() {
        let camera = looking_down_neg_z(100, 90.0);

        // Top-left pixel centre sits just inside the 45 degree frustum
        let corner = camera.get_ray(0, 0).direction;
        assert!((corner.x + 0.99).abs() < 1e-4, "{corner:?}");
        assert!((corner.y - 0.99).abs() < 1e-4, "{corner:?}");
        assert!((corner.z + 1.0).abs() < 1e-5);

        let bottom_right = camera.get_ray(99, 99).direction;
        assert!(bottom_right.x > 0.0 && bottom_right.y < 0.0);
    }

    #[test]
    fn test_jittered_rays_stay_in_pixel() {
        let camera = looking_down_neg_z(10, 90.0);
        let mut rng = StdRng::seed_from_u64(42);

        let centre = camera.get_ray(5, 5).direction;
        for _ in 0..20 {
            let ray = camera.get_jittered_ray(5, 5, &mut rng);
            // Pixels are 0.2 wide on the image plane
            assert!((ray.direction - centre).length() < 0.15);
        }
    }
}
