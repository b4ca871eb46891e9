//! Renders a floor, a mirror cube and a glass sphere under a soft area
//! light, and saves the result as a PNG.
//!
//! Run with `RUST_LOG=info` to see build and render statistics.

use std::f32::consts::FRAC_PI_2;
use std::time::Instant;

use anyhow::Result;
use octrace_core::{AoSettings, Color, Light, Material, Mesh, SampleMode, Scene};
use octrace_math::Mat3;
use octrace_renderer::{render, Camera, Octree, PhongShader, RenderConfig, Tracer, Vec3};

fn main() -> Result<()> {
    env_logger::init();

    let start = Instant::now();
    let scene = build_scene()?;
    log::info!("scene built in {:?} ({} faces)", start.elapsed(), scene.face_count());

    let config = RenderConfig {
        samples_per_pixel: 4,
        ..Default::default()
    };

    let start = Instant::now();
    let octree = Octree::build(&scene, &config.octree)?;
    log::info!("octree built in {:?}: {:?}", start.elapsed(), octree.stats());

    let mut camera = Camera::new()
        .with_resolution(640, 400)
        .with_position(Vec3::new(6.0, 3.5, 8.0), Vec3::new(0.0, 0.8, 0.0), Vec3::Y)
        .with_fov(40.0);
    camera.initialize();

    let tracer = Tracer::new(&octree, &PhongShader, &scene.world, &config);

    let start = Instant::now();
    let output = render(&tracer, &camera, &config)?;
    log::info!("rendered in {:?}: {:?}", start.elapsed(), output.stats);

    let filename = "output.png";
    output.image.save_png(filename)?;
    println!("Saved to {}", filename);
    Ok(())
}

fn build_scene() -> Result<Scene> {
    let mut scene = Scene::new("simple");
    scene.world.ambient_occlusion = Some(AoSettings {
        samples: 4,
        distance: 3.0,
        energy: 0.3,
        ..Default::default()
    });

    let floor = scene.add_material(Material::new("floor", Color::new(0.6, 0.6, 0.55)))?;
    let mirror = scene.add_material(Material::new("mirror", Color::new(0.9, 0.9, 0.9)).with_mirror(0.8))?;
    let glass = scene.add_material(Material::new("glass", Color::new(0.8, 0.9, 1.0)).with_glass(0.2, 1.5))?;

    scene.add_mesh(&Mesh::plane(Vec3::ZERO, 8.0), floor, false)?;
    scene.add_mesh(&Mesh::cube(Vec3::new(-1.5, 1.0, -1.0), 1.0), mirror, false)?;
    scene.add_mesh(&Mesh::uv_sphere(Vec3::new(1.5, 1.0, 1.0), 1.0, 32, 16), glass, true)?;

    scene.add_light(
        Light::area(Vec3::new(2.0, 6.0, 3.0), Mat3::from_rotation_x(FRAC_PI_2), 2.0, 16)
            .with_color(Color::ONE, 1.0)
            .with_sampling(SampleMode::Jitter),
    )?;
    scene.add_light(Light::hemi(Vec3::new(0.0, -1.0, 0.0)).with_color(Color::new(0.4, 0.5, 0.7), 0.3))?;

    Ok(scene)
}
