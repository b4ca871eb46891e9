//! Scene fixtures shared by the unit tests.

use glam::Vec3;
use octrace_core::{FaceId, Material, MaterialId, Scene};
use octrace_math::Aabb;

/// Empty scene with one diffuse grey material.
pub fn grey_scene() -> (Scene, MaterialId) {
    let mut scene = Scene::new("test");
    let grey = scene
        .add_material(Material::new("grey", Vec3::splat(0.8)))
        .unwrap();
    (scene, grey)
}

pub fn add_tri(scene: &mut Scene, material: MaterialId, corners: [Vec3; 3]) -> FaceId {
    let indices: Vec<u32> = corners.iter().map(|&p| scene.add_vertex(p, None)).collect();
    scene.add_face(&indices, material).unwrap()
}

pub fn add_quad(scene: &mut Scene, material: MaterialId, corners: [Vec3; 4]) -> FaceId {
    let indices: Vec<u32> = corners.iter().map(|&p| scene.add_vertex(p, None)).collect();
    scene.add_face(&indices, material).unwrap()
}

/// Square in the plane z = center.z, wound counter-clockwise seen from +z.
pub fn square_xy(center: Vec3, half: f32) -> [Vec3; 4] {
    [
        center + Vec3::new(-half, -half, 0.0),
        center + Vec3::new(half, -half, 0.0),
        center + Vec3::new(half, half, 0.0),
        center + Vec3::new(-half, half, 0.0),
    ]
}

/// Square in the plane y = center.y, wound counter-clockwise seen from +y.
pub fn square_xz(center: Vec3, half: f32) -> [Vec3; 4] {
    [
        center + Vec3::new(-half, 0.0, -half),
        center + Vec3::new(-half, 0.0, half),
        center + Vec3::new(half, 0.0, half),
        center + Vec3::new(half, 0.0, -half),
    ]
}

/// Separating axis test between a triangle and a box.
pub fn tri_box_overlap(tri: [Vec3; 3], bounds: &Aabb) -> bool {
    let center = bounds.centroid();
    let half = 0.5 * bounds.extent();
    let v = tri.map(|p| p - center);
    let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];

    let separated = |axis: Vec3| {
        if axis.length_squared() < 1e-12 {
            return false;
        }
        let p = v.map(|q| q.dot(axis));
        let lo = p[0].min(p[1]).min(p[2]);
        let hi = p[0].max(p[1]).max(p[2]);
        let r = half.dot(axis.abs());
        lo > r || hi < -r
    };

    let mut axes = vec![Vec3::X, Vec3::Y, Vec3::Z, edges[0].cross(edges[1])];
    for edge in edges {
        for unit in [Vec3::X, Vec3::Y, Vec3::Z] {
            axes.push(edge.cross(unit));
        }
    }
    !axes.into_iter().any(separated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tri_box_overlap() {
        let unit = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let inside = [Vec3::splat(0.2), Vec3::new(0.8, 0.2, 0.2), Vec3::new(0.2, 0.8, 0.2)];
        let above = inside.map(|p| p + 1.1 * Vec3::Z);
        let diagonal = [Vec3::new(2.2, 0.0, 0.5), Vec3::new(0.0, 2.2, 0.5), Vec3::new(3.0, 3.0, 0.5)];

        assert!(tri_box_overlap(inside, &unit));
        assert!(!tri_box_overlap(above, &unit));
        // Bounding boxes overlap but the edge passes the corner
        assert!(!tri_box_overlap(diagonal, &unit));
    }
}
