//! The flat scene the tracer works on.
//!
//! Faces reference vertices by index into one shared buffer, so two faces
//! share a vertex exactly when they hold the same index.

use octrace_math::{Aabb, Vec3};
use serde::{Deserialize, Serialize};

use crate::light::Light;
use crate::material::Material;
use crate::mesh::{polygon_normal, Mesh, Polygon};
use crate::{Color, SceneError, SceneResult};

/// Index of a face in its scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub u32);

/// Index of a material in its scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

/// A triangle or quad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Face {
    /// Vertex indices; the fourth is `None` for triangles
    pub v: [u32; 3],
    pub v4: Option<u32>,

    /// Flat normal (counter-clockwise winding)
    pub normal: Vec3,
    pub material: MaterialId,

    /// Interpolate vertex normals when shading
    pub smooth: bool,

    /// Layer bitmask, tested against shadow ray masks
    pub layer: u32,
}

impl Face {
    pub fn is_quad(&self) -> bool {
        self.v4.is_some()
    }

    /// Vertex indices in winding order.
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.v.iter().copied().chain(self.v4)
    }

    /// True when the two faces have at least one vertex in common.
    pub fn shares_vertex(&self, other: &Face) -> bool {
        self.indices().any(|i| other.indices().any(|j| i == j))
    }
}

/// Ambient occlusion colouring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AoColor {
    /// Occlusion factor only
    #[default]
    Plain,
    /// Unoccluded directions pick up the horizon/zenith blend
    SkyColor,
    /// Unoccluded directions pick up the sky shader
    SkyTexture,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AoSettings {
    /// Pattern resolution; `2 * samples^2` directions, at most 16
    pub samples: u32,

    /// Occluders further than this are ignored
    pub distance: f32,

    /// Minimum cosine between a direction and the normal (smooth faces)
    pub bias: f32,

    /// Exponential falloff with distance, if set
    pub falloff: Option<f32>,
    pub color: AoColor,
    pub energy: f32,
}

impl Default for AoSettings {
    fn default() -> Self {
        Self {
            samples: 5,
            distance: 10.0,
            bias: 0.05,
            falloff: None,
            color: AoColor::Plain,
            energy: 1.0,
        }
    }
}

/// World (environment) settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct World {
    pub horizon: Color,
    pub zenith: Color,

    /// Up direction for the sky blend
    pub up: Vec3,
    pub ambient_occlusion: Option<AoSettings>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            horizon: Color::ONE,
            zenith: Color::new(0.5, 0.7, 1.0),
            up: Vec3::Y,
            ambient_occlusion: None,
        }
    }
}

impl World {
    /// Horizon/zenith blend for a direction.
    pub fn sky_blend(&self, direction: Vec3) -> Color {
        let a = 0.5 * (direction.dot(self.up) + 1.0);
        (1.0 - a) * self.horizon + a * self.zenith
    }
}

/// A scene: vertex buffer, faces, materials, lights and world settings.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    /// Scene name
    pub name: String,
    pub world: World,

    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    faces: Vec<Face>,
    materials: Vec<Material>,
    lights: Vec<Light>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a material to the scene and return its ID.
    pub fn add_material(&mut self, material: Material) -> SceneResult<MaterialId> {
        material.validate()?;
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(material);
        Ok(id)
    }

    /// Add a vertex with an optional smooth-shading normal.
    pub fn add_vertex(&mut self, position: Vec3, normal: Option<Vec3>) -> u32 {
        self.vertices.push(position);
        self.normals.push(normal.unwrap_or(Vec3::ZERO));
        (self.vertices.len() - 1) as u32
    }

    /// Add a triangle or quad over existing vertices.
    pub fn add_face(&mut self, indices: &[u32], material: MaterialId) -> SceneResult<FaceId> {
        if !(3..=4).contains(&indices.len()) {
            return Err(SceneError::BadPolygon(indices.len()));
        }
        if material.0 as usize >= self.materials.len() {
            return Err(SceneError::UnknownMaterial(material.0));
        }
        let count = self.vertices.len();
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= count) {
            return Err(SceneError::InvalidVertex { index, count });
        }

        let corners: Vec<Vec3> = indices.iter().map(|&i| self.vertices[i as usize]).collect();
        let face = Face {
            v: [indices[0], indices[1], indices[2]],
            v4: indices.get(3).copied(),
            normal: polygon_normal(&corners),
            material,
            smooth: false,
            layer: 1,
        };
        self.faces.push(face);
        Ok(FaceId((self.faces.len() - 1) as u32))
    }

    /// Append a mesh, returning the ids of its faces.
    pub fn add_mesh(
        &mut self,
        mesh: &Mesh,
        material: MaterialId,
        smooth: bool,
    ) -> SceneResult<Vec<FaceId>> {
        let mut mesh = mesh.clone();
        if smooth {
            mesh.ensure_normals();
        }

        let base = self.vertices.len() as u32;
        for (i, position) in mesh.positions.iter().enumerate() {
            let normal = mesh.normals.as_ref().and_then(|n| n.get(i).copied());
            self.add_vertex(*position, normal);
        }

        let first_face = self.faces.len();
        let mut ids = Vec::with_capacity(mesh.polygons.len());
        for polygon in &mesh.polygons {
            let indices: Vec<u32> = polygon.indices().iter().map(|i| base + i).collect();
            match self.add_face(&indices, material) {
                Ok(id) => {
                    self.faces[id.0 as usize].smooth = smooth;
                    ids.push(id);
                }
                Err(err) => {
                    // Leave the scene as it was before the mesh
                    self.vertices.truncate(base as usize);
                    self.normals.truncate(base as usize);
                    self.faces.truncate(first_face);
                    return Err(err);
                }
            }
        }
        log::debug!(
            "Added {} faces ({} vertices) to scene '{}'",
            ids.len(),
            mesh.vertex_count(),
            self.name
        );
        Ok(ids)
    }

    /// Add a light. Area lights need at least one shadow sample.
    pub fn add_light(&mut self, light: Light) -> SceneResult<usize> {
        let index = self.lights.len();
        if light.samples == 0 {
            return Err(SceneError::ZeroSamples { light: index });
        }
        self.lights.push(light);
        Ok(index)
    }

    /// Move a face to other layers.
    pub fn set_face_layer(&mut self, id: FaceId, layer: u32) {
        if let Some(face) = self.faces.get_mut(id.0 as usize) {
            face.layer = layer;
        }
    }

    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id.0 as usize]
    }

    /// Iterate over faces with their ids.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId, &Face)> {
        self.faces
            .iter()
            .enumerate()
            .map(|(i, face)| (FaceId(i as u32), face))
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.0 as usize]
    }

    pub fn face_material(&self, face: &Face) -> &Material {
        self.material(face.material)
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn vertex(&self, index: u32) -> Vec3 {
        self.vertices[index as usize]
    }

    /// Smooth-shading normal of a vertex (`Vec3::ZERO` if none was given).
    pub fn vertex_normal(&self, index: u32) -> Vec3 {
        self.normals[index as usize]
    }

    /// Corner positions of a face and their count (3 or 4).
    pub fn face_corners(&self, face: &Face) -> ([Vec3; 4], usize) {
        let mut corners = [Vec3::ZERO; 4];
        let mut count = 0;
        for (slot, index) in corners.iter_mut().zip(face.indices()) {
            *slot = self.vertex(index);
            count += 1;
        }
        (corners, count)
    }

    /// Bounds of all faces whose material is traceable.
    pub fn traceable_bounds(&self) -> Aabb {
        self.faces
            .iter()
            .filter(|face| self.face_material(face).is_traceable())
            .flat_map(|face| face.indices())
            .fold(Aabb::EMPTY, |bounds, i| bounds.include(self.vertex(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::Light;

    fn grey_scene() -> (Scene, MaterialId) {
        let mut scene = Scene::new("test");
        let grey = scene
            .add_material(Material::new("grey", Color::splat(0.5)))
            .unwrap();
        (scene, grey)
    }

    #[test]
    fn test_scene_creation() {
        let (mut scene, grey) = grey_scene();
        let ids = scene.add_mesh(&Mesh::cube(Vec3::ZERO, 1.0), grey, false).unwrap();

        assert_eq!(ids.len(), 6);
        assert_eq!(scene.face_count(), 6);
        assert!(scene.face(ids[0]).is_quad());
        assert_eq!(scene.face_material(scene.face(ids[0])).name, "grey");
    }

    #[test]
    fn test_add_face_validation() {
        let (mut scene, grey) = grey_scene();
        let a = scene.add_vertex(Vec3::ZERO, None);
        let b = scene.add_vertex(Vec3::X, None);
        let c = scene.add_vertex(Vec3::Y, None);

        assert_eq!(
            scene.add_face(&[a, b], grey),
            Err(SceneError::BadPolygon(2))
        );
        assert_eq!(
            scene.add_face(&[a, b, 7], grey),
            Err(SceneError::InvalidVertex { index: 7, count: 3 })
        );
        assert_eq!(
            scene.add_face(&[a, b, c], MaterialId(3)),
            Err(SceneError::UnknownMaterial(3))
        );

        let id = scene.add_face(&[a, b, c], grey).unwrap();
        assert!((scene.face(id).normal - Vec3::Z).length() < 0.001);
    }

    #[test]
    fn test_failed_mesh_leaves_scene_unchanged() {
        let (mut scene, grey) = grey_scene();
        scene.add_mesh(&Mesh::plane(Vec3::ZERO, 1.0), grey, false).unwrap();

        let broken = Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![Polygon::Tri([0, 1, 2]), Polygon::Tri([0, 1, 9])],
        );
        assert_eq!(
            scene.add_mesh(&broken, grey, false),
            Err(SceneError::InvalidVertex { index: 13, count: 7 })
        );

        // Neither the vertices nor the first triangle were kept
        assert_eq!(scene.face_count(), 1);
        assert_eq!(
            scene.add_face(&[0, 1, 4], grey),
            Err(SceneError::InvalidVertex { index: 4, count: 4 })
        );
    }

    #[test]
    fn test_shared_vertices() {
        let (mut scene, grey) = grey_scene();
        let v: Vec<u32> = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE, Vec3::NEG_ONE]
            .iter()
            .map(|p| scene.add_vertex(*p, None))
            .collect();

        let first = scene.add_face(&[v[0], v[1], v[2]], grey).unwrap();
        let neighbour = scene.add_face(&[v[1], v[3], v[2]], grey).unwrap();
        let apart = scene.add_face(&[v[3], v[4], v[0]], grey).unwrap();
        let far = scene.add_face(&[v[3], v[4], v[3]], grey).unwrap();

        assert!(scene.face(first).shares_vertex(scene.face(neighbour)));
        assert!(scene.face(first).shares_vertex(scene.face(apart)));
        assert!(!scene.face(first).shares_vertex(scene.face(far)));
    }

    #[test]
    fn test_zero_sample_light_rejected() {
        let (mut scene, _) = grey_scene();
        let mut light = Light::point(Vec3::Y);
        light.samples = 0;

        assert_eq!(scene.add_light(light), Err(SceneError::ZeroSamples { light: 0 }));
        assert!(scene.lights().is_empty());
    }

    #[test]
    fn test_traceable_bounds_skip_wire() {
        let (mut scene, grey) = grey_scene();
        let wire = scene
            .add_material(Material {
                wire: true,
                ..Default::default()
            })
            .unwrap();
        scene.add_mesh(&Mesh::plane(Vec3::ZERO, 1.0), grey, false).unwrap();
        scene
            .add_mesh(&Mesh::plane(Vec3::new(0.0, 5.0, 0.0), 10.0), wire, false)
            .unwrap();

        let bounds = scene.traceable_bounds();
        assert!((bounds.x.max - 1.0).abs() < 0.001);
        assert!(bounds.y.max.abs() < 0.001);
    }

    #[test]
    fn test_smooth_mesh_gets_vertex_normals() {
        let (mut scene, grey) = grey_scene();
        let ids = scene
            .add_mesh(&Mesh::plane(Vec3::ZERO, 1.0), grey, true)
            .unwrap();
        let face = *scene.face(ids[0]);

        assert!(face.smooth);
        for i in face.indices() {
            assert!((scene.vertex_normal(i) - Vec3::Y).length() < 0.001);
        }
    }

    #[test]
    fn test_world_from_json() {
        let world: World = serde_json::from_str(
            r#"{ "zenith": [0.1, 0.2, 0.9], "ambient_occlusion": { "samples": 3 } }"#,
        )
        .unwrap();

        assert_eq!(world.horizon, Color::ONE);
        assert_eq!(world.ambient_occlusion.unwrap().samples, 3);
        assert!((world.sky_blend(Vec3::Y) - Color::new(0.1, 0.2, 0.9)).length() < 0.001);
    }
}
