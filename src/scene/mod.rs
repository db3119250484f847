//! Scene graph
//!
//! Plain data describing what should be drawn: meshes with materials and
//! transforms, lights, fog and background. The renderer reads it each frame;
//! gameplay code only ever adds objects and moves them.

pub mod camera;

pub use camera::PerspectiveCamera;

use glam::{Mat4, Quat, Vec3};

use crate::srgb_hex_to_linear;

/// Index of an object inside a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub usize);

/// Shape of a scene object
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeshKind {
    /// Axis-aligned box with full extents
    Box { size: Vec3 },
    /// Y-up capsule: cylinder of `length` capped by two hemispheres
    Capsule {
        radius: f32,
        length: f32,
        cap_segments: u32,
        radial_segments: u32,
    },
}

/// Flat-colored lit material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Linear RGB
    pub color: [f32; 3],
    pub opacity: f32,
}

impl Material {
    pub fn opaque(hex: u32) -> Self {
        Self {
            color: srgb_hex_to_linear(hex),
            opacity: 1.0,
        }
    }

    pub fn translucent(hex: u32, opacity: f32) -> Self {
        Self {
            color: srgb_hex_to_linear(hex),
            opacity: opacity.clamp(0.0, 1.0),
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub mesh: MeshKind,
    pub material: Material,
    pub position: Vec3,
    pub rotation: Quat,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl SceneObject {
    pub fn new(mesh: MeshKind, material: Material, position: Vec3) -> Self {
        Self {
            mesh,
            material,
            position,
            rotation: Quat::IDENTITY,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Orthographic shadow volume of a directional light
#[derive(Debug, Clone, Copy)]
pub struct ShadowCamera {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
    pub map_size: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    /// Light sits here and shines toward `target`
    pub position: Vec3,
    pub target: Vec3,
    /// None = casts no shadows
    pub shadow: Option<ShadowCamera>,
}

impl DirectionalLight {
    /// Unit vector pointing from the surface toward the light
    pub fn direction_to_light(&self) -> Vec3 {
        (self.position - self.target).normalize_or(Vec3::Y)
    }

    /// View-projection used to render and sample the shadow map
    pub fn shadow_view_proj(&self) -> Option<Mat4> {
        let shadow = self.shadow?;
        let view = Mat4::look_at_rh(self.position, self.target, Vec3::Y);
        let proj = Mat4::orthographic_rh(
            shadow.left,
            shadow.right,
            shadow.bottom,
            shadow.top,
            shadow.near,
            shadow.far,
        );
        Some(proj * view)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Fog {
    pub color: [f32; 3],
    pub near: f32,
    pub far: f32,
}

pub struct Scene {
    /// Linear RGB clear color
    pub background: [f32; 3],
    pub fog: Option<Fog>,
    pub ambient: AmbientLight,
    pub sun: DirectionalLight,
    objects: Vec<SceneObject>,
}

impl Scene {
    /// Sky-blue scene with fog, a soft white ambient light and an angled sun
    pub fn new(sky_hex: u32, fog_near: f32, fog_far: f32, shadow_map_size: Option<u32>) -> Self {
        let sky = srgb_hex_to_linear(sky_hex);
        Self {
            background: sky,
            fog: Some(Fog {
                color: sky,
                near: fog_near,
                far: fog_far,
            }),
            ambient: AmbientLight {
                color: [1.0, 1.0, 1.0],
                intensity: 0.6,
            },
            sun: DirectionalLight {
                color: [1.0, 1.0, 1.0],
                intensity: 0.8,
                position: Vec3::new(10.0, 15.0, 10.0),
                target: Vec3::ZERO,
                shadow: shadow_map_size.map(|map_size| ShadowCamera {
                    left: -20.0,
                    right: 20.0,
                    bottom: -20.0,
                    top: 20.0,
                    near: 0.5,
                    far: 50.0,
                    map_size,
                }),
            },
            objects: Vec::new(),
        }
    }

    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().enumerate().map(|(i, o)| (ObjectId(i), o))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_returns_sequential_ids() {
        let mut scene = Scene::new(0x87ceeb, 0.0, 75.0, Some(1024));
        let a = scene.add(SceneObject::new(
            MeshKind::Box { size: Vec3::ONE },
            Material::opaque(0x888888),
            Vec3::ZERO,
        ));
        let b = scene.add(SceneObject::new(
            MeshKind::Box { size: Vec3::ONE },
            Material::translucent(0x00ff00, 0.5),
            Vec3::X,
        ));
        assert_eq!(a, ObjectId(0));
        assert_eq!(b, ObjectId(1));
        assert_eq!(scene.len(), 2);
        assert!(scene.get(b).unwrap().material.is_transparent());
        assert!(!scene.get(a).unwrap().material.is_transparent());
    }

    #[test]
    fn test_shadow_projection_covers_origin() {
        let scene = Scene::new(0x87ceeb, 0.0, 75.0, Some(1024));
        let vp = scene.sun.shadow_view_proj().unwrap();
        let clip = vp * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);

        let no_shadows = Scene::new(0x87ceeb, 0.0, 75.0, None);
        assert!(no_shadows.sun.shadow_view_proj().is_none());
    }
}
