//! Perspective camera

use glam::{Mat4, Vec3};

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Vertical field of view in radians
    pub fov: f32,
    /// Width / height of the viewport
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    /// Point the camera looks at
    pub target: Vec3,
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov: fov_degrees.to_radians(),
            aspect,
            near,
            far,
            position: Vec3::new(0.0, 5.0, 10.0),
            target: Vec3::ZERO,
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Match the aspect ratio to a viewport. Zero-height viewports are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }
}
