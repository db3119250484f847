//! WebGPU rendering module
//!
//! Forward renderer for the scene graph: flat-colored lit meshes, a directional
//! shadow map, linear fog and alpha-blended translucent objects.

pub mod pipeline;
pub mod shapes;
pub mod vertex;

pub use pipeline::RenderState;

use thiserror::Error;

use crate::scene::{PerspectiveCamera, Scene};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Anything that can draw a scene from a camera and follow viewport changes
pub trait SceneRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError>;
    fn resize(&mut self, width: u32, height: u32);
}
