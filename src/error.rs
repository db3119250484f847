//! Error types
//!
//! Start-up failures are surfaced to the caller; the browser entry point logs them
//! and stops initializing instead of panicking.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    /// A collaborator was used before it was created
    #[error("{0} not initialized")]
    MissingDependency(&'static str),
    #[error("canvas unavailable: {0}")]
    Canvas(String),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),
    #[error("failed to create GPU device: {0}")]
    Device(String),
    #[error("failed to create render surface: {0}")]
    Surface(String),
}
