//! Goal Rush - roll a ball across a floating platform into the goal
//!
//! Core modules:
//! - `physics`: rapier3d world wrapper (stepping, tags, collision subscriptions)
//! - `scene`: scene graph and camera handed to the renderer
//! - `level`: platform + goal sensor
//! - `player`: player body, keyboard intent, movement and jump
//! - `game`: session bootstrap and the per-frame driver
//! - `renderer`: WebGPU rendering pipeline
//! - `platform`: Browser host glue

pub mod error;
pub mod game;
pub mod level;
pub mod physics;
pub mod platform;
pub mod player;
pub mod renderer;
pub mod scene;
pub mod settings;

pub use error::GameError;
pub use game::{FrameDriver, FrameFlow, RunState, Session, World};
pub use settings::{QualityPreset, Settings};

/// Game configuration constants
pub mod consts {
    /// Nominal physics step (60 Hz)
    pub const TIME_STEP: f32 = 1.0 / 60.0;
    /// Maximum catch-up substeps per frame
    pub const MAX_SUBSTEPS: u32 = 3;
    /// Upper bound on frame elapsed time fed to the physics step (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// World gravity (m/s²)
    pub const GRAVITY: f32 = -9.82;
    pub const SOLVER_ITERATIONS: usize = 10;
    /// Friction used by every collider in the level
    pub const SURFACE_FRICTION: f32 = 0.3;
    /// Bounciness used by every solid collider in the level
    pub const SURFACE_RESTITUTION: f32 = 0.3;

    /// Platform: 10 x 0.5 x 10 box with its top at y = 0
    pub const PLATFORM_SIZE: [f32; 3] = [10.0, 0.5, 10.0];
    pub const PLATFORM_CENTER: [f32; 3] = [0.0, -0.25, 0.0];

    /// Goal: 1 unit cube resting on the platform near one corner
    pub const GOAL_SIZE: f32 = 1.0;
    pub const GOAL_CENTER: [f32; 3] = [4.0, GOAL_SIZE / 2.0, 4.0];
    pub const GOAL_NAME: &str = "GoalArea";

    /// Player defaults
    pub const PLAYER_SPAWN: [f32; 3] = [0.0, 3.0, 3.0];
    pub const PLAYER_RADIUS: f32 = 0.5;
    pub const PLAYER_HEIGHT: f32 = 2.0;
    pub const PLAYER_MASS: f32 = 70.0;
    pub const PLAYER_LINEAR_DAMPING: f32 = 0.1;
    pub const PLAYER_ANGULAR_DAMPING: f32 = 0.5;
    pub const PLAYER_MOVE_SPEED: f32 = 200.0;
    pub const PLAYER_JUMP_IMPULSE: f32 = 350.0;
    /// Jump only allowed while |vy| is below this ("grounded" heuristic)
    pub const JUMP_VELOCITY_THRESHOLD: f32 = 0.5;

    /// Chase camera offset from the player
    pub const CAMERA_OFFSET: [f32; 3] = [0.0, 3.0, 7.0];
    /// Camera aims this far above the player
    pub const CAMERA_LOOK_HEIGHT: f32 = 1.0;

    pub const GOAL_MESSAGE: &str = "You reached the goal! Congratulations!";
}

/// Convert a 0xRRGGBB sRGB color to linear RGB
#[inline]
pub fn srgb_hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_hex_to_linear() {
        assert_eq!(srgb_hex_to_linear(0x000000), [0.0, 0.0, 0.0]);
        let white = srgb_hex_to_linear(0xffffff);
        assert!(white.iter().all(|c| (c - 1.0).abs() < 1e-6));

        // Mid grey is darker in linear space
        let grey = srgb_hex_to_linear(0x888888);
        assert!(grey[0] > 0.2 && grey[0] < 0.3);
        assert_eq!(srgb_hex_to_linear(0xff0000)[1], 0.0);
    }
}
