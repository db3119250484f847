//! Game settings and tuning
//!
//! Read as JSON from LocalStorage. Every field falls back to its default so a
//! partial or hand-edited entry still loads.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    /// Whether the directional light renders a shadow map
    pub fn shadows_enabled(&self) -> bool {
        !matches!(self, QualityPreset::Low)
    }

    /// Shadow map resolution (square)
    pub fn shadow_map_size(&self) -> u32 {
        match self {
            QualityPreset::Low => 512,
            QualityPreset::Medium => 1024,
            QualityPreset::High => 2048,
        }
    }

    /// Cap applied to window.devicePixelRatio when sizing the canvas
    pub fn max_pixel_ratio(&self) -> f64 {
        match self {
            QualityPreset::Low => 1.0,
            QualityPreset::Medium => 2.0,
            QualityPreset::High => 3.0,
        }
    }
}

/// Physics world parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub gravity: f32,
    pub solver_iterations: usize,
    /// Fixed internal step (seconds)
    pub time_step: f32,
    pub max_substeps: u32,
    /// Clamp for frame elapsed time (seconds)
    pub max_frame_dt: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            solver_iterations: SOLVER_ITERATIONS,
            time_step: TIME_STEP,
            max_substeps: MAX_SUBSTEPS,
            max_frame_dt: MAX_FRAME_DT,
            friction: SURFACE_FRICTION,
            restitution: SURFACE_RESTITUTION,
        }
    }
}

/// Player body and control tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub spawn: Vec3,
    pub radius: f32,
    /// Visual capsule height including both caps
    pub height: f32,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub move_speed: f32,
    pub jump_impulse: f32,
    pub jump_velocity_threshold: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            spawn: Vec3::from(PLAYER_SPAWN),
            radius: PLAYER_RADIUS,
            height: PLAYER_HEIGHT,
            mass: PLAYER_MASS,
            linear_damping: PLAYER_LINEAR_DAMPING,
            angular_damping: PLAYER_ANGULAR_DAMPING,
            move_speed: PLAYER_MOVE_SPEED,
            jump_impulse: PLAYER_JUMP_IMPULSE,
            jump_velocity_threshold: JUMP_VELOCITY_THRESHOLD,
        }
    }
}

/// Chase camera
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub follow_offset: Vec3,
    pub look_height: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            follow_offset: Vec3::from(CAMERA_OFFSET),
            look_height: CAMERA_LOOK_HEIGHT,
        }
    }
}

/// Look of the world
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsSettings {
    pub quality: QualityPreset,
    /// 0xRRGGBB
    pub sky_color: u32,
    pub fog_near: f32,
    pub fog_far: f32,
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            sky_color: 0x87ceeb,
            fog_near: 0.0,
            fog_far: 75.0,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub physics: PhysicsSettings,
    pub player: PlayerSettings,
    pub camera: CameraSettings,
    pub graphics: GraphicsSettings,
}

impl Settings {
    /// Parse settings JSON, falling back to defaults on malformed input
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring malformed settings: {}", e);
                Self::default()
            }
        }
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "goal_rush_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                log::info!("Loaded settings from LocalStorage");
                return Self::from_json(&json);
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Native stub
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}
