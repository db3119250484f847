//! Session bootstrap and per-frame driver
//!
//! [`World`] holds the scene, camera and physics world. [`Session`] is the
//! composition root for one playthrough: level, player and run state. [`FrameDriver`]
//! wraps a session with a clock and a renderer and is what the host calls once per
//! display refresh.

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec3;

use crate::consts::GOAL_MESSAGE;
use crate::error::GameError;
use crate::level::{LevelObjects, load_level};
use crate::physics::PhysicsWorld;
use crate::player::{AppliedInput, Player};
use crate::renderer::{RenderError, SceneRenderer};
use crate::scene::{PerspectiveCamera, Scene};
use crate::settings::{CameraSettings, PhysicsSettings, Settings};

/// Scene, camera and physics world
pub struct World {
    pub scene: Scene,
    pub camera: PerspectiveCamera,
    physics: Option<PhysicsWorld>,
}

impl World {
    /// Scene and camera only. Call [`World::init_physics`] before starting a session.
    pub fn new(settings: &Settings, width: u32, height: u32) -> Self {
        let graphics = &settings.graphics;
        let quality = graphics.quality;
        let scene = Scene::new(
            graphics.sky_color,
            graphics.fog_near,
            graphics.fog_far,
            quality
                .shadows_enabled()
                .then(|| quality.shadow_map_size()),
        );

        let cam = &settings.camera;
        let mut camera = PerspectiveCamera::new(cam.fov_degrees, 1.0, cam.near, cam.far);
        camera.set_viewport(width, height);

        log::info!("Scene and camera initialized ({} quality)", quality.as_str());
        Self {
            scene,
            camera,
            physics: None,
        }
    }

    pub fn init_physics(&mut self, settings: &PhysicsSettings) {
        self.physics = Some(PhysicsWorld::new(settings));
    }

    /// Scene, camera and physics in one go
    pub fn bootstrap(settings: &Settings, width: u32, height: u32) -> Self {
        let mut world = Self::new(settings, width, height);
        world.init_physics(&settings.physics);
        world
    }

    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.physics.as_ref()
    }

    /// Physics world, or `None` with a warning if it has not been created yet
    pub fn physics_mut(&mut self) -> Option<&mut PhysicsWorld> {
        if self.physics.is_none() {
            log::warn!("Physics world accessed before initialization");
        }
        self.physics.as_mut()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
}

/// Frame timer: turns host timestamps into clamped elapsed seconds
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_ms: Option<f64>,
    nominal: f32,
    max_dt: f32,
}

impl FrameClock {
    pub fn new(nominal: f32, max_dt: f32) -> Self {
        Self {
            last_ms: None,
            nominal,
            max_dt,
        }
    }

    /// Seconds since the previous call, at most `max_dt`. The first call
    /// returns the nominal step.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => self.nominal,
        };
        self.last_ms = Some(now_ms);
        dt.clamp(0.0, self.max_dt)
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// Internal physics steps taken
    pub substeps: u32,
    /// Input applied to the player, `None` once stopped
    pub input: Option<AppliedInput>,
    /// The goal was reached during this tick
    pub goal_reached: bool,
}

/// One playthrough
pub struct Session {
    pub world: World,
    pub player: Player,
    pub level: LevelObjects,
    state: RunState,
    goal_hit: Rc<Cell<bool>>,
    /// Message for the user, shown by the host outside the tick
    notice: Option<&'static str>,
    physics_settings: PhysicsSettings,
    camera_settings: CameraSettings,
}

impl Session {
    /// Load the level into `world`, spawn the player and hook up the goal
    pub fn start(mut world: World, settings: &Settings) -> Result<Self, GameError> {
        let World { scene, physics, .. } = &mut world;
        let Some(physics) = physics.as_mut() else {
            log::error!("Cannot start session: physics world not initialized");
            return Err(GameError::MissingDependency("physics world"));
        };

        let level = load_level(scene, physics);

        let mut player = Player::spawn(scene, physics, settings.player.spawn, &settings.player);
        let goal_hit = Rc::new(Cell::new(false));
        let flag = goal_hit.clone();
        player.setup_collision_listener(physics, move || flag.set(true));

        let mut session = Self {
            world,
            player,
            level,
            state: RunState::Running,
            goal_hit,
            notice: None,
            physics_settings: settings.physics.clone(),
            camera_settings: settings.camera.clone(),
        };
        session.update_camera();

        log::info!("Session started");
        Ok(session)
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Advance the game by `elapsed` seconds.
    ///
    /// Physics and visuals always advance. Input is only applied while running.
    pub fn tick(&mut self, elapsed: f32) -> TickReport {
        let elapsed = elapsed.clamp(0.0, self.physics_settings.max_frame_dt);
        let mut report = TickReport::default();

        let World { scene, physics, .. } = &mut self.world;
        if let Some(physics) = physics.as_mut() {
            report.substeps = physics.step(
                self.physics_settings.time_step,
                elapsed,
                self.physics_settings.max_substeps,
            );
        }

        if self.goal_hit.take() && self.state == RunState::Running {
            log::info!("{}", GOAL_MESSAGE);
            self.notice = Some(GOAL_MESSAGE);
            self.state = RunState::Stopped;
            report.goal_reached = true;
        }

        if let Some(physics) = physics.as_mut() {
            if self.state == RunState::Running {
                report.input = Some(self.player.apply_inputs(physics, elapsed));
            }
            self.player.update_mesh(scene, physics);
        }

        self.update_camera();
        report
    }

    /// Pending user notification, handed out once
    pub fn take_notice(&mut self) -> Option<&'static str> {
        self.notice.take()
    }

    /// Keep the camera at a fixed offset from the player, aimed just above it
    fn update_camera(&mut self) {
        let Some(mesh) = self.world.scene.get(self.player.mesh) else {
            return;
        };
        let target = mesh.position;
        let camera = &mut self.world.camera;
        camera.position = target + self.camera_settings.follow_offset;
        camera.look_at(target + Vec3::Y * self.camera_settings.look_height);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.world.camera.set_viewport(width, height);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFlow {
    /// Schedule another frame
    Continue,
    /// Stop requesting frames
    Stop,
}

/// Drives a session and renderer from host refresh callbacks
pub struct FrameDriver<R: SceneRenderer> {
    pub session: Session,
    renderer: R,
    clock: FrameClock,
    viewport: (u32, u32),
    frames: u64,
}

impl<R: SceneRenderer> FrameDriver<R> {
    pub fn new(session: Session, renderer: R, width: u32, height: u32) -> Self {
        let clock = FrameClock::new(
            session.physics_settings.time_step,
            session.physics_settings.max_frame_dt,
        );
        Self {
            session,
            renderer,
            clock,
            viewport: (width, height),
            frames: 0,
        }
    }

    /// Run one frame at host time `now_ms`
    pub fn frame(&mut self, now_ms: f64) -> FrameFlow {
        if !self.session.is_running() {
            return FrameFlow::Stop;
        }

        let elapsed = self.clock.tick(now_ms);
        self.session.tick(elapsed);
        self.render();
        self.frames += 1;

        if self.session.is_running() {
            FrameFlow::Continue
        } else {
            log::info!("Game stopped after {} frames", self.frames);
            FrameFlow::Stop
        }
    }

    fn render(&mut self) {
        let world = &self.session.world;
        match self.renderer.render(&world.scene, &world.camera) {
            Ok(()) => {}
            Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                self.renderer.resize(self.viewport.0, self.viewport.1);
            }
            Err(RenderError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                log::error!("Out of memory!");
            }
            Err(e) => log::warn!("Render error: {}", e),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = (width, height);
        self.session.resize(width, height);
        self.renderer.resize(width, height);
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{GOAL_CENTER, TIME_STEP};

    fn start_with(settings: Settings) -> Session {
        let world = World::bootstrap(&settings, 800, 600);
        Session::start(world, &settings).unwrap()
    }

    fn start() -> Session {
        start_with(Settings::default())
    }

    /// Spawned right inside the goal so the first step reaches it
    fn start_in_goal() -> Session {
        let mut settings = Settings::default();
        settings.player.spawn = Vec3::from(GOAL_CENTER);
        start_with(settings)
    }

    /// Hold whichever keys push the player toward `target` on each axis
    fn steer(session: &mut Session, target: Vec3) {
        let physics = session.world.physics().unwrap();
        let pos = session.player.position(physics).unwrap();
        let input = &mut session.player.input;
        input.right = pos.x < target.x;
        input.left = pos.x > target.x;
        input.backward = pos.z < target.z;
        input.forward = pos.z > target.z;
    }

    #[derive(Default)]
    struct RecordingRenderer {
        frames: usize,
        resizes: Vec<(u32, u32)>,
        fail_next: Option<wgpu::SurfaceError>,
    }

    impl SceneRenderer for RecordingRenderer {
        fn render(&mut self, _: &Scene, _: &PerspectiveCamera) -> Result<(), RenderError> {
            if let Some(err) = self.fail_next.take() {
                return Err(err.into());
            }
            self.frames += 1;
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.resizes.push((width, height));
        }
    }

    #[test]
    fn test_clock_clamps_stalls() {
        let mut clock = FrameClock::new(TIME_STEP, 0.1);
        assert_eq!(clock.tick(1000.0), TIME_STEP);
        assert!((clock.tick(1016.0) - 0.016).abs() < 1e-6);
        // 2 s stall
        assert_eq!(clock.tick(3016.0), 0.1);
        // Clock going backwards never yields negative time
        assert_eq!(clock.tick(3000.0), 0.0);
    }

    #[test]
    fn test_tick_clamps_elapsed() {
        let mut session = start();
        // 0.1 s at 1/60 would be 6 steps, but only 3 substeps are allowed
        let report = session.tick(2.0);
        assert_eq!(report.substeps, 3);
        assert!(session.world.physics().unwrap().accumulator() < TIME_STEP);
    }

    #[test]
    fn test_missing_physics_is_reported() {
        let settings = Settings::default();
        let mut world = World::new(&settings, 800, 600);
        assert!(world.physics_mut().is_none());

        let result = Session::start(world, &settings);
        assert!(matches!(
            result,
            Err(GameError::MissingDependency("physics world"))
        ));
    }

    #[test]
    fn test_camera_follows_player() {
        let mut session = start();
        for _ in 0..30 {
            session.tick(TIME_STEP);
        }
        let mesh_pos = session.world.scene.get(session.player.mesh).unwrap().position;
        let camera = &session.world.camera;
        assert!((camera.position - (mesh_pos + Vec3::new(0.0, 3.0, 7.0))).length() < 1e-5);
        assert!((camera.target - (mesh_pos + Vec3::Y)).length() < 1e-5);
    }

    #[test]
    fn test_resize_only_changes_aspect() {
        let mut session = start();
        session.tick(TIME_STEP);
        let position = session.world.camera.position;
        let target = session.world.camera.target;

        session.resize(1280, 720);
        let camera = &session.world.camera;
        assert!((camera.aspect - 1280.0 / 720.0).abs() < 1e-6);
        assert_eq!(camera.position, position);
        assert_eq!(camera.target, target);
    }

    #[test]
    fn test_goal_stops_input_but_not_visuals() {
        let mut session = start_in_goal();

        let report = session.tick(TIME_STEP);
        assert!(report.goal_reached);
        assert_eq!(report.input, None);
        assert_eq!(session.state(), RunState::Stopped);
        assert_eq!(session.take_notice(), Some(GOAL_MESSAGE));

        session.player.input.right = true;
        session.player.input.jump = true;
        for _ in 0..10 {
            let report = session.tick(TIME_STEP);
            assert_eq!(report.input, None);
            assert!(!report.goal_reached);

            let physics = session.world.physics().unwrap();
            let (body_pos, body_rot) = physics.pose(session.player.body).unwrap();
            let mesh = session.world.scene.get(session.player.mesh).unwrap();
            assert_eq!(mesh.position, body_pos);
            assert_eq!(mesh.rotation, body_rot);
        }
        // Intent is left untouched because nothing consumes it
        assert!(session.player.input.jump);
        assert_eq!(session.take_notice(), None);
    }

    #[test]
    fn test_walk_to_goal_notifies_once() {
        let mut session = start();
        let goal = Vec3::from(GOAL_CENTER);
        let mut notices = Vec::new();

        let mut reached_at = None;
        for i in 0..6000 {
            steer(&mut session, goal);
            let report = session.tick(TIME_STEP);
            notices.extend(session.take_notice());
            if report.goal_reached {
                reached_at = Some(i);
                break;
            }
        }
        let reached_at = reached_at.expect("player never reached the goal");
        assert!(reached_at > 0);

        let physics = session.world.physics().unwrap();
        let pos = session.player.position(physics).unwrap();
        // Ball overlaps the unit cube: centers within radius + half extent
        assert!((pos.x - goal.x).abs() < 1.0 + 1e-3);
        assert!((pos.z - goal.z).abs() < 1.0 + 1e-3);

        // Keys stay held but the game is over
        for _ in 0..600 {
            steer(&mut session, Vec3::new(-4.0, 0.0, -4.0));
            session.tick(TIME_STEP);
            notices.extend(session.take_notice());
        }
        assert_eq!(notices, ["You reached the goal! Congratulations!"]);
        assert_eq!(session.state(), RunState::Stopped);
    }

    #[test]
    fn test_driver_stops_after_goal() {
        let session = start_in_goal();
        let mut driver = FrameDriver::new(session, RecordingRenderer::default(), 800, 600);

        // The frame that reaches the goal still renders
        assert_eq!(driver.frame(0.0), FrameFlow::Stop);
        assert_eq!(driver.renderer().frames, 1);

        // Guard at entry: nothing runs afterwards
        assert_eq!(driver.frame(16.0), FrameFlow::Stop);
        assert_eq!(driver.renderer().frames, 1);
        assert_eq!(driver.frames(), 1);

        // The message waits for the host to pick it up after the frame
        assert_eq!(driver.session.take_notice(), Some(GOAL_MESSAGE));
        assert_eq!(driver.session.take_notice(), None);
    }

    #[test]
    fn test_driver_runs_and_recovers_lost_surface() {
        let session = start();
        let mut driver = FrameDriver::new(session, RecordingRenderer::default(), 800, 600);

        for i in 0..5 {
            assert_eq!(driver.frame(i as f64 * 16.0), FrameFlow::Continue);
        }
        assert_eq!(driver.renderer().frames, 5);

        driver.renderer.fail_next = Some(wgpu::SurfaceError::Lost);
        assert_eq!(driver.frame(80.0), FrameFlow::Continue);
        assert_eq!(driver.renderer().resizes, [(800, 600)]);
        assert_eq!(driver.renderer().frames, 5);
    }

    #[test]
    fn test_driver_resize() {
        let session = start();
        let mut driver = FrameDriver::new(session, RecordingRenderer::default(), 800, 600);

        driver.resize(0, 600);
        assert!(driver.renderer().resizes.is_empty());

        driver.resize(1024, 512);
        assert_eq!(driver.renderer().resizes, [(1024, 512)]);
        assert!((driver.session.world.camera.aspect - 2.0).abs() < 1e-6);
    }
}
