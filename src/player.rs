//! Player entity
//!
//! A red capsule on screen, a damped rolling sphere in the physics world. Keyboard
//! events flip flags on [`InputIntent`]; [`Player::apply_inputs`] turns those flags
//! into world-space forces and a jump impulse once per frame.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use rapier3d::prelude::*;

use crate::physics::{PhysicsWorld, to_vec3, to_vector};
use crate::scene::{Material, MeshKind, ObjectId, Scene, SceneObject};
use crate::settings::PlayerSettings;

/// What the player is currently asking for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    /// One-shot, consumed by `apply_inputs`
    pub jump: bool,
}

impl InputIntent {
    /// Handle a key press (`KeyboardEvent.key`). Returns true if the key is bound.
    pub fn key_down(&mut self, key: &str) -> bool {
        match key.to_lowercase().as_str() {
            "w" | "arrowup" => self.forward = true,
            "s" | "arrowdown" => self.backward = true,
            "a" | "arrowleft" => self.left = true,
            "d" | "arrowright" => self.right = true,
            " " => self.jump = true,
            _ => return false,
        }
        true
    }

    /// Handle a key release. Jump is left for `apply_inputs` to consume.
    pub fn key_up(&mut self, key: &str) -> bool {
        match key.to_lowercase().as_str() {
            "w" | "arrowup" => self.forward = false,
            "s" | "arrowdown" => self.backward = false,
            "a" | "arrowleft" => self.left = false,
            "d" | "arrowright" => self.right = false,
            _ => return false,
        }
        true
    }

    pub fn any_direction(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }
}

/// World-space push for the held directions, scaled by `dt`.
///
/// Forward is -Z and right is +X. Diagonals are not normalized.
pub fn movement_force(input: &InputIntent, move_speed: f32, dt: f32) -> Vec3 {
    let mut force = Vec3::ZERO;
    if input.forward {
        force.z -= move_speed;
    }
    if input.backward {
        force.z += move_speed;
    }
    if input.left {
        force.x -= move_speed;
    }
    if input.right {
        force.x += move_speed;
    }
    force * dt
}

/// What `apply_inputs` did to the body this frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AppliedInput {
    pub force: Vec3,
    pub jumped: bool,
}

type GoalCallback = Rc<RefCell<Option<Box<dyn FnMut()>>>>;

pub struct Player {
    pub mesh: ObjectId,
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub input: InputIntent,
    move_speed: f32,
    jump_impulse: f32,
    jump_velocity_threshold: f32,
    on_goal_reached: GoalCallback,
    listening: bool,
}

impl Player {
    /// Add the player's capsule and sphere body at `position`
    pub fn spawn(
        scene: &mut Scene,
        physics: &mut PhysicsWorld,
        position: Vec3,
        settings: &PlayerSettings,
    ) -> Self {
        let radius = settings.radius;
        let mesh = scene.add(
            SceneObject::new(
                MeshKind::Capsule {
                    radius,
                    length: (settings.height - 2.0 * radius).max(0.0),
                    cap_segments: 8,
                    radial_segments: 16,
                },
                Material::opaque(0xff0000),
                position,
            )
            .with_shadows(true, true),
        );
        log::info!("Player capsule added to scene");

        // Sphere rather than capsule so the body rolls
        let (body, collider) = physics.add_body(
            RigidBodyBuilder::dynamic()
                .translation(to_vector(position))
                .linear_damping(settings.linear_damping)
                .angular_damping(settings.angular_damping),
            ColliderBuilder::ball(radius)
                .mass(settings.mass)
                .friction(physics.friction())
                .restitution(physics.restitution())
                .active_events(ActiveEvents::COLLISION_EVENTS),
        );
        log::info!("Player body added to world at {}", position);

        Self {
            mesh,
            body,
            collider,
            input: InputIntent::default(),
            move_speed: settings.move_speed,
            jump_impulse: settings.jump_impulse,
            jump_velocity_threshold: settings.jump_velocity_threshold,
            on_goal_reached: Rc::new(RefCell::new(None)),
            listening: false,
        }
    }

    /// Push the body according to the current intent. Call once per frame with
    /// that frame's elapsed time.
    ///
    /// Jumping only happens while vertical speed is under the threshold, which
    /// is a rough stand-in for being on the ground. The jump flag is cleared
    /// either way.
    pub fn apply_inputs(&mut self, physics: &mut PhysicsWorld, dt: f32) -> AppliedInput {
        let mut applied = AppliedInput::default();
        let Some(body) = physics.body_mut(self.body) else {
            log::warn!("Player body missing from physics world");
            self.input.jump = false;
            return applied;
        };

        if self.input.any_direction() {
            let force = movement_force(&self.input, self.move_speed, dt);
            body.add_force(to_vector(force), true);
            applied.force = force;
        }

        if self.input.jump {
            if body.linvel().y.abs() < self.jump_velocity_threshold {
                body.apply_impulse(vector![0.0, self.jump_impulse, 0.0], true);
                applied.jumped = true;
                log::info!("Player jumped");
            }
            self.input.jump = false;
        }

        applied
    }

    /// Copy the body's pose onto the capsule
    pub fn update_mesh(&self, scene: &mut Scene, physics: &PhysicsWorld) {
        let (Some((position, rotation)), Some(mesh)) =
            (physics.pose(self.body), scene.get_mut(self.mesh))
        else {
            return;
        };
        mesh.position = position;
        mesh.rotation = rotation;
    }

    /// Run `callback` every time the body starts touching a goal-tagged collider.
    ///
    /// Registering again replaces the previous callback.
    pub fn setup_collision_listener(
        &mut self,
        physics: &mut PhysicsWorld,
        callback: impl FnMut() + 'static,
    ) {
        *self.on_goal_reached.borrow_mut() = Some(Box::new(callback));

        if !self.listening {
            let on_goal = self.on_goal_reached.clone();
            physics.on_collision_start(self.collider, move |contact| {
                if contact.other_tag.is_some_and(|tag| tag.is_goal) {
                    if let Some(callback) = on_goal.borrow_mut().as_mut() {
                        callback();
                    }
                }
            });
            self.listening = true;
        }
        log::info!("Player collision listener set up");
    }

    pub fn position(&self, physics: &PhysicsWorld) -> Option<Vec3> {
        physics.body(self.body).map(|b| to_vec3(b.translation()))
    }

    pub fn velocity(&self, physics: &PhysicsWorld) -> Option<Vec3> {
        physics.body(self.body).map(|b| to_vec3(b.linvel()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PhysicsSettings;
    use proptest::prelude::*;
    use std::cell::Cell;

    const DT: f32 = 1.0 / 60.0;

    fn spawn_in(gravity: f32) -> (Scene, PhysicsWorld, Player) {
        let mut scene = Scene::new(0x87ceeb, 0.0, 75.0, None);
        let mut physics = PhysicsWorld::new(&PhysicsSettings {
            gravity,
            ..Default::default()
        });
        let player = Player::spawn(
            &mut scene,
            &mut physics,
            Vec3::new(0.0, 3.0, 3.0),
            &PlayerSettings::default(),
        );
        (scene, physics, player)
    }

    fn set_vertical_speed(physics: &mut PhysicsWorld, player: &Player, vy: f32) {
        physics
            .body_mut(player.body)
            .unwrap()
            .set_linvel(vector![0.0, vy, 0.0], true);
    }

    #[test]
    fn test_key_bindings() {
        let mut input = InputIntent::default();
        assert!(input.key_down("W"));
        assert!(input.key_down("ArrowLeft"));
        assert!(input.key_down(" "));
        assert!(!input.key_down("q"));
        assert!(input.forward && input.left && input.jump);

        input.key_up("w");
        input.key_up("arrowleft");
        // Space release does not cancel a pending jump
        assert!(!input.key_up(" "));
        assert!(!input.forward && !input.left && input.jump);
    }

    #[test]
    fn test_no_flags_no_force() {
        let input = InputIntent::default();
        assert_eq!(movement_force(&input, 200.0, DT), Vec3::ZERO);

        let (_, mut physics, mut player) = spawn_in(0.0);
        let applied = player.apply_inputs(&mut physics, DT);
        assert_eq!(applied, AppliedInput::default());
    }

    #[test]
    fn test_diagonal_not_normalized() {
        let input = InputIntent {
            forward: true,
            right: true,
            ..Default::default()
        };
        let force = movement_force(&input, 200.0, 0.5);
        assert_eq!(force, Vec3::new(100.0, 0.0, -100.0));
    }

    proptest! {
        #[test]
        fn prop_force_is_sum_of_axes(
            forward in any::<bool>(),
            backward in any::<bool>(),
            left in any::<bool>(),
            right in any::<bool>(),
            speed in 1.0f32..500.0,
            dt in 0.0f32..0.1,
        ) {
            let input = InputIntent { forward, backward, left, right, jump: false };
            let force = movement_force(&input, speed, dt);

            let x = (right as i32 - left as i32) as f32 * speed * dt;
            let z = (backward as i32 - forward as i32) as f32 * speed * dt;
            prop_assert!((force.x - x).abs() < 1e-4);
            prop_assert!((force.z - z).abs() < 1e-4);
            prop_assert_eq!(force.y, 0.0);
        }
    }

    #[test]
    fn test_jump_when_nearly_still() {
        let (_, mut physics, mut player) = spawn_in(0.0);
        // Settle mass properties
        physics.step(DT, DT, 1);
        set_vertical_speed(&mut physics, &player, 0.2);

        player.input.jump = true;
        let applied = player.apply_inputs(&mut physics, DT);

        assert!(applied.jumped);
        assert!(!player.input.jump);
        // 350 N·s on 70 kg
        let vy = player.velocity(&physics).unwrap().y;
        assert!((vy - (0.2 + 5.0)).abs() < 1e-3, "vy = {}", vy);
    }

    #[test]
    fn test_no_jump_while_moving_vertically() {
        let (_, mut physics, mut player) = spawn_in(0.0);
        physics.step(DT, DT, 1);

        for vy in [0.5, -0.5, 3.0, -8.0] {
            set_vertical_speed(&mut physics, &player, vy);
            player.input.jump = true;
            let applied = player.apply_inputs(&mut physics, DT);

            assert!(!applied.jumped);
            assert!(!player.input.jump, "jump must be consumed");
            assert_eq!(player.velocity(&physics).unwrap().y, vy);
        }
    }

    #[test]
    fn test_force_moves_body() {
        let (_, mut physics, mut player) = spawn_in(0.0);
        player.input.right = true;

        let applied = player.apply_inputs(&mut physics, DT);
        assert!((applied.force.x - 200.0 * DT).abs() < 1e-5);

        physics.step(DT, DT, 1);
        assert!(player.velocity(&physics).unwrap().x > 0.0);
    }

    #[test]
    fn test_goal_fires_on_each_entry_not_while_inside() {
        let (_, mut physics, mut player) = spawn_in(0.0);
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        player.setup_collision_listener(&mut physics, move || counter.set(counter.get() + 1));

        let (_, goal) = physics.add_body(
            RigidBodyBuilder::fixed().translation(vector![0.0, 3.0, 3.0]),
            ColliderBuilder::cuboid(0.5, 0.5, 0.5)
                .sensor(true)
                .active_events(ActiveEvents::COLLISION_EVENTS),
        );
        physics.set_tag(goal, crate::physics::BodyTag::goal("GoalArea"));

        // Lingering in the goal is a single overlap
        for _ in 0..120 {
            physics.step(DT, DT, 1);
        }
        assert_eq!(hits.get(), 1);

        let teleport = |physics: &mut PhysicsWorld, z: f32| {
            physics
                .body_mut(player.body)
                .unwrap()
                .set_translation(vector![0.0, 3.0, z], true);
            physics.step(DT, DT, 1);
        };
        teleport(&mut physics, 10.0);
        assert_eq!(hits.get(), 1);

        // No debouncing: coming back fires again
        teleport(&mut physics, 3.0);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_ball_uses_world_surface() {
        let (_, physics, player) = spawn_in(0.0);
        let collider = physics.collider(player.collider).unwrap();
        assert_eq!(collider.friction(), 0.3);
        assert_eq!(collider.restitution(), 0.3);
    }

    #[test]
    fn test_update_mesh_follows_body() {
        let (mut scene, mut physics, player) = spawn_in(-9.82);
        for _ in 0..10 {
            physics.step(DT, DT, 3);
        }
        player.update_mesh(&mut scene, &physics);

        let body_pos = player.position(&physics).unwrap();
        assert!(body_pos.y < 3.0);
        assert_eq!(scene.get(player.mesh).unwrap().position, body_pos);
    }

    #[test]
    fn test_second_listener_replaces_first() {
        let (_, mut physics, mut player) = spawn_in(0.0);
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));

        let counter = first.clone();
        player.setup_collision_listener(&mut physics, move || counter.set(counter.get() + 1));
        let counter = second.clone();
        player.setup_collision_listener(&mut physics, move || counter.set(counter.get() + 1));

        // Drop a goal sensor right on the player
        let (_, goal) = physics.add_body(
            RigidBodyBuilder::fixed().translation(vector![0.0, 3.0, 3.0]),
            ColliderBuilder::cuboid(0.5, 0.5, 0.5).sensor(true),
        );
        physics.set_tag(goal, crate::physics::BodyTag::goal("Test"));
        physics.step(DT, DT, 1);

        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }
}
