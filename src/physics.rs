//! Physics world
//!
//! Thin wrapper around a rapier3d world. Owns the fixed-step accumulator, clears
//! user forces after every internal step, and routes collision-start events to
//! per-collider listeners so gameplay code never touches the narrow phase.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use crate::settings::PhysicsSettings;

/// Gameplay tag attached to a collider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyTag {
    pub name: String,
    pub is_goal: bool,
}

impl BodyTag {
    pub fn goal(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_goal: true,
        }
    }
}

/// A collision that just started, seen from a subscribed collider
#[derive(Debug, Clone, Copy)]
pub struct Contact<'a> {
    /// The other collider involved
    pub other: ColliderHandle,
    pub other_tag: Option<&'a BodyTag>,
    /// True when either side is a sensor (no contact response)
    pub sensor: bool,
}

type ContactListener = Box<dyn FnMut(&Contact<'_>)>;

/// Collects collision events emitted during a pipeline step
#[derive(Default)]
struct CollisionLog {
    events: Mutex<Vec<CollisionEvent>>,
}

impl CollisionLog {
    fn drain(&self) -> Vec<CollisionEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl EventHandler for CollisionLog {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

#[inline]
pub fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

#[inline]
pub fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
pub fn to_quat(r: &Rotation<Real>) -> Quat {
    Quat::from_xyzw(r.i, r.j, r.k, r.w)
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    collision_log: CollisionLog,
    tags: HashMap<ColliderHandle, BodyTag>,
    listeners: Vec<(ColliderHandle, ContactListener)>,
    friction: f32,
    restitution: f32,
    /// Unsimulated time carried between frames
    accumulator: f32,
    /// Internal steps taken since creation
    step_count: u64,
}

impl PhysicsWorld {
    pub fn new(settings: &PhysicsSettings) -> Self {
        let mut params = IntegrationParameters::default();
        params.dt = settings.time_step;
        params.num_solver_iterations =
            NonZeroUsize::new(settings.solver_iterations).unwrap_or(NonZeroUsize::MIN);

        log::info!(
            "Physics world initialized (gravity {}, {} solver iterations)",
            settings.gravity,
            params.num_solver_iterations
        );

        Self {
            gravity: vector![0.0, settings.gravity, 0.0],
            params,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            collision_log: CollisionLog::default(),
            tags: HashMap::new(),
            listeners: Vec::new(),
            friction: settings.friction,
            restitution: settings.restitution,
            accumulator: 0.0,
            step_count: 0,
        }
    }

    /// Friction level bodies should be built with
    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Insert a body with a single collider attached
    pub fn add_body(
        &mut self,
        body: impl Into<RigidBody>,
        collider: impl Into<Collider>,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let body = self.bodies.insert(body);
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        (body, collider)
    }

    pub fn set_tag(&mut self, collider: ColliderHandle, tag: BodyTag) {
        self.tags.insert(collider, tag);
    }

    pub fn tag(&self, collider: ColliderHandle) -> Option<&BodyTag> {
        self.tags.get(&collider)
    }

    /// Call `listener` whenever a collision involving `collider` starts
    pub fn on_collision_start(
        &mut self,
        collider: ColliderHandle,
        listener: impl FnMut(&Contact<'_>) + 'static,
    ) {
        self.listeners.push((collider, Box::new(listener)));
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    /// Body translation and orientation
    pub fn pose(&self, handle: RigidBodyHandle) -> Option<(Vec3, Quat)> {
        self.bodies
            .get(handle)
            .map(|b| (to_vec3(b.translation()), to_quat(b.rotation())))
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Advance by `elapsed` seconds in fixed `dt` steps, running at most
    /// `max_substeps` of them. Leftover time below one step carries over; time
    /// beyond the substep budget is dropped.
    ///
    /// Returns the number of internal steps taken.
    pub fn step(&mut self, dt: f32, elapsed: f32, max_substeps: u32) -> u32 {
        self.accumulator += elapsed.max(0.0);

        let mut substeps = 0;
        while self.accumulator >= dt && substeps < max_substeps {
            self.internal_step(dt);
            self.accumulator -= dt;
            substeps += 1;
        }
        self.accumulator %= dt;

        substeps
    }

    fn internal_step(&mut self, dt: f32) {
        self.params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &self.collision_log,
        );
        self.step_count += 1;

        // Forces only act for the step after they were applied
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
        }

        self.dispatch_collisions();
    }

    fn dispatch_collisions(&mut self) {
        for event in self.collision_log.drain() {
            if !event.started() {
                continue;
            }
            let (a, b) = (event.collider1(), event.collider2());
            for (handle, listener) in self.listeners.iter_mut() {
                let other = if *handle == a {
                    b
                } else if *handle == b {
                    a
                } else {
                    continue;
                };
                let contact = Contact {
                    other,
                    other_tag: self.tags.get(&other),
                    sensor: event.sensor(),
                };
                listener(&contact);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn zero_g() -> PhysicsWorld {
        PhysicsWorld::new(&PhysicsSettings {
            gravity: 0.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_step_runs_fixed_substeps() {
        let mut world = zero_g();
        let dt = 1.0 / 60.0;

        // Less than one step: nothing simulated yet
        assert_eq!(world.step(dt, dt * 0.5, 3), 0);
        assert_eq!(world.step_count(), 0);

        // Carry-over completes a step
        assert_eq!(world.step(dt, dt * 0.6, 3), 1);
        assert_eq!(world.step_count(), 1);
    }

    #[test]
    fn test_step_caps_substeps() {
        let mut world = zero_g();
        let dt = 1.0 / 60.0;

        assert_eq!(world.step(dt, 0.1, 3), 3);
        assert!(world.accumulator() < dt);
    }

    #[test]
    fn test_forces_last_one_step() {
        let mut world = zero_g();
        let (body, _) = world.add_body(
            RigidBodyBuilder::dynamic().translation(vector![0.0, 0.0, 0.0]),
            ColliderBuilder::ball(0.5).mass(2.0),
        );

        let dt = 1.0 / 60.0;
        world
            .body_mut(body)
            .unwrap()
            .add_force(vector![10.0, 0.0, 0.0], true);

        world.step(dt, dt, 3);
        let v1 = world.body(body).unwrap().linvel().x;
        assert!((v1 - 10.0 / 2.0 * dt).abs() < 1e-4, "v1 = {}", v1);

        // No new force applied, velocity stays put
        world.step(dt, dt, 3);
        let v2 = world.body(body).unwrap().linvel().x;
        assert!((v2 - v1).abs() < 1e-5);
    }

    #[test]
    fn test_collision_listener_sees_tagged_sensor() {
        let mut world = PhysicsWorld::new(&PhysicsSettings::default());

        let (_, sensor) = world.add_body(
            RigidBodyBuilder::fixed().translation(vector![0.0, 0.0, 0.0]),
            ColliderBuilder::cuboid(0.5, 0.5, 0.5)
                .sensor(true)
                .active_events(ActiveEvents::COLLISION_EVENTS),
        );
        world.set_tag(sensor, BodyTag::goal("Target"));

        let (_, ball) = world.add_body(
            RigidBodyBuilder::dynamic().translation(vector![0.0, 2.0, 0.0]),
            ColliderBuilder::ball(0.25).active_events(ActiveEvents::COLLISION_EVENTS),
        );

        let seen: Rc<RefCell<Vec<(String, bool)>>> = Rc::default();
        let log = seen.clone();
        world.on_collision_start(ball, move |contact| {
            if let Some(tag) = contact.other_tag {
                log.borrow_mut().push((tag.name.clone(), contact.sensor));
            }
        });

        // Falls into the sensor within a second
        for _ in 0..60 {
            world.step(1.0 / 60.0, 1.0 / 60.0, 3);
        }

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ("Target".to_string(), true));
    }

    #[test]
    fn test_pose_reads_body_state() {
        let mut world = zero_g();
        let (body, _) = world.add_body(
            RigidBodyBuilder::dynamic().translation(vector![1.0, 2.0, 3.0]),
            ColliderBuilder::ball(0.5),
        );
        let (pos, rot) = world.pose(body).unwrap();
        assert_eq!(pos, Vec3::new(1.0, 2.0, 3.0));
        assert!(rot.abs_diff_eq(Quat::IDENTITY, 1e-6));
        assert_eq!(world.body_count(), 1);
    }
}
