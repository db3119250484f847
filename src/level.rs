//! Level layout
//!
//! A single grey platform with its top face at y = 0 and a translucent green goal
//! cube sitting near one corner. The goal is a sensor: it reports overlaps but
//! never pushes the player back.

use glam::Vec3;
use rapier3d::prelude::*;

use crate::consts::*;
use crate::physics::{BodyTag, PhysicsWorld, to_vector};
use crate::scene::{Material, MeshKind, ObjectId, Scene, SceneObject};

/// Visual and physical handles of one level piece
#[derive(Debug, Clone, Copy)]
pub struct LevelObject {
    pub mesh: ObjectId,
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

#[derive(Debug, Clone, Copy)]
pub struct LevelObjects {
    pub platform: LevelObject,
    pub goal: LevelObject,
}

/// Insert the platform and goal into the scene and physics world
pub fn load_level(scene: &mut Scene, physics: &mut PhysicsWorld) -> LevelObjects {
    log::info!("Loading level...");

    let platform = add_platform(scene, physics);
    let goal = add_goal(scene, physics);

    log::info!("Level loaded");
    LevelObjects { platform, goal }
}

fn add_platform(scene: &mut Scene, physics: &mut PhysicsWorld) -> LevelObject {
    let size = Vec3::from(PLATFORM_SIZE);
    let center = Vec3::from(PLATFORM_CENTER);

    let mesh = scene.add(
        SceneObject::new(MeshKind::Box { size }, Material::opaque(0x888888), center)
            .with_shadows(true, true),
    );
    log::info!("Platform mesh added to scene");

    let half = size / 2.0;
    let (body, collider) = physics.add_body(
        RigidBodyBuilder::fixed().translation(to_vector(center)),
        ColliderBuilder::cuboid(half.x, half.y, half.z)
            .friction(physics.friction())
            .restitution(physics.restitution()),
    );
    log::info!("Platform body added to world");

    LevelObject {
        mesh,
        body,
        collider,
    }
}

fn add_goal(scene: &mut Scene, physics: &mut PhysicsWorld) -> LevelObject {
    let center = Vec3::from(GOAL_CENTER);

    let mesh = scene.add(
        SceneObject::new(
            MeshKind::Box {
                size: Vec3::splat(GOAL_SIZE),
            },
            Material::translucent(0x00ff00, 0.5),
            center,
        )
        .with_shadows(true, false),
    );
    log::info!("Goal mesh added to scene");

    let half = GOAL_SIZE / 2.0;
    let (body, collider) = physics.add_body(
        RigidBodyBuilder::fixed().translation(to_vector(center)),
        ColliderBuilder::cuboid(half, half, half)
            .sensor(true)
            .active_events(ActiveEvents::COLLISION_EVENTS),
    );
    physics.set_tag(collider, BodyTag::goal(GOAL_NAME));
    log::info!("Goal sensor added to world");

    LevelObject {
        mesh,
        body,
        collider,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PhysicsSettings;

    fn load() -> (Scene, PhysicsWorld, LevelObjects) {
        let mut scene = Scene::new(0x87ceeb, 0.0, 75.0, Some(1024));
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        let level = load_level(&mut scene, &mut physics);
        (scene, physics, level)
    }

    #[test]
    fn test_level_adds_two_pieces() {
        let (scene, physics, level) = load();
        assert_eq!(scene.len(), 2);
        assert_eq!(physics.body_count(), 2);
        assert_ne!(level.platform.mesh, level.goal.mesh);
    }

    #[test]
    fn test_platform_top_is_ground_level() {
        let (scene, physics, level) = load();

        let body = physics.body(level.platform.body).unwrap();
        assert!(body.is_fixed());

        let mesh = scene.get(level.platform.mesh).unwrap();
        match mesh.mesh {
            MeshKind::Box { size } => {
                assert_eq!(size, Vec3::new(10.0, 0.5, 10.0));
                assert!((mesh.position.y + size.y / 2.0).abs() < 1e-6);
            }
            other => panic!("unexpected platform mesh {:?}", other),
        }
        assert!(mesh.cast_shadow && mesh.receive_shadow);

        let collider = physics.collider(level.platform.collider).unwrap();
        assert_eq!(collider.friction(), 0.3);
        assert_eq!(collider.restitution(), 0.3);
    }

    #[test]
    fn test_goal_is_tagged_sensor() {
        let (scene, physics, level) = load();

        let collider = physics.collider(level.goal.collider).unwrap();
        assert!(collider.is_sensor());
        let tag = physics.tag(level.goal.collider).unwrap();
        assert!(tag.is_goal);
        assert_eq!(tag.name, "GoalArea");
        assert!(physics.tag(level.platform.collider).is_none());

        let (pos, _) = physics.pose(level.goal.body).unwrap();
        assert_eq!(pos, Vec3::new(4.0, 0.5, 4.0));

        let mesh = scene.get(level.goal.mesh).unwrap();
        assert_eq!(mesh.position, pos);
        assert_eq!(mesh.material.opacity, 0.5);
    }
}
