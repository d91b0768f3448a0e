//! The physics world: an arena of rigid scene objects plus the per-tick
//! integration and inter-object resolution step.

use generational_arena::{Arena, Index};
use log::debug;
use na::Point3;

use crate::physics::integrate::integrate_object;
use crate::physics::object::{SceneObject, ShapeKind};
use crate::physics::resolve::resolve_pairs;

pub mod integrate;
pub mod object;
pub mod resolve;

/// Ticks longer than this are capped; a stalled caller should not make
/// objects tunnel through each other on the next frame.
pub const MAX_TICK_SECONDS: f32 = 0.05;
/// Fixed integration sub-step length.
pub const SUBSTEP_SECONDS: f32 = 1.0 / 240.0;

pub struct PhysicsWorld {
    pub objects: Arena<SceneObject>,
    /// Monotonically increasing counter feeding object names. Never reused,
    /// so names stay unique across removals.
    next_spawn_id: u32,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        PhysicsWorld {
            objects: Arena::new(),
            next_spawn_id: 1,
        }
    }

    /// Insert a new object at the given center position, deriving its name
    /// from the shape kind and the spawn counter.
    pub fn spawn(&mut self, kind: ShapeKind, position: Point3<f32>, size: f32) -> Index {
        let name = format!("{}_{}", kind.label(), self.next_spawn_id);
        self.next_spawn_id += 1;
        debug!("spawning {} at {:?}", name, position);
        self.objects
            .insert(SceneObject::new(name, kind, position, size))
    }

    pub fn find_by_name(&self, name: &str) -> Option<Index> {
        self.objects
            .iter()
            .find(|(_, o)| o.name == name)
            .map(|(i, _)| i)
    }

    /// Remove a single object by name. Returns the removed object.
    pub fn remove_by_name(&mut self, name: &str) -> Option<SceneObject> {
        let idx = self.find_by_name(name)?;
        debug!("removing {}", name);
        self.objects.remove(idx)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// The index of the gripped object, if any. At most one exists.
    pub fn gripped_object(&self) -> Option<Index> {
        self.objects
            .iter()
            .find(|(_, o)| o.is_gripped())
            .map(|(i, _)| i)
    }

    /// Advance all non-gripped objects by `dt`, then run pairwise
    /// separation. `dt` is capped and divided into fixed sub-steps.
    pub fn step(&mut self, dt: f32) {
        let mut remaining = dt.min(MAX_TICK_SECONDS);

        while remaining > 0.0 {
            let sub = remaining.min(SUBSTEP_SECONDS);
            for (_, obj) in self.objects.iter_mut() {
                if !obj.is_gripped() {
                    integrate_object(obj, sub);
                }
            }
            remaining -= sub;
        }

        resolve_pairs(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::Vector3;

    #[test]
    fn spawn_names_are_unique_and_kind_derived() {
        let mut world = PhysicsWorld::new();
        let a = world.spawn(ShapeKind::Cube, Point3::new(0.0, 0.0, 2.0), 4.0);
        let b = world.spawn(ShapeKind::Sphere, Point3::new(10.0, 0.0, 2.0), 4.0);
        assert_eq!(world.objects[a].name, "cube_1");
        assert_eq!(world.objects[b].name, "sphere_2");

        world.remove_by_name("cube_1").unwrap();
        let c = world.spawn(ShapeKind::Cube, Point3::new(20.0, 0.0, 2.0), 4.0);
        // The counter never reuses a freed name.
        assert_eq!(world.objects[c].name, "cube_3");
    }

    #[test]
    fn objects_settle_on_the_floor() {
        let mut world = PhysicsWorld::new();
        let a = world.spawn(ShapeKind::Cube, Point3::new(0.0, 100.0, 80.0), 6.0);
        let b = world.spawn(ShapeKind::Cylinder, Point3::new(30.0, 100.0, 50.0), 4.0);
        world.objects[b].velocity = Vector3::new(-15.0, 10.0, 0.0);

        for _ in 0..600 {
            world.step(1.0 / 60.0);
            for (_, o) in world.objects.iter() {
                assert!(
                    o.position.z >= o.half_size() - 0.01,
                    "{} sank below the floor",
                    o.name
                );
            }
        }

        assert!((world.objects[a].position.z - 3.0).abs() < 0.05);
        assert!(world.objects[a].velocity.norm() < 2.5);
    }

    #[test]
    fn gripped_object_reports_the_attached_one() {
        use crate::physics::object::GripAttachment;

        let mut world = PhysicsWorld::new();
        let a = world.spawn(ShapeKind::Cube, Point3::new(0.0, 0.0, 2.0), 4.0);
        let b = world.spawn(ShapeKind::Cube, Point3::new(10.0, 0.0, 2.0), 4.0);
        assert_eq!(world.gripped_object(), None);

        world.objects[b].attachment = Some(GripAttachment {
            local_offset: Vector3::zeros(),
            local_orientation: na::UnitQuaternion::identity(),
        });
        assert_eq!(world.gripped_object(), Some(b));
        assert!(!world.objects[a].is_gripped());
    }

    #[test]
    fn remove_by_unknown_name_is_a_no_op() {
        let mut world = PhysicsWorld::new();
        world.spawn(ShapeKind::Cube, Point3::new(0.0, 0.0, 2.0), 4.0);
        assert!(world.remove_by_name("cube_99").is_none());
        assert_eq!(world.objects.len(), 1);
    }
}
