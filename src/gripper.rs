//! The grip state machine: openness animation, pick-up detection between
//! the two fingers, held-object pose tracking, and release.

use generational_arena::Index;
use log::debug;

use crate::arm::ArmState;
use crate::arm_collision::{finger_boxes, finger_contacts};
use crate::physics::object::GripAttachment;
use crate::physics::PhysicsWorld;

/// Inner gap between the finger faces when fully open (openness = 100).
pub const MAX_FINGER_GAP: f32 = 8.0;
/// How far the fingers extend below the gripper base. Slightly past the
/// effector tip so the fingers reach around an object the tip hovers over.
pub const FINGER_LENGTH: f32 = 30.0;
pub const FINGER_THICKNESS: f32 = 3.0;
pub const FINGER_DEPTH: f32 = 8.0;

/// Extra gap beyond the object's width kept after a grip, so the fingers
/// hug the object instead of crushing through it.
pub const GRIP_PADDING: f32 = 0.6;
/// Exponential smoothing rate of openness toward its target, per second.
pub const OPENNESS_SMOOTHING: f32 = 8.0;
/// Gap below which openness snaps to its target.
pub const OPENNESS_SNAP: f32 = 0.25;
/// How much the target must rise above the current openness to count as a
/// deliberate release while holding an object, in percent.
pub const RELEASE_THRESHOLD: f32 = 5.0;
/// Downward velocity seeded into a just-released object so gravity takes
/// over without a visible hang.
pub const RELEASE_DROP_SPEED: f32 = 30.0;
/// Push applied to an object contacted by a single finger.
pub const SINGLE_FINGER_PUSH: f32 = 0.8;

/// Inner gap corresponding to an openness percentage.
pub fn gap_for_openness(openness: f32) -> f32 {
    openness.max(0.0).min(100.0) / 100.0 * MAX_FINGER_GAP
}

/// Openness percentage whose gap is `gap`, clamped to `[0, 100]`.
pub fn openness_for_gap(gap: f32) -> f32 {
    (gap / MAX_FINGER_GAP * 100.0).max(0.0).min(100.0)
}

/// Whether the object currently sits in the grip zone: centered between the
/// fingers, within finger depth and length, and small enough to fit the gap.
pub fn grip_zone_eligible(arm: &ArmState, world: &PhysicsWorld, idx: Index) -> bool {
    let obj = match world.objects.get(idx) {
        Some(o) => o,
        None => return false,
    };
    let frame = arm.gripper_frame();
    let local = frame.inverse_transform_point(&obj.position);
    let gap = gap_for_openness(arm.gripper_openness);

    local.x.abs() <= gap * 0.5 + 0.5
        && local.y.abs() <= FINGER_DEPTH * 0.5 + obj.half_size()
        && local.z >= 0.0
        && local.z <= FINGER_LENGTH
        && obj.size <= gap + 1.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GripState {
    Idle,
    Closing,
    Holding(Index),
    Opening,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GripEvent {
    Gripped { object: String },
    Released { object: String },
}

pub struct Gripper {
    pub state: GripState,
    pub target_openness: f32,
}

impl Gripper {
    pub fn new() -> Self {
        Gripper {
            state: GripState::Idle,
            target_openness: 100.0,
        }
    }

    pub fn held_object(&self) -> Option<Index> {
        match self.state {
            GripState::Holding(idx) => Some(idx),
            _ => None,
        }
    }

    /// Set a new openness target. Opening meaningfully while holding an
    /// object releases it immediately; the attachment is cleared before
    /// anything else so the pose-tracking step cannot race the release.
    /// A target below the held object's snug openness clamps to it, so
    /// the fingers never close through what they are holding.
    pub fn set_target(
        &mut self,
        arm: &mut ArmState,
        world: &mut PhysicsWorld,
        percent: f32,
        animated: bool,
    ) -> Option<GripEvent> {
        let percent = percent.max(0.0).min(100.0);
        self.target_openness = percent;

        let mut event = None;
        if let GripState::Holding(idx) = self.state {
            if percent > arm.gripper_openness + RELEASE_THRESHOLD {
                event = self.release(world, idx);
            } else if let Some(obj) = world.objects.get(idx) {
                let snug = openness_for_gap(obj.size + GRIP_PADDING);
                self.target_openness = percent.max(snug);
            }
        }

        match self.state {
            GripState::Holding(_) => {}
            _ => {
                self.state = if percent < arm.gripper_openness - OPENNESS_SNAP {
                    GripState::Closing
                } else if percent > arm.gripper_openness + OPENNESS_SNAP {
                    GripState::Opening
                } else {
                    GripState::Idle
                };
            }
        }

        if !animated {
            arm.gripper_openness = self.target_openness;
            if self.held_object().is_none() {
                self.state = GripState::Idle;
            }
        }

        event
    }

    /// Advance the openness animation and the grip logic by one tick.
    pub fn tick(&mut self, dt: f32, arm: &mut ArmState, world: &mut PhysicsWorld) -> Option<GripEvent> {
        // A held object can disappear through explicit removal.
        if let GripState::Holding(idx) = self.state {
            if world.objects.get(idx).is_none() {
                self.state = GripState::Idle;
            }
        }

        let diff = self.target_openness - arm.gripper_openness;
        if diff.abs() <= OPENNESS_SNAP {
            arm.gripper_openness = self.target_openness;
            match self.state {
                GripState::Closing | GripState::Opening => self.state = GripState::Idle,
                _ => {}
            }
        } else {
            let blend = 1.0 - (-OPENNESS_SMOOTHING * dt).exp();
            arm.gripper_openness += diff * blend;
        }

        let mut event = None;
        match self.state {
            GripState::Closing => {
                event = self.try_grip(arm, world);
            }
            GripState::Holding(idx) => {
                update_held_pose(arm, world, idx);
            }
            _ => {}
        }
        event
    }

    /// While closing, look for an object caught between both fingers.
    fn try_grip(&mut self, arm: &mut ArmState, world: &mut PhysicsWorld) -> Option<GripEvent> {
        let boxes = finger_boxes(arm);
        let ids: Vec<Index> = world.objects.iter().map(|(i, _)| i).collect();

        for idx in ids {
            let (left, right) = {
                let obj = &world.objects[idx];
                if obj.is_gripped() {
                    continue;
                }
                finger_contacts(&boxes, obj)
            };

            match (left, right) {
                (Some(_), Some(_)) if grip_zone_eligible(arm, world, idx) => {
                    let frame = arm.gripper_frame();
                    let obj = &mut world.objects[idx];
                    obj.attachment = Some(GripAttachment {
                        local_offset: frame.inverse_transform_point(&obj.position).coords,
                        local_orientation: frame.rotation.inverse() * obj.orientation,
                    });
                    obj.velocity.fill(0.0);

                    // Hug the object instead of continuing to the commanded
                    // openness, which would crush it.
                    self.target_openness = openness_for_gap(obj.size + GRIP_PADDING);
                    self.state = GripState::Holding(idx);
                    debug!("gripped {}", obj.name);
                    return Some(GripEvent::Gripped {
                        object: obj.name.clone(),
                    });
                }
                (Some(contact), None) | (None, Some(contact)) => {
                    // One finger only: shove the object out of the way
                    // along that finger's outward axis, no grip.
                    let obj = &mut world.objects[idx];
                    let push = contact.depth.max(0.2) * SINGLE_FINGER_PUSH;
                    obj.position += contact.outward * push;
                    obj.velocity += contact.outward * push * 20.0;
                    obj.position.z = obj.position.z.max(obj.half_size());
                }
                _ => {}
            }
        }
        None
    }

    /// Drop the held object: clear the linkage first, then seed a small
    /// downward velocity so gravity takes over on the next step.
    fn release(&mut self, world: &mut PhysicsWorld, idx: Index) -> Option<GripEvent> {
        self.state = GripState::Opening;
        let obj = world.objects.get_mut(idx)?;
        obj.attachment = None;
        obj.velocity.fill(0.0);
        obj.velocity.z = -RELEASE_DROP_SPEED;
        debug!("released {}", obj.name);
        Some(GripEvent::Released {
            object: obj.name.clone(),
        })
    }
}

/// Recompute the held object's world pose from the gripper's current frame
/// and the attachment captured at grip time; the object rides rigidly.
fn update_held_pose(arm: &ArmState, world: &mut PhysicsWorld, idx: Index) {
    let frame = arm.gripper_frame();
    if let Some(obj) = world.objects.get_mut(idx) {
        if let Some(attachment) = obj.attachment {
            obj.position = frame * na::Point3::from(attachment.local_offset);
            obj.orientation = frame.rotation * attachment.local_orientation;
            obj.velocity.fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::ArmJointMap;
    use crate::inverse_kinematics::solve_ik;
    use crate::physics::object::ShapeKind;
    use na::Point3;

    /// Pose the arm (via the analytic solver) so the effector tip hovers at
    /// the given point, pointing straight down.
    fn arm_over(x: f32, y: f32, z: f32) -> ArmState {
        let sol = solve_ik(x, y, z).expect("test target must be reachable");
        let mut arm = ArmState::new();
        arm.set_angles(ArmJointMap {
            base: sol.base.to_radians(),
            shoulder: sol.shoulder.to_radians(),
            elbow: sol.elbow.to_radians(),
            wrist: sol.wrist.to_radians(),
            wrist_roll: 0.0,
        });
        arm
    }

    fn arm_pointing_down() -> ArmState {
        arm_over(0.0, 150.0, 20.0)
    }

    #[test]
    fn releasing_with_nothing_held_is_a_no_op() {
        let mut arm = arm_pointing_down();
        let mut world = PhysicsWorld::new();
        let mut gripper = Gripper::new();
        arm.gripper_openness = 20.0;
        gripper.target_openness = 20.0;

        let event = gripper.set_target(&mut arm, &mut world, 100.0, true);
        assert_eq!(event, None);
        assert_eq!(gripper.state, GripState::Opening);
    }

    #[test]
    fn openness_converges_and_snaps() {
        let mut arm = arm_pointing_down();
        let mut world = PhysicsWorld::new();
        let mut gripper = Gripper::new();
        gripper.set_target(&mut arm, &mut world, 0.0, true);

        for _ in 0..200 {
            gripper.tick(1.0 / 60.0, &mut arm, &mut world);
        }
        assert_eq!(arm.gripper_openness, 0.0);
        assert_eq!(gripper.state, GripState::Idle);
    }

    #[test]
    fn closing_over_a_centered_object_grips_it() {
        let mut arm = arm_pointing_down();
        let mut world = PhysicsWorld::new();
        let mut gripper = Gripper::new();

        // Place a small cube centered in the grip zone.
        let frame = arm.gripper_frame();
        let center = frame * Point3::new(0.0, 0.0, FINGER_LENGTH * 0.6);
        let idx = world.spawn(ShapeKind::Cube, center, 4.0);

        gripper.set_target(&mut arm, &mut world, 0.0, true);

        let mut gripped = false;
        for _ in 0..200 {
            if let Some(GripEvent::Gripped { .. }) = gripper.tick(1.0 / 60.0, &mut arm, &mut world) {
                gripped = true;
                break;
            }
        }
        assert!(gripped, "object between both fingers was not gripped");
        assert_eq!(gripper.held_object(), Some(idx));
        assert!(world.objects[idx].is_gripped());

        // Gripping again is a no-op: the object is skipped while gripped.
        let before = gripper.target_openness;
        for _ in 0..10 {
            assert_eq!(gripper.tick(1.0 / 60.0, &mut arm, &mut world), None);
        }
        assert_eq!(gripper.target_openness, before);

        // Snug openness hugs the object rather than crushing to zero.
        assert!(gripper.target_openness > 0.0);

        // Opening wide releases with a downward velocity seed.
        let event = gripper.set_target(&mut arm, &mut world, 100.0, true);
        assert_eq!(
            event,
            Some(GripEvent::Released {
                object: world.objects[idx].name.clone()
            })
        );
        assert!(!world.objects[idx].is_gripped());
        assert!(world.objects[idx].velocity.z < 0.0);
    }

    #[test]
    fn instant_close_while_holding_keeps_the_snug_gap() {
        let mut arm = arm_pointing_down();
        let mut world = PhysicsWorld::new();
        let mut gripper = Gripper::new();

        let frame = arm.gripper_frame();
        let center = frame * Point3::new(0.0, 0.0, FINGER_LENGTH * 0.6);
        let idx = world.spawn(ShapeKind::Cube, center, 4.0);

        gripper.set_target(&mut arm, &mut world, 0.0, true);
        for _ in 0..200 {
            gripper.tick(1.0 / 60.0, &mut arm, &mut world);
        }
        assert_eq!(gripper.held_object(), Some(idx));

        // Forcing the fingers shut instantly must stop at the held
        // object's width, not pass through it.
        gripper.set_target(&mut arm, &mut world, 0.0, false);
        assert_eq!(gripper.held_object(), Some(idx));
        assert!(gap_for_openness(arm.gripper_openness) >= world.objects[idx].size);

        // The same clamp applies to an animated close.
        gripper.set_target(&mut arm, &mut world, 0.0, true);
        for _ in 0..100 {
            gripper.tick(1.0 / 60.0, &mut arm, &mut world);
        }
        assert!(gap_for_openness(arm.gripper_openness) >= world.objects[idx].size);
    }

    #[test]
    fn held_object_rides_with_the_gripper() {
        let mut arm = arm_pointing_down();
        let mut world = PhysicsWorld::new();
        let mut gripper = Gripper::new();

        let frame = arm.gripper_frame();
        let center = frame * Point3::new(0.0, 0.0, FINGER_LENGTH * 0.6);
        let idx = world.spawn(ShapeKind::Cube, center, 4.0);

        gripper.set_target(&mut arm, &mut world, 0.0, true);
        for _ in 0..200 {
            gripper.tick(1.0 / 60.0, &mut arm, &mut world);
        }
        assert!(world.objects[idx].is_gripped());

        // Move the arm; the object must follow rigidly.
        let offset_before = arm.gripper_frame().inverse_transform_point(&world.objects[idx].position);
        arm.set_angles(ArmJointMap {
            base: 0.5,
            shoulder: 1.0,
            elbow: 0.9,
            wrist: 0.2,
            wrist_roll: 0.3,
        });
        gripper.tick(1.0 / 60.0, &mut arm, &mut world);
        let offset_after = arm.gripper_frame().inverse_transform_point(&world.objects[idx].position);
        assert!((offset_before - offset_after).norm() < 1e-3);
    }
}
