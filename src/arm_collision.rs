//! Contact detection and reaction between the arm and scene objects.
//!
//! Two kinds of reaction exist. *Pushing* (the common case) corrects an
//! object's position along the accumulated contact normal and gives it a
//! velocity impulse, so the arm shoves things aside as it sweeps. *Blocking*
//! is the narrow case where resolving the contact would require moving an
//! on-floor object downward through the floor; the motion executor treats
//! that as a hard stop rather than a push.

use float_ord::FloatOrd;
use generational_arena::Index;
use log::warn;
use na::{Point3, Vector3};
use rand::Rng;

use crate::arm::ArmState;
use crate::collision::{aabb_mtv, closest_point_on_segment, Aabb};
use crate::gripper::{self, gap_for_openness, FINGER_DEPTH, FINGER_LENGTH, FINGER_THICKNESS};
use crate::physics::object::SceneObject;
use crate::physics::PhysicsWorld;

/// Fraction of the deepest penetration applied as positional correction.
pub const PUSH_CORRECTION_FACTOR: f32 = 0.6;
/// Minimum positional correction once any contact exists, so even shallow
/// grazing contact produces visible separation.
pub const MIN_PUSH: f32 = 0.4;
/// Velocity impulse per unit of penetration depth.
pub const PUSH_IMPULSE: f32 = 25.0;
/// Penetration beyond which a random lateral jitter is added, preventing
/// stable interpenetrating equilibria.
pub const JITTER_MIN_DEPTH: f32 = 0.5;
pub const JITTER_MAGNITUDE: f32 = 1.2;

/// Minimum penetration for a contact to classify as blocking.
pub const BLOCK_PENETRATION: f32 = 0.75;
/// Fraction of the separation magnitude that must point straight down for
/// a contact to classify as blocking. Empirically tuned; the intent is
/// only "never tunnel objects through the floor, let everything slide".
pub const BLOCK_VERTICALITY: f32 = 0.95;

/// A single arm/object contact: the unit axis along which the object
/// separates from the arm, and how deep the overlap is.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    pub axis: Vector3<f32>,
    pub depth: f32,
}

/// Contact between one gripper finger and an object. `outward` points away
/// from the gripper center along the finger's opening axis.
#[derive(Debug, Clone, Copy)]
pub struct FingerContact {
    pub outward: Vector3<f32>,
    pub depth: f32,
}

/// The two gripper fingers as exact boxes in the gripper's local frame,
/// plus their world-space outward axes. Contact tests against the fingers
/// happen in this frame: boxing the rotated fingers in world axes would
/// fatten them enough to brush an object sitting centered between them,
/// and the arm would shove away the very thing it is about to grip.
pub struct FingerBoxes {
    frame: na::Isometry3<f32>,
    pub left: Aabb,
    pub right: Aabb,
    pub left_outward: Vector3<f32>,
    pub right_outward: Vector3<f32>,
}

pub fn finger_boxes(arm: &ArmState) -> FingerBoxes {
    let frame = arm.gripper_frame();
    let gap = gap_for_openness(arm.gripper_openness);

    let side_box = |side: f32| {
        Aabb::from_half_extents(
            Point3::new(
                side * (gap * 0.5 + FINGER_THICKNESS * 0.5),
                0.0,
                FINGER_LENGTH * 0.5,
            ),
            Vector3::new(
                FINGER_THICKNESS * 0.5,
                FINGER_DEPTH * 0.5,
                FINGER_LENGTH * 0.5,
            ),
        )
    };

    FingerBoxes {
        left: side_box(-1.0),
        right: side_box(1.0),
        left_outward: frame * Vector3::new(-1.0, 0.0, 0.0),
        right_outward: frame * Vector3::new(1.0, 0.0, 0.0),
        frame,
    }
}

impl FingerBoxes {
    /// The object's world AABB re-boxed in the gripper frame. Conservative
    /// for objects at an angle to the gripper, exact when aligned.
    fn local_box(&self, obj: &SceneObject) -> Aabb {
        let world = obj.aabb();
        let corners: Vec<Point3<f32>> = (0..8)
            .map(|i| {
                let corner = Point3::new(
                    if i & 1 == 0 { world.mins.x } else { world.maxs.x },
                    if i & 2 == 0 { world.mins.y } else { world.maxs.y },
                    if i & 4 == 0 { world.mins.z } else { world.maxs.z },
                );
                self.frame.inverse_transform_point(&corner)
            })
            .collect();
        // Eight corners always yield a box.
        Aabb::from_points(corners.iter())
            .unwrap_or(Aabb::new(Point3::origin(), Point3::origin()))
    }
}

/// Per-finger contact test used by the grip state machine.
pub fn finger_contacts(
    boxes: &FingerBoxes,
    obj: &SceneObject,
) -> (Option<FingerContact>, Option<FingerContact>) {
    let local = boxes.local_box(obj);
    let contact = |finger: &Aabb, outward: Vector3<f32>| {
        aabb_mtv(&local, finger).map(|mtv| FingerContact {
            outward,
            depth: mtv.norm(),
        })
    };
    (
        contact(&boxes.left, boxes.left_outward),
        contact(&boxes.right, boxes.right_outward),
    )
}

/// All contacts between the arm (fingers plus link probe volumes) and one
/// object. Each axis is the unit direction that separates the object.
pub fn object_contacts(arm: &ArmState, boxes: &FingerBoxes, obj: &SceneObject) -> Vec<Contact> {
    let aabb = obj.aabb();
    let local = boxes.local_box(obj);
    let mut contacts = Vec::new();

    for finger in [&boxes.left, &boxes.right].iter() {
        if let Some(mtv) = aabb_mtv(&local, finger) {
            let depth = mtv.norm();
            // Separation axis back in world coordinates.
            let axis = boxes.frame.rotation * (mtv / depth);
            contacts.push(Contact { axis, depth });
        }
    }

    // Arm links are probed as a small box around the segment point nearest
    // the object, standing in for the link's bounding volume there.
    for (start, end, radius) in arm.collision_segments().iter() {
        let nearest = closest_point_on_segment(*start, *end, obj.position);
        let probe = Aabb::from_half_extents(nearest, Vector3::new(*radius, *radius, *radius));
        if let Some(mtv) = aabb_mtv(&aabb, &probe) {
            let depth = mtv.norm();
            contacts.push(Contact {
                axis: mtv / depth,
                depth,
            });
        }
    }

    contacts
}

/// Push every non-gripped object out of the arm. Runs on every tick and
/// after every animation sub-step.
pub fn push_objects(arm: &ArmState, world: &mut PhysicsWorld, rng: &mut impl Rng) {
    let boxes = finger_boxes(arm);
    let ids: Vec<Index> = world.objects.iter().map(|(i, _)| i).collect();

    for idx in ids {
        let obj = &world.objects[idx];
        if obj.is_gripped() {
            continue;
        }
        let contacts = object_contacts(arm, &boxes, obj);
        if contacts.is_empty() {
            continue;
        }

        // Accumulate all contacts into one combined direction, weighted by
        // penetration depth.
        let mut combined = Vector3::zeros();
        let mut deepest = 0.0f32;
        for c in contacts.iter() {
            combined += c.axis * c.depth;
            deepest = deepest.max(c.depth);
        }
        if combined.norm() < crate::collision::GEOMETRY_EPSILON {
            continue;
        }
        let mut direction = combined.normalize();

        // An on-floor object can never be displaced downward; sideways
        // sliding is always fine.
        let on_floor = obj.on_floor();
        if on_floor && direction.z < 0.0 {
            direction.z = 0.0;
            let norm = direction.norm();
            if norm < crate::collision::GEOMETRY_EPSILON {
                continue;
            }
            direction /= norm;
        }

        let correction = (deepest * PUSH_CORRECTION_FACTOR).max(MIN_PUSH);
        let obj = &mut world.objects[idx];
        obj.position += direction * correction;
        obj.velocity += direction * deepest * PUSH_IMPULSE;

        if deepest > JITTER_MIN_DEPTH {
            let jitter = Vector3::new(
                rng.gen_range(-JITTER_MAGNITUDE..JITTER_MAGNITUDE),
                rng.gen_range(-JITTER_MAGNITUDE..JITTER_MAGNITUDE),
                0.0,
            );
            obj.position += jitter;
        }

        obj.position.z = obj.position.z.max(obj.half_size());
    }
}

/// Find a blocking contact, if any: an on-floor, non-gripped object outside
/// the grip zone whose deepest arm contact points nearly straight down.
pub fn blocking_contact(arm: &ArmState, world: &PhysicsWorld) -> Option<String> {
    let boxes = finger_boxes(arm);

    for (idx, obj) in world.objects.iter() {
        if obj.is_gripped() || !obj.on_floor() {
            continue;
        }
        if gripper::grip_zone_eligible(arm, world, idx) {
            // About to be gripped, not an obstacle.
            continue;
        }

        let contacts = object_contacts(arm, &boxes, obj);
        let deepest = match contacts.iter().max_by_key(|c| FloatOrd(c.depth)) {
            Some(c) => *c,
            None => continue,
        };

        if deepest.depth >= BLOCK_PENETRATION && deepest.axis.z <= -BLOCK_VERTICALITY {
            warn!(
                "blocking contact with {} (depth {:.2})",
                obj.name, deepest.depth
            );
            return Some(obj.name.clone());
        }
    }
    None
}
