//! A module containing the kinematic description of the arm:
//! a simplified datatype that represents kinematic chains,
//! plus the fixed geometry of the standard five-joint arm.

use na::{Isometry3, Translation3, Unit, Vector3};

/// Length of the upper arm (shoulder to elbow), in world units (1 unit = 1 cm).
pub const UPPER_ARM_LENGTH: f32 = 150.0;
/// Length of the forearm (elbow to wrist).
pub const FOREARM_LENGTH: f32 = 150.0;
/// Length of the wrist segment (wrist joint to gripper base).
pub const WRIST_LENGTH: f32 = 40.0;
/// Length of the gripper body (gripper base to the end-effector tip).
pub const GRIPPER_LENGTH: f32 = 25.0;
/// Height of the shoulder pivot above the floor.
pub const BASE_HEIGHT: f32 = 40.0;

/// Distance from the wrist joint to the end-effector tip, used by the
/// inverse kinematics solver to place the wrist above a target when the
/// effector must point straight down.
pub const WRIST_TO_TIP: f32 = WRIST_LENGTH + GRIPPER_LENGTH;

pub const BASE_LIMIT: f32 = std::f32::consts::PI;
pub const SHOULDER_LIMIT: f32 = std::f32::consts::FRAC_PI_2;
pub const ELBOW_LIMIT: f32 = 3.0 * std::f32::consts::FRAC_PI_4;
pub const WRIST_LIMIT: f32 = std::f32::consts::FRAC_PI_2;
pub const WRIST_ROLL_LIMIT: f32 = std::f32::consts::PI;

/// A link in a KinematicModel, assumed to consist of an axis of rotation,
/// as well as a translation, and max/min angles.
#[derive(Debug)]
pub struct KinematicLink {
    pub offset: Vector3<f32>,
    pub axis: Unit<Vector3<f32>>,
    pub min: f32,
    pub max: f32,
}

/// A simple kinematic chain model, consisting of a single origin and a set of revolute links.
///
/// The `origin` field is effectively an "anchor" where the base of the chain is attached in space.
///
/// Then, each link contains an 'offset' and an 'axis' field. The axis is the direction of the axis
/// around which the link rotates, and the offset is the vector from the base to the tip of the link
/// when at 0 angle.
#[derive(Debug)]
pub struct KinematicModel {
    pub origin: Isometry3<f32>,
    pub links: Vec<KinematicLink>,
}

pub struct PredictedPositions {
    pub link_base_positions: Vec<Isometry3<f32>>,
    pub tip_position: Isometry3<f32>,
}

impl KinematicModel {
    /// Predict the global base frame of every kinematic link, plus the tip frame.
    pub fn predict(&self, angles: &[f32]) -> PredictedPositions {
        let mut last_tip_position = self.origin;

        let mut base_positions = Vec::new();

        for (a, l) in angles.iter().zip(self.links.iter()) {
            let base_pos = last_tip_position
                * Isometry3::new(Vector3::new(0.0, 0.0, 0.0), l.axis.into_inner() * *a);
            last_tip_position = base_pos * Translation3::from(l.offset);
            base_positions.push(base_pos);
        }

        PredictedPositions {
            link_base_positions: base_positions,
            tip_position: last_tip_position,
        }
    }

    /// Mutate the given angles such that they are within the legal range of every kinematic link.
    pub fn cap_angles_to_legal(&self, angles: &mut [f32]) {
        for (angle, link) in angles.iter_mut().zip(self.links.iter()) {
            *angle = angle.max(link.min).min(link.max);
        }
    }

    /// Whether every angle is within the legal range of its link.
    pub fn angles_within_limits(&self, angles: &[f32]) -> bool {
        angles
            .iter()
            .zip(self.links.iter())
            .all(|(a, l)| *a >= l.min && *a <= l.max)
    }

    /// Get the sum of the lengths of all links in the kinematic chain,
    /// to get a rough estimate of maximum reach.
    pub fn chain_length(&self) -> f32 {
        self.links.iter().map(|link| link.offset.norm()).sum()
    }
}

/// The kinematic chain of the standard arm.
///
/// Conventions: the chain lives in a right-handed Z-up frame with the floor
/// at Z = 0. With all angles at zero the arm points straight up. The base
/// joint yaws about +Z; shoulder, elbow and wrist pitch about the local +X
/// axis (the normal of the arm's vertical plane); the wrist-roll joint
/// rotates about the local +Z axis, which runs along the gripper body.
pub fn arm_chain() -> KinematicModel {
    let pitch_axis = Unit::new_normalize(Vector3::x());
    let yaw_axis = Unit::new_normalize(Vector3::z());

    KinematicModel {
        origin: Isometry3::identity(),
        links: vec![
            KinematicLink {
                offset: Vector3::new(0.0, 0.0, BASE_HEIGHT),
                axis: yaw_axis,
                min: -BASE_LIMIT,
                max: BASE_LIMIT,
            },
            KinematicLink {
                offset: Vector3::new(0.0, 0.0, UPPER_ARM_LENGTH),
                axis: pitch_axis,
                min: -SHOULDER_LIMIT,
                max: SHOULDER_LIMIT,
            },
            KinematicLink {
                offset: Vector3::new(0.0, 0.0, FOREARM_LENGTH),
                axis: pitch_axis,
                min: -ELBOW_LIMIT,
                max: ELBOW_LIMIT,
            },
            KinematicLink {
                offset: Vector3::new(0.0, 0.0, WRIST_LENGTH),
                axis: pitch_axis,
                min: -WRIST_LIMIT,
                max: WRIST_LIMIT,
            },
            KinematicLink {
                offset: Vector3::new(0.0, 0.0, GRIPPER_LENGTH),
                axis: yaw_axis,
                min: -WRIST_ROLL_LIMIT,
                max: WRIST_ROLL_LIMIT,
            },
        ],
    }
}

/// Wrap an angle into `[-π, π]`.
pub fn wrap_angle(a: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut a = a % TAU;
    if a > PI {
        a -= TAU;
    } else if a < -PI {
        a += TAU;
    }
    a
}
