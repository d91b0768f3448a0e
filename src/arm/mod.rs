//! This mod contains the kinematic state of the "standard arm": a five-joint
//! arm (base yaw, shoulder, elbow, wrist, wrist roll) with a two-fingered
//! parallel gripper end-effector.
//!
//! The state here is purely kinematic: current joint angles plus gripper
//! openness, with forward-kinematic queries derived on demand. Animation
//! toward *target* angles is the motion executor's job ([`crate::motion`]).

use na::{Isometry3, Point3};

use crate::kinematics::{arm_chain, KinematicModel};

pub use joint_map::ArmJointMap;

pub mod joint_map;

/// World-space positions of the arm's joint pivots and effector tip,
/// as produced by forward kinematics.
#[derive(Debug, Clone, Copy)]
pub struct ArmJointPositions {
    pub shoulder: Point3<f32>,
    pub elbow: Point3<f32>,
    pub wrist: Point3<f32>,
    pub gripper_base: Point3<f32>,
    pub tip: Point3<f32>,
}

/// Current kinematic state of the arm.
///
/// Invariant: every stored angle is within its joint limit; all setters
/// clamp before storing. Gripper openness is a percentage in `[0, 100]`.
pub struct ArmState {
    angles: ArmJointMap<f32>,
    pub gripper_openness: f32,
    model: KinematicModel,
}

impl ArmState {
    /// The arm in its home pose: pointing straight up, gripper fully open.
    pub fn new() -> Self {
        ArmState {
            angles: ArmJointMap::ZERO,
            gripper_openness: 100.0,
            model: arm_chain(),
        }
    }

    pub fn model(&self) -> &KinematicModel {
        &self.model
    }

    pub fn angles(&self) -> ArmJointMap<f32> {
        self.angles
    }

    /// Store a new set of joint angles, clamping each to its static limit.
    pub fn set_angles(&mut self, angles: ArmJointMap<f32>) {
        let mut raw = angles.to_array();
        self.model.cap_angles_to_legal(&mut raw);
        self.angles = ArmJointMap::from(raw);
    }

    /// Clamp a candidate angle set without storing it.
    pub fn clamp_angles(&self, angles: ArmJointMap<f32>) -> ArmJointMap<f32> {
        let mut raw = angles.to_array();
        self.model.cap_angles_to_legal(&mut raw);
        ArmJointMap::from(raw)
    }

    /// World positions of every joint pivot plus the effector tip.
    pub fn joint_positions(&self) -> ArmJointPositions {
        let predicted = self.model.predict(&self.angles.to_array());
        let at = |i: usize| Point3::from(predicted.link_base_positions[i].translation.vector);

        ArmJointPositions {
            shoulder: at(1),
            elbow: at(2),
            wrist: at(3),
            gripper_base: at(4),
            tip: Point3::from(predicted.tip_position.translation.vector),
        }
    }

    /// The end-effector tip position (the IK target point).
    pub fn end_effector_position(&self) -> Point3<f32> {
        self.joint_positions().tip
    }

    /// The gripper's local frame, anchored at the gripper base with +Z
    /// running along the gripper body toward (and past) the tip, and +X
    /// being the axis along which the fingers open. Includes wrist roll.
    pub fn gripper_frame(&self) -> Isometry3<f32> {
        let predicted = self.model.predict(&self.angles.to_array());
        predicted.link_base_positions[4]
    }

    /// The arm's collision segments as (start, end, radius) capsule-like
    /// probes: upper arm, forearm, and wrist-plus-palm. The last segment
    /// stops at the gripper base; below it the fingers have their own
    /// collision boxes, and the space between them must stay free so an
    /// open gripper can be lowered around an object.
    pub fn collision_segments(&self) -> [(Point3<f32>, Point3<f32>, f32); 3] {
        let joints = self.joint_positions();
        [
            (joints.shoulder, joints.elbow, UPPER_ARM_RADIUS),
            (joints.elbow, joints.wrist, FOREARM_RADIUS),
            (joints.wrist, joints.gripper_base, WRIST_RADIUS),
        ]
    }
}

/// Collision radii of the arm links. These approximate the visual model's
/// girth; collision itself is AABB-based (see [`crate::arm_collision`]).
pub const UPPER_ARM_RADIUS: f32 = 12.0;
pub const FOREARM_RADIUS: f32 = 10.0;
pub const WRIST_RADIUS: f32 = 8.0;
