//! Analytic inverse kinematics for the standard arm.
//!
//! The solver reduces the problem to a two-link solve in the vertical plane
//! that contains the target, under the constraint that the effector points
//! straight down (so the wrist sits a fixed distance directly above the
//! target). Both elbow configurations are derived in closed form and
//! checked against the joint limits.

use thiserror::Error;

use crate::kinematics::{
    wrap_angle, BASE_HEIGHT, ELBOW_LIMIT, FOREARM_LENGTH, SHOULDER_LIMIT, UPPER_ARM_LENGTH,
    WRIST_LIMIT, WRIST_TO_TIP,
};

/// Fraction of the full two-link reach the solver will actually use.
/// Targets requiring a fully straightened elbow are numerically unstable
/// and physically implausible, so the last 2% is treated as out of reach.
pub const REACH_FRACTION: f32 = 0.98;

/// Planar wrist distances below this are degenerate (wrist collinear with
/// the shoulder pivot, base yaw undefined).
const MIN_PLANAR_DISTANCE: f32 = 1e-3;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum IkError {
    #[error("target is below the floor plane")]
    BelowFloor,
    #[error("target too far: needs {required:.1} units of reach, maximum is {max:.1}")]
    TooFar { required: f32, max: f32 },
    #[error("target too close to the shoulder pivot")]
    TooCloseToPivot,
    #[error(
        "target unreachable under joint limits (horizontal distance {horizontal:.1}, height {height:.1})"
    )]
    OutsideJointLimits { horizontal: f32, height: f32 },
}

/// A successful solve. Angles are in **degrees**, the boundary format used
/// by the command layer and saved positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkSolution {
    pub base: f32,
    pub shoulder: f32,
    pub elbow: f32,
    pub wrist: f32,
}

/// Solve for the joint angles that put the effector tip at `(x, y, z)`
/// pointing straight down.
///
/// Pure and side-effect free; coordinates are in world units (1 unit = 1 cm,
/// the source UI's fixed 100-units-per-meter scale).
pub fn solve_ik(x: f32, y: f32, z: f32) -> Result<IkSolution, IkError> {
    if z < 0.0 {
        return Err(IkError::BelowFloor);
    }

    // Yaw of the vertical plane containing the target. The arm's reference
    // direction at zero yaw is -Y, so a target straight ahead (+Y) maps to
    // a base angle of 180°.
    let base = wrap_angle(std::f32::consts::PI - x.atan2(y));

    // Reduce to 2D: horizontal distance from the base axis, and the wrist
    // height relative to the shoulder pivot. The wrist sits a fixed
    // distance straight above the target because the effector points down.
    let r = x.hypot(y);
    let h = z + WRIST_TO_TIP - BASE_HEIGHT;

    let wrist_distance = r.hypot(h);
    let max_reach = REACH_FRACTION * (UPPER_ARM_LENGTH + FOREARM_LENGTH);

    if wrist_distance > max_reach {
        return Err(IkError::TooFar {
            required: wrist_distance,
            max: max_reach,
        });
    }
    if wrist_distance < MIN_PLANAR_DISTANCE {
        return Err(IkError::TooCloseToPivot);
    }

    // Law of cosines for the internal elbow angle and the angle between the
    // upper arm and the shoulder-to-wrist line.
    let l1 = UPPER_ARM_LENGTH;
    let l2 = FOREARM_LENGTH;
    let d = wrist_distance;

    let elbow_internal = clamped_acos((l1 * l1 + l2 * l2 - d * d) / (2.0 * l1 * l2));
    let shoulder_offset = clamped_acos((l1 * l1 + d * d - l2 * l2) / (2.0 * l1 * d));

    // Angle of the shoulder-to-wrist line from vertical.
    let line_from_vertical = r.atan2(h);

    // Two candidate configurations. "Elbow-down" bends the forearm back
    // toward vertical (negative elbow angle) and is preferred when legal.
    let candidates = [
        planar_candidate(
            line_from_vertical + shoulder_offset,
            elbow_internal - std::f32::consts::PI,
        ),
        planar_candidate(
            line_from_vertical - shoulder_offset,
            std::f32::consts::PI - elbow_internal,
        ),
    ];

    for (shoulder, elbow, wrist) in candidates.iter() {
        if shoulder.abs() <= SHOULDER_LIMIT && elbow.abs() <= ELBOW_LIMIT && wrist.abs() <= WRIST_LIMIT
        {
            return Ok(IkSolution {
                base: base.to_degrees(),
                shoulder: shoulder.to_degrees(),
                elbow: elbow.to_degrees(),
                wrist: wrist.to_degrees(),
            });
        }
    }

    Err(IkError::OutsideJointLimits {
        horizontal: r,
        height: z,
    })
}

/// Complete a planar (shoulder, elbow) pair with the wrist angle that makes
/// the pitch angles sum to π, i.e. the effector pointing straight down.
fn planar_candidate(shoulder: f32, elbow: f32) -> (f32, f32, f32) {
    let shoulder = wrap_angle(shoulder);
    let elbow = wrap_angle(elbow);
    let wrist = wrap_angle(std::f32::consts::PI - shoulder - elbow);
    (shoulder, elbow, wrist)
}

/// `acos` with the input clamped to `[-1, 1]` to absorb floating-point
/// overshoot in the law-of-cosines ratios.
fn clamped_acos(x: f32) -> f32 {
    x.max(-1.0).min(1.0).acos()
}
