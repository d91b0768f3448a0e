//! The collision-aware motion executor: a state machine that advances a
//! joint-space trajectory in sub-steps, pushing objects aside as the arm
//! sweeps and rolling back to the last safe pose when a contact would
//! force an object through the floor.

use std::collections::VecDeque;

use log::{debug, warn};
use rand::Rng;

use crate::arm::{ArmJointMap, ArmState};
use crate::arm_collision::{blocking_contact, push_objects};
use crate::kinematics::wrap_angle;
use crate::physics::PhysicsWorld;

/// Default angular speed used to derive a duration from the largest joint
/// delta, radians per second.
pub const DEFAULT_ANGULAR_SPEED: f32 = 1.2;
pub const MIN_DURATION: f32 = 0.4;
pub const MAX_DURATION: f32 = 3.0;

/// Progress below this per tick is skipped outright (no sub-stepping);
/// completion is still checked.
pub const PROGRESS_EPSILON: f32 = 1e-4;
/// Maximum progress advanced per sub-step; one tick always takes at least
/// two sub-steps so fast motions cannot tunnel through an object.
pub const MAX_PROGRESS_PER_SUBSTEP: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    CubicInOut,
}

impl Easing {
    pub fn apply(&self, p: f32) -> f32 {
        let p = p.max(0.0).min(1.0);
        match self {
            Easing::Linear => p,
            Easing::CubicInOut => {
                if p < 0.5 {
                    4.0 * p * p * p
                } else {
                    let q = -2.0 * p + 2.0;
                    1.0 - q * q * q / 2.0
                }
            }
        }
    }
}

/// An in-flight joint-space animation.
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub start: ArmJointMap<f32>,
    pub target: ArmJointMap<f32>,
    pub duration: f32,
    pub easing: Easing,
    pub elapsed: f32,
    /// Raw progress at which angles were last applied.
    progress: f32,
    /// Last sub-step confirmed free of blocking contact, for rollback.
    last_safe: ArmJointMap<f32>,
    last_safe_progress: f32,
}

/// Interpolate between two angle sets. Base rotation and wrist roll take
/// the shortest angular path (difference wrapped into `[-π, π]`), so a
/// commanded rotation never goes the long way around; the remaining joints
/// are plain lerps since their limits keep them far from the wrap point.
pub fn interpolate_angles(
    start: &ArmJointMap<f32>,
    target: &ArmJointMap<f32>,
    t: f32,
) -> ArmJointMap<f32> {
    let lerp = |a: f32, b: f32| a + (b - a) * t;
    let shortest = |a: f32, b: f32| wrap_angle(a + wrap_angle(b - a) * t);
    ArmJointMap {
        base: shortest(start.base, target.base),
        shoulder: lerp(start.shoulder, target.shoulder),
        elbow: lerp(start.elbow, target.elbow),
        wrist: lerp(start.wrist, target.wrist),
        wrist_roll: shortest(start.wrist_roll, target.wrist_roll),
    }
}

impl Trajectory {
    pub fn new(start: ArmJointMap<f32>, target: ArmJointMap<f32>, duration: f32, easing: Easing) -> Self {
        Trajectory {
            start,
            target,
            duration: duration.max(1e-3),
            easing,
            elapsed: 0.0,
            progress: 0.0,
            last_safe: start,
            last_safe_progress: 0.0,
        }
    }

    /// Duration derived from the largest angular distance to travel.
    pub fn duration_for(start: &ArmJointMap<f32>, target: &ArmJointMap<f32>) -> f32 {
        let delta = start
            .zip_with(*target, |a, b| wrap_angle(b - a))
            .max_abs();
        (delta / DEFAULT_ANGULAR_SPEED).max(MIN_DURATION).min(MAX_DURATION)
    }

    fn angles_at(&self, raw_progress: f32) -> ArmJointMap<f32> {
        interpolate_angles(&self.start, &self.target, self.easing.apply(raw_progress))
    }
}

#[derive(Debug, Clone)]
pub enum MotionState {
    Idle,
    Animating(Trajectory),
    /// A blocking collision stopped the last motion; a fresh command is
    /// required to leave this state.
    Blocked,
}

/// What one executor tick amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionOutcome {
    Idle,
    Moving,
    /// The trajectory completed this tick.
    Finished,
    /// A blocking contact stopped the motion; the queue was cleared.
    Blocked { object: String },
}

/// A motion request made while a trajectory was in flight, waiting its
/// turn.
#[derive(Debug, Clone)]
struct PendingMotion {
    target: ArmJointMap<f32>,
    duration: Option<f32>,
}

pub struct MotionExecutor {
    pub state: MotionState,
    /// Pending high-level commands, drained one at a time when idle.
    pub queue: VecDeque<String>,
    /// Deferred motion requests, started in order as trajectories finish.
    pending: VecDeque<PendingMotion>,
}

impl MotionExecutor {
    pub fn new() -> Self {
        MotionExecutor {
            state: MotionState::Idle,
            queue: VecDeque::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.state, MotionState::Animating(_))
    }

    /// Begin animating toward `target` from the arm's current pose. A
    /// request made while a trajectory is in flight never interrupts it:
    /// it is deferred and started once the active trajectory (and any
    /// earlier deferred request) completes. A Blocked state is superseded
    /// immediately, since a fresh command is the way out of it.
    pub fn start(&mut self, arm: &ArmState, target: ArmJointMap<f32>, duration: Option<f32>) {
        if self.is_animating() {
            self.pending.push_back(PendingMotion { target, duration });
            return;
        }
        let start = arm.angles();
        let duration = duration.unwrap_or_else(|| Trajectory::duration_for(&start, &target));
        debug!("starting trajectory over {:.2}s", duration);
        self.state = MotionState::Animating(Trajectory::new(start, target, duration, Easing::CubicInOut));
    }

    /// Freeze in place: the queue and any deferred requests are dropped
    /// and the in-flight trajectory is abandoned where it stands.
    pub fn stop(&mut self) {
        self.queue.clear();
        self.pending.clear();
        self.state = MotionState::Idle;
    }

    /// Advance the animation by `dt`, applying pushes after every sub-step
    /// and rolling back if a sub-step produces a blocking contact.
    pub fn tick(
        &mut self,
        dt: f32,
        arm: &mut ArmState,
        world: &mut PhysicsWorld,
        rng: &mut impl Rng,
    ) -> MotionOutcome {
        let trajectory = match &mut self.state {
            MotionState::Idle => return MotionOutcome::Idle,
            MotionState::Blocked => return MotionOutcome::Idle,
            MotionState::Animating(t) => t,
        };

        trajectory.elapsed += dt;
        let new_progress = (trajectory.elapsed / trajectory.duration).min(1.0);
        let delta = new_progress - trajectory.progress;

        if delta > PROGRESS_EPSILON {
            let substeps = ((delta / MAX_PROGRESS_PER_SUBSTEP).ceil() as usize).max(2);

            for step in 1..=substeps {
                let p = trajectory.progress + delta * step as f32 / substeps as f32;
                arm.set_angles(trajectory.angles_at(p));
                push_objects(arm, world, rng);

                if let Some(object) = blocking_contact(arm, world) {
                    // Roll back roughly halfway between the last safe
                    // sub-step and the blocking one; if the midpoint is
                    // itself still in blocking contact, retreat all the
                    // way so the arm never comes to rest blocked.
                    let rollback = (trajectory.last_safe_progress + p) * 0.5;
                    arm.set_angles(trajectory.angles_at(rollback));
                    if blocking_contact(arm, world).is_some() {
                        arm.set_angles(trajectory.last_safe);
                    }
                    warn!("motion blocked by {}, rolled back", object);
                    self.queue.clear();
                    self.pending.clear();
                    self.state = MotionState::Blocked;
                    return MotionOutcome::Blocked { object };
                }

                trajectory.last_safe = arm.angles();
                trajectory.last_safe_progress = p;
            }
            trajectory.progress = new_progress;
        } else {
            trajectory.progress = new_progress;
        }

        if new_progress >= 1.0 {
            arm.set_angles(trajectory.target);
            self.state = MotionState::Idle;
            if let Some(next) = self.pending.pop_front() {
                self.start(arm, next.target, next.duration);
                return MotionOutcome::Moving;
            }
            return MotionOutcome::Finished;
        }
        MotionOutcome::Moving
    }
}
