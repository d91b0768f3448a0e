//! The top-level simulation state and the boundary operations the command
//! and rendering layers drive it through.
//!
//! Everything is single-threaded and cooperative: one external per-frame
//! call to [`Simulation::tick`] advances the motion executor (all sub-steps
//! and pushes), then the gripper animation, then the free-object
//! integrator and resolver. The order is fixed so that the blocking rule
//! always sees up-to-date arm geometry.

use log::warn;
use na::Point3;
use rand::rngs::ThreadRng;
use thiserror::Error;

use crate::arm::{ArmJointMap, ArmState};
use crate::arm_collision::push_objects;
use crate::gripper::{GripEvent, Gripper};
use crate::inverse_kinematics::{solve_ik, IkError, IkSolution};
use crate::motion::{MotionExecutor, MotionOutcome};
use crate::physics::object::ShapeKind;
use crate::physics::PhysicsWorld;

/// Spawnable object sizes, millimeters.
pub const MIN_OBJECT_SIZE_MM: f32 = 10.0;
pub const MAX_OBJECT_SIZE_MM: f32 = 150.0;

/// World units per millimeter (the world is scaled at 100 units per meter).
pub const UNITS_PER_MM: f32 = 0.1;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpawnError {
    #[error("invalid size {size_mm} mm: must be between {MIN_OBJECT_SIZE_MM} and {MAX_OBJECT_SIZE_MM} mm")]
    InvalidSize { size_mm: f32 },
    #[error("spawn position unreachable: {reason}")]
    Unreachable { reason: IkError },
}

/// Everything that happened during one tick that the outside world may
/// care about: a finished motion (and the next queued command to
/// dispatch), a blocking collision, a grip or release.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickEvents {
    /// Set when an animation finished this tick and a queued command is
    /// ready: the command layer should dispatch it.
    pub next_command: Option<String>,
    /// Human-readable error when a blocking collision stopped the motion.
    /// The command queue (and any running program) has been discarded.
    pub collision_error: Option<String>,
    pub grip_event: Option<GripEvent>,
}

/// The one owner of all mutable simulation state: arm kinematics, the
/// object world, the motion executor and the grip state machine.
pub struct Simulation {
    pub arm: ArmState,
    pub world: PhysicsWorld,
    pub motion: MotionExecutor,
    pub gripper: Gripper,
    rng: ThreadRng,
}

impl Simulation {
    pub fn new() -> Self {
        Simulation {
            arm: ArmState::new(),
            world: PhysicsWorld::new(),
            motion: MotionExecutor::new(),
            gripper: Gripper::new(),
            rng: rand::thread_rng(),
        }
    }

    /// Advance the whole simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> TickEvents {
        let mut events = TickEvents::default();

        match self.motion.tick(dt, &mut self.arm, &mut self.world, &mut self.rng) {
            MotionOutcome::Blocked { object } => {
                events.collision_error = Some(format!(
                    "collision with {}: motion stopped, queued commands discarded",
                    object
                ));
            }
            MotionOutcome::Finished => {
                events.next_command = self.motion.queue.pop_front();
            }
            MotionOutcome::Idle => {
                // Even a stationary arm keeps objects pushed out of it,
                // e.g. when something falls onto a link.
                push_objects(&self.arm, &mut self.world, &mut self.rng);
            }
            MotionOutcome::Moving => {}
        }

        events.grip_event = self.gripper.tick(dt, &mut self.arm, &mut self.world);

        self.world.step(dt);

        events
    }

    /// Set the four primary joint angles, degrees. Values outside the
    /// joint limits are clamped, never rejected. With `animated` the
    /// angles become a trajectory target; a request made while a motion
    /// is in flight runs after it. An instant set (used for loading
    /// saved positions) aborts any running motion.
    pub fn set_joint_angles(&mut self, base: f32, shoulder: f32, elbow: f32, wrist: f32, animated: bool) {
        let target = self.arm.clamp_angles(ArmJointMap {
            base: base.to_radians(),
            shoulder: shoulder.to_radians(),
            elbow: elbow.to_radians(),
            wrist: wrist.to_radians(),
            wrist_roll: self.arm.angles().wrist_roll,
        });

        if animated {
            self.motion.start(&self.arm, target, None);
        } else {
            self.motion.stop();
            self.arm.set_angles(target);
        }
    }

    /// Set the wrist-roll joint, degrees.
    pub fn set_wrist_roll(&mut self, degrees: f32, animated: bool) {
        let mut target = self.arm.angles();
        target.wrist_roll = degrees.to_radians();
        let target = self.arm.clamp_angles(target);
        if animated {
            self.motion.start(&self.arm, target, None);
        } else {
            self.motion.stop();
            self.arm.set_angles(target);
        }
    }

    /// Solve for the target and start an animated motion toward it.
    pub fn move_to(&mut self, x: f32, y: f32, z: f32) -> Result<IkSolution, IkError> {
        let solution = solve_ik(x, y, z)?;
        self.set_joint_angles(
            solution.base,
            solution.shoulder,
            solution.elbow,
            solution.wrist,
            true,
        );
        Ok(solution)
    }

    pub fn set_gripper_openness(&mut self, percent: f32, animated: bool) -> Option<GripEvent> {
        self.gripper
            .set_target(&mut self.arm, &mut self.world, percent, animated)
    }

    pub fn gripper_openness(&self) -> f32 {
        self.arm.gripper_openness
    }

    pub fn end_effector_position(&self) -> Point3<f32> {
        self.arm.end_effector_position()
    }

    /// Spawn an object with its base at `(x, y, z)`. The position must be
    /// reachable by the effector and the size within bounds; overlap with
    /// existing objects is resolved by stacking the newcomer on top.
    pub fn spawn_object(
        &mut self,
        kind: ShapeKind,
        x: f32,
        y: f32,
        z: f32,
        size_mm: f32,
    ) -> Result<String, SpawnError> {
        if !(MIN_OBJECT_SIZE_MM..=MAX_OBJECT_SIZE_MM).contains(&size_mm) || !size_mm.is_finite() {
            return Err(SpawnError::InvalidSize { size_mm });
        }
        let size = size_mm * UNITS_PER_MM;

        if let Err(reason) = solve_ik(x, y, z.max(0.0)) {
            return Err(SpawnError::Unreachable { reason });
        }

        let mut center = Point3::new(x, y, z.max(0.0) + size * 0.5);

        // Collision-checked placement: climb on top of anything occupying
        // the spot. A handful of passes is plenty for sane scenes.
        for _ in 0..8 {
            let candidate = crate::collision::Aabb::from_half_extents(
                center,
                na::Vector3::new(size * 0.5, size * 0.5, size * 0.5),
            );
            let bump = self
                .world
                .objects
                .iter()
                .filter(|(_, o)| o.aabb().intersects(&candidate))
                .map(|(_, o)| o.aabb().maxs.z)
                .fold(None, |acc: Option<f32>, top| {
                    Some(acc.map_or(top, |a| a.max(top)))
                });
            match bump {
                Some(top) => center.z = top + size * 0.5,
                None => break,
            }
        }

        let idx = self.world.spawn(kind, center, size);
        Ok(self.world.objects[idx].name.clone())
    }

    /// Remove one object by name. Removing the held object clears the grip.
    pub fn remove_object(&mut self, name: &str) -> bool {
        if let Some(held) = self.world.gripped_object() {
            if self
                .world
                .objects
                .get(held)
                .map_or(false, |o| o.name == name)
            {
                self.gripper.state = crate::gripper::GripState::Idle;
            }
        }
        self.world.remove_by_name(name).is_some()
    }

    pub fn remove_all_objects(&mut self) {
        self.gripper.state = crate::gripper::GripState::Idle;
        self.world.clear();
    }

    /// Append a high-level command to be dispatched when the current
    /// animation finishes.
    pub fn enqueue_command(&mut self, command: String) {
        self.motion.queue.push_back(command);
    }

    /// Stop: discard the queue and freeze the arm where it is.
    pub fn stop(&mut self) {
        if self.motion.is_animating() {
            warn!("stop requested mid-animation");
        }
        self.motion.stop();
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}
