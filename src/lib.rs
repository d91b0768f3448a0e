//! A headless sandbox in which a five-joint robotic arm manipulates loose
//! rigid objects: analytic inverse kinematics, collision-aware joint-space
//! animation, and a small rigid-body layer for falling/sliding/stacked
//! objects. Rendering, command parsing and the like live elsewhere and talk
//! to this crate through [`simulation::Simulation`].

pub mod arm;
pub mod arm_collision;
pub mod collision;
pub mod gripper;
pub mod inverse_kinematics;
pub mod kinematics;
pub mod motion;
pub mod physics;
pub mod simulation;

extern crate nalgebra as na;
