//! Per-object integration: gravity, drag, floor contact and friction.
//!
//! Semi-implicit Euler over fixed sub-steps; deliberately simple. There is
//! no rotational inertia and no mesh collision anywhere in this crate.

use crate::physics::object::SceneObject;

/// Gravity, world units (cm) per second squared.
pub const GRAVITY: f32 = 980.0;
/// Quadratic drag coefficient; damps fast motion much harder than slow.
pub const QUADRATIC_DRAG: f32 = 0.0015;
/// Plain linear damping per second.
pub const LINEAR_DAMPING: f32 = 0.08;
/// Impact speed above which a floor hit bounces instead of resting.
pub const BOUNCE_THRESHOLD: f32 = 80.0;
/// Restitution of a bouncing floor hit.
pub const RESTITUTION: f32 = 0.35;
/// Fraction of lateral velocity surviving a bounce, scaled by impact.
pub const IMPACT_FRICTION: f32 = 0.6;
/// Exponential sliding-friction rate for resting contact, per second.
pub const REST_FRICTION: f32 = 6.0;
/// Below this speed, velocity snaps to zero to stop resting jitter.
pub const SNAP_SPEED: f32 = 2.0;
/// Hard cap on object speed.
pub const MAX_SPEED: f32 = 400.0;

/// Advance one object by `dt`. Gripped objects are never integrated; the
/// gripper state machine owns their pose while held.
pub fn integrate_object(obj: &mut SceneObject, dt: f32) {
    obj.velocity.z -= GRAVITY * dt;

    // Quadratic drag plus linear damping.
    let speed = obj.velocity.norm();
    let drag = 1.0 / (1.0 + QUADRATIC_DRAG * speed * dt * 60.0);
    obj.velocity *= drag * (1.0 - LINEAR_DAMPING * dt).max(0.0);

    obj.position += obj.velocity * dt;

    let half = obj.half_size();
    if obj.position.z < half {
        obj.position.z = half;

        let impact = -obj.velocity.z;
        if impact > BOUNCE_THRESHOLD {
            obj.velocity.z = impact * RESTITUTION;
            // Harder impacts scrub off more lateral speed.
            let scrub = IMPACT_FRICTION * (BOUNCE_THRESHOLD / impact).min(1.0);
            obj.velocity.x *= scrub;
            obj.velocity.y *= scrub;
        } else {
            obj.velocity.z = 0.0;
            let friction = (-REST_FRICTION * dt).exp();
            obj.velocity.x *= friction;
            obj.velocity.y *= friction;
        }
    }

    if obj.velocity.norm() < SNAP_SPEED && obj.on_floor() {
        obj.velocity.x = 0.0;
        obj.velocity.y = 0.0;
        if obj.velocity.z.abs() < SNAP_SPEED {
            obj.velocity.z = 0.0;
        }
    }

    let speed = obj.velocity.norm();
    if speed > MAX_SPEED {
        obj.velocity *= MAX_SPEED / speed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::object::ShapeKind;
    use na::Point3;

    fn cube_at(z: f32) -> SceneObject {
        SceneObject::new("cube_1".into(), ShapeKind::Cube, Point3::new(0.0, 0.0, z), 4.0)
    }

    #[test]
    fn dropped_object_never_sinks_below_the_floor() {
        let mut obj = cube_at(120.0);
        for _ in 0..2000 {
            integrate_object(&mut obj, 1.0 / 240.0);
            assert!(obj.position.z >= obj.half_size() - 1e-3);
        }
        // And it has come to rest exactly on the floor.
        assert!((obj.position.z - obj.half_size()).abs() < 1e-2);
        assert!(obj.velocity.norm() < SNAP_SPEED);
    }

    #[test]
    fn fast_impact_bounces_with_restitution() {
        let mut obj = cube_at(2.5);
        obj.velocity.z = -200.0;
        integrate_object(&mut obj, 1.0 / 240.0);
        assert!(obj.velocity.z > 0.0);
        assert!(obj.velocity.z < 200.0 * RESTITUTION * 1.1);
    }

    #[test]
    fn resting_object_slides_to_a_stop() {
        let mut obj = cube_at(2.0);
        obj.velocity.x = 60.0;
        for _ in 0..1000 {
            integrate_object(&mut obj, 1.0 / 240.0);
        }
        assert_eq!(obj.velocity.x, 0.0);
    }

    #[test]
    fn speed_is_clamped() {
        let mut obj = cube_at(200.0);
        obj.velocity.x = 10_000.0;
        integrate_object(&mut obj, 1.0 / 240.0);
        assert!(obj.velocity.norm() <= MAX_SPEED + 1e-3);
    }
}
