//! Iterative pairwise separation between scene objects.
//!
//! Every overlapping pair gets a minimum-translation-vector correction and
//! a velocity impulse, split between the two bodies depending on which of
//! them is floor-constrained (or gripped) and whether the contact is a
//! vertical stack or a horizontal shove. This is intentionally *not* a
//! constraint solver: it is an order-dependent approximation that behaves
//! well for the handful of objects the sandbox deals with.

use generational_arena::Index;

use crate::collision::aabb_mtv;
use crate::physics::PhysicsWorld;

/// Passes over all pairs per tick. More passes settle stacks better.
pub const RESOLVE_ITERATIONS: usize = 4;
/// |axis.z| above which a contact counts as vertical stacking.
pub const STACK_AXIS_THRESHOLD: f32 = 0.7;
/// Fraction of an MTV applied as positional correction per pass.
pub const CORRECTION_FACTOR: f32 = 0.8;
/// Velocity impulse per unit of penetration depth.
pub const IMPULSE_PER_UNIT_DEPTH: f32 = 12.0;
/// Lateral damping applied to the upper body of a stack per pass.
pub const STACK_FRICTION: f32 = 0.85;

pub fn resolve_pairs(world: &mut PhysicsWorld) {
    let ids: Vec<Index> = world.objects.iter().map(|(i, _)| i).collect();

    for _ in 0..RESOLVE_ITERATIONS {
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                resolve_pair(world, ids[i], ids[j]);
            }
        }
    }
}

fn resolve_pair(world: &mut PhysicsWorld, ia: Index, ib: Index) {
    let (a, b) = match world.objects.get2_mut(ia, ib) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };

    // MTV that moves `a` out of `b`.
    let mtv = match aabb_mtv(&a.aabb(), &b.aabb()) {
        Some(mtv) => mtv,
        None => return,
    };
    let depth = mtv.norm();
    let axis = mtv / depth;

    // A gripped object rides with the arm and never yields; the other body
    // takes the whole correction. Otherwise split by stacking role: the
    // supported (upper) body moves, its support stays put.
    let vertical = axis.z.abs() > STACK_AXIS_THRESHOLD;
    let (weight_a, weight_b) = if a.is_gripped() {
        (0.0, 1.0)
    } else if b.is_gripped() {
        (1.0, 0.0)
    } else if vertical {
        if axis.z > 0.0 {
            // `a` sits on top of `b`.
            if b.on_floor() {
                (1.0, 0.0)
            } else {
                (0.8, 0.2)
            }
        } else if a.on_floor() {
            (0.0, 1.0)
        } else {
            (0.2, 0.8)
        }
    } else {
        (0.5, 0.5)
    };

    let correction = mtv * CORRECTION_FACTOR;
    a.position += correction * weight_a;
    b.position -= correction * weight_b;

    // Keep floor-constrained corrections honest.
    a.position.z = a.position.z.max(a.half_size());
    b.position.z = b.position.z.max(b.half_size());

    // Separating impulse along the axis, plus a kill of any approach
    // velocity so the pair does not immediately re-penetrate.
    let relative = a.velocity - b.velocity;
    let approach = relative.dot(&axis);
    if approach < 0.0 {
        let impulse = axis * (-approach * 0.5 + depth * IMPULSE_PER_UNIT_DEPTH * 0.1);
        a.velocity += impulse * weight_a;
        b.velocity -= impulse * weight_b;
    } else {
        let impulse = axis * depth * IMPULSE_PER_UNIT_DEPTH;
        a.velocity += impulse * weight_a * 0.1;
        b.velocity -= impulse * weight_b * 0.1;
    }

    // The upper body of a stack gets friction-damped laterally so stacks
    // settle instead of sliding apart.
    if vertical {
        let upper = if axis.z > 0.0 { a } else { b };
        upper.velocity.x *= STACK_FRICTION;
        upper.velocity.y *= STACK_FRICTION;
        if upper.velocity.z < 0.0 {
            upper.velocity.z = 0.0;
        }
    }
}
