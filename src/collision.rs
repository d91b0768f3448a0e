//! Axis-aligned bounding box and segment geometry utilities shared by the
//! arm/object collision detector and the inter-object resolver.

use na::{Point3, Vector3};

/// Below this, overlaps and separation axes are treated as degenerate and
/// produce "no effect" rather than an error.
pub const GEOMETRY_EPSILON: f32 = 1e-5;

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub mins: Point3<f32>,
    pub maxs: Point3<f32>,
}

impl Aabb {
    pub fn new(mins: Point3<f32>, maxs: Point3<f32>) -> Self {
        Aabb { mins, maxs }
    }

    pub fn from_half_extents(center: Point3<f32>, half_extents: Vector3<f32>) -> Self {
        Aabb {
            mins: center - half_extents,
            maxs: center + half_extents,
        }
    }

    /// The smallest box containing all of the given points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f32>>) -> Option<Self> {
        let mut it = points.into_iter();
        let first = *it.next()?;
        let mut aabb = Aabb::new(first, first);
        for p in it {
            aabb.mins = Point3::new(
                aabb.mins.x.min(p.x),
                aabb.mins.y.min(p.y),
                aabb.mins.z.min(p.z),
            );
            aabb.maxs = Point3::new(
                aabb.maxs.x.max(p.x),
                aabb.maxs.y.max(p.y),
                aabb.maxs.z.max(p.z),
            );
        }
        Some(aabb)
    }

    pub fn center(&self) -> Point3<f32> {
        self.mins + (self.maxs - self.mins) * 0.5
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.mins.x < other.maxs.x
            && self.maxs.x > other.mins.x
            && self.mins.y < other.maxs.y
            && self.maxs.y > other.mins.y
            && self.mins.z < other.maxs.z
            && self.maxs.z > other.mins.z
    }
}

/// The minimum translation vector that moves `a` out of `b`, or `None` if
/// the boxes are disjoint (or the overlap is degenerate).
///
/// The returned vector is axis-aligned: the axis of least overlap, signed
/// so that translating `a` by it separates the boxes.
pub fn aabb_mtv(a: &Aabb, b: &Aabb) -> Option<Vector3<f32>> {
    let overlap_x = (a.maxs.x.min(b.maxs.x)) - (a.mins.x.max(b.mins.x));
    let overlap_y = (a.maxs.y.min(b.maxs.y)) - (a.mins.y.max(b.mins.y));
    let overlap_z = (a.maxs.z.min(b.maxs.z)) - (a.mins.z.max(b.mins.z));

    if overlap_x <= GEOMETRY_EPSILON || overlap_y <= GEOMETRY_EPSILON || overlap_z <= GEOMETRY_EPSILON
    {
        return None;
    }

    let ca = a.center();
    let cb = b.center();

    let mtv = if overlap_x <= overlap_y && overlap_x <= overlap_z {
        Vector3::new(overlap_x * (ca.x - cb.x).signum(), 0.0, 0.0)
    } else if overlap_y <= overlap_z {
        Vector3::new(0.0, overlap_y * (ca.y - cb.y).signum(), 0.0)
    } else {
        Vector3::new(0.0, 0.0, overlap_z * (ca.z - cb.z).signum())
    };

    Some(mtv)
}

/// The point on segment `ab` closest to `p`.
pub fn closest_point_on_segment(a: Point3<f32>, b: Point3<f32>, p: Point3<f32>) -> Point3<f32> {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < GEOMETRY_EPSILON {
        return a;
    }
    let t = ((p - a).dot(&ab) / len2).max(0.0).min(1.0);
    a + ab * t
}

/// Distance from `p` to segment `ab`.
pub fn point_segment_distance(a: Point3<f32>, b: Point3<f32>, p: Point3<f32>) -> f32 {
    (p - closest_point_on_segment(a, b, p)).norm()
}
