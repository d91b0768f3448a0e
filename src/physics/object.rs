//! The rigid objects the arm can manipulate.

use na::{Point3, UnitQuaternion, Vector3};

use crate::collision::Aabb;

/// Visual shape of a scene object. Collision uses a bounding-cube
/// approximation regardless of the visual shape; this is an intentional
/// simplification preserved from the original sandbox, not a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Cube,
    Cylinder,
    Sphere,
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Cube => "cube",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Sphere => "sphere",
        }
    }
}

/// Pose of a gripped object relative to the gripper frame, captured at the
/// moment the grip closed. While held, the object's world pose is
/// recomputed from the gripper's current frame composed with this.
#[derive(Debug, Clone, Copy)]
pub struct GripAttachment {
    pub local_offset: Vector3<f32>,
    pub local_orientation: UnitQuaternion<f32>,
}

/// A free-standing rigid object.
///
/// Owned exclusively by the [`super::PhysicsWorld`] arena; everything else
/// refers to it by arena index or name. `attachment` is a back-reference
/// to the gripper, never an owning one, and at most one object in the
/// world has it set.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub kind: ShapeKind,
    /// Edge length of the bounding cube, world units.
    pub size: f32,
    /// Center of the object.
    pub position: Point3<f32>,
    pub velocity: Vector3<f32>,
    pub orientation: UnitQuaternion<f32>,
    pub attachment: Option<GripAttachment>,
}

impl SceneObject {
    pub fn new(name: String, kind: ShapeKind, position: Point3<f32>, size: f32) -> Self {
        SceneObject {
            name,
            kind,
            size,
            position,
            velocity: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            attachment: None,
        }
    }

    pub fn half_size(&self) -> f32 {
        self.size * 0.5
    }

    pub fn is_gripped(&self) -> bool {
        self.attachment.is_some()
    }

    /// Whether the object rests on (or has sunk into) the floor plane.
    pub fn on_floor(&self) -> bool {
        self.position.z <= self.half_size() + FLOOR_CONTACT_EPSILON
    }

    /// Bounding cube, axis-aligned, regardless of visual shape.
    pub fn aabb(&self) -> Aabb {
        let h = self.half_size();
        Aabb::from_half_extents(self.position, Vector3::new(h, h, h))
    }
}

/// Slack below which "resting at half-size height" still counts as floor
/// contact, so slightly-sunk objects are floor-constrained too.
pub const FLOOR_CONTACT_EPSILON: f32 = 0.2;
