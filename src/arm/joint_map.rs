//! A module containing a small struct that makes interactions with the
//! standard arm's joints a bit easier than raw numerical indices.

use na::{Scalar, VectorN, U5};
use std::convert::TryFrom;

pub type Vector5<N> = VectorN<N, U5>;

#[derive(Debug)]
pub struct WrongLengthError;

/// A struct with one entry for every motorized joint of the arm,
/// in kinematic-chain order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmJointMap<T> {
    pub base: T,
    pub shoulder: T,
    pub elbow: T,
    pub wrist: T,
    pub wrist_roll: T,
}

impl<T> ArmJointMap<T> {
    pub fn to_array(self) -> [T; 5] {
        [self.base, self.shoulder, self.elbow, self.wrist, self.wrist_roll]
    }

    /// Combine two joint maps entry-wise.
    pub fn zip_with<U, V>(self, other: ArmJointMap<U>, mut f: impl FnMut(T, U) -> V) -> ArmJointMap<V> {
        ArmJointMap {
            base: f(self.base, other.base),
            shoulder: f(self.shoulder, other.shoulder),
            elbow: f(self.elbow, other.elbow),
            wrist: f(self.wrist, other.wrist),
            wrist_roll: f(self.wrist_roll, other.wrist_roll),
        }
    }
}

impl ArmJointMap<f32> {
    pub const ZERO: ArmJointMap<f32> = ArmJointMap {
        base: 0.0,
        shoulder: 0.0,
        elbow: 0.0,
        wrist: 0.0,
        wrist_roll: 0.0,
    };

    /// The largest absolute entry, useful as a "how far apart are these
    /// two angle sets" metric when applied to a difference.
    pub fn max_abs(&self) -> f32 {
        self.base
            .abs()
            .max(self.shoulder.abs())
            .max(self.elbow.abs())
            .max(self.wrist.abs())
            .max(self.wrist_roll.abs())
    }
}

impl<T> From<[T; 5]> for ArmJointMap<T> {
    fn from(v: [T; 5]) -> Self {
        let [base, shoulder, elbow, wrist, wrist_roll] = v;
        ArmJointMap {
            base,
            shoulder,
            elbow,
            wrist,
            wrist_roll,
        }
    }
}

impl<N: Scalar + Copy> From<Vector5<N>> for ArmJointMap<N> {
    fn from(v: Vector5<N>) -> Self {
        ArmJointMap {
            base: v[0],
            shoulder: v[1],
            elbow: v[2],
            wrist: v[3],
            wrist_roll: v[4],
        }
    }
}

impl<N: Scalar + Copy> Into<Vector5<N>> for ArmJointMap<N> {
    fn into(self) -> Vector5<N> {
        Vector5::<N>::from_row_slice(&[
            self.base,
            self.shoulder,
            self.elbow,
            self.wrist,
            self.wrist_roll,
        ])
    }
}

impl<T: Clone> TryFrom<&[T]> for ArmJointMap<T> {
    type Error = WrongLengthError;

    fn try_from(value: &[T]) -> Result<Self, WrongLengthError> {
        if value.len() == 5 {
            Ok(Self {
                base: value[0].clone(),
                shoulder: value[1].clone(),
                elbow: value[2].clone(),
                wrist: value[3].clone(),
                wrist_roll: value[4].clone(),
            })
        } else {
            Err(WrongLengthError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_round_trip() {
        let m = ArmJointMap::from([1.0f32, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(m.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(m.wrist, 4.0);
    }

    #[test]
    fn max_abs_picks_largest_magnitude() {
        let m = ArmJointMap::from([0.1f32, -2.5, 1.0, 0.0, 2.0]);
        assert_eq!(m.max_abs(), 2.5);
    }

    #[test]
    fn slice_of_wrong_length_is_rejected() {
        let v = [1.0f32, 2.0, 3.0];
        assert!(ArmJointMap::try_from(&v[..]).is_err());
    }
}
