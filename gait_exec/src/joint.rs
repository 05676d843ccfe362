//! # Joint identification
//!
//! The leg pair has four servo driven joints, one ankle and one knee per leg. Per-joint data is held
//! in a [`JointMap`], which can be indexed by [`Joint`] and is deserialised from tables keyed by
//! the joint names.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{fmt, ops::{Index, IndexMut}};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The number of joints on the leg pair.
pub const NUM_JOINTS: usize = 4;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A servo driven joint of the leg pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    /// First leg ankle
    Ankle1,

    /// First leg knee
    Knee1,

    /// Second leg knee
    Knee2,

    /// Second leg ankle
    Ankle2,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One value of `T` for each joint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointMap<T> {
    pub ankle1: T,
    pub knee1: T,
    pub knee2: T,
    pub ankle2: T,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Joint {
    /// All joints, in declaration order.
    pub const ALL: [Joint; NUM_JOINTS] = [Joint::Ankle1, Joint::Knee1, Joint::Knee2, Joint::Ankle2];

    /// Order in which joint demands are written to the servos each cycle.
    pub const WRITE_ORDER: [Joint; NUM_JOINTS] =
        [Joint::Knee1, Joint::Ankle2, Joint::Knee2, Joint::Ankle1];

    /// The name of the joint, as used in parameter files and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Joint::Ankle1 => "ankle1",
            Joint::Knee1 => "knee1",
            Joint::Knee2 => "knee2",
            Joint::Ankle2 => "ankle2",
        }
    }

    /// Index of the joint in [`Joint::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Joint::Ankle1 => 0,
            Joint::Knee1 => 1,
            Joint::Knee2 => 2,
            Joint::Ankle2 => 3,
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<T> JointMap<T> {
    /// Build a map by calling `f` for each joint.
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(Joint) -> T
    {
        Self {
            ankle1: f(Joint::Ankle1),
            knee1: f(Joint::Knee1),
            knee2: f(Joint::Knee2),
            ankle2: f(Joint::Ankle2),
        }
    }

    /// Iterate over `(joint, value)` pairs in [`Joint::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Joint, &T)> {
        Joint::ALL.iter().map(move |&j| (j, &self[j]))
    }
}

impl<T> Index<Joint> for JointMap<T> {
    type Output = T;

    fn index(&self, joint: Joint) -> &T {
        match joint {
            Joint::Ankle1 => &self.ankle1,
            Joint::Knee1 => &self.knee1,
            Joint::Knee2 => &self.knee2,
            Joint::Ankle2 => &self.ankle2,
        }
    }
}

impl<T> IndexMut<Joint> for JointMap<T> {
    fn index_mut(&mut self, joint: Joint) -> &mut T {
        match joint {
            Joint::Ankle1 => &mut self.ankle1,
            Joint::Knee1 => &mut self.knee1,
            Joint::Knee2 => &mut self.knee2,
            Joint::Ankle2 => &mut self.ankle2,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_joint_map_index() {
        let mut map = JointMap::from_fn(|j| j.index());

        for (i, joint) in Joint::ALL.iter().enumerate() {
            assert_eq!(map[*joint], i);
            assert_eq!(joint.index(), i);
        }

        map[Joint::Knee2] = 10;
        assert_eq!(map.knee2, 10);
    }

    #[test]
    fn test_write_order_covers_all_joints() {
        for joint in Joint::ALL.iter() {
            assert_eq!(Joint::WRITE_ORDER.iter().filter(|&j| j == joint).count(), 1);
        }
    }

    #[test]
    fn test_joint_map_deserialise() {
        let map: JointMap<u8> = util::params::parse(
            "ankle1 = 26\nknee1 = 13\nknee2 = 25\nankle2 = 12"
        ).unwrap();

        assert_eq!(map[Joint::Ankle1], 26);
        assert_eq!(map[Joint::Knee1], 13);
        assert_eq!(map[Joint::Knee2], 25);
        assert_eq!(map[Joint::Ankle2], 12);
    }
}
