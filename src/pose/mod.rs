//! Skeletal pose snapshots and their transport plumbing.
//!
//! A snapshot is one full capture of all tracked joints at one instant.
//! The joint set and its ordering are fixed for the lifetime of a session;
//! a count change on the receiving side signals a configuration change,
//! not a corrupt packet.

pub mod codec;
pub mod mailbox;
pub mod receiver;

pub use codec::{decode, encode, encoded_len, HEADER_SIZE, JOINT_RECORD_SIZE};
pub use mailbox::PoseMailbox;
pub use receiver::PoseStreamReceiver;

/// One tracked joint: identifier, position, and unit-quaternion
/// orientation (x, y, z, w).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub id: i32,
    pub position: [f32; 3],
    pub orientation: [f32; 4],
}

impl JointPose {
    /// Joint at the origin with an identity rotation.
    pub fn identity(id: i32) -> Self {
        Self {
            id,
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// One full capture of all tracked joints.
///
/// Capture time is implicit; it is assigned at send time and never stored
/// on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseSnapshot {
    pub joints: Vec<JointPose>,
}

impl PoseSnapshot {
    pub fn new(joints: Vec<JointPose>) -> Self {
        Self { joints }
    }

    /// Snapshot of `count` identity joints with ids `0..count`.
    pub fn identity(count: usize) -> Self {
        Self {
            joints: (0..count as i32).map(JointPose::identity).collect(),
        }
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_snapshot() {
        let snapshot = PoseSnapshot::identity(24);
        assert_eq!(snapshot.joint_count(), 24);
        assert_eq!(snapshot.joints[0].id, 0);
        assert_eq!(snapshot.joints[23].id, 23);
        assert_eq!(snapshot.joints[5].orientation, [0.0, 0.0, 0.0, 1.0]);
    }
}
