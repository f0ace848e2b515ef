//! Binary codec for pose snapshots.
//!
//! Fixed little-endian layout, no padding, no compression:
//! `i32 joint_count`, then per joint `i32 id`, `3xf32 position`,
//! `4xf32 orientation (x, y, z, w)`. Total size is
//! `4 + joint_count * 32` bytes, well under typical channel chunking for
//! a 20-70 joint skeleton.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::errors::{PoseLinkError, Result};
use crate::pose::{JointPose, PoseSnapshot};

/// Size of the leading joint-count field.
pub const HEADER_SIZE: usize = 4;

/// Wire size of one joint record.
pub const JOINT_RECORD_SIZE: usize = 32;

/// Encoded size of a snapshot with `joint_count` joints.
pub fn encoded_len(joint_count: usize) -> usize {
    HEADER_SIZE + joint_count * JOINT_RECORD_SIZE
}

/// Encode a snapshot into its wire form. Total and deterministic.
pub fn encode(snapshot: &PoseSnapshot) -> Bytes {
    let mut buf = BytesMut::with_capacity(encoded_len(snapshot.joint_count()));
    buf.put_i32_le(snapshot.joint_count() as i32);
    for joint in &snapshot.joints {
        buf.put_i32_le(joint.id);
        for p in joint.position {
            buf.put_f32_le(p);
        }
        for q in joint.orientation {
            buf.put_f32_le(q);
        }
    }
    buf.freeze()
}

/// Decode a wire buffer into a snapshot.
///
/// Fails with `TruncatedBuffer` when fewer bytes remain than the declared
/// joint count requires, and with `InvalidJointCount` for a negative
/// count. Matching the count against the session's expected skeleton size
/// is the caller's responsibility.
pub fn decode(buf: &[u8]) -> Result<PoseSnapshot> {
    let total = buf.len();
    let mut buf = buf;

    if buf.remaining() < HEADER_SIZE {
        return Err(PoseLinkError::TruncatedBuffer {
            expected: HEADER_SIZE,
            actual: total,
        });
    }

    let declared = buf.get_i32_le();
    if declared < 0 {
        return Err(PoseLinkError::InvalidJointCount(declared));
    }

    let count = declared as usize;
    let expected = encoded_len(count);
    if total < expected {
        return Err(PoseLinkError::TruncatedBuffer {
            expected,
            actual: total,
        });
    }

    let mut joints = Vec::with_capacity(count);
    for _ in 0..count {
        let id = buf.get_i32_le();
        let position = [buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le()];
        let orientation = [
            buf.get_f32_le(),
            buf.get_f32_le(),
            buf.get_f32_le(),
            buf.get_f32_le(),
        ];
        joints.push(JointPose {
            id,
            position,
            orientation,
        });
    }

    Ok(PoseSnapshot { joints })
}
