//! Single-slot mailbox between the pose producer and the sender loop.
//!
//! Holds at most one encoded snapshot. A write always replaces any
//! unconsumed previous value; no FIFO ordering is kept, and superseded
//! data is dropped silently. Because only the newest unsent snapshot is
//! ever retained, end-to-end pose latency is bounded by one sender period
//! plus network delay no matter how fast the producer runs.

use std::sync::Mutex;

use bytes::Bytes;

/// Overwrite-on-write slot for the newest encoded pose snapshot.
///
/// Safe for one concurrent writer and one concurrent reader. The lock is
/// held only for the slot swap; serialization happens on the producer
/// side before `put`.
#[derive(Debug, Default)]
pub struct PoseMailbox {
    slot: Mutex<Option<Bytes>>,
}

impl PoseMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any pending value with `payload`. Non-blocking, O(1).
    pub fn put(&self, payload: Bytes) {
        let mut slot = self.slot.lock().unwrap();
        *slot = Some(payload);
    }

    /// Remove and return the pending value, if any.
    pub fn take(&self) -> Option<Bytes> {
        let mut slot = self.slot.lock().unwrap();
        slot.take()
    }

    /// Discard any pending value. Used at session teardown.
    pub fn clear(&self) {
        let mut slot = self.slot.lock().unwrap();
        *slot = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().unwrap().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_overwrites() {
        let mailbox = PoseMailbox::new();
        mailbox.put(Bytes::from_static(b"first"));
        mailbox.put(Bytes::from_static(b"second"));

        assert_eq!(mailbox.take(), Some(Bytes::from_static(b"second")));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_empty_take() {
        let mailbox = PoseMailbox::new();
        assert!(mailbox.is_empty());
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_clear() {
        let mailbox = PoseMailbox::new();
        mailbox.put(Bytes::from_static(b"pending"));
        mailbox.clear();
        assert!(mailbox.is_empty());
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_concurrent_writer_and_reader() {
        use std::sync::Arc;
        use std::thread;

        let mailbox = Arc::new(PoseMailbox::new());
        let writer_box = Arc::clone(&mailbox);

        let writer = thread::spawn(move || {
            for i in 0..10_000u32 {
                writer_box.put(Bytes::copy_from_slice(&i.to_le_bytes()));
            }
        });

        let mut last_seen = 0u32;
        while !writer.is_finished() {
            if let Some(payload) = mailbox.take() {
                let value = u32::from_le_bytes(payload[..4].try_into().unwrap());
                // Values only ever move forward: older puts are superseded.
                assert!(value >= last_seen);
                last_seen = value;
            }
        }
        writer.join().unwrap();
    }
}
