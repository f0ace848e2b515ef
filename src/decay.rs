//! Staleness tracking for message-driven streams.
//!
//! Tracks last-arrival time per logical stream (e.g. per hand) and treats
//! values older than a timeout as zero/absent. Staleness overrides the
//! cached value lazily on read; nothing is purged eagerly and no timer
//! thread exists. Consumers must evaluate on every consumption tick,
//! because the absence of messages is itself the signal that must
//! propagate.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct DecayState<V> {
    last_message_time: Instant,
    current_value: V,
}

/// Per-stream last-value store with timeout-based decay.
///
/// Safe to update from transport callbacks while a consumer loop reads.
#[derive(Debug, Default)]
pub struct DecayMonitor<K, V> {
    streams: Mutex<HashMap<K, DecayState<V>>>,
}

impl<K, V> DecayMonitor<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Default,
{
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Record a message arrival for `stream` at `now`.
    pub fn record_message(&self, stream: K, value: V, now: Instant) {
        let mut streams = self.streams.lock().unwrap();
        streams.insert(
            stream,
            DecayState {
                last_message_time: now,
                current_value: value,
            },
        );
    }

    /// The stream's value if fresh, otherwise the type's zero value.
    pub fn effective_value(&self, stream: &K, now: Instant, timeout: Duration) -> V {
        self.fresh_value(stream, now, timeout).unwrap_or_default()
    }

    /// The stream's value if fresh, `None` when absent or stale.
    pub fn fresh_value(&self, stream: &K, now: Instant, timeout: Duration) -> Option<V> {
        let streams = self.streams.lock().unwrap();
        let state = streams.get(stream)?;
        if now.duration_since(state.last_message_time) <= timeout {
            Some(state.current_value.clone())
        } else {
            None
        }
    }

    /// Whether the stream has no fresh value.
    pub fn is_stale(&self, stream: &K, now: Instant, timeout: Duration) -> bool {
        self.fresh_value(stream, now, timeout).is_none()
    }

    /// Forget all streams. Used at session teardown.
    pub fn clear(&self) {
        self.streams.lock().unwrap().clear();
    }
}
