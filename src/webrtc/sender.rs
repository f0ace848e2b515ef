//! Rate-gated pose sender.
//!
//! A fixed-frequency loop drains the mailbox and writes to the pose
//! channel only while the channel's buffered-byte count is below the
//! high-water mark. Under congestion the tick is skipped entirely; the
//! mailbox keeps the newest snapshot, which a fresher `put` may replace
//! before the next tick. Retrying stale pose data would grow latency
//! without bound, so superseded snapshots are simply dropped.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::MissedTickBehavior;

use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;

use crate::config::SenderConfig;
use crate::errors::{PoseLinkError, Result};
use crate::pose::PoseMailbox;

/// Send half of the pose channel, as seen by the sender loop.
///
/// Production wraps an open data channel; tests inject a mock.
pub trait PoseTransport: Send + Sync {
    /// Bytes currently queued in the transport's send buffer.
    fn buffered_amount(&self) -> impl Future<Output = usize> + Send;

    /// Enqueue one snapshot. Non-blocking from the caller's view: the
    /// payload either enters the transport buffer or the channel is gone.
    fn send(&self, payload: &Bytes) -> impl Future<Output = Result<usize>> + Send;
}

/// Pose transport backed by a webrtc data channel.
pub struct DataChannelTransport {
    channel: Arc<RTCDataChannel>,
}

impl DataChannelTransport {
    pub fn new(channel: Arc<RTCDataChannel>) -> Self {
        Self { channel }
    }
}

impl PoseTransport for DataChannelTransport {
    async fn buffered_amount(&self) -> usize {
        self.channel.buffered_amount().await
    }

    async fn send(&self, payload: &Bytes) -> Result<usize> {
        if self.channel.ready_state() != RTCDataChannelState::Open {
            return Err(PoseLinkError::ChannelClosed(
                self.channel.label().to_string(),
            ));
        }
        self.channel
            .send(payload)
            .await
            .map_err(|e| PoseLinkError::ChannelClosed(format!("{}: {}", self.channel.label(), e)))
    }
}

/// What one sender tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Mailbox was empty.
    Idle,
    /// Buffered bytes at or above the high-water mark; nothing consumed.
    Deferred,
    /// One snapshot handed to the transport.
    Sent(usize),
}

/// Fixed-rate, congestion-gated drain of the pose mailbox.
pub struct PoseSender {
    mailbox: Arc<PoseMailbox>,
    period: Duration,
    high_water_mark: usize,
    stop: Arc<AtomicBool>,
    sends: AtomicU64,
    deferrals: AtomicU64,
}

impl PoseSender {
    pub fn new(mailbox: Arc<PoseMailbox>, config: &SenderConfig, stop: Arc<AtomicBool>) -> Self {
        Self {
            mailbox,
            period: Duration::from_secs_f32(1.0 / config.send_rate_hz),
            high_water_mark: config.high_water_mark_bytes,
            stop,
            sends: AtomicU64::new(0),
            deferrals: AtomicU64::new(0),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Snapshots handed to the transport so far.
    pub fn sends(&self) -> u64 {
        self.sends.load(Ordering::Relaxed)
    }

    /// Ticks skipped because of congestion so far.
    pub fn deferrals(&self) -> u64 {
        self.deferrals.load(Ordering::Relaxed)
    }

    /// One tick of the gating discipline.
    ///
    /// The congestion check runs before the mailbox is drained, so a
    /// deferred tick leaves the newest snapshot in place for the next
    /// one. Congestion is a scheduling outcome, never an error; only a
    /// dead channel produces `Err`.
    pub async fn tick_once<T: PoseTransport>(&self, transport: &T) -> Result<TickOutcome> {
        let buffered = transport.buffered_amount().await;
        if buffered >= self.high_water_mark {
            self.deferrals.fetch_add(1, Ordering::Relaxed);
            log::trace!(
                "pose send deferred: {} bytes buffered (high-water mark {})",
                buffered,
                self.high_water_mark
            );
            return Ok(TickOutcome::Deferred);
        }

        let Some(payload) = self.mailbox.take() else {
            return Ok(TickOutcome::Idle);
        };

        let sent = transport.send(&payload).await?;
        self.sends.fetch_add(1, Ordering::Relaxed);
        Ok(TickOutcome::Sent(sent))
    }

    /// Run ticks at the configured period until the stop flag is set or
    /// the transport dies. Send failures terminate the loop and are
    /// returned to the caller; they are not retried here.
    pub async fn run<T: PoseTransport>(&self, transport: T) -> Result<()> {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!(
            "pose sender running at {:.1} Hz (high-water mark {} bytes)",
            1.0 / self.period.as_secs_f32(),
            self.high_water_mark
        );

        loop {
            ticker.tick().await;
            if self.stop.load(Ordering::SeqCst) {
                log::info!("pose sender stopped after {} sends", self.sends());
                return Ok(());
            }
            if let Err(e) = self.tick_once(&transport).await {
                log::warn!("pose sender terminating: {}", e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockTransport {
        buffered: AtomicUsize,
        sent: Mutex<Vec<Bytes>>,
        closed: AtomicBool,
    }

    impl PoseTransport for MockTransport {
        async fn buffered_amount(&self) -> usize {
            self.buffered.load(Ordering::SeqCst)
        }

        async fn send(&self, payload: &Bytes) -> Result<usize> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(PoseLinkError::ChannelClosed("body_pose".to_string()));
            }
            self.sent.lock().unwrap().push(payload.clone());
            Ok(payload.len())
        }
    }

    fn sender_parts() -> (Arc<PoseMailbox>, PoseSender, Arc<AtomicBool>) {
        let mailbox = Arc::new(PoseMailbox::new());
        let stop = Arc::new(AtomicBool::new(false));
        let config = SenderConfig {
            send_rate_hz: 90.0,
            high_water_mark_bytes: 1024,
        };
        let sender = PoseSender::new(Arc::clone(&mailbox), &config, Arc::clone(&stop));
        (mailbox, sender, stop)
    }

    #[tokio::test]
    async fn test_empty_mailbox_tick_is_idle() {
        let (_mailbox, sender, _stop) = sender_parts();
        let transport = MockTransport::default();

        assert_eq!(sender.tick_once(&transport).await.unwrap(), TickOutcome::Idle);
        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(sender.sends(), 0);
    }

    #[tokio::test]
    async fn test_congested_tick_defers_without_consuming() {
        let (mailbox, sender, _stop) = sender_parts();
        let transport = MockTransport::default();
        transport.buffered.store(1024, Ordering::SeqCst);

        mailbox.put(Bytes::from_static(b"snapshot"));
        assert_eq!(
            sender.tick_once(&transport).await.unwrap(),
            TickOutcome::Deferred
        );
        assert!(transport.sent.lock().unwrap().is_empty());
        // The snapshot is still pending, available to the next tick.
        assert!(!mailbox.is_empty());
        assert_eq!(sender.deferrals(), 1);
    }

    #[tokio::test]
    async fn test_deferred_value_superseded_by_newer_put() {
        let (mailbox, sender, _stop) = sender_parts();
        let transport = MockTransport::default();

        transport.buffered.store(4096, Ordering::SeqCst);
        mailbox.put(Bytes::from_static(b"old"));
        assert_eq!(
            sender.tick_once(&transport).await.unwrap(),
            TickOutcome::Deferred
        );

        mailbox.put(Bytes::from_static(b"new"));
        transport.buffered.store(0, Ordering::SeqCst);
        assert_eq!(
            sender.tick_once(&transport).await.unwrap(),
            TickOutcome::Sent(3)
        );

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[Bytes::from_static(b"new")]);
    }

    #[tokio::test]
    async fn test_two_puts_one_send_with_second_payload() {
        let (mailbox, sender, _stop) = sender_parts();
        let transport = MockTransport::default();

        mailbox.put(Bytes::from_static(b"first"));
        mailbox.put(Bytes::from_static(b"second"));

        assert_eq!(
            sender.tick_once(&transport).await.unwrap(),
            TickOutcome::Sent(6)
        );
        assert_eq!(sender.tick_once(&transport).await.unwrap(), TickOutcome::Idle);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[Bytes::from_static(b"second")]);
    }

    #[tokio::test]
    async fn test_send_failure_terminates_run() {
        let (mailbox, sender, _stop) = sender_parts();
        let transport = MockTransport::default();
        transport.closed.store(true, Ordering::SeqCst);

        mailbox.put(Bytes::from_static(b"doomed"));
        let err = sender.run(transport).await.unwrap_err();
        assert!(matches!(err, PoseLinkError::ChannelClosed(_)));
    }

    #[tokio::test]
    async fn test_stop_flag_ends_run_cleanly() {
        let (mailbox, sender, stop) = sender_parts();
        mailbox.put(Bytes::from_static(b"snapshot"));

        stop.store(true, Ordering::SeqCst);
        sender.run(MockTransport::default()).await.unwrap();
        // Stop was observed at the tick boundary; nothing was drained.
        assert!(!mailbox.is_empty());
    }
}
