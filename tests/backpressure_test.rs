//! End-to-end tests of the mailbox + rate-gated sender discipline
//! against a mock transport.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

use poselink::config::SenderConfig;
use poselink::pose::PoseMailbox;
use poselink::webrtc::{PoseSender, PoseTransport, TickOutcome};
use poselink::{PoseLinkError, Result};

#[derive(Default)]
struct MockChannel {
    buffered: AtomicUsize,
    sent: Mutex<Vec<Bytes>>,
    closed: AtomicBool,
}

impl PoseTransport for MockChannel {
    fn buffered_amount(&self) -> impl Future<Output = usize> + Send {
        let buffered = self.buffered.load(Ordering::SeqCst);
        async move { buffered }
    }

    fn send(&self, payload: &Bytes) -> impl Future<Output = Result<usize>> + Send {
        let result = if self.closed.load(Ordering::SeqCst) {
            Err(PoseLinkError::ChannelClosed("body_pose".to_string()))
        } else {
            self.sent.lock().unwrap().push(payload.clone());
            Ok(payload.len())
        };
        async move { result }
    }
}

fn pipeline(high_water_mark: usize) -> (Arc<PoseMailbox>, PoseSender, Arc<AtomicBool>) {
    let mailbox = Arc::new(PoseMailbox::new());
    let stop = Arc::new(AtomicBool::new(false));
    let sender = PoseSender::new(
        Arc::clone(&mailbox),
        &SenderConfig {
            send_rate_hz: 500.0,
            high_water_mark_bytes: high_water_mark,
        },
        Arc::clone(&stop),
    );
    (mailbox, sender, stop)
}

#[tokio::test]
async fn test_congestion_drops_by_supersession_not_blocking() {
    let (mailbox, sender, _stop) = pipeline(1024);
    let channel = MockChannel::default();

    // Saturated transport: three producer updates arrive across three
    // deferred ticks. Nothing blocks, nothing errors, nothing queues.
    channel.buffered.store(2048, Ordering::SeqCst);
    for generation in 0..3u8 {
        mailbox.put(Bytes::copy_from_slice(&[generation]));
        assert_eq!(
            sender.tick_once(&channel).await.unwrap(),
            TickOutcome::Deferred
        );
    }

    // Congestion clears: exactly one send happens, carrying only the
    // newest generation.
    channel.buffered.store(0, Ordering::SeqCst);
    assert_eq!(sender.tick_once(&channel).await.unwrap(), TickOutcome::Sent(1));

    let sent = channel.sent.lock().unwrap();
    assert_eq!(sent.as_slice(), &[Bytes::from_static(&[2])]);
    assert_eq!(sender.deferrals(), 3);
    assert_eq!(sender.sends(), 1);
}

#[tokio::test]
async fn test_gate_boundary_is_at_mark() {
    let (mailbox, sender, _stop) = pipeline(1024);
    let channel = MockChannel::default();

    mailbox.put(Bytes::from_static(b"a"));
    channel.buffered.store(1023, Ordering::SeqCst);
    assert!(matches!(
        sender.tick_once(&channel).await.unwrap(),
        TickOutcome::Sent(_)
    ));

    mailbox.put(Bytes::from_static(b"b"));
    channel.buffered.store(1024, Ordering::SeqCst);
    assert_eq!(
        sender.tick_once(&channel).await.unwrap(),
        TickOutcome::Deferred
    );
}

#[tokio::test]
async fn test_run_loop_drains_latest_only() {
    let (mailbox, sender, stop) = pipeline(usize::MAX);
    let sender = Arc::new(sender);
    let channel = Arc::new(MockChannel::default());

    // Two producer updates land before the loop's first tick; only the
    // second survives the mailbox.
    mailbox.put(Bytes::from_static(b"first"));
    mailbox.put(Bytes::from_static(b"second"));

    let loop_sender = Arc::clone(&sender);
    let loop_channel = Arc::clone(&channel);
    let task = tokio::spawn(async move { loop_sender.run(ArcChannel(loop_channel)).await });

    tokio::time::sleep(Duration::from_millis(50)).await;

    stop.store(true, Ordering::SeqCst);
    task.await.unwrap().unwrap();

    let sent = channel.sent.lock().unwrap();
    assert_eq!(sent.len(), 1, "superseded snapshot must not be sent");
    assert_eq!(sent[0], Bytes::from_static(b"second"));
}

#[tokio::test]
async fn test_run_loop_reports_dead_channel() {
    let (mailbox, sender, _stop) = pipeline(usize::MAX);
    let channel = MockChannel::default();
    channel.closed.store(true, Ordering::SeqCst);

    mailbox.put(Bytes::from_static(b"snapshot"));
    let err = sender.run(channel).await.unwrap_err();
    assert!(matches!(err, PoseLinkError::ChannelClosed(_)));
}

/// Shared-ownership adapter so the test can keep inspecting the mock
/// while the loop owns a transport.
struct ArcChannel(Arc<MockChannel>);

impl PoseTransport for ArcChannel {
    fn buffered_amount(&self) -> impl Future<Output = usize> + Send {
        self.0.buffered_amount()
    }

    fn send(&self, payload: &Bytes) -> impl Future<Output = Result<usize>> + Send {
        self.0.send(payload)
    }
}
