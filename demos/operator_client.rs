//! Minimal operator client: connects to a signaling server, streams a
//! synthetic skeleton at the capture rate, and prints haptic commands.
//!
//! Usage: `cargo run --example operator_client [signaling-url]`

use std::sync::Arc;
use std::time::{Duration, Instant};

use poselink::{
    HapticActuator, HapticRenderer, JointPose, MotorCommand, OrientationState, PoseLinkConfig,
    PoseSnapshot, TelemetrySession,
};

struct ConsoleGlove;

impl HapticActuator for ConsoleGlove {
    fn play_motors(&self, command: &MotorCommand) {
        println!(
            "haptics {:?}: motors {:?} for {} ms",
            command.hand, command.motors, command.duration_ms
        );
    }
}

fn synthetic_skeleton(t: f32) -> PoseSnapshot {
    PoseSnapshot::new(
        (0..24)
            .map(|id| JointPose {
                id,
                position: [(t + id as f32).sin() * 0.2, 1.0 + id as f32 * 0.05, 0.0],
                orientation: [0.0, 0.0, 0.0, 1.0],
            })
            .collect(),
    )
}

#[tokio::main]
async fn main() -> poselink::Result<()> {
    poselink::init_logging();

    let mut config = PoseLinkConfig::load_or_default();
    if let Some(url) = std::env::args().nth(1) {
        config.signaling.url = url;
    }
    config.validate()?;

    let session = Arc::new(TelemetrySession::new(config.clone()));
    let renderer = Arc::new(HapticRenderer::new(&config.haptics, Arc::new(ConsoleGlove)));
    session.set_haptic_renderer(Arc::clone(&renderer));

    session.start().await?;

    // Host loop: capture-rate pose production, per-tick orientation, and
    // per-tick haptic rendering, until ctrl-c.
    let producer_session = Arc::clone(&session);
    let producer = tokio::spawn(async move {
        let start = Instant::now();
        let mut ticker = tokio::time::interval(Duration::from_millis(11));
        loop {
            ticker.tick().await;
            let t = start.elapsed().as_secs_f32();
            producer_session.submit_pose(&synthetic_skeleton(t));
            let orientation = OrientationState::from_euler_degrees(t.sin() * 45.0, 0.0, 0.0);
            if producer_session.send_orientation(&orientation).await.is_err() {
                break;
            }
            renderer.render_tick(Instant::now());
        }
    });

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");
    producer.abort();

    session.stop().await?;
    println!("final stats: {:?}", session.stats());
    Ok(())
}
