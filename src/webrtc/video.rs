//! Video receive path.
//!
//! The session negotiates a recv-only video transceiver and forwards the
//! incoming track's RTP packets to an injected sink. Decoding and
//! rendering are the sink's concern.

use std::sync::Arc;

use webrtc::rtp::packet::Packet;
use webrtc::track::track_remote::TrackRemote;

/// Consumer of the incoming video track's RTP packets.
///
/// Called from the track's read loop; implementations must not block.
pub trait VideoSink: Send + Sync {
    fn on_rtp(&self, packet: Packet);
}

/// Pump the remote track into the sink until the track ends.
pub(crate) fn spawn_video_pump(track: Arc<TrackRemote>, sink: Arc<dyn VideoSink>) {
    tokio::spawn(async move {
        log::info!("video track attached (ssrc {})", track.ssrc());
        loop {
            match track.read_rtp().await {
                Ok((packet, _)) => sink.on_rtp(packet),
                Err(e) => {
                    log::debug!("video track ended: {}", e);
                    break;
                }
            }
        }
    });
}
