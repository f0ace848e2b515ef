//! Dual-channel telemetry session.
//!
//! Owns one peer connection with two locally created data channels: the
//! ordered/reliable orientation channel and the unordered/unreliable
//! zero-retransmit pose channel. Also owns the video receive path and
//! adopts the remote-announced haptics channel. Drives the session lifecycle:
//! `Idle -> Negotiating -> Connected -> Closed`, with `Failed` reachable
//! from `Negotiating` and `Connected`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

use crate::config::PoseLinkConfig;
use crate::errors::{NegotiationStage, PoseLinkError, Result};
use crate::haptics::{parse_haptic_frame, HapticRenderer};
use crate::pose::{codec, PoseMailbox, PoseSnapshot};
use crate::types::{OrientationState, SessionEvent, SessionState, SessionStats};
use crate::webrtc::sender::{DataChannelTransport, PoseSender};
use crate::webrtc::signaling::SignalingClient;
use crate::webrtc::video::{spawn_video_pump, VideoSink};

type ChannelSlot = Arc<Mutex<Option<Arc<RTCDataChannel>>>>;

/// Client end of the telemetry link.
///
/// Construct once, inject the actuator-side renderer and video sink,
/// then drive with `start`/`stop`. The pose producer calls `submit_pose`
/// at its own cadence; the host sends `send_orientation` every tick.
pub struct TelemetrySession {
    id: String,
    config: PoseLinkConfig,
    signaling: SignalingClient,
    created_at: DateTime<Utc>,
    state: Arc<Mutex<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    mailbox: Arc<PoseMailbox>,
    sender: Arc<PoseSender>,
    sender_stop: Arc<AtomicBool>,
    sender_started: Arc<AtomicBool>,
    sender_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    pc: Mutex<Option<Arc<RTCPeerConnection>>>,
    orientation_channel: ChannelSlot,
    pose_channel: ChannelSlot,
    video_sink: Arc<Mutex<Option<Arc<dyn VideoSink>>>>,
    haptics: Arc<Mutex<Option<Arc<HapticRenderer>>>>,
}

impl TelemetrySession {
    pub fn new(config: PoseLinkConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        let mailbox = Arc::new(PoseMailbox::new());
        let sender_stop = Arc::new(AtomicBool::new(false));
        let sender = Arc::new(PoseSender::new(
            Arc::clone(&mailbox),
            &config.sender,
            Arc::clone(&sender_stop),
        ));
        let signaling = SignalingClient::new(config.signaling.url.clone());

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            signaling,
            created_at: Utc::now(),
            state: Arc::new(Mutex::new(SessionState::Idle)),
            events,
            mailbox,
            sender,
            sender_stop,
            sender_started: Arc::new(AtomicBool::new(false)),
            sender_task: Arc::new(Mutex::new(None)),
            pc: Mutex::new(None),
            orientation_channel: Arc::new(Mutex::new(None)),
            pose_channel: Arc::new(Mutex::new(None)),
            video_sink: Arc::new(Mutex::new(None)),
            haptics: Arc::new(Mutex::new(None)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Install the sink the incoming video track is forwarded to.
    /// Must be called before `start`.
    pub fn set_video_sink(&self, sink: Arc<dyn VideoSink>) {
        *self.video_sink.lock().unwrap() = Some(sink);
    }

    /// Install the renderer fed by the remote haptics channel.
    /// Must be called before `start`.
    pub fn set_haptic_renderer(&self, renderer: Arc<HapticRenderer>) {
        *self.haptics.lock().unwrap() = Some(renderer);
    }

    /// Hand the newest pose snapshot to the pipeline.
    ///
    /// Encoding happens here, on the producer's thread; the mailbox lock
    /// is only held for the slot swap. Any unsent previous snapshot is
    /// superseded.
    pub fn submit_pose(&self, snapshot: &PoseSnapshot) {
        self.mailbox.put(codec::encode(snapshot));
    }

    /// Send the viewpoint orientation on the reliable channel.
    ///
    /// Silently skipped while the channel is not open; the stream is
    /// loss-tolerant and the next tick brings a fresh value.
    pub async fn send_orientation(&self, orientation: &OrientationState) -> Result<()> {
        let channel = { self.orientation_channel.lock().unwrap().clone() };
        let Some(channel) = channel else {
            return Ok(());
        };
        if channel.ready_state() != RTCDataChannelState::Open {
            return Ok(());
        }

        let json = serde_json::to_string(orientation)
            .map_err(|e| PoseLinkError::Transport(e.to_string()))?;
        channel
            .send_text(json)
            .await
            .map_err(|e| PoseLinkError::ChannelClosed(format!("{}: {}", channel.label(), e)))?;
        Ok(())
    }

    /// Negotiate the session: create the peer connection and channels,
    /// exchange the offer/answer with the signaling endpoint.
    ///
    /// Rejected while a negotiation is in progress or the session is
    /// connected. Any failing stage transitions the session to `Failed`
    /// and is reported with that stage; the caller decides whether to
    /// retry.
    pub async fn start(&self) -> Result<()> {
        self.begin_negotiation()?;

        match self.negotiate().await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("session {}: negotiation failed: {}", self.id, e);
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    /// Tear the session down. Safe to call from any state, idempotent.
    pub async fn stop(&self) -> Result<()> {
        self.sender_stop.store(true, Ordering::SeqCst);
        self.sender_started.store(false, Ordering::SeqCst);

        // The loop observes the stop flag at its next tick boundary.
        let task = { self.sender_task.lock().unwrap().take() };
        if let Some(task) = task {
            let _ = task.await;
        }

        let orientation = { self.orientation_channel.lock().unwrap().take() };
        if let Some(channel) = orientation {
            if let Err(e) = channel.close().await {
                log::warn!("session {}: closing orientation channel: {}", self.id, e);
            }
        }

        let pose = { self.pose_channel.lock().unwrap().take() };
        if let Some(channel) = pose {
            if let Err(e) = channel.close().await {
                log::warn!("session {}: closing pose channel: {}", self.id, e);
            }
        }

        let pc = { self.pc.lock().unwrap().take() };
        if let Some(pc) = pc {
            if let Err(e) = pc.close().await {
                log::warn!("session {}: closing peer connection: {}", self.id, e);
            }
        }

        self.mailbox.clear();
        if let Some(renderer) = self.haptics.lock().unwrap().as_ref() {
            renderer.clear();
        }

        self.transition(SessionState::Closed);
        Ok(())
    }

    /// Point-in-time diagnostics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.id.clone(),
            state: self.state(),
            created_at: self.created_at,
            pose_sends: self.sender.sends(),
            pose_deferrals: self.sender.deferrals(),
        }
    }

    /// Claim the `Negotiating` state, rejecting concurrent attempts.
    fn begin_negotiation(&self) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                SessionState::Negotiating => return Err(PoseLinkError::NegotiationInProgress),
                SessionState::Connected => return Err(PoseLinkError::AlreadyConnected),
                SessionState::Idle | SessionState::Closed | SessionState::Failed => {
                    *state = SessionState::Negotiating;
                }
            }
        }
        self.sender_stop.store(false, Ordering::SeqCst);
        self.sender_started.store(false, Ordering::SeqCst);
        log::info!("session {}: negotiating via {}", self.id, self.signaling.url());
        let _ = self.events.send(SessionEvent::StateChanged(SessionState::Negotiating));
        Ok(())
    }

    async fn negotiate(&self) -> Result<()> {
        let api = build_api()?;

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: self.config.signaling.ice_servers.clone(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let pc = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(|e| PoseLinkError::negotiation(NegotiationStage::CreatePeer, e))?,
        );

        self.install_connection_hooks(&pc);

        if self.config.video.enabled {
            pc.add_transceiver_from_kind(
                RTPCodecType::Video,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await
            .map_err(|e| PoseLinkError::negotiation(NegotiationStage::CreatePeer, e))?;
        }

        let orientation = pc
            .create_data_channel(
                &self.config.channels.orientation_label,
                Some(RTCDataChannelInit {
                    ordered: Some(true),
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| PoseLinkError::negotiation(NegotiationStage::CreatePeer, e))?;

        let pose = pc
            .create_data_channel(
                &self.config.channels.pose_label,
                Some(RTCDataChannelInit {
                    ordered: Some(self.config.channels.pose_ordered),
                    max_retransmits: Some(self.config.channels.pose_max_retransmits),
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| PoseLinkError::negotiation(NegotiationStage::CreatePeer, e))?;

        self.install_pose_open_hook(&pose);

        *self.orientation_channel.lock().unwrap() = Some(orientation);
        *self.pose_channel.lock().unwrap() = Some(Arc::clone(&pose));
        *self.pc.lock().unwrap() = Some(Arc::clone(&pc));

        let offer = pc
            .create_offer(None)
            .await
            .map_err(|e| PoseLinkError::negotiation(NegotiationStage::CreateOffer, e))?;
        let offer_sdp = offer.sdp.clone();

        pc.set_local_description(offer)
            .await
            .map_err(|e| PoseLinkError::negotiation(NegotiationStage::LocalDescription, e))?;

        let answer_sdp = self.signaling.exchange_offer(&offer_sdp).await?;

        let answer = RTCSessionDescription::answer(answer_sdp)
            .map_err(|e| PoseLinkError::negotiation(NegotiationStage::RemoteDescription, e))?;
        pc.set_remote_description(answer)
            .await
            .map_err(|e| PoseLinkError::negotiation(NegotiationStage::RemoteDescription, e))?;

        log::info!("session {}: answer applied, waiting for transport", self.id);
        Ok(())
    }

    fn transition(&self, next: SessionState) {
        transition(&self.id, &self.state, &self.events, next);
    }

    /// Wire connection-level callbacks: state transitions, video track
    /// forwarding, and adoption of remote-announced channels.
    fn install_connection_hooks(&self, pc: &Arc<RTCPeerConnection>) {
        let id = self.id.clone();
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let sender_stop = Arc::clone(&self.sender_stop);
        pc.on_peer_connection_state_change(Box::new(move |new_state: RTCPeerConnectionState| {
            let id = id.clone();
            let state = Arc::clone(&state);
            let events = events.clone();
            let sender_stop = Arc::clone(&sender_stop);
            Box::pin(async move {
                log::info!("session {}: transport state {}", id, new_state);
                match new_state {
                    RTCPeerConnectionState::Connected => {
                        transition(&id, &state, &events, SessionState::Connected);
                    }
                    RTCPeerConnectionState::Disconnected | RTCPeerConnectionState::Closed => {
                        if *state.lock().unwrap() == SessionState::Connected {
                            sender_stop.store(true, Ordering::SeqCst);
                            transition(&id, &state, &events, SessionState::Closed);
                        }
                    }
                    RTCPeerConnectionState::Failed => {
                        sender_stop.store(true, Ordering::SeqCst);
                        transition(&id, &state, &events, SessionState::Failed);
                    }
                    _ => {}
                }
            })
        }));

        let id = self.id.clone();
        let sink_slot = Arc::clone(&self.video_sink);
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let id = id.clone();
            let sink = { sink_slot.lock().unwrap().clone() };
            Box::pin(async move {
                if track.kind() != RTPCodecType::Video {
                    return;
                }
                match sink {
                    Some(sink) => spawn_video_pump(track, sink),
                    None => log::debug!("session {}: video track ignored, no sink set", id),
                }
            })
        }));

        let id = self.id.clone();
        let events = self.events.clone();
        let haptics_slot = Arc::clone(&self.haptics);
        let haptics_label = self.config.channels.haptics_label.clone();
        pc.on_data_channel(Box::new(move |channel: Arc<RTCDataChannel>| {
            let id = id.clone();
            let events = events.clone();
            let haptics_slot = Arc::clone(&haptics_slot);
            let haptics_label = haptics_label.clone();
            Box::pin(async move {
                let label = channel.label().to_string();
                log::info!("session {}: remote channel \"{}\" announced", id, label);

                if label == haptics_label {
                    let renderer = { haptics_slot.lock().unwrap().clone() };
                    match renderer {
                        Some(renderer) => install_haptics_hook(&channel, renderer),
                        None => {
                            log::warn!(
                                "session {}: haptics channel announced but no renderer set",
                                id
                            )
                        }
                    }
                }
                let _ = events.send(SessionEvent::ChannelAdopted(label));
            })
        }));
    }

    /// Start the rate-gated sender when the pose channel opens.
    ///
    /// The open callback can fire more than once across renegotiation;
    /// the atomic guard makes the spawn happen exactly once per session
    /// lifetime.
    fn install_pose_open_hook(&self, pose: &Arc<RTCDataChannel>) {
        let id = self.id.clone();
        let started = Arc::clone(&self.sender_started);
        let sender = Arc::clone(&self.sender);
        let events = self.events.clone();
        let task_slot = Arc::clone(&self.sender_task);
        let channel = Arc::clone(pose);
        pose.on_open(Box::new(move || {
            let id = id.clone();
            let started = Arc::clone(&started);
            let sender = Arc::clone(&sender);
            let events = events.clone();
            let task_slot = Arc::clone(&task_slot);
            let channel = Arc::clone(&channel);
            Box::pin(async move {
                if started.swap(true, Ordering::SeqCst) {
                    log::debug!("session {}: pose sender already running", id);
                    return;
                }
                log::info!("session {}: pose channel open", id);
                let transport = DataChannelTransport::new(channel);
                let task = tokio::spawn(async move {
                    if let Err(e) = sender.run(transport).await {
                        let _ = events.send(SessionEvent::PoseSenderFailed(e));
                    }
                });
                *task_slot.lock().unwrap() = Some(task);
            })
        }));
    }
}

/// Apply a state transition and notify subscribers. No-op when the state
/// is unchanged, which keeps repeated stops at exactly one `Closed`.
fn transition(
    id: &str,
    state: &Mutex<SessionState>,
    events: &broadcast::Sender<SessionEvent>,
    next: SessionState,
) {
    {
        let mut state = state.lock().unwrap();
        if *state == next {
            return;
        }
        log::info!("session {}: {:?} -> {:?}", id, *state, next);
        *state = next;
    }
    let _ = events.send(SessionEvent::StateChanged(next));
}

/// Feed haptic frames from the wire into the renderer. Malformed frames
/// are dropped with a diagnostic; the receive path keeps running.
fn install_haptics_hook(channel: &Arc<RTCDataChannel>, renderer: Arc<HapticRenderer>) {
    channel.on_message(Box::new(move |message| {
        let renderer = Arc::clone(&renderer);
        Box::pin(async move {
            match parse_haptic_frame(&message.data) {
                Ok(frame) => renderer.record_frame(&frame, Instant::now()),
                Err(e) => log::warn!("dropping haptic frame: {}", e),
            }
        })
    }));
}

fn build_api() -> Result<API> {
    let mut media_engine = MediaEngine::default();
    media_engine
        .register_default_codecs()
        .map_err(|e| PoseLinkError::negotiation(NegotiationStage::CreatePeer, e))?;

    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut media_engine)
        .map_err(|e| PoseLinkError::negotiation(NegotiationStage::CreatePeer, e))?;

    Ok(APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build())
}
