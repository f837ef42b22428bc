//! WebRTC peer session
//!
//! Assembles the peer connection with one Opus and one H.264 track, starts
//! the media pumps, generates the local offer and forwards signalling to
//! the control channel through the outbound queue.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_H264, MIME_TYPE_OPUS};
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

use super::messages::{SignalMessage, VideoRequest};
use super::SessionState;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::media::{pipeline, TrackPump};

/// Opus capability for the audio track (48 kHz stereo)
fn audio_codec_capability() -> RTCRtpCodecCapability {
    RTCRtpCodecCapability {
        mime_type: MIME_TYPE_OPUS.to_string(),
        clock_rate: 48000,
        channels: 2,
        sdp_fmtp_line: "minptime=10;useinbandfec=1".to_string(),
        rtcp_feedback: vec![],
    }
}

/// H.264 capability for the video track
fn video_codec_capability() -> RTCRtpCodecCapability {
    RTCRtpCodecCapability {
        mime_type: MIME_TYPE_H264.to_string(),
        clock_rate: 90000,
        channels: 0,
        sdp_fmtp_line: "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f"
            .to_string(),
        rtcp_feedback: vec![],
    }
}

/// Peer connection with its two media pumps
pub struct PeerSession {
    session_id: String,
    pc: Arc<RTCPeerConnection>,
    audio_pump: TrackPump,
    video_pump: TrackPump,
}

impl PeerSession {
    /// Build the peer connection, attach the tracks, start the pumps and
    /// emit the local offer on the control channel.
    pub async fn start(
        session_id: String,
        config: &Config,
        request: &VideoRequest,
        outbound: mpsc::Sender<SignalMessage>,
        state: Arc<watch::Sender<SessionState>>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| AppError::WebRtc(format!("Failed to register codecs: {e}")))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|e| AppError::WebRtc(format!("Failed to register interceptors: {e}")))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: config.ice_servers.clone(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(rtc_config).await.map_err(|e| {
            AppError::WebRtc(format!("Failed to create peer connection: {e}"))
        })?);

        // Audio: Opus samples pumped from the capture pipeline
        let audio_track = Arc::new(TrackLocalStaticSample::new(
            audio_codec_capability(),
            "audio".to_string(),
            "audio".to_string(),
        ));
        pc.add_track(Arc::clone(&audio_track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| AppError::WebRtc(format!("Failed to add audio track: {e}")))?;
        let audio_pump = TrackPump::spawn(
            "audio",
            pipeline::audio_pipeline(&config.audio_device),
            audio_track,
        );

        // Video: H.264 samples at the negotiated geometry and bitrate
        let video_track = Arc::new(TrackLocalStaticSample::new(
            video_codec_capability(),
            "video".to_string(),
            "video".to_string(),
        ));
        pc.add_track(Arc::clone(&video_track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| AppError::WebRtc(format!("Failed to add video track: {e}")))?;
        let video_pump = TrackPump::spawn(
            "video",
            pipeline::video_pipeline(&config.video_device, request),
            video_track,
        );

        let session = Self {
            session_id,
            pc,
            audio_pump,
            video_pump,
        };
        session.install_callbacks(outbound.clone(), state);

        // Local offer, emitted as the first signalling message
        let offer = session
            .pc
            .create_offer(None)
            .await
            .map_err(|e| AppError::WebRtc(format!("Failed to create offer: {e}")))?;
        session
            .pc
            .set_local_description(offer.clone())
            .await
            .map_err(|e| AppError::WebRtc(format!("Failed to set local description: {e}")))?;

        if outbound.send(SignalMessage::Offer(offer)).await.is_err() {
            warn!(
                "Control channel closed before offer was sent (session {})",
                session.session_id
            );
        }

        Ok(session)
    }

    fn install_callbacks(
        &self,
        outbound: mpsc::Sender<SignalMessage>,
        state: Arc<watch::Sender<SessionState>>,
    ) {
        // Trickle ICE: every discovered candidate goes out on the control
        // channel. The control task is the only socket writer; callbacks
        // publish through the queue.
        let session_id = self.session_id.clone();
        self.pc
            .on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
                let outbound = outbound.clone();
                let session_id = session_id.clone();

                Box::pin(async move {
                    let Some(candidate) = candidate else {
                        debug!("ICE candidate gathering complete (session {})", session_id);
                        return;
                    };
                    match candidate.to_json() {
                        Ok(init) => {
                            if outbound
                                .send(SignalMessage::AddIceCandidate(init))
                                .await
                                .is_err()
                            {
                                debug!(
                                    "Control channel gone, dropping candidate (session {})",
                                    session_id
                                );
                            }
                        }
                        Err(e) => warn!("Failed to serialize ICE candidate: {}", e),
                    }
                })
            }));

        let session_id = self.session_id.clone();
        let audio_stop = self.audio_pump.stop_handle();
        let video_stop = self.video_pump.stop_handle();
        self.pc
            .on_ice_connection_state_change(Box::new(move |s: RTCIceConnectionState| {
                let session_id = session_id.clone();
                let audio_stop = audio_stop.clone();
                let video_stop = video_stop.clone();
                let state = state.clone();

                Box::pin(async move {
                    info!("ICE connection state (session {}): {}", session_id, s);
                    match s {
                        RTCIceConnectionState::Connected => {
                            let _ = state.send(SessionState::Streaming);
                        }
                        RTCIceConnectionState::Closed => {
                            let _ = audio_stop.send(true);
                            let _ = video_stop.send(true);
                        }
                        _ => {}
                    }
                })
            }));
    }

    /// Apply the remote session description received as `answer`
    pub async fn apply_answer(&self, answer: RTCSessionDescription) -> Result<()> {
        self.pc
            .set_remote_description(answer)
            .await
            .map_err(|e| AppError::WebRtc(format!("Failed to set remote description: {e}")))
    }

    /// Add a remote ICE candidate
    pub async fn add_remote_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()> {
        self.pc
            .add_ice_candidate(candidate)
            .await
            .map_err(|e| AppError::WebRtc(format!("Failed to add ICE candidate: {e}")))
    }

    /// Signal both pumps to stop
    pub fn stop_pumps(&self) {
        self.audio_pump.stop();
        self.video_pump.stop();
    }

    /// Stop the pumps and close the peer connection
    pub async fn close(&self) {
        self.stop_pumps();
        if let Err(e) = self.pc.close().await {
            warn!(
                "Failed to close peer connection (session {}): {}",
                self.session_id, e
            );
        }
    }
}
