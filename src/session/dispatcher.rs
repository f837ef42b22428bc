//! Control channel dispatcher
//!
//! One session per WebSocket connection. The control task reads framed JSON
//! messages, drives the USB gadget and the peer session, and is the sole
//! writer of the outbound channel; peer-connection callbacks publish their
//! signalling messages through a bounded queue.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::messages::{
    Envelope, GamepadEvent, InitRequest, KeyEvent, PointerEvent, RunCommandRequest, SignalMessage,
};
use super::peer::PeerSession;
use super::SessionState;
use crate::config::Config;
use crate::gadget::configfs::DEFAULT_GADGET_NAME;
use crate::gadget::{GadgetHandles, HidFunctionKind, UsbGadget};

/// Depth of the outbound signalling queue
const OUTBOUND_QUEUE_DEPTH: usize = 32;

/// Run a session over an upgraded WebSocket until the channel closes
pub async fn run(socket: WebSocket, config: Arc<Config>) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<SignalMessage>(OUTBOUND_QUEUE_DEPTH);
    let (state_tx, mut state_rx) = watch::channel(SessionState::Idle);

    let mut session = Session {
        id: uuid::Uuid::new_v4().to_string(),
        config,
        outbound: outbound_tx,
        state: Arc::new(state_tx),
        initialized: false,
        gadget: None,
        handles: GadgetHandles::default(),
        peer: None,
    };

    info!("Control channel connected (session {})", session.id);

    // Observe lifecycle transitions; ends when the session drops its sender
    let state_session_id = session.id.clone();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            info!("Session {} state: {}", state_session_id, *state_rx.borrow());
        }
    });

    loop {
        tokio::select! {
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => session.handle_frame(&text).await,
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Control channel closed (session {})", session.id);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Control channel error (session {}): {}", session.id, e);
                        break;
                    }
                }
            }

            outbound = outbound_rx.recv() => {
                // The session holds a sender, so recv() cannot return None
                // until teardown; a send failure means the client is gone.
                let Some(message) = outbound else { break };
                match serde_json::to_string(&message) {
                    Ok(json) => {
                        if sink.send(Message::Text(json)).await.is_err() {
                            warn!("Failed to send signalling message (session {})", session.id);
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to encode signalling message: {}", e),
                }
            }
        }
    }

    session.shutdown().await;
}

/// Per-channel session: owns the gadget, the handles and the peer session
struct Session {
    id: String,
    config: Arc<Config>,
    outbound: mpsc::Sender<SignalMessage>,
    state: Arc<watch::Sender<SessionState>>,
    initialized: bool,
    gadget: Option<UsbGadget>,
    handles: GadgetHandles,
    peer: Option<PeerSession>,
}

impl Session {
    /// Dispatch one framed message. Malformed frames and unknown types are
    /// logged and ignored; the session keeps running.
    async fn handle_frame(&mut self, text: &str) {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Malformed control message (session {}): {}", self.id, e);
                return;
            }
        };

        match envelope.kind.as_str() {
            "init" => {
                if let Some(request) = self.decode::<InitRequest>("init", envelope.payload) {
                    self.on_init(request).await;
                }
            }
            "mouseEvent" => {
                if let Some(event) = self.decode::<PointerEvent>("mouseEvent", envelope.payload) {
                    if let Some(mouse) = self.handles.mouse.as_mut() {
                        if let Err(e) = mouse.send(event.buttons as u8, event.pos.x, event.pos.y) {
                            warn!("Mouse send failed (session {}): {}", self.id, e);
                        }
                    }
                }
            }
            "mouseAbsEvent" => {
                if let Some(event) = self.decode::<PointerEvent>("mouseAbsEvent", envelope.payload)
                {
                    if let Some(mouse_abs) = self.handles.mouse_abs.as_mut() {
                        if let Err(e) = mouse_abs.send(
                            event.buttons as u8,
                            event.pos.x as u16,
                            event.pos.y as u16,
                        ) {
                            warn!("Absolute mouse send failed (session {}): {}", self.id, e);
                        }
                    }
                }
            }
            "touchEvent" => {
                if let Some(event) = self.decode::<PointerEvent>("touchEvent", envelope.payload) {
                    if let Some(touch) = self.handles.touch_screen.as_mut() {
                        if let Err(e) = touch.send(
                            event.buttons as u8,
                            event.pos.x as u16,
                            event.pos.y as u16,
                        ) {
                            warn!("Touch send failed (session {}): {}", self.id, e);
                        }
                    }
                }
            }
            "keyEvent" => {
                if let Some(event) = self.decode::<KeyEvent>("keyEvent", envelope.payload) {
                    if let Some(keyboard) = self.handles.keyboard.as_mut() {
                        if let Err(e) = keyboard.send(&event.scancodes(), event.modifiers()) {
                            warn!("Keyboard send failed (session {}): {}", self.id, e);
                        }
                    }
                }
            }
            "gamepadEvent" => {
                if let Some(event) = self.decode::<GamepadEvent>("gamepadEvent", envelope.payload)
                {
                    if let Some(gamepad) = self.handles.gamepad.as_mut() {
                        if let Err(e) = gamepad.send(&event.buttons, &event.axes) {
                            warn!("Gamepad send failed (session {}): {}", self.id, e);
                        }
                    }
                }
            }
            "answer" => {
                if let Some(answer) = self.decode("answer", envelope.payload) {
                    if let Some(peer) = self.peer.as_ref() {
                        if let Err(e) = peer.apply_answer(answer).await {
                            warn!("Failed to apply answer (session {}): {}", self.id, e);
                        }
                    }
                }
            }
            "addIceCandidate" => {
                if let Some(candidate) = self.decode("addIceCandidate", envelope.payload) {
                    if let Some(peer) = self.peer.as_ref() {
                        if let Err(e) = peer.add_remote_candidate(candidate).await {
                            warn!("Failed to add ICE candidate (session {}): {}", self.id, e);
                        }
                    }
                }
            }
            "runCommand" => {
                if let Some(request) =
                    self.decode::<RunCommandRequest>("runCommand", envelope.payload)
                {
                    self.run_command(request);
                }
            }
            "keepAlive" => {}
            other => warn!("Unknown message type (session {}): {}", self.id, other),
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(
        &self,
        kind: &str,
        payload: serde_json::Value,
    ) -> Option<T> {
        match serde_json::from_value(payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Malformed {} payload (session {}): {}", kind, self.id, e);
                None
            }
        }
    }

    /// Build the peer session and/or the USB gadget requested by `init`
    async fn on_init(&mut self, request: InitRequest) {
        if self.initialized {
            warn!(
                "Duplicate init ignored (session {}); functions cannot change mid-session",
                self.id
            );
            return;
        }
        self.initialized = true;

        if request.remote_video.enable {
            let _ = self.state.send(SessionState::Initializing);
            match PeerSession::start(
                self.id.clone(),
                &self.config,
                &request.remote_video,
                self.outbound.clone(),
                self.state.clone(),
            )
            .await
            {
                Ok(peer) => self.peer = Some(peer),
                Err(e) => warn!("Failed to start peer session ({}): {}", self.id, e),
            }
        }

        if request.wants_hid() {
            let mut gadget = UsbGadget::new(DEFAULT_GADGET_NAME);
            if request.mouse {
                gadget.add_function(HidFunctionKind::MouseRelative);
            }
            if request.mouse_abs {
                gadget.add_function(HidFunctionKind::MouseAbsolute);
            }
            if request.touch_screen {
                gadget.add_function(HidFunctionKind::TouchScreen);
            }
            if request.keyboard {
                gadget.add_function(HidFunctionKind::Keyboard);
            }
            if request.gamepad {
                gadget.add_function(HidFunctionKind::Gamepad);
            }

            match gadget.start() {
                Ok(()) => {
                    self.handles = GadgetHandles::attach(&gadget);
                    self.gadget = Some(gadget);
                }
                Err(e) => {
                    warn!("Failed to start USB gadget (session {}): {}", self.id, e);
                    // Partial ConfigFS state must not leak into later sessions
                    gadget.stop();
                }
            }
        }
    }

    /// Execute a configured shell action by catalog index.
    ///
    /// The command runs on a detached task so a slow command cannot stall
    /// HID processing; its exit status is logged.
    fn run_command(&self, request: RunCommandRequest) {
        let index = request.index;
        if index < 0 || index as usize >= self.config.commands.len() {
            warn!("Invalid command index (session {}): {}", self.id, index);
            return;
        }

        let spec = self.config.commands[index as usize].clone();
        info!(
            "Running command {:?} (session {}): {}",
            spec.name, self.id, spec.command
        );
        tokio::spawn(async move {
            match tokio::process::Command::new("sh")
                .arg("-c")
                .arg(&spec.command)
                .status()
                .await
            {
                Ok(status) if status.success() => debug!("Command {:?} finished", spec.name),
                Ok(status) => warn!("Command {:?} exited with {}", spec.name, status),
                Err(e) => warn!("Failed to run command {:?}: {}", spec.name, e),
            }
        });
    }

    /// Tear everything down: peer connection first, then the gadget
    async fn shutdown(&mut self) {
        let _ = self.state.send(SessionState::Closing);

        if let Some(peer) = self.peer.take() {
            peer.close().await;
        }

        self.handles.clear();
        if let Some(mut gadget) = self.gadget.take() {
            gadget.stop();
        }

        info!("Session {} closed", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session(config: Config) -> Session {
        let (outbound, _outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let (state_tx, _state_rx) = watch::channel(SessionState::Idle);
        Session {
            id: "test".to_string(),
            config: Arc::new(config),
            outbound,
            state: Arc::new(state_tx),
            initialized: false,
            gadget: None,
            handles: GadgetHandles::default(),
            peer: None,
        }
    }

    #[tokio::test]
    async fn malformed_and_unknown_frames_are_ignored() {
        let mut session = test_session(Config::default());

        session.handle_frame("not json").await;
        session.handle_frame(r#"{"type":"bogusEvent","payload":{}}"#).await;
        session.handle_frame(r#"{"payload":{}}"#).await;

        assert!(!session.initialized);
        assert!(session.peer.is_none());
        assert!(session.gadget.is_none());
    }

    #[tokio::test]
    async fn keep_alive_has_no_side_effects() {
        let mut session = test_session(Config::default());
        session.handle_frame(r#"{"type":"keepAlive"}"#).await;
        assert!(!session.initialized);
    }

    #[tokio::test]
    async fn events_for_disabled_functions_are_dropped() {
        let mut session = test_session(Config::default());

        // No function was enabled; none of these may touch a device
        session
            .handle_frame(r#"{"type":"mouseEvent","payload":{"buttons":1,"pos":{"x":5,"y":5}}}"#)
            .await;
        session
            .handle_frame(r#"{"type":"keyEvent","payload":{"code":[4]}}"#)
            .await;
        session
            .handle_frame(r#"{"type":"gamepadEvent","payload":{"buttons":[true],"axes":[]}}"#)
            .await;

        assert!(session.gadget.is_none());
    }

    #[tokio::test]
    async fn init_without_features_marks_session_initialized() {
        let mut session = test_session(Config::default());
        session.handle_frame(r#"{"type":"init","payload":{}}"#).await;
        assert!(session.initialized);
        assert!(session.peer.is_none());
        assert!(session.gadget.is_none());

        // A second init cannot re-enable functions mid-session
        session
            .handle_frame(r#"{"type":"init","payload":{"keyboard":true}}"#)
            .await;
        assert!(session.gadget.is_none());
    }

    #[tokio::test]
    async fn out_of_range_command_index_spawns_nothing() {
        let config = Config {
            commands: vec![crate::config::CommandSpec {
                name: "noop".to_string(),
                command: "true".to_string(),
            }],
            ..Default::default()
        };
        let mut session = test_session(config);

        session
            .handle_frame(r#"{"type":"runCommand","payload":{"index":5}}"#)
            .await;
        session
            .handle_frame(r#"{"type":"runCommand","payload":{"index":-1}}"#)
            .await;
    }
}
