//! Control-channel wire messages
//!
//! Every frame is a JSON object `{"type": <string>, "payload": <object>}`.
//! Incoming payloads are decoded per message type so an unknown type or a
//! malformed payload never tears the session down.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::gadget::reports::KeyModifiers;

/// Framed control-channel message
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// Video parameters negotiated in `init`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoRequest {
    pub enable: bool,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    /// Kilobits per second
    pub target_bitrate: u32,
}

/// First message of a session: selects HID functions and video
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitRequest {
    pub remote_video: VideoRequest,
    pub mouse: bool,
    pub mouse_abs: bool,
    pub touch_screen: bool,
    pub keyboard: bool,
    pub gamepad: bool,
}

impl InitRequest {
    /// Whether any HID function was requested
    pub fn wants_hid(&self) -> bool {
        self.mouse || self.mouse_abs || self.touch_screen || self.keyboard || self.gamepad
    }
}

/// Cursor position, top-left origin
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// Shared payload of mouse, absolute-mouse and touch events
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PointerEvent {
    pub buttons: i32,
    pub pos: Position,
}

/// Keyboard event: pressed scancodes plus modifier flags
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyEvent {
    pub code: Vec<i32>,
    pub alt_key: bool,
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub shift_key: bool,
}

impl KeyEvent {
    pub fn modifiers(&self) -> KeyModifiers {
        KeyModifiers {
            ctrl: self.ctrl_key,
            shift: self.shift_key,
            alt: self.alt_key,
            meta: self.meta_key,
        }
    }

    pub fn scancodes(&self) -> Vec<u8> {
        self.code.iter().map(|c| *c as u8).collect()
    }
}

/// Gamepad event: boolean buttons in input order plus analog axes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GamepadEvent {
    pub buttons: Vec<bool>,
    pub axes: Vec<f64>,
}

/// Request to run a configured shell action
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RunCommandRequest {
    pub index: i64,
}

/// Outgoing signalling messages emitted by the session
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum SignalMessage {
    #[serde(rename = "offer")]
    Offer(RTCSessionDescription),
    #[serde(rename = "addIceCandidate")]
    AddIceCandidate(RTCIceCandidateInit),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_envelope_without_payload() {
        let envelope: Envelope = serde_json::from_str(r#"{"type":"keepAlive"}"#).unwrap();
        assert_eq!(envelope.kind, "keepAlive");
        assert!(envelope.payload.is_null());
    }

    #[test]
    fn parse_init_request() {
        let json = r#"{
            "remoteVideo": {"enable": true, "width": 1280, "height": 720,
                            "framerate": 30, "targetBitrate": 2500},
            "mouse": true,
            "mouseAbs": false,
            "touchScreen": false,
            "keyboard": true,
            "gamepad": false
        }"#;
        let request: InitRequest = serde_json::from_str(json).unwrap();
        assert!(request.remote_video.enable);
        assert_eq!(request.remote_video.width, 1280);
        assert_eq!(request.remote_video.target_bitrate, 2500);
        assert!(request.mouse);
        assert!(request.keyboard);
        assert!(!request.gamepad);
        assert!(request.wants_hid());
    }

    #[test]
    fn init_request_missing_fields_default_off() {
        let request: InitRequest = serde_json::from_str("{}").unwrap();
        assert!(!request.remote_video.enable);
        assert!(!request.wants_hid());
    }

    #[test]
    fn parse_pointer_event() {
        let event: PointerEvent =
            serde_json::from_str(r#"{"buttons": 1, "pos": {"x": 100, "y": 200}}"#).unwrap();
        assert_eq!(event.buttons, 1);
        assert_eq!(event.pos.x, 100);
        assert_eq!(event.pos.y, 200);
    }

    #[test]
    fn key_event_modifiers_and_codes() {
        let event: KeyEvent =
            serde_json::from_str(r#"{"code": [76], "ctrlKey": true, "altKey": true}"#).unwrap();
        let modifiers = event.modifiers();
        assert!(modifiers.ctrl);
        assert!(modifiers.alt);
        assert!(!modifiers.shift);
        assert!(!modifiers.meta);
        assert_eq!(event.scancodes(), vec![76]);
    }

    #[test]
    fn outgoing_candidate_envelope_shape() {
        let init = RTCIceCandidateInit {
            candidate: "candidate:1 1 udp 2130706431 192.0.2.1 54321 typ host".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
            username_fragment: None,
        };
        let json = serde_json::to_value(SignalMessage::AddIceCandidate(init)).unwrap();
        assert_eq!(json["type"], "addIceCandidate");
        assert!(json["payload"]["candidate"]
            .as_str()
            .unwrap()
            .starts_with("candidate:"));
        assert_eq!(json["payload"]["sdpMid"], "0");
    }
}
