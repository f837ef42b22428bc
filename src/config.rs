//! Static daemon configuration loaded from a YAML document.
//!
//! The configuration is read once at startup and shared with every session
//! by reference; nothing in it changes while the process runs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Main daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Address the HTTP/WebSocket server binds to (e.g. "0.0.0.0:8080")
    pub listen_address: String,
    /// STUN/TURN server URLs used for NAT traversal
    pub ice_servers: Vec<String>,
    /// UI defaults shown to the client before `init`
    #[serde(rename = "default")]
    pub defaults: UiDefaults,
    /// Shell actions the client may trigger by index
    pub commands: Vec<CommandSpec>,
    /// Video capture device fed to the producer pipeline
    pub video_device: String,
    /// ALSA capture device fed to the producer pipeline
    pub audio_device: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8080".to_string(),
            ice_servers: vec![],
            defaults: UiDefaults::default(),
            commands: vec![],
            video_device: "/dev/video0".to_string(),
            audio_device: "hw:1".to_string(),
        }
    }
}

/// Feature toggles presented as defaults in the UI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiDefaults {
    pub remote_video: bool,
    pub relative_mouse: bool,
    pub absolute_mouse: bool,
    pub touch_screen: bool,
    pub keyboard: bool,
    pub gamepad: bool,
}

/// A named shell action, addressed by its position in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub command: String,
}

/// Load the configuration from a YAML file
pub fn load(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;

    serde_yaml::from_str(&text)
        .map_err(|e| AppError::Config(format!("Failed to parse {}: {}", path.display(), e)))
}
