use crate::xml::XmlElement;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sender name the device expects on key-press commands
pub const KEY_SENDER: &str = "Gabbo";

/// HTTP resources exposed by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Info,
    NowPlaying,
    Volume,
    Sources,
    Presets,
    GetZone,
    Key,
    Select,
}

impl Endpoint {
    /// Request path of the resource
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Info => "/info",
            Endpoint::NowPlaying => "/now_playing",
            Endpoint::Volume => "/volume",
            Endpoint::Sources => "/sources",
            Endpoint::Presets => "/presets",
            Endpoint::GetZone => "/getZone",
            Endpoint::Key => "/key",
            Endpoint::Select => "/select",
        }
    }

    /// Root element name of the document the resource answers with
    pub fn root_element(self) -> Option<&'static str> {
        match self {
            Endpoint::Info => Some("info"),
            Endpoint::NowPlaying => Some("nowPlaying"),
            Endpoint::Volume => Some("volume"),
            Endpoint::Sources => Some("sourceItems"),
            Endpoint::Presets => Some("presets"),
            Endpoint::GetZone => Some("zone"),
            Endpoint::Key | Endpoint::Select => None,
        }
    }
}

/// Remote-control keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Power,
    Mute,
    Play,
    Pause,
    PlayPause,
    Stop,
    NextTrack,
    PrevTrack,
    VolumeUp,
    VolumeDown,
    AuxInput,
    Preset(u8),
}

impl Key {
    /// Key code as sent on the wire
    pub fn code(self) -> String {
        match self {
            Key::Power => "POWER".to_string(),
            Key::Mute => "MUTE".to_string(),
            Key::Play => "PLAY".to_string(),
            Key::Pause => "PAUSE".to_string(),
            Key::PlayPause => "PLAY_PAUSE".to_string(),
            Key::Stop => "STOP".to_string(),
            Key::NextTrack => "NEXT_TRACK".to_string(),
            Key::PrevTrack => "PREV_TRACK".to_string(),
            Key::VolumeUp => "VOLUME_UP".to_string(),
            Key::VolumeDown => "VOLUME_DOWN".to_string(),
            Key::AuxInput => "AUX_INPUT".to_string(),
            Key::Preset(index) => format!("PRESET_{}", index),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// Phase of a key-press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Press,
    Release,
}

impl KeyState {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyState::Press => "press",
            KeyState::Release => "release",
        }
    }
}

/// Body of a `POST /key` request
pub fn key_element(key: Key, state: KeyState) -> XmlElement {
    XmlElement::new("key")
        .with_attribute("state", state.as_str())
        .with_attribute("sender", KEY_SENDER)
        .with_text(key.code())
}

/// Body of a `POST /volume` request
pub fn volume_element(level: u8) -> XmlElement {
    XmlElement::new("volume").with_text(level.min(100).to_string())
}
