use serde::{Deserialize, Serialize};
use std::fmt;

/// Device identifier (the MAC-derived `deviceID` reported by the speaker)
pub type DeviceId = String;

/// Volume level on the device's 0-100 scale
pub type VolumeLevel = u8;

/// Default port of the SoundTouch Web API
pub const DEFAULT_PORT: u16 = 8090;

/// A resolved device endpoint. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    pub host: String,
    pub port: u16,
    pub device_id: DeviceId,
    pub model: String,
    pub firmware_version: Option<String>,
}

/// A reference to something playable
///
/// Used both for what is currently playing and as the payload of a
/// `select` command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentItem {
    pub source: String,

    /// Empty when the device reports no account
    pub source_account: String,

    pub location: Option<String>,
    pub item_name: Option<String>,
    pub is_presetable: Option<bool>,
    pub container_art: Option<String>,
}

/// Playback status reported by `now_playing`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayStatus {
    Play,
    Pause,
    Stop,
    Buffering,
    Unknown,
}

impl PlayStatus {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "PLAY_STATE" => PlayStatus::Play,
            "PAUSE_STATE" => PlayStatus::Pause,
            "STOP_STATE" => PlayStatus::Stop,
            "BUFFERING_STATE" => PlayStatus::Buffering,
            _ => PlayStatus::Unknown,
        }
    }
}

/// Active input of the device
///
/// `Standby` is the only signal that the device is powered off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceStatus {
    Standby,
    Invalid,
    Aux,
    Bluetooth,
    Product,
    InternetRadio,
    LocalInternetRadio,
    StoredMusic,
    Spotify,
    TuneIn,
    Amazon,
    Deezer,
    IHeart,
    Pandora,
    Update,
    Other(String),
}

impl SourceStatus {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "STANDBY" => SourceStatus::Standby,
            "INVALID_SOURCE" => SourceStatus::Invalid,
            "AUX" => SourceStatus::Aux,
            "BLUETOOTH" => SourceStatus::Bluetooth,
            "PRODUCT" => SourceStatus::Product,
            "INTERNET_RADIO" => SourceStatus::InternetRadio,
            "LOCAL_INTERNET_RADIO" => SourceStatus::LocalInternetRadio,
            "STORED_MUSIC" => SourceStatus::StoredMusic,
            "SPOTIFY" => SourceStatus::Spotify,
            "TUNEIN" => SourceStatus::TuneIn,
            "AMAZON" => SourceStatus::Amazon,
            "DEEZER" => SourceStatus::Deezer,
            "IHEART" => SourceStatus::IHeart,
            "PANDORA" => SourceStatus::Pandora,
            "UPDATE" => SourceStatus::Update,
            other => SourceStatus::Other(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            SourceStatus::Standby => "STANDBY",
            SourceStatus::Invalid => "INVALID_SOURCE",
            SourceStatus::Aux => "AUX",
            SourceStatus::Bluetooth => "BLUETOOTH",
            SourceStatus::Product => "PRODUCT",
            SourceStatus::InternetRadio => "INTERNET_RADIO",
            SourceStatus::LocalInternetRadio => "LOCAL_INTERNET_RADIO",
            SourceStatus::StoredMusic => "STORED_MUSIC",
            SourceStatus::Spotify => "SPOTIFY",
            SourceStatus::TuneIn => "TUNEIN",
            SourceStatus::Amazon => "AMAZON",
            SourceStatus::Deezer => "DEEZER",
            SourceStatus::IHeart => "IHEART",
            SourceStatus::Pandora => "PANDORA",
            SourceStatus::Update => "UPDATE",
            SourceStatus::Other(other) => other,
        }
    }

    /// Whether this source means the speaker is in standby (off)
    pub fn is_standby(&self) -> bool {
        matches!(self, SourceStatus::Standby)
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Availability of an entry in the device's source list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceAvailability {
    Ready,
    Unavailable,
    Unknown,
}

impl SourceAvailability {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "READY" => SourceAvailability::Ready,
            "UNAVAILABLE" => SourceAvailability::Unavailable,
            _ => SourceAvailability::Unknown,
        }
    }
}

/// Cover art download status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtStatus {
    Invalid,
    ShowDefaultImage,
    Downloading,
    ImagePresent,
    Unknown,
}

impl ArtStatus {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "INVALID" => ArtStatus::Invalid,
            "SHOW_DEFAULT_IMAGE" => ArtStatus::ShowDefaultImage,
            "DOWNLOADING" => ArtStatus::Downloading,
            "IMAGE_PRESENT" => ArtStatus::ImagePresent,
            _ => ArtStatus::Unknown,
        }
    }
}

/// Cover art of the current item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Art {
    pub status: ArtStatus,
    pub url: String,
}

/// Connection state of sources that pair with a remote device (Bluetooth)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionStatusInfo {
    pub status: Option<String>,
    pub device_name: Option<String>,
}

/// Result of a `now_playing` query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub device_id: Option<DeviceId>,
    pub source: SourceStatus,
    pub content_item: Option<ContentItem>,
    pub track: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub station_name: Option<String>,
    pub art: Option<Art>,
    pub play_status: Option<PlayStatus>,
    pub connection_status: Option<ConnectionStatusInfo>,
}

/// Result of a `volume` query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Requested level; the device ramps towards it
    pub target: VolumeLevel,

    /// Level currently applied
    pub actual: VolumeLevel,

    pub muted: bool,
}

/// A preset slot reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    /// Device-assigned slot number, 1-based
    pub id: u8,
    pub content_item: ContentItem,
}

/// An entry of the device's source list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub name: String,
    pub source: String,
    pub source_account: String,
    pub status: SourceAvailability,
    pub is_local: bool,
    pub multiroom_allowed: bool,
}

/// Result of a `sources` query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sources {
    pub device_id: DeviceId,
    pub items: Vec<SourceItem>,
}

impl Sources {
    /// Sources that belong to the speaker itself (AUX, Bluetooth, TV inputs)
    pub fn local(&self) -> impl Iterator<Item = &SourceItem> {
        self.items.iter().filter(|item| item.is_local)
    }
}

/// A member of a multi-room zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneMember {
    pub device_id: DeviceId,
    pub ip_address: Option<String>,
}

/// Multi-room grouping state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub master: DeviceId,
    pub members: Vec<ZoneMember>,
}

/// Hardware component reported by `info`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Component {
    pub category: Option<String>,
    pub software_version: Option<String>,
    pub serial_number: Option<String>,
}

/// Network interface reported by `info`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub kind: Option<String>,
    pub mac_address: Option<String>,
    pub ip_address: Option<String>,
}

/// Result of an `info` query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub device_id: DeviceId,
    pub name: String,
    pub model: String,
    pub components: Vec<Component>,
    pub network: Vec<NetworkInfo>,
}

impl Info {
    /// Firmware version of the main board: the component whose serial
    /// number matches the device id, else the SCM component
    pub fn firmware_version(&self) -> Option<&str> {
        self.components
            .iter()
            .find(|c| {
                c.serial_number
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(&self.device_id))
            })
            .or_else(|| {
                self.components
                    .iter()
                    .find(|c| c.category.as_deref() == Some("SCM"))
            })
            .and_then(|c| c.software_version.as_deref())
    }

    /// Whether any network interface reports this IP address
    pub fn has_ip(&self, ip: &str) -> bool {
        self.network
            .iter()
            .any(|n| n.ip_address.as_deref() == Some(ip))
    }
}

/// A speaker found by mDNS discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredSpeaker {
    /// Room name the speaker advertises
    pub name: String,
    pub host: String,
    pub port: u16,
    pub mac_address: Option<String>,
    pub model: Option<String>,
}

impl DiscoveredSpeaker {
    /// Create a client for this discovered speaker
    pub fn client(&self) -> crate::error::Result<crate::client::SoundTouchClient> {
        crate::client::SoundTouchClient::new(self.host.as_str(), self.port)
    }
}
