//! Rust library for controlling Bose SoundTouch networked speakers
//!
//! This library bridges idempotent smart-home controls (power, mute,
//! volume, playback) onto SoundTouch speakers, whose HTTP API mostly offers
//! remote-control key presses that toggle state. It supports:
//!
//! - Discovery via mDNS (`_soundtouch._tcp`)
//! - Typed status queries over the local HTTP API (port 8090)
//! - Key presses, volume changes and source selection
//! - Reconciliation of desired values against polled device state
//! - Layered configuration (accessory > global > defaults)
//! - Real-time state update subscriptions
//!
//! # Quick Start
//!
//! ```no_run
//! use soundtouch_control::{AccessoryConfig, Discovery, GlobalConfig, SoundTouchDevice};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let discovery = Discovery::new()?;
//!     let accessory = AccessoryConfig {
//!         room: Some("Kitchen".to_string()),
//!         ..Default::default()
//!     };
//!
//!     let device =
//!         SoundTouchDevice::from_config(&GlobalConfig::default(), &accessory, Some(&discovery)).await?;
//!     let speaker = device.into_speaker();
//!
//!     let mut updates = speaker.subscribe();
//!     speaker.init().await;
//!
//!     speaker.set_power(true).await?;
//!     speaker.set_volume(25).await?;
//!
//!     while let Ok(update) = updates.recv().await {
//!         println!("State update: {:?}", update);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Direct Connection
//!
//! If you know the IP address of a speaker, you can talk to it directly:
//!
//! ```no_run
//! use soundtouch_control::{Key, SoundTouchClient, SpeakerControl};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SoundTouchClient::new("192.168.1.100", 8090)?;
//!     if let Some(now_playing) = client.get_now_playing().await {
//!         println!("Source: {}", now_playing.source);
//!     }
//!     client.press_key(Key::Preset(1)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized into several layers:
//!
//! - **Config / Device**: configuration layers resolved into per-device settings
//! - **Speaker**: reconciliation engine with per-aspect lanes and polling
//! - **Client**: typed queries and commands behind the `SpeakerControl` trait
//! - **Connection**: HTTP transport
//! - **Decoders / Protocol**: typed records and command payloads
//! - **XML**: element tree codec

mod client;
mod config;
mod connection;
mod decoders;
mod device;
mod discovery;
mod error;
mod polling;
mod protocol;
mod speaker;
mod subscription;
mod traits;
mod types;
mod xml;

// Public exports
pub use client::SoundTouchClient;
pub use config::{
    find_config, resolve_polling_interval, resolve_presets, resolve_sources, resolve_verbose,
    resolve_volume, AccessoryConfig, DeviceSettings, GlobalConfig, PlatformConfig, PresetConfig,
    ResolvedPreset, ResolvedSource, SourceConfig, VolumeConfig, VolumeMode, VolumeSettings,
};
pub use decoders::{decode_list, FromElement, ToElement};
pub use device::SoundTouchDevice;
pub use discovery::Discovery;
pub use error::{Result, SoundTouchError};
pub use protocol::{Key, KeyState};
pub use speaker::{
    secure_volume, CurrentMediaState, PowerState, Speaker, SpeakerState, TargetMediaState,
    SETTLE_DELAY, VOLUME_SCALE_MAX,
};
pub use subscription::{StateReceiver, StateUpdate};
pub use traits::SpeakerControl;
pub use types::{
    Art, ArtStatus, Component, ConnectionStatusInfo, ContentItem, DeviceEndpoint, DeviceId,
    DiscoveredSpeaker, Info, NetworkInfo, NowPlaying, PlayStatus, Preset, SourceAvailability,
    SourceItem, SourceStatus, Sources, Volume, VolumeLevel, Zone, ZoneMember, DEFAULT_PORT,
};
pub use xml::XmlElement;
