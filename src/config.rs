//! Configuration layers and their resolution into per-device settings.
//!
//! Three layers feed every device: the accessory entry, the global section
//! and the values reported by the device itself. Accessory values win over
//! global ones, which win over protocol defaults. Resolution happens once,
//! when the device is created; the result is an immutable [`DeviceSettings`].

use crate::error::Result;
use crate::types::{ContentItem, Preset, SourceItem};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fallback for `onValue` and `unmuteValue`
pub const DEFAULT_VOLUME_VALUE: u8 = 35;
/// Fallback for `maxValue`
pub const DEFAULT_MAX_VOLUME: u8 = 100;

/// How volume is exposed to the capability layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeMode {
    /// No volume control
    None,
    /// Volume as the brightness of a dimmable switch
    #[default]
    #[serde(alias = "lightbulb")]
    Dimmer,
    /// Explicit speaker volume
    Speaker,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeConfig {
    pub on_value: Option<u8>,
    pub max_value: Option<u8>,
    pub unmute_value: Option<u8>,
    pub mode: Option<VolumeMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetConfig {
    pub index: u8,
    pub name: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// PRODUCT, BLUETOOTH, AUX, ...
    pub source: String,
    /// TV, HDMI_1, ...
    pub account: Option<String>,
    pub name: Option<String>,
    pub enabled: Option<bool>,
}

/// Settings shared by every accessory unless overridden
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    pub verbose: Option<bool>,
    /// Polling interval in milliseconds; absent disables polling
    pub polling_interval: Option<u64>,
    pub volume: Option<VolumeConfig>,
    pub presets: Option<Vec<PresetConfig>>,
    pub sources: Option<Vec<SourceConfig>>,
}

/// One configured speaker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryConfig {
    /// Display name; defaults to the device's own name
    pub name: Option<String>,
    /// Room name used to find the speaker by discovery
    pub room: Option<String>,
    pub ip: Option<String>,
    pub port: Option<u16>,

    #[serde(flatten)]
    pub overrides: GlobalConfig,
}

/// Root of the configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    #[serde(default)]
    pub discover_all_accessories: bool,
    #[serde(default)]
    pub accessories: Vec<AccessoryConfig>,
    #[serde(default)]
    pub global: GlobalConfig,
}

impl PlatformConfig {
    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Resolved volume bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeSettings {
    pub on_value: u8,
    pub max_value: u8,
    pub unmute_value: u8,
    pub mode: VolumeMode,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            on_value: DEFAULT_VOLUME_VALUE,
            max_value: DEFAULT_MAX_VOLUME,
            unmute_value: DEFAULT_VOLUME_VALUE,
            mode: VolumeMode::default(),
        }
    }
}

/// A preset exposed to the capability layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPreset {
    /// Device slot number, 1-based
    pub index: u8,
    pub name: String,
}

/// A local source exposed to the capability layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub name: String,
    pub source: String,
    pub account: Option<String>,
    pub enabled: bool,
}

impl ResolvedSource {
    /// Payload that selects this source
    pub fn content_item(&self) -> ContentItem {
        ContentItem {
            source: self.source.clone(),
            source_account: self.account.clone().unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Whether `item` refers to this source
    pub fn matches(&self, item: &ContentItem) -> bool {
        item.source == self.source
            && item.source_account == self.account.as_deref().unwrap_or_default()
    }
}

/// Everything the reconciliation engine needs to know about one device
#[derive(Debug, Clone, Default)]
pub struct DeviceSettings {
    pub volume: VolumeSettings,
    pub polling_interval: Option<Duration>,
    pub verbose: bool,
    pub presets: Vec<ResolvedPreset>,
    pub sources: Vec<ResolvedSource>,
}

/// First config matching `predicate`, looking at accessory entries before
/// global ones
pub fn find_config<'a, C>(
    predicate: impl Fn(&C) -> bool,
    accessory: Option<&'a [C]>,
    global: Option<&'a [C]>,
) -> Option<&'a C> {
    accessory
        .and_then(|configs| configs.iter().find(|c| predicate(c)))
        .or_else(|| global.and_then(|configs| configs.iter().find(|c| predicate(c))))
}

pub fn resolve_verbose(global: &GlobalConfig, accessory: &AccessoryConfig) -> bool {
    accessory
        .overrides
        .verbose
        .or(global.verbose)
        .unwrap_or(false)
}

/// Polling interval; a zero interval disables polling like an absent one
pub fn resolve_polling_interval(
    global: &GlobalConfig,
    accessory: &AccessoryConfig,
) -> Option<Duration> {
    accessory
        .overrides
        .polling_interval
        .or(global.polling_interval)
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

pub fn resolve_volume(global: &GlobalConfig, accessory: &AccessoryConfig) -> VolumeSettings {
    let layers = [accessory.overrides.volume.as_ref(), global.volume.as_ref()];
    let pick = |field: fn(&VolumeConfig) -> Option<u8>| {
        layers.iter().flatten().find_map(|v| field(v))
    };

    let max_value = pick(|v| v.max_value)
        .unwrap_or(DEFAULT_MAX_VOLUME)
        .clamp(1, DEFAULT_MAX_VOLUME);
    let on_value = pick(|v| v.on_value).unwrap_or(DEFAULT_VOLUME_VALUE).min(max_value);
    let unmute_value = pick(|v| v.unmute_value).unwrap_or(on_value).min(max_value);
    let mode = layers
        .iter()
        .flatten()
        .find_map(|v| v.mode)
        .unwrap_or_default();

    VolumeSettings {
        on_value,
        max_value,
        unmute_value,
        mode,
    }
}

/// Apply preset configs to the presets reported by the device
///
/// Disabled presets are dropped; a configured name replaces the item name.
pub fn resolve_presets(
    device_presets: &[Preset],
    global: &GlobalConfig,
    accessory: &AccessoryConfig,
) -> Vec<ResolvedPreset> {
    device_presets
        .iter()
        .filter_map(|preset| {
            let config = find_config(
                |c: &PresetConfig| c.index == preset.id,
                accessory.overrides.presets.as_deref(),
                global.presets.as_deref(),
            );
            if config.and_then(|c| c.enabled) == Some(false) {
                return None;
            }

            let name = config
                .and_then(|c| c.name.clone())
                .or_else(|| preset.content_item.item_name.clone())
                .unwrap_or_else(|| format!("Preset {}", preset.id));

            Some(ResolvedPreset {
                index: preset.id,
                name,
            })
        })
        .collect()
}

/// Apply source configs to the local sources reported by the device
///
/// A config matches on the source and, when it names one, the account.
/// Unnamed sources are called "<device name> <source name>".
pub fn resolve_sources<'a>(
    local_sources: impl IntoIterator<Item = &'a SourceItem>,
    device_name: &str,
    global: &GlobalConfig,
    accessory: &AccessoryConfig,
) -> Vec<ResolvedSource> {
    local_sources
        .into_iter()
        .map(|item| {
            let config = find_config(
                |c: &SourceConfig| {
                    c.source == item.source
                        && c.account
                            .as_deref()
                            .is_none_or(|account| account == item.source_account)
                },
                accessory.overrides.sources.as_deref(),
                global.sources.as_deref(),
            );

            ResolvedSource {
                name: config
                    .and_then(|c| c.name.clone())
                    .unwrap_or_else(|| format!("{} {}", device_name, item.name)),
                source: item.source.clone(),
                account: Some(item.source_account.clone()).filter(|a| !a.is_empty()),
                enabled: config.and_then(|c| c.enabled) != Some(false),
            }
        })
        .collect()
}
