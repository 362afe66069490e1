//! Device creation: resolve where a configured speaker lives, read what it
//! offers and freeze the settings the engine will use.

use crate::client::SoundTouchClient;
use crate::config::{
    resolve_polling_interval, resolve_presets, resolve_sources, resolve_verbose, resolve_volume,
    AccessoryConfig, DeviceSettings, GlobalConfig,
};
use crate::discovery::Discovery;
use crate::error::{Result, SoundTouchError};
use crate::speaker::Speaker;
use crate::traits::SpeakerControl;
use crate::types::{DeviceEndpoint, Info, DEFAULT_PORT};
use futures_util::future::join_all;
use std::sync::Arc;

/// A speaker that has been located and configured
#[derive(Debug, Clone)]
pub struct SoundTouchDevice {
    /// Display name
    pub name: String,
    pub endpoint: DeviceEndpoint,
    pub settings: DeviceSettings,
    pub client: SoundTouchClient,
}

impl SoundTouchDevice {
    /// Create the device described by one accessory entry
    ///
    /// The speaker is addressed by `ip` when given, otherwise it is looked up
    /// by `room` through mDNS (with a short-lived `Discovery` when none is
    /// passed). Fails with a configuration error when neither is set, and
    /// with `DeviceNotFound` when the speaker does not answer.
    pub async fn from_config(
        global: &GlobalConfig,
        accessory: &AccessoryConfig,
        discovery: Option<&Discovery>,
    ) -> Result<Self> {
        let client = match (&accessory.ip, &accessory.room) {
            (Some(ip), _) => {
                SoundTouchClient::new(ip.as_str(), accessory.port.unwrap_or(DEFAULT_PORT))?
            }
            (None, Some(room)) => {
                let found = match discovery {
                    Some(discovery) => discovery.find(room).await?,
                    None => Discovery::new()?.find(room).await?,
                };
                found
                    .ok_or_else(|| SoundTouchError::DeviceNotFound(room.clone()))?
                    .client()?
            }
            (None, None) => {
                return Err(SoundTouchError::Configuration(
                    "accessory needs an ip or a room".to_string(),
                ))
            }
        };

        let info = client
            .get_info()
            .await
            .ok_or_else(|| SoundTouchError::DeviceNotFound(client.host().to_string()))?;

        Self::from_api(client, info, global, accessory).await
    }

    /// Create a device for every speaker found on the network
    ///
    /// A speaker picks up the accessory entry whose room matches its name or
    /// whose ip is one of its addresses. Speakers that fail to initialize
    /// are logged and left out.
    pub async fn search_all(
        global: &GlobalConfig,
        accessories: &[AccessoryConfig],
        discovery: &Discovery,
    ) -> Result<Vec<Self>> {
        let found = discovery.search().await?;

        let lookups = found.into_iter().map(|speaker| async move {
            let client = speaker.client()?;
            let info = client
                .get_info()
                .await
                .ok_or_else(|| SoundTouchError::DeviceNotFound(speaker.name.clone()))?;

            let default_accessory = AccessoryConfig::default();
            let accessory = accessories
                .iter()
                .find(|a| {
                    a.room.as_deref() == Some(info.name.as_str())
                        || a.ip.as_deref().is_some_and(|ip| info.has_ip(ip))
                })
                .unwrap_or(&default_accessory);

            Self::from_api(client, info, global, accessory).await
        });

        let devices = join_all(lookups)
            .await
            .into_iter()
            .filter_map(|result| match result {
                Ok(device) => Some(device),
                Err(e) => {
                    tracing::warn!("Skipping speaker: {}", e);
                    None
                }
            })
            .collect();

        Ok(devices)
    }

    /// Resolve settings from the configuration and the device's own lists
    pub async fn from_api(
        client: SoundTouchClient,
        info: Info,
        global: &GlobalConfig,
        accessory: &AccessoryConfig,
    ) -> Result<Self> {
        let name = accessory.name.clone().unwrap_or_else(|| info.name.clone());
        let verbose = resolve_verbose(global, accessory);

        log_setup(
            verbose,
            &name,
            format_args!("Found {} at {}:{}", info.model, client.host(), client.port()),
        );

        let device_presets = client.get_presets().await.unwrap_or_default();
        let presets = resolve_presets(&device_presets, global, accessory);
        for preset in &presets {
            log_setup(
                verbose,
                &name,
                format_args!("Preset {}: {}", preset.index, preset.name),
            );
        }

        let sources = client.get_sources().await.ok_or_else(|| {
            SoundTouchError::Configuration(format!("could not read the source list of {}", name))
        })?;
        let sources = resolve_sources(sources.local(), &info.name, global, accessory);
        for source in sources.iter().filter(|s| s.enabled) {
            log_setup(verbose, &name, format_args!("Source: {}", source.name));
        }

        let endpoint = DeviceEndpoint {
            host: client.host().to_string(),
            port: client.port(),
            device_id: info.device_id.clone(),
            model: info.model.clone(),
            firmware_version: info.firmware_version().map(str::to_string),
        };

        Ok(Self {
            name,
            endpoint,
            settings: DeviceSettings {
                volume: resolve_volume(global, accessory),
                polling_interval: resolve_polling_interval(global, accessory),
                verbose,
                presets,
                sources,
            },
            client,
        })
    }

    /// Build the reconciliation engine for this device
    pub fn into_speaker(self) -> Speaker {
        Speaker::new(self.name, Arc::new(self.client), self.settings)
    }
}

fn log_setup(verbose: bool, name: &str, message: std::fmt::Arguments<'_>) {
    if verbose {
        tracing::info!("[{}] {}", name, message);
    } else {
        tracing::debug!("[{}] {}", name, message);
    }
}
