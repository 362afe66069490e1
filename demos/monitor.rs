//! Monitor SoundTouch speakers and print every state change
//!
//! Usage: `cargo run --example monitor [config.json]`
//!
//! Without a config file every speaker found on the network is monitored
//! with default settings and a 5 second polling interval.

use soundtouch_control::{
    Discovery, GlobalConfig, PlatformConfig, SoundTouchDevice, Speaker, StateUpdate,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => PlatformConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => PlatformConfig {
            discover_all_accessories: true,
            global: GlobalConfig {
                polling_interval: Some(5000),
                ..Default::default()
            },
            ..Default::default()
        },
    };

    let discovery = Discovery::new()?;

    let devices = if config.discover_all_accessories {
        SoundTouchDevice::search_all(&config.global, &config.accessories, &discovery).await?
    } else {
        let mut devices = Vec::new();
        for accessory in &config.accessories {
            match SoundTouchDevice::from_config(&config.global, accessory, Some(&discovery)).await {
                Ok(device) => devices.push(device),
                Err(e) => eprintln!("Skipping accessory: {}", e),
            }
        }
        devices
    };

    if devices.is_empty() {
        println!("No speakers found");
        return Ok(());
    }

    let mut tasks = Vec::new();
    for device in devices {
        println!(
            "{} ({} at {}, firmware {})",
            device.name,
            device.endpoint.model,
            device.endpoint.host,
            device.endpoint.firmware_version.as_deref().unwrap_or("unknown"),
        );
        for preset in &device.settings.presets {
            println!("  preset {}: {}", preset.index, preset.name);
        }
        for source in device.settings.sources.iter().filter(|s| s.enabled) {
            println!("  source: {}", source.name);
        }

        let speaker = device.into_speaker();
        tasks.push(tokio::spawn(monitor(speaker)));
    }

    tokio::signal::ctrl_c().await?;
    for task in tasks {
        task.abort();
    }
    Ok(())
}

async fn monitor(speaker: Speaker) {
    let mut updates = speaker.subscribe();
    speaker.init().await;

    while let Ok(update) = updates.recv().await {
        let description = match update {
            StateUpdate::Power(on) => format!("power {}", if on { "on" } else { "off" }),
            StateUpdate::Mute(muted) => format!("muted: {}", muted),
            StateUpdate::Volume(level) => format!("volume {}", level),
            StateUpdate::CurrentMedia(state) => format!("playing: {:?}", state),
            StateUpdate::TargetMedia(state) => format!("target: {:?}", state),
        };
        println!("[{}] {}", speaker.name(), description);
    }
}
