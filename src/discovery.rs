use crate::error::{Result, SoundTouchError};
use crate::types::{DiscoveredSpeaker, DEFAULT_PORT};
use mdns_sd::{ResolvedService, ServiceDaemon, ServiceEvent};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// mDNS service type advertised by SoundTouch speakers (trailing dot required)
const SERVICE_TYPE: &str = "_soundtouch._tcp.local.";
const DEFAULT_BROWSE_WINDOW: Duration = Duration::from_secs(3);

/// mDNS discovery of SoundTouch speakers
///
/// Each call to [`search`](Discovery::search) is a finite scan: it collects
/// every speaker that resolves within the browse window and then stops
/// browsing.
///
/// # Example
///
/// ```no_run
/// use soundtouch_control::Discovery;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let discovery = Discovery::new()?;
///
///     for speaker in discovery.search().await? {
///         println!("Found speaker: {} at {}", speaker.name, speaker.host);
///     }
///
///     if let Some(kitchen) = discovery.find("Kitchen").await? {
///         let _client = kitchen.client()?;
///     }
///     Ok(())
/// }
/// ```
pub struct Discovery {
    daemon: ServiceDaemon,
    browse_window: Duration,
}

impl Discovery {
    /// Create a discovery handle with its own mDNS daemon
    pub fn new() -> Result<Self> {
        let daemon = ServiceDaemon::new().map_err(|e| SoundTouchError::Discovery(e.to_string()))?;
        Ok(Self {
            daemon,
            browse_window: DEFAULT_BROWSE_WINDOW,
        })
    }

    /// Change how long a scan waits for responders
    pub fn with_browse_window(mut self, window: Duration) -> Self {
        self.browse_window = window;
        self
    }

    /// Browse for speakers and return every responder seen within the window
    pub async fn search(&self) -> Result<Vec<DiscoveredSpeaker>> {
        tracing::debug!(
            "Browsing for {} for {}ms",
            SERVICE_TYPE,
            self.browse_window.as_millis()
        );

        let receiver = self
            .daemon
            .browse(SERVICE_TYPE)
            .map_err(|e| SoundTouchError::Discovery(e.to_string()))?;

        let mut speakers: BTreeMap<String, DiscoveredSpeaker> = BTreeMap::new();
        let start = Instant::now();

        while start.elapsed() < self.browse_window {
            let remaining = self.browse_window.saturating_sub(start.elapsed());

            match timeout(remaining, receiver.recv_async()).await {
                Ok(Ok(ServiceEvent::ServiceResolved(info))) => {
                    if let Some(speaker) = parse_resolved_service(&info) {
                        tracing::info!("Found speaker {} at {}", speaker.name, speaker.host);
                        speakers.insert(speaker.name.clone(), speaker);
                    }
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::debug!("mDNS receiver closed: {}", e);
                    break;
                }
                // Window elapsed
                Err(_) => break,
            }
        }

        if let Err(e) = self.daemon.stop_browse(SERVICE_TYPE) {
            tracing::warn!("Failed to stop mDNS browse: {}", e);
        }

        tracing::debug!("Discovery complete: {} speaker(s)", speakers.len());
        Ok(speakers.into_values().collect())
    }

    /// Scan and return the speaker whose room name matches `name`
    pub async fn find(&self, name: &str) -> Result<Option<DiscoveredSpeaker>> {
        let speakers = self.search().await?;
        Ok(speakers.into_iter().find(|speaker| speaker.name == name))
    }
}

impl Drop for Discovery {
    fn drop(&mut self) {
        let _ = self.daemon.shutdown();
    }
}

fn parse_resolved_service(info: &ResolvedService) -> Option<DiscoveredSpeaker> {
    let host = info
        .addresses
        .iter()
        .map(|addr| addr.to_ip_addr())
        .find(|ip| ip.is_ipv4())?
        .to_string();

    let name = instance_name(&info.fullname)?;
    let port = if info.port > 0 { info.port } else { DEFAULT_PORT };

    Some(DiscoveredSpeaker {
        name,
        host,
        port,
        mac_address: info
            .txt_properties
            .get_property_val_str("MAC")
            .map(str::to_string),
        model: info
            .txt_properties
            .get_property_val_str("MODEL")
            .map(str::to_string),
    })
}

/// Instance part of a full service name: `Kitchen._soundtouch._tcp.local.` -> `Kitchen`
fn instance_name(fullname: &str) -> Option<String> {
    let name = fullname
        .strip_suffix(SERVICE_TYPE)?
        .trim_end_matches('.')
        .replace("\\032", " ");

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
