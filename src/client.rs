use crate::connection::Connection;
use crate::decoders::{decode_list, FromElement, ToElement};
use crate::error::Result;
use crate::protocol::{key_element, volume_element, Endpoint, Key, KeyState};
use crate::traits::SpeakerControl;
use crate::types::{ContentItem, Info, NowPlaying, Preset, Sources, Volume, Zone};
use crate::xml::XmlElement;
use async_trait::async_trait;

/// Client for the HTTP API of one SoundTouch speaker
///
/// Status getters return `None` on any failure (unreachable device, HTTP
/// error, malformed or unexpected document) and log the reason. Commands
/// return errors.
///
/// # Example
///
/// ```no_run
/// use soundtouch_control::{SoundTouchClient, SpeakerControl, Key};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = SoundTouchClient::new("192.168.1.100", 8090)?;
///     if let Some(volume) = client.get_volume().await {
///         println!("volume {} (muted: {})", volume.actual, volume.muted);
///     }
///     client.press_key(Key::PlayPause).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SoundTouchClient {
    host: String,
    port: u16,
    connection: Connection,
}

impl SoundTouchClient {
    /// Create a client for the speaker at the given address and port
    ///
    /// No request is made; the default port is 8090.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        let connection = Connection::new(&host, port)?;

        Ok(Self {
            host,
            port,
            connection,
        })
    }

    /// Get the speaker's address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the speaker's port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        self.connection.base_url()
    }

    /// Fetch a resource and return its root element, if it is the expected one
    async fn fetch(&self, endpoint: Endpoint) -> Option<XmlElement> {
        let root = match self.connection.get(endpoint).await {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!("{} query to {} failed: {}", endpoint.path(), self.host, e);
                return None;
            }
        };

        match endpoint.root_element() {
            Some(expected) if root.name() != expected => {
                tracing::warn!(
                    "{} query to {} answered with <{}> instead of <{}>",
                    endpoint.path(),
                    self.host,
                    root.name(),
                    expected
                );
                None
            }
            _ => Some(root),
        }
    }

    async fn fetch_decoded<T: FromElement>(&self, endpoint: Endpoint) -> Option<T> {
        let root = self.fetch(endpoint).await?;
        let decoded = T::from_element(&root);
        if decoded.is_none() {
            tracing::debug!("Incomplete {} document from {}", endpoint.path(), self.host);
        }
        decoded
    }
}

#[async_trait]
impl SpeakerControl for SoundTouchClient {
    async fn get_info(&self) -> Option<Info> {
        self.fetch_decoded(Endpoint::Info).await
    }

    async fn get_now_playing(&self) -> Option<NowPlaying> {
        self.fetch_decoded(Endpoint::NowPlaying).await
    }

    async fn get_volume(&self) -> Option<Volume> {
        self.fetch_decoded(Endpoint::Volume).await
    }

    async fn get_presets(&self) -> Option<Vec<Preset>> {
        let root = self.fetch(Endpoint::Presets).await?;
        Some(decode_list(&root, "preset"))
    }

    async fn get_sources(&self) -> Option<Sources> {
        self.fetch_decoded(Endpoint::Sources).await
    }

    async fn get_zone(&self) -> Option<Zone> {
        self.fetch_decoded(Endpoint::GetZone).await
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        tracing::debug!("Pressing {} on {}", key, self.host);
        self.connection
            .post(Endpoint::Key, &key_element(key, KeyState::Press))
            .await?;
        self.connection
            .post(Endpoint::Key, &key_element(key, KeyState::Release))
            .await
    }

    async fn set_volume(&self, level: u8) -> Result<()> {
        self.connection
            .post(Endpoint::Volume, &volume_element(level))
            .await
    }

    async fn select(&self, item: &ContentItem) -> Result<()> {
        self.connection
            .post(Endpoint::Select, &item.to_element())
            .await
    }
}
