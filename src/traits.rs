//! The seam between the reconciliation engine and the device.
//!
//! [`Speaker`](crate::Speaker) only talks to a `SpeakerControl`, so it can be
//! driven by [`SoundTouchClient`](crate::SoundTouchClient) in production and
//! by an in-memory fake in tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::Key;
use crate::types::{ContentItem, Info, NowPlaying, Preset, SourceStatus, Sources, Volume, Zone};

/// Status queries and commands supported by a speaker
///
/// Status getters return `None` when the device could not be reached or
/// answered with a document that does not decode; callers treat that as
/// "no data this cycle". Commands report failures as errors but never
/// confirm the resulting state: read it back with a getter.
#[async_trait]
pub trait SpeakerControl: Send + Sync {
    async fn get_info(&self) -> Option<Info>;

    async fn get_now_playing(&self) -> Option<NowPlaying>;

    async fn get_volume(&self) -> Option<Volume>;

    /// Active source, taken from `now_playing`
    async fn get_source(&self) -> Option<SourceStatus> {
        self.get_now_playing().await.map(|now_playing| now_playing.source)
    }

    async fn get_presets(&self) -> Option<Vec<Preset>>;

    async fn get_sources(&self) -> Option<Sources>;

    async fn get_zone(&self) -> Option<Zone>;

    /// Press and release a remote-control key
    async fn press_key(&self, key: Key) -> Result<()>;

    async fn set_volume(&self, level: u8) -> Result<()>;

    /// Start playing a content item (select a source)
    async fn select(&self, item: &ContentItem) -> Result<()>;
}
