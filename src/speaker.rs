use crate::config::{DeviceSettings, ResolvedSource, VolumeMode};
use crate::error::{Result, SoundTouchError};
use crate::polling::RefreshTask;
use crate::protocol::Key;
use crate::subscription::{StateReceiver, StateUpdate};
use crate::traits::SpeakerControl;
use crate::types::{NowPlaying, PlayStatus};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::time::sleep;

/// Time the device needs after a power toggle before its reported source
/// can be trusted again
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Top of the volume scale exposed to the capability layer
pub const VOLUME_SCALE_MAX: u8 = 100;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Cached power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    /// Never observed
    #[default]
    Unknown,
    On,
    Off,
    /// A toggle was just sent; `observed` is what the device reported right
    /// after it
    Settling { observed: bool },
}

impl PowerState {
    fn confirmed(on: bool) -> Self {
        if on {
            PowerState::On
        } else {
            PowerState::Off
        }
    }

    /// Boolean view of the state, `None` while unknown
    pub fn is_on(self) -> Option<bool> {
        match self {
            PowerState::Unknown => None,
            PowerState::On => Some(true),
            PowerState::Off => Some(false),
            PowerState::Settling { observed } => Some(observed),
        }
    }
}

/// What the speaker is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentMediaState {
    Play,
    Pause,
    Stop,
    Loading,
}

impl CurrentMediaState {
    /// A speaker in standby is stopped; a missing play status is unknown
    pub fn from_now_playing(now_playing: &NowPlaying) -> Option<Self> {
        if now_playing.source.is_standby() {
            return Some(CurrentMediaState::Stop);
        }
        now_playing.play_status.map(|status| match status {
            PlayStatus::Play => CurrentMediaState::Play,
            PlayStatus::Pause => CurrentMediaState::Pause,
            PlayStatus::Buffering => CurrentMediaState::Loading,
            PlayStatus::Stop | PlayStatus::Unknown => CurrentMediaState::Stop,
        })
    }
}

/// What the speaker has been asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMediaState {
    Play,
    Pause,
    Stop,
}

impl TargetMediaState {
    /// Buffering counts as playing
    pub fn from_now_playing(now_playing: &NowPlaying) -> Option<Self> {
        if now_playing.source.is_standby() {
            return Some(TargetMediaState::Stop);
        }
        now_playing.play_status.map(|status| match status {
            PlayStatus::Play | PlayStatus::Buffering => TargetMediaState::Play,
            PlayStatus::Pause => TargetMediaState::Pause,
            PlayStatus::Stop | PlayStatus::Unknown => TargetMediaState::Stop,
        })
    }

    fn key(self) -> Key {
        match self {
            TargetMediaState::Play => Key::PlayPause,
            TargetMediaState::Pause => Key::Pause,
            TargetMediaState::Stop => Key::Stop,
        }
    }
}

/// Snapshot of the last published values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakerState {
    pub power: PowerState,
    pub muted: Option<bool>,
    pub volume: Option<u8>,
    pub current_media: Option<CurrentMediaState>,
    pub target_media: Option<TargetMediaState>,
}

/// Volume to apply for a requested level
///
/// Jumping straight to the top of the scale from a quiet level is almost
/// always an accidental slider swipe; such a request is replaced with the
/// louder of the prior level and `unmute_value`.
pub fn secure_volume(requested: u8, prior: u8, unmute_value: u8) -> u8 {
    if requested == VOLUME_SCALE_MAX && u16::from(prior) * 2 <= u16::from(VOLUME_SCALE_MAX) {
        prior.max(unmute_value)
    } else {
        requested
    }
}

/// One async lane per aspect; set operations on the same aspect queue up
#[derive(Default)]
struct Lanes {
    power: AsyncMutex<()>,
    mute: AsyncMutex<()>,
    volume: AsyncMutex<()>,
    media: AsyncMutex<()>,
}

struct SpeakerInner {
    name: String,
    api: Arc<dyn SpeakerControl>,
    settings: DeviceSettings,
    state: Mutex<SpeakerState>,
    lanes: Lanes,
    update_tx: broadcast::Sender<StateUpdate>,
    polling: Mutex<Option<RefreshTask>>,
}

/// State reconciliation engine for one speaker
///
/// A `Speaker` keeps the last value it published for each aspect (power,
/// mute, volume, current and target media) and reconciles it with what the
/// device reports. Setters only send a command when the device is not
/// already in the requested state; `refresh` re-reads the device and
/// publishes what changed.
///
/// Cloning is cheap and every clone drives the same device.
///
/// # Example
///
/// ```no_run
/// use soundtouch_control::{DeviceSettings, SoundTouchClient, Speaker};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = SoundTouchClient::new("192.168.1.100", 8090)?;
///     let speaker = Speaker::new("Kitchen", Arc::new(client), DeviceSettings::default());
///
///     let mut updates = speaker.subscribe();
///     speaker.refresh().await;
///     speaker.set_power(true).await?;
///     speaker.set_volume(30).await?;
///
///     while let Ok(update) = updates.recv().await {
///         println!("{:?}", update);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Speaker {
    inner: Arc<SpeakerInner>,
}

/// Non-owning handle used by the refresh task
#[derive(Clone)]
pub(crate) struct WeakSpeaker {
    inner: Weak<SpeakerInner>,
}

impl WeakSpeaker {
    pub(crate) fn upgrade(&self) -> Option<Speaker> {
        self.inner.upgrade().map(|inner| Speaker { inner })
    }
}

impl fmt::Debug for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Speaker")
            .field("name", &self.inner.name)
            .field("state", &*self.inner.state.lock())
            .finish()
    }
}

impl Speaker {
    pub fn new(
        name: impl Into<String>,
        api: Arc<dyn SpeakerControl>,
        settings: DeviceSettings,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(SpeakerInner {
                name: name.into(),
                api,
                settings,
                state: Mutex::new(SpeakerState::default()),
                lanes: Lanes::default(),
                update_tx,
                polling: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.inner.settings
    }

    /// Get a snapshot of every cached value
    pub fn state_snapshot(&self) -> SpeakerState {
        self.inner.state.lock().clone()
    }

    pub fn power_state(&self) -> PowerState {
        self.inner.state.lock().power
    }

    /// Cached power; off until observed
    pub fn power(&self) -> bool {
        self.power_state().is_on().unwrap_or(false)
    }

    pub fn mute(&self) -> bool {
        self.inner.state.lock().muted.unwrap_or(false)
    }

    pub fn volume(&self) -> u8 {
        self.inner.state.lock().volume.unwrap_or(0)
    }

    pub fn current_media(&self) -> CurrentMediaState {
        self.inner
            .state
            .lock()
            .current_media
            .unwrap_or(CurrentMediaState::Stop)
    }

    pub fn target_media(&self) -> TargetMediaState {
        self.inner
            .state
            .lock()
            .target_media
            .unwrap_or(TargetMediaState::Stop)
    }

    /// Subscribe to published value changes
    pub fn subscribe(&self) -> StateReceiver {
        StateReceiver::new(self.inner.update_tx.subscribe())
    }

    // ========== Lifecycle ==========

    /// Read every aspect once, then start polling if an interval is set
    pub async fn init(&self) {
        self.refresh().await;
        self.start_polling();
    }

    /// Start the periodic refresh loop
    ///
    /// Returns `false` when no polling interval is configured. Starting an
    /// already running loop does nothing.
    pub fn start_polling(&self) -> bool {
        let Some(interval) = self.inner.settings.polling_interval else {
            return false;
        };

        let mut polling = self.inner.polling.lock();
        if polling.is_none() {
            self.note(format_args!("Polling every {}ms", interval.as_millis()));
            *polling = Some(RefreshTask::start(self.downgrade(), interval));
        }
        true
    }

    /// Stop the periodic refresh loop, if running
    pub async fn stop_polling(&self) {
        let task = self.inner.polling.lock().take();
        if let Some(task) = task {
            task.stop().await;
        }
    }

    pub fn is_polling(&self) -> bool {
        self.inner.polling.lock().is_some()
    }

    pub(crate) fn downgrade(&self) -> WeakSpeaker {
        WeakSpeaker {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ========== Refresh ==========

    /// Re-read power, mute, volume and media and publish what changed
    ///
    /// Aspects with a set in flight are skipped. Failed queries keep the
    /// cached value.
    pub async fn refresh(&self) {
        self.refresh_power().await;
        self.refresh_volume().await;
        self.refresh_media().await;
    }

    async fn refresh_power(&self) {
        let Ok(_lane) = self.inner.lanes.power.try_lock() else {
            tracing::debug!("[{}] Power change in progress, skipping refresh", self.name());
            return;
        };

        match self.inner.api.get_source().await {
            Some(source) => self.store_power(PowerState::confirmed(!source.is_standby())),
            None => tracing::warn!("[{}] Could not refresh power state", self.name()),
        }
    }

    /// One volume query feeds both mute and volume
    async fn refresh_volume(&self) {
        let mute_lane = self.inner.lanes.mute.try_lock().ok();
        let volume_lane = if self.volume_enabled() {
            self.inner.lanes.volume.try_lock().ok()
        } else {
            None
        };
        if mute_lane.is_none() && volume_lane.is_none() {
            tracing::debug!("[{}] Mute and volume busy, skipping refresh", self.name());
            return;
        }

        let Some(volume) = self.inner.api.get_volume().await else {
            tracing::warn!("[{}] Could not refresh volume", self.name());
            return;
        };

        if mute_lane.is_some() {
            self.store_mute(volume.muted);
        }
        if volume_lane.is_some() {
            self.store_volume(volume.actual);
        }
    }

    async fn refresh_media(&self) {
        let Ok(_lane) = self.inner.lanes.media.try_lock() else {
            tracing::debug!("[{}] Media change in progress, skipping refresh", self.name());
            return;
        };

        let Some(now_playing) = self.inner.api.get_now_playing().await else {
            tracing::warn!("[{}] Could not refresh media state", self.name());
            return;
        };

        if let Some(current) = CurrentMediaState::from_now_playing(&now_playing) {
            self.store_current_media(current);
        }
        if let Some(target) = TargetMediaState::from_now_playing(&now_playing) {
            self.store_target_media(target);
        }
    }

    // ========== Power ==========

    /// Turn the speaker on or off
    ///
    /// Sends at most one power toggle, and only when the device is not
    /// already in the requested state. Returns after the settling delay.
    pub async fn set_power(&self, on: bool) -> Result<()> {
        let _lane = self.inner.lanes.power.lock().await;
        self.reconcile_power(on).await
    }

    /// Caller holds the power lane
    async fn reconcile_power(&self, on: bool) -> Result<()> {
        let mut current = self.power_state();
        if current == PowerState::Unknown {
            let source = self.inner.api.get_source().await.ok_or_else(|| {
                SoundTouchError::StatusUnavailable(format!("power state of {}", self.name()))
            })?;
            current = PowerState::confirmed(!source.is_standby());
            self.store_power(current);
        }

        if current.is_on() == Some(on) {
            tracing::debug!("[{}] Already {}", self.name(), on_off(on));
            return Ok(());
        }

        self.note(format_args!("Turning {}", on_off(on)));
        let pressed = self.inner.api.press_key(Key::Power).await;

        match &pressed {
            Ok(()) => match self.inner.api.get_source().await {
                Some(source) => self.store_power(PowerState::Settling {
                    observed: !source.is_standby(),
                }),
                None => {
                    tracing::warn!("[{}] Could not read power state after toggle", self.name());
                    self.store_power(PowerState::Unknown);
                }
            },
            Err(e) => {
                tracing::error!("[{}] Power toggle failed: {}", self.name(), e);
                self.store_power(PowerState::Unknown);
            }
        }

        sleep(SETTLE_DELAY).await;

        {
            let mut state = self.inner.state.lock();
            if let PowerState::Settling { observed } = state.power {
                state.power = PowerState::confirmed(observed);
            }
        }

        pressed
    }

    // ========== Mute ==========

    /// Mute or unmute the speaker
    ///
    /// While the speaker is off, unmuting does nothing and muting turns it
    /// on through the power path.
    pub async fn set_mute(&self, muted: bool) -> Result<()> {
        let _lane = self.inner.lanes.mute.lock().await;

        let observed_on = self.observe_power().await;
        let is_on = match observed_on {
            Some(on) => on,
            None => self.power_state().is_on().ok_or_else(|| {
                SoundTouchError::StatusUnavailable(format!("power state of {}", self.name()))
            })?,
        };

        if !is_on {
            if !muted {
                tracing::debug!("[{}] Off, nothing to unmute", self.name());
                return Ok(());
            }
            self.note(format_args!("Mute requested while off, turning on"));
            let _power = self.inner.lanes.power.lock().await;
            // A power change may have completed while waiting for the lane
            let on_now = self
                .inner
                .api
                .get_source()
                .await
                .map(|source| !source.is_standby())
                .unwrap_or(is_on);
            self.store_power(PowerState::confirmed(on_now));
            return self.reconcile_power(true).await;
        }

        let observed = match self.inner.api.get_volume().await {
            Some(volume) => {
                self.store_mute(volume.muted);
                volume.muted
            }
            None => self.inner.state.lock().muted.ok_or_else(|| {
                SoundTouchError::StatusUnavailable(format!("mute state of {}", self.name()))
            })?,
        };

        if observed == muted {
            tracing::debug!("[{}] Already {}", self.name(), muted_unmuted(muted));
            return Ok(());
        }

        self.note(format_args!("{}", if muted { "Muting" } else { "Unmuting" }));
        self.inner.api.press_key(Key::Mute).await.inspect_err(|e| {
            tracing::error!("[{}] Mute toggle failed: {}", self.name(), e);
        })?;
        self.store_mute(muted);
        Ok(())
    }

    /// Poll the source and cache the result unless a power change is in
    /// flight
    async fn observe_power(&self) -> Option<bool> {
        let on = self
            .inner
            .api
            .get_source()
            .await
            .map(|source| !source.is_standby())?;
        if let Ok(_power) = self.inner.lanes.power.try_lock() {
            self.store_power(PowerState::confirmed(on));
        }
        Some(on)
    }

    // ========== Volume ==========

    /// Set the volume on the 0-100 scale
    ///
    /// The level actually sent may differ from `level`: see
    /// [`secure_volume`] and the configured maximum.
    pub async fn set_volume(&self, level: u8) -> Result<()> {
        if !self.volume_enabled() {
            return Err(SoundTouchError::Configuration(format!(
                "volume control is disabled for {}",
                self.name()
            )));
        }

        let _lane = self.inner.lanes.volume.lock().await;

        let requested = level.min(VOLUME_SCALE_MAX);
        let volume = &self.inner.settings.volume;
        let prior = self.volume();
        let applied = secure_volume(requested, prior, volume.unmute_value).min(volume.max_value);

        if applied != requested {
            tracing::debug!(
                "[{}] Volume {} requested, applying {}",
                self.name(),
                requested,
                applied
            );
        }

        self.inner.api.set_volume(applied).await.inspect_err(|e| {
            tracing::error!("[{}] Volume change failed: {}", self.name(), e);
        })?;

        // The capability layer still shows the requested level
        if !self.store_volume(applied) && applied != requested {
            self.publish(StateUpdate::Volume(applied));
        }
        Ok(())
    }

    fn volume_enabled(&self) -> bool {
        self.inner.settings.volume.mode != VolumeMode::None
    }

    // ========== Media ==========

    /// Bring playback into the requested state
    pub async fn set_target_media(&self, target: TargetMediaState) -> Result<()> {
        let _lane = self.inner.lanes.media.lock().await;

        let now_playing = self.inner.api.get_now_playing().await.ok_or_else(|| {
            SoundTouchError::StatusUnavailable(format!("playback state of {}", self.name()))
        })?;

        if TargetMediaState::from_now_playing(&now_playing) == Some(target) {
            tracing::debug!("[{}] Already in {:?}", self.name(), target);
            self.store_target_media(target);
            return Ok(());
        }

        self.note(format_args!("Changing playback to {:?}", target));
        self.inner.api.press_key(target.key()).await.inspect_err(|e| {
            tracing::error!("[{}] Playback change failed: {}", self.name(), e);
        })?;
        self.store_target_media(target);
        Ok(())
    }

    /// Play a configured preset by its device slot
    pub async fn select_preset(&self, index: u8) -> Result<()> {
        let preset = self
            .inner
            .settings
            .presets
            .iter()
            .find(|p| p.index == index)
            .ok_or_else(|| {
                SoundTouchError::Configuration(format!(
                    "preset {} is not enabled on {}",
                    index,
                    self.name()
                ))
            })?;

        let _lane = self.inner.lanes.media.lock().await;
        self.note(format_args!("Selecting preset {}", preset.name));
        self.inner.api.press_key(Key::Preset(index)).await
    }

    /// Switch to a local source
    ///
    /// Nothing is sent when the source is already playing.
    pub async fn select_source(&self, source: &ResolvedSource) -> Result<()> {
        let known = self
            .inner
            .settings
            .sources
            .iter()
            .any(|s| s.enabled && s.source == source.source && s.account == source.account);
        if !known {
            return Err(SoundTouchError::Configuration(format!(
                "source {} is not enabled on {}",
                source.name,
                self.name()
            )));
        }

        let _lane = self.inner.lanes.media.lock().await;

        let playing = self
            .inner
            .api
            .get_now_playing()
            .await
            .and_then(|now_playing| now_playing.content_item)
            .is_some_and(|item| source.matches(&item));
        if playing {
            tracing::debug!("[{}] {} already selected", self.name(), source.name);
            return Ok(());
        }

        self.note(format_args!("Selecting source {}", source.name));
        self.inner.api.select(&source.content_item()).await
    }

    // ========== Publication ==========

    fn publish(&self, update: StateUpdate) {
        // No subscribers is fine
        let _ = self.inner.update_tx.send(update);
    }

    /// Cache a value and publish it if it changed; returns whether it did
    fn store<T: PartialEq + Copy>(
        &self,
        field: impl FnOnce(&mut SpeakerState) -> &mut Option<T>,
        value: T,
        update: impl FnOnce(T) -> StateUpdate,
    ) -> bool {
        let changed = {
            let mut state = self.inner.state.lock();
            let slot = field(&mut state);
            let changed = *slot != Some(value);
            *slot = Some(value);
            changed
        };
        if changed {
            self.publish(update(value));
        }
        changed
    }

    fn store_power(&self, next: PowerState) {
        let previous = std::mem::replace(&mut self.inner.state.lock().power, next);
        if let Some(on) = next.is_on() {
            if previous.is_on() != Some(on) {
                self.publish(StateUpdate::Power(on));
            }
        }
    }

    fn store_mute(&self, muted: bool) -> bool {
        self.store(|s| &mut s.muted, muted, StateUpdate::Mute)
    }

    fn store_volume(&self, level: u8) -> bool {
        self.store(|s| &mut s.volume, level, StateUpdate::Volume)
    }

    fn store_current_media(&self, media: CurrentMediaState) -> bool {
        self.store(|s| &mut s.current_media, media, StateUpdate::CurrentMedia)
    }

    fn store_target_media(&self, media: TargetMediaState) -> bool {
        self.store(|s| &mut s.target_media, media, StateUpdate::TargetMedia)
    }

    /// Action log line, promoted to info in verbose mode
    fn note(&self, message: fmt::Arguments<'_>) {
        if self.inner.settings.verbose {
            tracing::info!("[{}] {}", self.name(), message);
        } else {
            tracing::debug!("[{}] {}", self.name(), message);
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn muted_unmuted(muted: bool) -> &'static str {
    if muted {
        "muted"
    } else {
        "unmuted"
    }
}
