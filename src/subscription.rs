use crate::error::{Result, SoundTouchError};
use crate::speaker::{CurrentMediaState, TargetMediaState};
use tokio::sync::broadcast;

/// A published value that changed, either after a set or during a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateUpdate {
    /// Speaker left or entered standby
    Power(bool),

    Mute(bool),

    /// Volume on the 0-100 scale
    Volume(u8),

    CurrentMedia(CurrentMediaState),

    TargetMedia(TargetMediaState),
}

/// Receiver for state updates of one speaker
pub struct StateReceiver {
    rx: broadcast::Receiver<StateUpdate>,
}

impl StateReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<StateUpdate>) -> Self {
        Self { rx }
    }

    /// Receive the next state update
    ///
    /// Fails with `UpdatesClosed` once the speaker has been dropped.
    pub async fn recv(&mut self) -> Result<StateUpdate> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => SoundTouchError::UpdatesClosed,
            broadcast::error::RecvError::Lagged(n) => {
                SoundTouchError::ChannelError(format!("Lagged by {} messages", n))
            }
        })
    }

    /// Try to receive a state update without blocking
    ///
    /// Returns `None` if no message is available.
    pub fn try_recv(&mut self) -> Result<Option<StateUpdate>> {
        match self.rx.try_recv() {
            Ok(update) => Ok(Some(update)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(SoundTouchError::UpdatesClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(SoundTouchError::ChannelError(format!("Lagged by {} messages", n)))
            }
        }
    }

    /// Drain every update already queued
    pub fn drain(&mut self) -> Vec<StateUpdate> {
        let mut updates = Vec::new();
        while let Ok(Some(update)) = self.try_recv() {
            updates.push(update);
        }
        updates
    }
}
