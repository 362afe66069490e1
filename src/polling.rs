use crate::speaker::WeakSpeaker;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// How long `stop` waits for an in-flight refresh to finish
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Background loop refreshing one speaker at a fixed interval
///
/// The loop ends when a stop is requested, when the handle is dropped, or
/// when the speaker it refreshes no longer exists.
pub(crate) struct RefreshTask {
    stop_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    pub(crate) fn start(speaker: WeakSpeaker, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = broadcast::channel::<()>(1);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Also fires when the sender is dropped
                    _ = stop_rx.recv() => {
                        tracing::debug!("Refresh task stopped");
                        break;
                    }
                    _ = sleep(interval) => {}
                }

                let Some(speaker) = speaker.upgrade() else {
                    tracing::debug!("Speaker dropped, ending refresh task");
                    break;
                };
                speaker.refresh().await;
            }
        });

        Self { stop_tx, handle }
    }

    /// Signal the loop and wait briefly for it to exit
    pub(crate) async fn stop(self) {
        let _ = self.stop_tx.send(());
        if timeout(STOP_GRACE, self.handle).await.is_err() {
            tracing::debug!("Refresh task still busy after stop request");
        }
    }
}
