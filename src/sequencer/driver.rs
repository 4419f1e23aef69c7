use std::sync::Arc;

use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::{ActionSequencer, SequencerSnapshot};
use crate::catalog::SourceAvailability;

/// Drives an [`ActionSequencer`] in real time.
///
/// The virtual clock is pinned to tokio time since the handle was created. A
/// pump task sleeps until the next due step, fires it and publishes a fresh
/// [`SequencerSnapshot`] to subscribers. Dropping the handle stops the pump.
pub struct SequencerHandle {
    inner: Arc<Mutex<ActionSequencer>>,
    origin: Instant,
    wake: Arc<Notify>,
    tx: Arc<watch::Sender<SequencerSnapshot>>,
    pump: JoinHandle<()>,
}

impl SequencerHandle {
    /// Take ownership of a sequencer and spawn its pump.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(sequencer: ActionSequencer) -> Self {
        let origin = Instant::now();
        let (tx, _rx) = watch::channel(sequencer.snapshot());
        let inner = Arc::new(Mutex::new(sequencer));
        let wake = Arc::new(Notify::new());
        let tx = Arc::new(tx);

        let pump = tokio::spawn(pump(inner.clone(), origin, wake.clone(), tx.clone()));

        Self {
            inner,
            origin,
            wake,
            tx,
            pump,
        }
    }

    /// Start a run and return the snapshot right after.
    pub async fn start(&self, scenario_key: &str, active: &SourceAvailability) -> SequencerSnapshot {
        let mut sequencer = self.inner.lock().await;
        sequencer.advance_to(self.origin.elapsed());
        sequencer.start(scenario_key, active);
        self.publish(&sequencer)
    }

    /// Reset the sequencer and return the idle snapshot.
    pub async fn reset(&self) -> SequencerSnapshot {
        let mut sequencer = self.inner.lock().await;
        sequencer.advance_to(self.origin.elapsed());
        sequencer.reset();
        self.publish(&sequencer)
    }

    fn publish(&self, sequencer: &ActionSequencer) -> SequencerSnapshot {
        let snapshot = sequencer.snapshot();
        self.tx.send_replace(snapshot.clone());
        self.wake.notify_one();
        snapshot
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SequencerSnapshot> {
        self.tx.subscribe()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SequencerSnapshot {
        self.tx.borrow().clone()
    }
}

impl Drop for SequencerHandle {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn pump(
    inner: Arc<Mutex<ActionSequencer>>,
    origin: Instant,
    wake: Arc<Notify>,
    tx: Arc<watch::Sender<SequencerSnapshot>>,
) {
    loop {
        let next_due = inner.lock().await.next_due();

        let Some(due) = next_due else {
            wake.notified().await;
            continue;
        };

        tokio::select! {
            _ = tokio::time::sleep_until(origin + due) => {
                let mut sequencer = inner.lock().await;
                let now = origin.elapsed().max(due);
                sequencer.advance_to(now);
                debug!(at_ms = now.as_millis() as u64, state = %sequencer.state(), "Pump fired");
                tx.send_replace(sequencer.snapshot());
            }
            _ = wake.notified() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ScenarioCatalog, SourceKey};
    use crate::config::SequencerConfig;
    use crate::sequencer::SequencerState;
    use std::time::Duration;

    fn handle() -> SequencerHandle {
        SequencerHandle::spawn(ActionSequencer::new(
            Arc::new(ScenarioCatalog::new()),
            SequencerConfig::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_to_completion_in_real_time() {
        let handle = handle();
        let mut rx = handle.subscribe();
        let started = Instant::now();

        let snapshot = handle
            .start(
                "checkout-drop",
                &SourceAvailability::with_active([SourceKey::Analytics]),
            )
            .await;
        assert_eq!(snapshot.state, SequencerState::Intro);

        let done = rx
            .wait_for(|s| s.state == SequencerState::Complete)
            .await
            .unwrap()
            .clone();

        assert_eq!(done.actions.len(), 9);
        assert!(done.revealed);
        assert!(started.elapsed() >= Duration::from_millis(10200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_progress_is_visible() {
        let handle = handle();
        handle
            .start(
                "api-error-spike",
                &SourceAvailability::with_active([SourceKey::Analytics]),
            )
            .await;

        tokio::time::sleep(Duration::from_millis(2000)).await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.actions.len(), 2);
        assert_eq!(snapshot.state, SequencerState::Intro);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_mid_run_stays_empty() {
        let handle = handle();
        handle
            .start(
                "checkout-drop",
                &SourceAvailability::with_active(SourceKey::ALL),
            )
            .await;

        tokio::time::sleep(Duration::from_millis(6000)).await;
        assert_eq!(handle.snapshot().state, SequencerState::SourceCheck);

        let snapshot = handle.reset().await;
        assert_eq!(snapshot.state, SequencerState::Idle);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let snapshot = handle.snapshot();
        assert!(snapshot.actions.is_empty());
        assert_eq!(snapshot.state, SequencerState::Idle);
        assert!(snapshot.outcome.is_none());
    }
}
