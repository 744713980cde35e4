use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{storage::StorageError, tournament_store::TournamentStore},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Exponential backoff between [`INITIAL_DELAY`] and [`MAX_DELAY`].
struct Backoff {
    delay: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            delay: INITIAL_DELAY,
        }
    }

    async fn wait(&mut self) {
        sleep(self.delay).await;
        self.delay = (self.delay * 2).min(MAX_DELAY);
    }

    fn reset(&mut self) {
        self.delay = INITIAL_DELAY;
    }
}

/// Connect to the tournament store, install it, and keep it healthy.
///
/// The shared state stays in degraded mode while no store is reachable. Once connected, the
/// store is probed every [`HEALTH_POLL_INTERVAL`]; a failed probe flips degraded mode on and
/// triggers in-place reconnects before falling back to a fresh `connect`.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn TournamentStore>, StorageError>> + Send,
{
    let mut backoff = Backoff::new();

    loop {
        match connect().await {
            Ok(store) => {
                state.install_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                backoff.reset();
                monitor(&state, store.as_ref()).await;
                warn!("storage lost; reconnecting from scratch");
                state.clear_store().await;
                backoff.wait().await;
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                backoff.wait().await;
            }
        }
    }
}

/// Probe `store` until it cannot be recovered in place.
async fn monitor(state: &SharedState, store: &dyn TournamentStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed; entering degraded mode");
                state.update_degraded(true);
                if !reconnect(store).await {
                    warn!("exhausted storage reconnect attempts; staying in degraded mode");
                    return;
                }
                info!("storage reconnection succeeded after health check failure");
                state.update_degraded(false);
            }
        }
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn reconnect(store: &dyn TournamentStore) -> bool {
    let mut backoff = Backoff::new();
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "storage reconnect attempt failed");
                backoff.wait().await;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, dao::tournament_store::MemoryStore, state::AppState};

    #[tokio::test]
    async fn installing_a_store_leaves_degraded_mode() {
        let state = AppState::new(AppConfig::default(), None);
        let mut degraded = state.degraded_watcher();
        let supervisor = tokio::spawn(run(state.clone(), || async {
            Ok(Arc::new(MemoryStore::new()) as Arc<dyn TournamentStore>)
        }));

        tokio::time::timeout(Duration::from_secs(2), degraded.wait_for(|value| !*value))
            .await
            .unwrap()
            .unwrap();
        assert!(state.require_store().await.is_ok());
        supervisor.abort();
    }
}
