mod hub;
pub mod lifecycle;
pub mod match_state;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::SystemTime,
};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, watch};

use crate::{
    challonge::Challonge, config::AppConfig, dao::tournament_store::TournamentStore,
    error::ServiceError,
};

pub use self::hub::{EventHub, HubEvent, encode_frame};

pub type SharedState = Arc<AppState>;

/// Venue display registered over a socket.
#[derive(Debug, Clone)]
pub struct DisplayInfo {
    pub display_id: String,
    pub display_type: String,
    /// Socket the display registered from; cleared from the registry when it closes.
    pub connection_id: u64,
    pub connected_at: SystemTime,
}

/// Central application state storing connections and database handles.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn TournamentStore>>>,
    challonge: Option<Arc<dyn Challonge>>,
    hub: EventHub,
    displays: DashMap<String, DisplayInfo>,
    sockets: AtomicUsize,
    next_connection: AtomicUsize,
    degraded: watch::Sender<bool>,
    tournament_gates: DashMap<u64, Arc<Mutex<()>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, challonge: Option<Arc<dyn Challonge>>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            hub: EventHub::new(config.hub_capacity()),
            config,
            store: RwLock::new(None),
            challonge,
            displays: DashMap::new(),
            sockets: AtomicUsize::new(0),
            next_connection: AtomicUsize::new(1),
            degraded: degraded_tx,
            tournament_gates: DashMap::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn TournamentStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] while none is usable.
    pub async fn require_store(&self) -> Result<Arc<dyn TournamentStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn TournamentStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Challonge client, when an API key is configured.
    pub fn challonge(&self) -> Option<Arc<dyn Challonge>> {
        self.challonge.clone()
    }

    /// Broadcast hub feeding the WebSocket connections.
    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// Registry of displays keyed by their display id.
    pub fn displays(&self) -> &DashMap<String, DisplayInfo> {
        &self.displays
    }

    /// Track a newly opened socket and hand out its connection id.
    pub fn socket_opened(&self) -> u64 {
        self.sockets.fetch_add(1, Ordering::Relaxed);
        self.next_connection.fetch_add(1, Ordering::Relaxed) as u64
    }

    /// Forget a closed socket, returning the displays it had registered.
    pub fn socket_closed(&self, connection_id: u64) -> Vec<DisplayInfo> {
        self.sockets.fetch_sub(1, Ordering::Relaxed);
        let ids: Vec<String> = self
            .displays
            .iter()
            .filter(|entry| entry.connection_id == connection_id)
            .map(|entry| entry.key().clone())
            .collect();
        ids.into_iter()
            .filter_map(|id| self.displays.remove(&id).map(|(_, info)| info))
            .collect()
    }

    /// Number of open sockets.
    pub fn socket_count(&self) -> usize {
        self.sockets.load(Ordering::Relaxed)
    }

    /// Serialize writes to one tournament. Held across the read-modify-write of a request so
    /// concurrent reports on the same bracket cannot interleave.
    pub async fn lock_tournament(&self, tournament_id: u64) -> OwnedMutexGuard<()> {
        let gate = self
            .tournament_gates
            .entry(tournament_id)
            .or_default()
            .clone();
        gate.lock_owned().await
    }

    /// Drop the gate of a deleted tournament.
    pub fn forget_tournament(&self, tournament_id: u64) {
        self.tournament_gates.remove(&tournament_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::tournament_store::MemoryStore;

    #[tokio::test]
    async fn degraded_until_store_installed() {
        let state = AppState::new(AppConfig::default(), None);
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_store().await,
            Err(ServiceError::Degraded)
        ));

        let mut watcher = state.degraded_watcher();
        state.install_store(Arc::new(MemoryStore::new())).await;
        assert!(!state.is_degraded());
        assert!(watcher.has_changed().unwrap());
        assert!(state.require_store().await.is_ok());

        state.clear_store().await;
        assert!(state.is_degraded());
    }

    #[test]
    fn closing_a_socket_drops_its_displays() {
        let state = AppState::new(AppConfig::default(), None);
        let first = state.socket_opened();
        let second = state.socket_opened();
        for (id, connection_id) in [("lobby", first), ("stage", second)] {
            state.displays().insert(
                id.to_owned(),
                DisplayInfo {
                    display_id: id.to_owned(),
                    display_type: "match".to_owned(),
                    connection_id,
                    connected_at: SystemTime::now(),
                },
            );
        }

        let dropped = state.socket_closed(first);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].display_id, "lobby");
        assert_eq!(state.socket_count(), 1);
        assert!(state.displays().contains_key("stage"));
    }
}
