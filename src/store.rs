//! Document store collaborator.
//!
//! The hosted store is reached through [`DocumentStore`]; [`MemoryStore`] keeps
//! everything in process for local runs and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::error::GameError;
use crate::types::*;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Revision mismatch: expected {expected}, found {actual}")]
    VersionMismatch { expected: u64, actual: u64 },

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => GameError::LobbyNotFound(id),
            StoreError::VersionMismatch { .. } => GameError::ConcurrentModification { attempts: 1 },
            other => GameError::Store(other.to_string()),
        }
    }
}

/// Fields written by a guarded lobby update
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyUpdate {
    pub game_state: String,
    pub status: LobbyStatus,
}

/// Change notification published after every lobby write
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyEvent {
    pub lobby_id: LobbyId,
    pub revision: u64,
    pub status: LobbyStatus,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_lobby(&self, lobby_id: &str) -> StoreResult<Lobby>;

    async fn find_lobby_by_code(&self, code: &str) -> StoreResult<Option<Lobby>>;

    async fn create_lobby(&self, lobby: Lobby) -> StoreResult<Lobby>;

    /// Write only if the stored revision still equals `expected_revision`
    async fn update_lobby(
        &self,
        lobby_id: &str,
        expected_revision: u64,
        update: LobbyUpdate,
    ) -> StoreResult<Lobby>;

    /// Players in join order
    async fn list_players(&self, lobby_id: &str) -> StoreResult<Vec<Player>>;

    async fn get_player(&self, lobby_id: &str, player_id: &str) -> StoreResult<Option<Player>>;

    async fn upsert_player(&self, player: Player) -> StoreResult<Player>;

    async fn delete_player(&self, lobby_id: &str, player_id: &str) -> StoreResult<()>;

    fn subscribe(&self) -> broadcast::Receiver<LobbyEvent>;
}

/// In-process document store
#[derive(Clone)]
pub struct MemoryStore {
    lobbies: Arc<RwLock<HashMap<LobbyId, Lobby>>>,
    players: Arc<RwLock<HashMap<LobbyId, Vec<Player>>>>,
    events: broadcast::Sender<LobbyEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            lobbies: Arc::new(RwLock::new(HashMap::new())),
            players: Arc::new(RwLock::new(HashMap::new())),
            events: tx,
        }
    }

    fn publish(&self, lobby: &Lobby) {
        // Nobody listening is fine
        let _ = self.events.send(LobbyEvent {
            lobby_id: lobby.id.clone(),
            revision: lobby.revision,
            status: lobby.status,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_lobby(&self, lobby_id: &str) -> StoreResult<Lobby> {
        self.lobbies
            .read()
            .await
            .get(lobby_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(lobby_id.to_string()))
    }

    async fn find_lobby_by_code(&self, code: &str) -> StoreResult<Option<Lobby>> {
        Ok(self
            .lobbies
            .read()
            .await
            .values()
            .find(|l| l.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    async fn create_lobby(&self, mut lobby: Lobby) -> StoreResult<Lobby> {
        let mut lobbies = self.lobbies.write().await;
        if lobbies.contains_key(&lobby.id) {
            return Err(StoreError::AlreadyExists(lobby.id));
        }
        lobby.revision = 1;
        lobby.updated_at = chrono::Utc::now().to_rfc3339();
        lobbies.insert(lobby.id.clone(), lobby.clone());
        drop(lobbies);

        self.publish(&lobby);
        Ok(lobby)
    }

    async fn update_lobby(
        &self,
        lobby_id: &str,
        expected_revision: u64,
        update: LobbyUpdate,
    ) -> StoreResult<Lobby> {
        let mut lobbies = self.lobbies.write().await;
        let lobby = lobbies
            .get_mut(lobby_id)
            .ok_or_else(|| StoreError::NotFound(lobby_id.to_string()))?;

        if lobby.revision != expected_revision {
            return Err(StoreError::VersionMismatch {
                expected: expected_revision,
                actual: lobby.revision,
            });
        }

        lobby.game_state = update.game_state;
        lobby.status = update.status;
        lobby.revision += 1;
        lobby.updated_at = chrono::Utc::now().to_rfc3339();
        let updated = lobby.clone();
        drop(lobbies);

        self.publish(&updated);
        Ok(updated)
    }

    async fn list_players(&self, lobby_id: &str) -> StoreResult<Vec<Player>> {
        Ok(self
            .players
            .read()
            .await
            .get(lobby_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_player(&self, lobby_id: &str, player_id: &str) -> StoreResult<Option<Player>> {
        Ok(self
            .players
            .read()
            .await
            .get(lobby_id)
            .and_then(|players| players.iter().find(|p| p.id == player_id))
            .cloned())
    }

    async fn upsert_player(&self, player: Player) -> StoreResult<Player> {
        let mut players = self.players.write().await;
        let members = players.entry(player.lobby_id.clone()).or_default();
        match members.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player.clone(),
            None => members.push(player.clone()),
        }
        Ok(player)
    }

    async fn delete_player(&self, lobby_id: &str, player_id: &str) -> StoreResult<()> {
        let mut players = self.players.write().await;
        let members = players
            .get_mut(lobby_id)
            .ok_or_else(|| StoreError::NotFound(player_id.to_string()))?;
        let before = members.len();
        members.retain(|p| p.id != player_id);
        if members.len() == before {
            return Err(StoreError::NotFound(player_id.to_string()));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<LobbyEvent> {
        self.events.subscribe()
    }
}

/// Spawn a background task that traces every lobby change the store publishes
pub fn spawn_change_logger(store: &dyn DocumentStore) {
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => tracing::debug!(
                    "Lobby {} now at revision {} ({:?})",
                    event.lobby_id,
                    event.revision,
                    event.status
                ),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("Change logger fell behind, skipped {} event(s)", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
