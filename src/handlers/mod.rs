//! Game service: authorizes callers and runs engine operations under the
//! concurrency guard.
//!
//! Role checks that depend on the game (judge, membership) run inside the
//! guarded closure so they see the snapshot that ends up being written.

mod host;
mod judge;
mod player;

pub use host::{BotAdded, Converted, ResetOutcome, StartOutcome};

use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::Caller;
use crate::deck::CardCatalog;
use crate::error::{GameError, GameResult};
use crate::guard::{self, RetryPolicy};
use crate::state::{encode_game_state, GameState, GameView};
use crate::store::DocumentStore;
use crate::types::*;

/// Safe character set for join codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;
const MAX_NAME_LENGTH: usize = 32;

/// Generate a random join code (5 characters)
fn generate_short_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Bot ids live in their own namespace
fn require_human_id(caller: &Caller) -> GameResult<()> {
    if is_bot_id(caller.id()) {
        return Err(GameError::forbidden("user ids starting with 'bot-' are reserved"));
    }
    Ok(())
}

fn clean_name(name: &str) -> GameResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidPlayerName("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(GameError::InvalidPlayerName(format!(
            "at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Outcome of a committed mutation together with the new lobby revision
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Applied<T> {
    #[serde(flatten)]
    pub outcome: T,
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyCreated {
    pub lobby_id: LobbyId,
    pub code: String,
    pub player_id: PlayerId,
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Joined {
    pub lobby_id: LobbyId,
    pub player_id: PlayerId,
    pub spectator: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Left {
    pub player_id: PlayerId,
    /// Whether the player held a hand that went back to the discard pile
    pub was_playing: bool,
    pub phase: GamePhase,
}

/// Lobby as seen by one of its members
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyView {
    pub lobby_id: LobbyId,
    pub code: String,
    pub host_user_id: UserId,
    pub status: LobbyStatus,
    pub revision: u64,
    pub updated_at: String,
    pub players: Vec<Player>,
    pub game: GameView,
}

#[derive(Clone)]
pub struct GameService {
    store: Arc<dyn DocumentStore>,
    catalog: Arc<CardCatalog>,
    retry: RetryPolicy,
}

impl GameService {
    pub fn new(store: Arc<dyn DocumentStore>, catalog: Arc<CardCatalog>, retry: RetryPolicy) -> Self {
        Self {
            store,
            catalog,
            retry,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Run `op` under the concurrency guard
    async fn mutate<T, F>(&self, lobby_id: &str, op: F) -> GameResult<Applied<T>>
    where
        T: Send,
        F: FnMut(&Lobby, &mut GameState) -> GameResult<T> + Send,
    {
        let committed = guard::mutate_game(self.store.as_ref(), lobby_id, &self.retry, op).await?;
        Ok(Applied {
            outcome: committed.value,
            revision: committed.lobby.revision,
        })
    }

    async fn members(&self, lobby_id: &str) -> GameResult<Vec<Player>> {
        Ok(self.store.list_players(lobby_id).await?)
    }

    /// Open a new lobby; the caller becomes host and its first player
    pub async fn create_lobby(
        &self,
        caller: &Caller,
        name: &str,
        config: GameConfig,
    ) -> GameResult<LobbyCreated> {
        require_human_id(caller)?;
        let name = clean_name(name)?;
        config.validate(&self.catalog)?;

        // Generate a unique join code (check for collisions)
        let code = loop {
            let code = generate_short_code();
            if self.store.find_lobby_by_code(&code).await?.is_none() {
                break code;
            }
        };

        let now = chrono::Utc::now().to_rfc3339();
        let lobby = Lobby {
            id: ulid::Ulid::new().to_string(),
            code,
            host_user_id: caller.id().to_string(),
            status: LobbyStatus::Waiting,
            game_state: encode_game_state(&GameState::waiting(config)),
            updated_at: now.clone(),
            revision: 0,
        };
        let lobby = self.store.create_lobby(lobby).await?;

        self.store
            .upsert_player(Player {
                id: caller.id().to_string(),
                lobby_id: lobby.id.clone(),
                name,
                kind: PlayerKind::Human,
                spectator: false,
                joined_at: now,
            })
            .await?;

        tracing::info!(
            "Lobby {} ({}) created by {}",
            lobby.id,
            lobby.code,
            caller.id()
        );
        Ok(LobbyCreated {
            lobby_id: lobby.id,
            code: lobby.code,
            player_id: caller.id().to_string(),
            revision: lobby.revision,
        })
    }

    /// Join by code. Once a game is running newcomers watch until the host deals them in.
    pub async fn join_lobby(&self, caller: &Caller, code: &str, name: &str) -> GameResult<Joined> {
        require_human_id(caller)?;
        let name = clean_name(name)?;
        let lobby = self
            .store
            .find_lobby_by_code(code.trim())
            .await?
            .ok_or_else(|| GameError::LobbyNotFound(code.to_string()))?;

        if let Some(existing) = self.store.get_player(&lobby.id, caller.id()).await? {
            tracing::debug!("Player {} rejoined lobby {}", existing.id, lobby.id);
            return Ok(Joined {
                lobby_id: lobby.id,
                player_id: existing.id,
                spectator: existing.spectator,
            });
        }

        let spectator = lobby.status != LobbyStatus::Waiting;
        let player = self
            .store
            .upsert_player(Player {
                id: caller.id().to_string(),
                lobby_id: lobby.id.clone(),
                name,
                kind: PlayerKind::Human,
                spectator,
                joined_at: chrono::Utc::now().to_rfc3339(),
            })
            .await?;

        tracing::info!(
            "Player {} joined lobby {}{}",
            player.id,
            lobby.id,
            if spectator { " as spectator" } else { "" }
        );
        Ok(Joined {
            lobby_id: lobby.id,
            player_id: player.id,
            spectator,
        })
    }

    /// Leave the lobby. The host stays until the lobby is abandoned.
    pub async fn leave_lobby(&self, caller: &Caller, lobby_id: &str) -> GameResult<Left> {
        let lobby = self.store.get_lobby(lobby_id).await?;
        if lobby.host_user_id == caller.id() {
            return Err(GameError::forbidden("the host cannot leave the lobby"));
        }
        if self.store.get_player(lobby_id, caller.id()).await?.is_none() {
            return Err(GameError::forbidden("not a member of this lobby"));
        }
        self.remove_member(lobby_id, caller.id(), |_| Ok(())).await
    }

    /// Take a member out of the running game, then delete their record
    async fn remove_member<A>(&self, lobby_id: &str, player_id: &str, authorize: A) -> GameResult<Left>
    where
        A: Fn(&Lobby) -> GameResult<()> + Send + Sync,
    {
        let applied = self
            .mutate(lobby_id, |lobby, state| {
                authorize(lobby)?;
                let was_playing = state.is_in_game(player_id);
                if was_playing {
                    state.remove_player(player_id)?;
                }
                Ok(Left {
                    player_id: player_id.to_string(),
                    was_playing,
                    phase: state.phase,
                })
            })
            .await?;

        self.store.delete_player(lobby_id, player_id).await?;
        tracing::info!("Player {} left lobby {}", player_id, lobby_id);
        Ok(applied.outcome)
    }

    /// The lobby with everything the caller may not see redacted
    pub async fn lobby_view(&self, caller: &Caller, lobby_id: &str) -> GameResult<LobbyView> {
        let (lobby, state) = guard::read_game(self.store.as_ref(), lobby_id).await?;
        let players = self.members(lobby_id).await?;
        if !players.iter().any(|p| p.id == caller.id()) {
            return Err(GameError::forbidden("not a member of this lobby"));
        }

        Ok(LobbyView {
            game: state.view_for(caller.id(), &self.catalog),
            lobby_id: lobby.id,
            code: lobby.code,
            host_user_id: lobby.host_user_id,
            status: lobby.status,
            revision: lobby.revision,
            updated_at: lobby.updated_at,
            players,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;

    pub fn service() -> GameService {
        GameService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(CardCatalog::builtin().unwrap()),
            RetryPolicy {
                max_attempts: 5,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
            },
        )
    }

    pub fn caller(id: &str) -> Caller {
        Caller(id.to_string())
    }

    pub fn config(max_points: u32) -> GameConfig {
        GameConfig {
            max_points,
            cards_per_player: 7,
            ..GameConfig::default()
        }
    }

    /// Lobby hosted by "host" with "alice" and "bob" joined
    pub async fn lobby_of_three(service: &GameService, max_points: u32) -> LobbyCreated {
        let created = service
            .create_lobby(&caller("host"), "Host", config(max_points))
            .await
            .unwrap();
        for name in ["alice", "bob"] {
            service
                .join_lobby(&caller(name), &created.code, name)
                .await
                .unwrap();
        }
        created
    }

    pub async fn game(service: &GameService, lobby_id: &str) -> GameState {
        guard::read_game(service.store().as_ref(), lobby_id)
            .await
            .unwrap()
            .1
    }
}
