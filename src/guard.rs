//! Read-compute-swap wrapper around every game mutation.
//!
//! The lobby revision read at the start of an attempt is handed back to the
//! store with the write; if anyone else wrote in between, the store refuses and
//! the whole cycle runs again on fresh data after a short jittered backoff.

use rand::Rng;
use std::time::Duration;

use crate::error::{GameError, GameResult};
use crate::state::{decode_game_state, encode_game_state, GameState};
use crate::store::{DocumentStore, LobbyUpdate, StoreError};
use crate::types::Lobby;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(25),
            max_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff for the given (1-based) failed attempt, with equal jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);

        let backoff_ms = backoff.as_millis() as u64;
        if backoff_ms <= 1 {
            return backoff;
        }
        // Delay lands in [backoff/2, backoff]
        let half_ms = backoff_ms / 2;
        let jitter_ms = rand::rng().random_range(0..=half_ms);
        Duration::from_millis(half_ms + jitter_ms)
    }
}

/// Result of a committed mutation
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub state: GameState,
    pub lobby: Lobby,
}

/// Load a lobby and its decoded game
pub async fn read_game<S>(store: &S, lobby_id: &str) -> GameResult<(Lobby, GameState)>
where
    S: DocumentStore + ?Sized,
{
    let lobby = store.get_lobby(lobby_id).await?;
    let state = decode_game_state(&lobby.game_state).ok_or(GameError::InvalidGameState)?;
    Ok((lobby, state))
}

/// Apply `op` to the lobby's game and write it back if nobody raced us.
///
/// `op` may run several times and must not have side effects outside the
/// state it is given. Its errors are returned as-is and never retried.
pub async fn mutate_game<S, T, F>(
    store: &S,
    lobby_id: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> GameResult<Committed<T>>
where
    S: DocumentStore + ?Sized,
    T: Send,
    F: FnMut(&Lobby, &mut GameState) -> GameResult<T> + Send,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let (lobby, mut state) = read_game(store, lobby_id).await?;
        let value = op(&lobby, &mut state)?;
        debug_assert!(
            state.duplicate_white_cards().is_empty(),
            "mutation duplicated white cards: {:?}",
            state.duplicate_white_cards()
        );

        let update = LobbyUpdate {
            game_state: encode_game_state(&state),
            status: state.phase.into(),
        };
        match store.update_lobby(lobby_id, lobby.revision, update).await {
            Ok(lobby) => {
                if attempt > 1 {
                    tracing::debug!(
                        "Lobby {} committed revision {} after {} attempts",
                        lobby_id,
                        lobby.revision,
                        attempt
                    );
                }
                return Ok(Committed {
                    value,
                    state,
                    lobby,
                });
            }
            Err(StoreError::VersionMismatch { expected, actual }) => {
                if attempt >= max_attempts {
                    tracing::warn!(
                        "Lobby {} still contended after {} attempts (expected revision {}, found {})",
                        lobby_id,
                        attempt,
                        expected,
                        actual
                    );
                    return Err(GameError::ConcurrentModification { attempts: attempt });
                }
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    "Lobby {} changed under us (revision {} -> {}), retrying in {:?}",
                    lobby_id,
                    expected,
                    actual,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::error!("Failed to write lobby {}: {}", lobby_id, e);
                return Err(e.into());
            }
        }
    }
}
