//! Host commands
//!
//! The host check runs inside the guarded closure, against the lobby document
//! that is about to be written. Skipping is shared with the card czar.

use serde::Serialize;

use super::{Applied, GameService, Left};
use crate::auth::{self, Caller};
use crate::error::{GameError, GameResult};
use crate::state::SkipOutcome;
use crate::types::*;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub round: u32,
    pub judge_id: Option<PlayerId>,
    pub black_card: Option<BlackCard>,
    pub players: Vec<PlayerId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Converted {
    pub player_id: PlayerId,
    pub hand_size: usize,
    pub phase: GamePhase,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotAdded {
    pub player_id: PlayerId,
    pub name: String,
    pub spectator: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOutcome {
    pub phase: GamePhase,
    pub players: usize,
}

fn bot_name() -> String {
    petname::petname(2, " ").unwrap_or_else(|| "Robo Czar".to_string())
}

impl GameService {
    /// Deal the game to every non-spectator in join order
    pub async fn start_game(
        &self,
        caller: &Caller,
        lobby_id: &str,
    ) -> GameResult<Applied<StartOutcome>> {
        let players: Vec<PlayerId> = self
            .members(lobby_id)
            .await?
            .into_iter()
            .filter(|p| !p.spectator)
            .map(|p| p.id)
            .collect();

        tracing::info!("Host starting game in lobby {}", lobby_id);
        self.mutate(lobby_id, |lobby, state| {
            auth::require_host(caller, lobby)?;
            state.start_game(&players, &self.catalog, &mut rand::rng())?;
            Ok(StartOutcome {
                round: state.round,
                judge_id: state.judge_id.clone(),
                black_card: state.black_card.clone(),
                players: state.player_order.clone(),
            })
        })
        .await
    }

    /// Excuse a player from the current round; the czar may do this too
    pub async fn skip_player(
        &self,
        caller: &Caller,
        lobby_id: &str,
        player_id: &str,
    ) -> GameResult<Applied<SkipOutcome>> {
        let players = self.members(lobby_id).await?;
        tracing::info!("{} skipping {} in lobby {}", caller.id(), player_id, lobby_id);
        self.mutate(lobby_id, |lobby, state| {
            auth::require_host_or_judge(caller, lobby, state, &players)?;
            state.skip_player(player_id)
        })
        .await
    }

    /// Deal a spectator into the running game
    pub async fn convert_spectator(
        &self,
        caller: &Caller,
        lobby_id: &str,
        player_id: &str,
    ) -> GameResult<Applied<Converted>> {
        let lobby = self.store.get_lobby(lobby_id).await?;
        auth::require_host(caller, &lobby)?;

        let record = self
            .store
            .get_player(lobby_id, player_id)
            .await?
            .ok_or_else(|| GameError::PlayerNotInGame(player_id.to_string()))?;

        let applied = self
            .mutate(lobby_id, |lobby, state| {
                auth::require_host(caller, lobby)?;
                let hand_size = state.convert_spectator(player_id, &mut rand::rng())?;
                Ok(Converted {
                    player_id: player_id.to_string(),
                    hand_size,
                    phase: state.phase,
                })
            })
            .await?;

        if record.spectator {
            self.store
                .upsert_player(Player {
                    spectator: false,
                    ..record
                })
                .await?;
        }
        Ok(applied)
    }

    /// Add a bot seat that the host plays for
    pub async fn add_bot(&self, caller: &Caller, lobby_id: &str) -> GameResult<BotAdded> {
        let lobby = self.store.get_lobby(lobby_id).await?;
        auth::require_host(caller, &lobby)?;

        let spectator = lobby.status != LobbyStatus::Waiting;
        let bot = self
            .store
            .upsert_player(Player {
                id: format!("{}{}", BOT_PREFIX, ulid::Ulid::new().to_string().to_lowercase()),
                lobby_id: lobby.id.clone(),
                name: bot_name(),
                kind: PlayerKind::Bot {
                    controlled_by: caller.id().to_string(),
                },
                spectator,
                joined_at: chrono::Utc::now().to_rfc3339(),
            })
            .await?;

        tracing::info!("Bot {} ({}) added to lobby {}", bot.id, bot.name, lobby.id);
        Ok(BotAdded {
            player_id: bot.id,
            name: bot.name,
            spectator,
        })
    }

    pub async fn remove_bot(
        &self,
        caller: &Caller,
        lobby_id: &str,
        bot_id: &str,
    ) -> GameResult<Left> {
        let lobby = self.store.get_lobby(lobby_id).await?;
        auth::require_host(caller, &lobby)?;

        let record = self
            .store
            .get_player(lobby_id, bot_id)
            .await?
            .ok_or_else(|| GameError::PlayerNotInGame(bot_id.to_string()))?;
        if !record.is_bot() {
            return Err(GameError::forbidden(format!("{} is not a bot", bot_id)));
        }

        self.remove_member(lobby_id, bot_id, |lobby| auth::require_host(caller, lobby))
            .await
    }

    /// Throw the game away and return everyone to the lobby
    pub async fn reset_game(
        &self,
        caller: &Caller,
        lobby_id: &str,
    ) -> GameResult<Applied<ResetOutcome>> {
        let members = self.members(lobby_id).await?;

        let applied = self
            .mutate(lobby_id, |lobby, state| {
                auth::require_host(caller, lobby)?;
                state.reset_game();
                Ok(ResetOutcome {
                    phase: state.phase,
                    players: members.len(),
                })
            })
            .await?;

        // Spectators get a seat in the next game
        for player in members.into_iter().filter(|p| p.spectator) {
            self.store
                .upsert_player(Player {
                    spectator: false,
                    ..player
                })
                .await?;
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_start_game_host_only() {
        let service = service();
        let created = lobby_of_three(&service, 5).await;

        assert!(matches!(
            service.start_game(&caller("alice"), &created.lobby_id).await,
            Err(GameError::Forbidden(_))
        ));
        assert_eq!(game(&service, &created.lobby_id).await.phase, GamePhase::Waiting);

        let started = service
            .start_game(&caller("host"), &created.lobby_id)
            .await
            .unwrap();
        assert_eq!(started.outcome.round, 1);
        assert_eq!(started.outcome.judge_id.as_deref(), Some("host"));
        assert_eq!(started.outcome.players, vec!["host", "alice", "bob"]);
        assert_eq!(started.revision, 2);

        let lobby = service.store().get_lobby(&created.lobby_id).await.unwrap();
        assert_eq!(lobby.status, LobbyStatus::Playing);
    }

    #[tokio::test]
    async fn test_start_game_needs_three_players() {
        let service = service();
        let created = service
            .create_lobby(&caller("host"), "Host", config(5))
            .await
            .unwrap();
        service
            .join_lobby(&caller("alice"), &created.code, "Alice")
            .await
            .unwrap();

        assert_eq!(
            service
                .start_game(&caller("host"), &created.lobby_id)
                .await
                .map(|a| a.revision),
            Err(GameError::NotEnoughPlayers {
                required: 3,
                found: 2
            })
        );
    }

    #[tokio::test]
    async fn test_skip_player_host_or_czar() {
        let service = service();
        let created = lobby_of_three(&service, 5).await;
        service
            .start_game(&caller("host"), &created.lobby_id)
            .await
            .unwrap();

        assert!(matches!(
            service
                .skip_player(&caller("alice"), &created.lobby_id, "bob")
                .await,
            Err(GameError::Forbidden(_))
        ));

        let skipped = service
            .skip_player(&caller("host"), &created.lobby_id, "bob")
            .await
            .unwrap();
        assert!(!skipped.outcome.already_skipped);
        assert!(game(&service, &created.lobby_id)
            .await
            .skipped_players
            .contains("bob"));
    }

    #[tokio::test]
    async fn test_convert_spectator_deals_hand() {
        let service = service();
        let created = lobby_of_three(&service, 5).await;
        service
            .start_game(&caller("host"), &created.lobby_id)
            .await
            .unwrap();
        service
            .join_lobby(&caller("carol"), &created.code, "Carol")
            .await
            .unwrap();

        assert!(matches!(
            service
                .convert_spectator(&caller("alice"), &created.lobby_id, "carol")
                .await,
            Err(GameError::Forbidden(_))
        ));

        let converted = service
            .convert_spectator(&caller("host"), &created.lobby_id, "carol")
            .await
            .unwrap();
        assert_eq!(converted.outcome.hand_size, 7);

        let state = game(&service, &created.lobby_id).await;
        assert_eq!(state.hands["carol"].len(), 7);
        assert!(state.duplicate_white_cards().is_empty());
        let record = service
            .store()
            .get_player(&created.lobby_id, "carol")
            .await
            .unwrap()
            .unwrap();
        assert!(!record.spectator);

        assert_eq!(
            service
                .convert_spectator(&caller("host"), &created.lobby_id, "carol")
                .await
                .map(|a| a.revision),
            Err(GameError::AlreadyPlaying("carol".to_string()))
        );
    }

    #[tokio::test]
    async fn test_convert_spectator_checks_host_first() {
        let service = service();
        let created = lobby_of_three(&service, 5).await;
        service
            .start_game(&caller("host"), &created.lobby_id)
            .await
            .unwrap();

        // Members and strangers look the same to a non-host
        for target in ["carol", "nobody"] {
            assert!(matches!(
                service
                    .convert_spectator(&caller("alice"), &created.lobby_id, target)
                    .await,
                Err(GameError::Forbidden(_))
            ));
        }
        assert_eq!(
            service
                .convert_spectator(&caller("host"), &created.lobby_id, "nobody")
                .await
                .map(|a| a.revision),
            Err(GameError::PlayerNotInGame("nobody".to_string()))
        );
    }

    #[tokio::test]
    async fn test_bots_join_and_leave() {
        let service = service();
        let created = service
            .create_lobby(&caller("host"), "Host", config(5))
            .await
            .unwrap();

        assert!(matches!(
            service.add_bot(&caller("alice"), &created.lobby_id).await,
            Err(GameError::Forbidden(_))
        ));

        let first = service.add_bot(&caller("host"), &created.lobby_id).await.unwrap();
        let second = service.add_bot(&caller("host"), &created.lobby_id).await.unwrap();
        assert!(is_bot_id(&first.player_id));
        assert!(!first.spectator);
        assert_ne!(first.player_id, second.player_id);

        // Host plus two bots is enough for a game
        let started = service
            .start_game(&caller("host"), &created.lobby_id)
            .await
            .unwrap();
        assert_eq!(started.outcome.players.len(), 3);

        // A bot that is not judging can leave mid-round
        let left = service
            .remove_bot(&caller("host"), &created.lobby_id, &first.player_id)
            .await
            .unwrap();
        assert!(left.was_playing);
        assert!(!game(&service, &created.lobby_id)
            .await
            .is_in_game(&first.player_id));

        assert!(matches!(
            service
                .remove_bot(&caller("host"), &created.lobby_id, "host")
                .await,
            Err(GameError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_returns_to_waiting() {
        let service = service();
        let created = lobby_of_three(&service, 5).await;
        service
            .start_game(&caller("host"), &created.lobby_id)
            .await
            .unwrap();
        service
            .join_lobby(&caller("carol"), &created.code, "Carol")
            .await
            .unwrap();

        assert!(matches!(
            service.reset_game(&caller("bob"), &created.lobby_id).await,
            Err(GameError::Forbidden(_))
        ));

        let reset = service
            .reset_game(&caller("host"), &created.lobby_id)
            .await
            .unwrap();
        assert_eq!(reset.outcome.phase, GamePhase::Waiting);

        let state = game(&service, &created.lobby_id).await;
        assert!(state.hands.is_empty());
        assert!(state.scores.is_empty());
        assert_eq!(state.config.max_points, 5);

        let lobby = service.store().get_lobby(&created.lobby_id).await.unwrap();
        assert_eq!(lobby.status, LobbyStatus::Waiting);
        let players = service.store().list_players(&created.lobby_id).await.unwrap();
        assert!(players.iter().all(|p| !p.spectator));
    }
}
