//! Player commands

use super::{Applied, GameService};
use crate::auth::{self, Caller};
use crate::error::GameResult;
use crate::state::{NextRoundOutcome, PlayOutcome};
use crate::types::*;

impl GameService {
    /// Submit cards as the caller, or as a bot the host controls
    pub async fn play_card(
        &self,
        caller: &Caller,
        lobby_id: &str,
        player_id: Option<PlayerId>,
        card_ids: Vec<CardId>,
    ) -> GameResult<Applied<PlayOutcome>> {
        let players = self.members(lobby_id).await?;
        let player_id = player_id.unwrap_or_else(|| caller.id().to_string());

        let applied = self
            .mutate(lobby_id, |lobby, state| {
                auth::require_player(caller, lobby, &players, &player_id)?;
                state.play_card(&player_id, &card_ids)
            })
            .await?;

        if applied.outcome.all_submitted {
            tracing::info!("Lobby {}: all cards are in, judging", lobby_id);
        }
        Ok(applied)
    }

    /// Deal the next round; any member may press the button once the round is over
    pub async fn next_round(
        &self,
        caller: &Caller,
        lobby_id: &str,
    ) -> GameResult<Applied<NextRoundOutcome>> {
        let players = self.members(lobby_id).await?;
        self.mutate(lobby_id, |lobby, state| {
            auth::require_player(caller, lobby, &players, caller.id())?;
            state.next_round(&self.catalog, &mut rand::rng())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::error::GameError;
    use crate::types::*;

    #[tokio::test]
    async fn test_play_card_checks_identity() {
        let service = service();
        let created = lobby_of_three(&service, 5).await;
        service
            .start_game(&caller("host"), &created.lobby_id)
            .await
            .unwrap();
        let state = game(&service, &created.lobby_id).await;
        let pick = state.pick();
        let bob_cards = state.hands["bob"][..pick].to_vec();

        // Nobody plays for someone else's seat
        assert!(matches!(
            service
                .play_card(&caller("alice"), &created.lobby_id, Some("bob".to_string()), bob_cards.clone())
                .await,
            Err(GameError::Forbidden(_))
        ));
        assert!(matches!(
            service
                .play_card(&caller("mallory"), &created.lobby_id, None, bob_cards.clone())
                .await,
            Err(GameError::Forbidden(_))
        ));

        let played = service
            .play_card(&caller("bob"), &created.lobby_id, None, bob_cards)
            .await
            .unwrap();
        assert!(!played.outcome.all_submitted);
        assert_eq!(played.outcome.phase, GamePhase::Submitting);
    }

    #[tokio::test]
    async fn test_czar_play_leaves_document_untouched() {
        let service = service();
        let created = lobby_of_three(&service, 5).await;
        let started = service
            .start_game(&caller("host"), &created.lobby_id)
            .await
            .unwrap();
        let before = game(&service, &created.lobby_id).await;
        let pick = before.pick();
        let cards = before.hands["host"][..pick].to_vec();

        assert_eq!(
            service
                .play_card(&caller("host"), &created.lobby_id, None, cards)
                .await
                .map(|a| a.revision),
            Err(GameError::CzarCannotPlay)
        );
        let lobby = service.store().get_lobby(&created.lobby_id).await.unwrap();
        assert_eq!(lobby.revision, started.revision);
        assert_eq!(game(&service, &created.lobby_id).await, before);
    }

    #[tokio::test]
    async fn test_next_round_by_any_member() {
        let service = service();
        let created = lobby_of_three(&service, 5).await;
        service
            .start_game(&caller("host"), &created.lobby_id)
            .await
            .unwrap();

        assert_eq!(
            service
                .next_round(&caller("bob"), &created.lobby_id)
                .await
                .map(|a| a.revision),
            Err(GameError::WrongPhase {
                expected: GamePhase::RoundEnd,
                actual: GamePhase::Submitting
            })
        );
        assert!(matches!(
            service.next_round(&caller("mallory"), &created.lobby_id).await,
            Err(GameError::Forbidden(_))
        ));
    }
}
