//! Card czar commands

use super::{Applied, GameService};
use crate::auth::{self, Caller};
use crate::error::GameResult;
use crate::state::{RevealOutcome, WinnerOutcome};

impl GameService {
    pub async fn reveal_card(
        &self,
        caller: &Caller,
        lobby_id: &str,
        player_id: &str,
    ) -> GameResult<Applied<RevealOutcome>> {
        let players = self.members(lobby_id).await?;
        self.mutate(lobby_id, |lobby, state| {
            auth::require_judge(caller, lobby, state, &players)?;
            state.reveal_card(player_id)
        })
        .await
    }

    pub async fn select_winner(
        &self,
        caller: &Caller,
        lobby_id: &str,
        winner_id: &str,
    ) -> GameResult<Applied<WinnerOutcome>> {
        let players = self.members(lobby_id).await?;
        let applied = self
            .mutate(lobby_id, |lobby, state| {
                auth::require_judge(caller, lobby, state, &players)?;
                state.select_winner(winner_id)
            })
            .await?;

        tracing::info!(
            "Lobby {}: {} wins the round ({} point(s))",
            lobby_id,
            applied.outcome.winner_id,
            applied.outcome.score
        );
        Ok(applied)
    }
}
