use super::GameState;
use crate::error::{GameError, GameResult};
use crate::types::*;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealOutcome {
    pub player_id: PlayerId,
    pub already_revealed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerOutcome {
    pub winner_id: PlayerId,
    pub winning_cards: Vec<CardId>,
    pub score: u32,
    pub game_over: bool,
    pub phase: GamePhase,
}

impl GameState {
    /// Flip a submission face up for the judge
    pub fn reveal_card(&mut self, player_id: &str) -> GameResult<RevealOutcome> {
        if self.phase != GamePhase::Judging {
            return Err(GameError::NotJudgingPhase(self.phase));
        }
        if !self.submissions.contains_key(player_id) {
            return Err(GameError::NoSubmission(player_id.to_string()));
        }

        let already_revealed = self
            .revealed_cards
            .get(player_id)
            .copied()
            .unwrap_or(false);
        if !already_revealed {
            self.revealed_cards.insert(player_id.to_string(), true);
        }

        Ok(RevealOutcome {
            player_id: player_id.to_string(),
            already_revealed,
        })
    }

    /// Award the round; ends the game once the winner reaches max points
    pub fn select_winner(&mut self, winner_id: &str) -> GameResult<WinnerOutcome> {
        if self.phase != GamePhase::Judging {
            return Err(GameError::NotJudgingPhase(self.phase));
        }
        let winning_cards = self
            .submissions
            .get(winner_id)
            .cloned()
            .ok_or_else(|| GameError::NoSubmission(winner_id.to_string()))?;

        let score = {
            let entry = self.scores.entry(winner_id.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.round_winner = Some(winner_id.to_string());
        self.winning_cards = winning_cards.clone();

        let game_over = score >= self.config.max_points;
        if game_over {
            self.phase = GamePhase::Complete;
            self.game_end_time = Some(chrono::Utc::now().to_rfc3339());
            tracing::info!(
                "Player {} wins the game with {} point(s) after {} round(s)",
                winner_id,
                score,
                self.round
            );
        } else {
            self.phase = GamePhase::RoundEnd;
            tracing::info!("Player {} wins round {}", winner_id, self.round);
        }

        Ok(WinnerOutcome {
            winner_id: winner_id.to_string(),
            winning_cards,
            score,
            game_over,
            phase: self.phase,
        })
    }
}
