use super::GameState;
use crate::deck;
use crate::error::{GameError, GameResult};
use crate::types::*;
use rand::RngCore;

impl GameState {
    /// Deal a spectator into a running game. Returns the size of the new hand.
    ///
    /// Before the game starts there is nothing to deal; the player is picked up
    /// by `start_game` from the lobby's player list.
    pub fn convert_spectator<R: RngCore + ?Sized>(
        &mut self,
        player_id: &str,
        rng: &mut R,
    ) -> GameResult<usize> {
        match self.phase {
            GamePhase::Waiting => return Ok(0),
            GamePhase::Complete => {
                return Err(GameError::WrongPhase {
                    expected: GamePhase::RoundEnd,
                    actual: self.phase,
                })
            }
            GamePhase::Submitting | GamePhase::Judging | GamePhase::RoundEnd => {}
        }
        if self.is_in_game(player_id) {
            return Err(GameError::AlreadyPlaying(player_id.to_string()));
        }

        let hand_size = self
            .hands
            .values()
            .map(Vec::len)
            .max()
            .unwrap_or(self.config.cards_per_player);
        let hand = deck::draw(&mut self.white_deck, &mut self.discard_white, hand_size, rng)?;

        self.hands.insert(player_id.to_string(), hand);
        self.scores.entry(player_id.to_string()).or_insert(0);
        if !self.player_order.iter().any(|id| id == player_id) {
            self.player_order.push(player_id.to_string());
        }

        tracing::info!(
            "Player {} joined round {} with {} card(s)",
            player_id,
            self.round,
            hand_size
        );
        Ok(hand_size)
    }

    /// Take a player out of the game, returning their cards to the discard pile
    pub fn remove_player(&mut self, player_id: &str) -> GameResult<()> {
        let round_in_progress = matches!(self.phase, GamePhase::Submitting | GamePhase::Judging);
        if round_in_progress && self.is_judge(player_id) {
            return Err(GameError::CannotRemoveJudge);
        }
        if round_in_progress && self.is_in_game(player_id) {
            let submitters_left = self
                .hands
                .keys()
                .filter(|id| *id != player_id && !self.is_judge(id))
                .count();
            if submitters_left == 0 {
                return Err(GameError::NotEnoughPlayers {
                    required: MIN_ROUND_PLAYERS,
                    found: self.hands.len() - 1,
                });
            }
        }
        let Some(hand) = self.hands.remove(player_id) else {
            return Err(GameError::PlayerNotInGame(player_id.to_string()));
        };
        self.discard_white.extend(hand);
        self.skipped_players.remove(player_id);

        // Once judging has started the submission stays on the table
        if self.phase == GamePhase::Submitting {
            if let Some(cards) = self.submissions.remove(player_id) {
                self.discard_white.extend(cards);
            }
            self.revealed_cards.remove(player_id);
            self.sync_played_cards();
            self.advance_if_all_submitted();
        }

        tracing::info!("Player {} removed from the game", player_id);
        Ok(())
    }
}
