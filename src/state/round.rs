use super::GameState;
use crate::deck::{self, CardCatalog};
use crate::error::{GameError, GameResult};
use crate::types::*;
use rand::RngCore;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextRoundOutcome {
    pub round: u32,
    pub judge_id: PlayerId,
    pub black_card: BlackCard,
}

impl GameState {
    /// Clean up the finished round and deal the next one
    pub fn next_round<R: RngCore + ?Sized>(
        &mut self,
        catalog: &CardCatalog,
        rng: &mut R,
    ) -> GameResult<NextRoundOutcome> {
        if self.phase != GamePhase::RoundEnd {
            return Err(GameError::WrongPhase {
                expected: GamePhase::RoundEnd,
                actual: self.phase,
            });
        }

        if self.hands.len() < MIN_ROUND_PLAYERS {
            return Err(GameError::NotEnoughPlayers {
                required: MIN_ROUND_PLAYERS,
                found: self.hands.len(),
            });
        }

        // Dealing can run dry halfway, so work on a copy and commit at the end
        let mut next = self.clone();

        let played: Vec<CardId> = std::mem::take(&mut next.submissions)
            .into_values()
            .flatten()
            .collect();
        next.discard_white.extend(played);
        if let Some(used) = next.black_card.take() {
            next.discard_black.push(used.id);
        }

        let target = next.config.cards_per_player;
        let player_ids: Vec<PlayerId> = next.hands.keys().cloned().collect();
        for player_id in player_ids {
            let missing = target.saturating_sub(next.hands[&player_id].len());
            if missing == 0 {
                continue;
            }
            let cards = deck::draw(&mut next.white_deck, &mut next.discard_white, missing, rng)?;
            if let Some(hand) = next.hands.get_mut(&player_id) {
                hand.extend(cards);
            }
        }

        let judge_id = next.next_judge().ok_or(GameError::NotEnoughPlayers {
            required: MIN_ROUND_PLAYERS,
            found: next.hands.len(),
        })?;
        let black_card = next.draw_black_card(catalog, rng)?;

        next.clear_round();
        next.judge_id = Some(judge_id.clone());
        next.black_card = Some(black_card.clone());
        next.round += 1;
        next.phase = GamePhase::Submitting;

        tracing::info!("Round {} begins, judge {}", next.round, judge_id);
        *self = next;

        Ok(NextRoundOutcome {
            round: self.round,
            judge_id,
            black_card,
        })
    }

    /// The player after the current judge in join order who still holds a hand
    pub fn next_judge(&self) -> Option<PlayerId> {
        let order = &self.player_order;
        if order.is_empty() {
            return None;
        }
        let start = self
            .judge_id
            .as_ref()
            .and_then(|judge| order.iter().position(|id| id == judge))
            .map(|pos| pos + 1)
            .unwrap_or(0);

        (0..order.len())
            .map(|offset| &order[(start + offset) % order.len()])
            .find(|id| self.hands.contains_key(*id))
            .cloned()
    }

    /// Draw the next prompt, recycling used prompts when the pile is empty
    pub(crate) fn draw_black_card<R: RngCore + ?Sized>(
        &mut self,
        catalog: &CardCatalog,
        rng: &mut R,
    ) -> GameResult<BlackCard> {
        loop {
            let drawn = deck::draw(&mut self.black_deck, &mut self.discard_black, 1, rng)?;
            let Some(card_id) = drawn.into_iter().next() else {
                return Err(GameError::DeckExhausted);
            };
            match catalog.black_card(&card_id) {
                Some(card) => return Ok(card.clone()),
                None => {
                    // Pack removed from the catalog since the game was dealt
                    tracing::warn!("Dropping unknown black card {} from the deck", card_id);
                }
            }
        }
    }
}
