use super::GameState;
use crate::deck::{self, CardCatalog};
use crate::error::{GameError, GameResult};
use crate::types::*;
use rand::RngCore;
use std::collections::HashSet;

/// Bounds accepted for lobby settings
pub const MAX_POINTS_RANGE: std::ops::RangeInclusive<u32> = 1..=50;
pub const CARDS_PER_PLAYER_RANGE: std::ops::RangeInclusive<usize> = 3..=20;

impl GameConfig {
    /// Check settings before a lobby is created; they cannot change afterwards
    pub fn validate(&self, catalog: &CardCatalog) -> GameResult<()> {
        if !MAX_POINTS_RANGE.contains(&self.max_points) {
            return Err(GameError::InvalidConfig(format!(
                "maxPoints must be between {} and {}",
                MAX_POINTS_RANGE.start(),
                MAX_POINTS_RANGE.end()
            )));
        }
        if !CARDS_PER_PLAYER_RANGE.contains(&self.cards_per_player) {
            return Err(GameError::InvalidConfig(format!(
                "cardsPerPlayer must be between {} and {}",
                CARDS_PER_PLAYER_RANGE.start(),
                CARDS_PER_PLAYER_RANGE.end()
            )));
        }
        if self.lobby_name.chars().count() > 64 {
            return Err(GameError::InvalidConfig(
                "lobbyName must be at most 64 characters".to_string(),
            ));
        }
        // Surfaces NoCardPacks / UnknownCardPack
        deck::build_decks(catalog, &self.card_packs)?;
        Ok(())
    }
}

impl GameState {
    /// Deal a new game: shuffled decks, full hands, first player judges
    pub fn start_game<R: RngCore + ?Sized>(
        &mut self,
        players: &[PlayerId],
        catalog: &CardCatalog,
        rng: &mut R,
    ) -> GameResult<()> {
        if self.phase != GamePhase::Waiting {
            return Err(GameError::WrongPhase {
                expected: GamePhase::Waiting,
                actual: self.phase,
            });
        }

        let mut seen = HashSet::new();
        let order: Vec<PlayerId> = players
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        if order.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers {
                required: MIN_PLAYERS,
                found: order.len(),
            });
        }

        let decks = deck::build_decks(catalog, &self.config.card_packs)?;
        let needed = order.len() * self.config.cards_per_player;
        if decks.white.len() < needed || decks.black.is_empty() {
            tracing::warn!(
                "Selected packs hold {} white / {} black cards, {} players need {}",
                decks.white.len(),
                decks.black.len(),
                order.len(),
                needed
            );
            return Err(GameError::DeckExhausted);
        }

        let mut next = GameState::waiting(self.config.clone());
        next.white_deck = decks.white;
        next.black_deck = decks.black;
        deck::shuffle(&mut next.white_deck, rng);
        deck::shuffle(&mut next.black_deck, rng);

        for player_id in &order {
            let hand = deck::deal(&mut next.white_deck, next.config.cards_per_player)?;
            next.hands.insert(player_id.clone(), hand);
            next.scores.insert(player_id.clone(), 0);
        }

        next.black_card = Some(next.draw_black_card(catalog, rng)?);
        next.judge_id = order.first().cloned();
        next.player_order = order;
        next.round = 1;
        next.phase = GamePhase::Submitting;

        tracing::info!(
            "Game started with {} players, judge {:?}",
            next.player_order.len(),
            next.judge_id
        );
        *self = next;
        Ok(())
    }

    /// Back to the lobby: scores, hands and decks are thrown away
    pub fn reset_game(&mut self) {
        tracing::info!("Resetting game after round {}", self.round);
        *self = GameState::waiting(self.config.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[test]
    fn test_start_game_deals_hands() {
        let mut state = GameState::waiting(config(5));
        state
            .start_game(&players(&["p1", "p2", "p3"]), &catalog(), &mut rng())
            .unwrap();

        assert_eq!(state.phase, GamePhase::Submitting);
        assert_eq!(state.round, 1);
        assert_eq!(state.judge_id.as_deref(), Some("p1"));
        assert!(state.black_card.is_some());
        assert_eq!(state.hands.len(), 3);
        assert!(state.hands.values().all(|h| h.len() == 7));
        assert_eq!(state.scores.values().sum::<u32>(), 0);
        assert_eq!(state.player_order, players(&["p1", "p2", "p3"]));
        assert!(state.duplicate_white_cards().is_empty());
    }

    #[test]
    fn test_start_game_requires_waiting() {
        let mut state = started(5);
        let before = state.clone();
        let result = state.start_game(&players(&["p1", "p2", "p3"]), &catalog(), &mut rng());
        assert_eq!(
            result,
            Err(GameError::WrongPhase {
                expected: GamePhase::Waiting,
                actual: GamePhase::Submitting
            })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_start_game_needs_three_players() {
        let mut state = GameState::waiting(config(5));
        // Duplicates do not count twice
        let result = state.start_game(&players(&["p1", "p2", "p2"]), &catalog(), &mut rng());
        assert_eq!(
            result,
            Err(GameError::NotEnoughPlayers {
                required: 3,
                found: 2
            })
        );
        assert_eq!(state.phase, GamePhase::Waiting);
    }

    #[test]
    fn test_start_game_with_too_few_cards() {
        let mut cfg = config(5);
        cfg.cards_per_player = 20;
        cfg.card_packs = vec!["nerd".to_string()];
        let mut state = GameState::waiting(cfg);
        let result = state.start_game(
            &players(&["p1", "p2", "p3", "p4", "p5"]),
            &catalog(),
            &mut rng(),
        );
        assert_eq!(result, Err(GameError::DeckExhausted));
        assert!(state.hands.is_empty());
    }

    #[test]
    fn test_reset_game_keeps_config() {
        let mut state = judging(5);
        state.select_winner("p2").unwrap();
        state.reset_game();

        assert_eq!(state.phase, GamePhase::Waiting);
        assert!(state.scores.is_empty());
        assert!(state.hands.is_empty());
        assert_eq!(state.config, config(5));
    }

    #[test]
    fn test_config_validation() {
        let catalog = catalog();
        assert!(GameConfig::default().validate(&catalog).is_ok());

        let mut cfg = GameConfig::default();
        cfg.max_points = 0;
        assert!(matches!(cfg.validate(&catalog), Err(GameError::InvalidConfig(_))));

        let mut cfg = GameConfig::default();
        cfg.cards_per_player = 50;
        assert!(matches!(cfg.validate(&catalog), Err(GameError::InvalidConfig(_))));

        let mut cfg = GameConfig::default();
        cfg.card_packs = vec![];
        assert_eq!(cfg.validate(&catalog), Err(GameError::NoCardPacks));

        let mut cfg = GameConfig::default();
        cfg.card_packs = vec!["missing".to_string()];
        assert_eq!(
            cfg.validate(&catalog),
            Err(GameError::UnknownCardPack("missing".to_string()))
        );
    }
}
