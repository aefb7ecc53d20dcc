use super::GameState;
use crate::error::{GameError, GameResult};
use crate::types::*;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayOutcome {
    pub all_submitted: bool,
    pub phase: GamePhase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipOutcome {
    pub already_skipped: bool,
    pub all_submitted: bool,
    pub phase: GamePhase,
}

impl GameState {
    /// Submit white cards for the current prompt
    pub fn play_card(&mut self, player_id: &str, card_ids: &[CardId]) -> GameResult<PlayOutcome> {
        if self.phase != GamePhase::Submitting {
            return Err(GameError::NotAcceptingSubmissions(self.phase));
        }
        if self.is_judge(player_id) {
            return Err(GameError::CzarCannotPlay);
        }
        let hand = self
            .hands
            .get(player_id)
            .ok_or_else(|| GameError::PlayerNotInGame(player_id.to_string()))?;
        if self.submissions.contains_key(player_id) {
            return Err(GameError::AlreadySubmitted(player_id.to_string()));
        }

        let expected = self.pick();
        if card_ids.len() != expected {
            return Err(GameError::WrongCardCount {
                expected,
                got: card_ids.len(),
            });
        }
        let mut seen = HashSet::new();
        for card_id in card_ids {
            if !seen.insert(card_id.as_str()) {
                return Err(GameError::DuplicateCard(card_id.clone()));
            }
            if !hand.contains(card_id) {
                return Err(GameError::CardNotInHand(card_id.clone()));
            }
        }

        // Validated; from here on nothing can fail
        if let Some(hand) = self.hands.get_mut(player_id) {
            hand.retain(|c| !seen.contains(c.as_str()));
        }
        self.submissions
            .insert(player_id.to_string(), card_ids.to_vec());
        self.sync_played_cards();
        // Playing after being skipped brings the player back into the round
        self.skipped_players.remove(player_id);

        tracing::debug!(
            "Player {} submitted {} card(s) in round {}",
            player_id,
            card_ids.len(),
            self.round
        );

        let all_submitted = self.advance_if_all_submitted();
        Ok(PlayOutcome {
            all_submitted,
            phase: self.phase,
        })
    }

    /// Excuse a player from submitting this round
    pub fn skip_player(&mut self, player_id: &str) -> GameResult<SkipOutcome> {
        if self.phase != GamePhase::Submitting {
            return Err(GameError::NotAcceptingSubmissions(self.phase));
        }
        if self.is_judge(player_id) {
            return Err(GameError::CannotSkipJudge);
        }
        if !self.is_in_game(player_id) {
            return Err(GameError::PlayerNotInGame(player_id.to_string()));
        }
        if self.submissions.contains_key(player_id) {
            return Err(GameError::AlreadySubmitted(player_id.to_string()));
        }
        if self.skipped_players.contains(player_id) {
            return Ok(SkipOutcome {
                already_skipped: true,
                all_submitted: false,
                phase: self.phase,
            });
        }

        let others_pending = self
            .required_submitters()
            .into_iter()
            .any(|id| id != player_id && !self.submissions.contains_key(id));
        if self.submissions.is_empty() && !others_pending {
            return Err(GameError::NoSubmissionsRemaining);
        }

        self.skipped_players.insert(player_id.to_string());
        tracing::info!("Player {} skipped in round {}", player_id, self.round);

        let all_submitted = self.advance_if_all_submitted();
        Ok(SkipOutcome {
            already_skipped: false,
            all_submitted,
            phase: self.phase,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[test]
    fn test_three_player_round_auto_advances() {
        let mut state = started(5);
        assert_eq!(state.judge_id.as_deref(), Some("p1"));

        let c5 = first_card(&state, "p2");
        let outcome = state.play_card("p2", &[c5.clone()]).unwrap();
        assert!(!outcome.all_submitted);
        assert_eq!(state.phase, GamePhase::Submitting);

        let c9 = first_card(&state, "p3");
        let outcome = state.play_card("p3", &[c9.clone()]).unwrap();
        assert!(outcome.all_submitted);
        assert_eq!(outcome.phase, GamePhase::Judging);
        assert_eq!(state.phase, GamePhase::Judging);

        assert_eq!(state.submissions["p2"], vec![c5.clone()]);
        assert_eq!(state.submissions["p3"], vec![c9]);
        assert_eq!(state.played_cards, state.submissions);
        assert!(!state.hands["p2"].contains(&c5));
        assert_eq!(state.hands["p2"].len(), 6);
    }

    #[test]
    fn test_judge_cannot_play_and_state_is_untouched() {
        let mut state = started(5);
        let before = state.clone();
        let card = first_card(&state, "p1");

        assert_eq!(
            state.play_card("p1", &[card]),
            Err(GameError::CzarCannotPlay)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_play_outside_submitting() {
        let mut state = judging(5);
        let card = first_card(&state, "p2");
        assert_eq!(
            state.play_card("p2", &[card]),
            Err(GameError::NotAcceptingSubmissions(GamePhase::Judging))
        );
    }

    #[test]
    fn test_double_submission_rejected() {
        let mut state = started(5);
        let card = first_card(&state, "p2");
        state.play_card("p2", &[card]).unwrap();

        let another = first_card(&state, "p2");
        assert_eq!(
            state.play_card("p2", &[another]),
            Err(GameError::AlreadySubmitted("p2".to_string()))
        );
    }

    #[test]
    fn test_card_must_be_in_hand() {
        let mut state = started(5);
        let foreign = first_card(&state, "p3");
        let before = state.clone();
        assert_eq!(
            state.play_card("p2", &[foreign.clone()]),
            Err(GameError::CardNotInHand(foreign))
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_card_count_must_match_pick() {
        let mut state = started(5);
        state.black_card.as_mut().unwrap().pick = 2;
        let hand = state.hands["p2"].clone();

        assert_eq!(
            state.play_card("p2", &hand[..1]),
            Err(GameError::WrongCardCount {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            state.play_card("p2", &[hand[0].clone(), hand[0].clone()]),
            Err(GameError::DuplicateCard(hand[0].clone()))
        );

        let outcome = state.play_card("p2", &hand[..2]).unwrap();
        assert_eq!(outcome.phase, GamePhase::Submitting);
        assert_eq!(state.submissions["p2"], hand[..2].to_vec());
    }

    #[test]
    fn test_unknown_player_cannot_play() {
        let mut state = started(5);
        assert_eq!(
            state.play_card("ghost", &["base-w001".to_string()]),
            Err(GameError::PlayerNotInGame("ghost".to_string()))
        );
    }

    #[test]
    fn test_no_duplicate_cards_after_plays() {
        let mut state = GameState::waiting(config(5));
        state
            .start_game(&players(&["p1", "p2", "p3", "p4", "p5"]), &catalog(), &mut rng())
            .unwrap();
        for p in ["p2", "p3", "p4", "p5"] {
            let card = first_card(&state, p);
            state.play_card(p, &[card]).unwrap();
            assert!(state.duplicate_white_cards().is_empty());
        }
        let total: usize = state.white_card_census().values().sum();
        // 80 base white cards, none lost or duplicated
        assert_eq!(total, 80);
    }

    #[test]
    fn test_skip_unblocks_judging() {
        let mut state = started(5);
        let card = first_card(&state, "p2");
        state.play_card("p2", &[card]).unwrap();

        let outcome = state.skip_player("p3").unwrap();
        assert!(outcome.all_submitted);
        assert_eq!(state.phase, GamePhase::Judging);
        assert!(state.skipped_players.contains("p3"));
    }

    #[test]
    fn test_skip_is_idempotent() {
        let mut state = GameState::waiting(config(5));
        state
            .start_game(&players(&["p1", "p2", "p3", "p4"]), &catalog(), &mut rng())
            .unwrap();
        let first = state.skip_player("p3").unwrap();
        assert!(!first.already_skipped);
        let second = state.skip_player("p3").unwrap();
        assert!(second.already_skipped);
        assert_eq!(state.skipped_players.len(), 1);
    }

    #[test]
    fn test_skip_rules() {
        let mut state = started(5);
        assert_eq!(state.skip_player("p1"), Err(GameError::CannotSkipJudge));
        assert_eq!(
            state.skip_player("ghost"),
            Err(GameError::PlayerNotInGame("ghost".to_string()))
        );

        let card = first_card(&state, "p2");
        state.play_card("p2", &[card]).unwrap();
        assert_eq!(
            state.skip_player("p2"),
            Err(GameError::AlreadySubmitted("p2".to_string()))
        );
    }

    #[test]
    fn test_cannot_skip_everyone() {
        let mut state = started(5);
        state.skip_player("p2").unwrap();
        assert_eq!(
            state.skip_player("p3"),
            Err(GameError::NoSubmissionsRemaining)
        );
        assert_eq!(state.phase, GamePhase::Submitting);
    }

    #[test]
    fn test_skipped_player_may_still_play() {
        let mut state = GameState::waiting(config(5));
        state
            .start_game(&players(&["p1", "p2", "p3", "p4"]), &catalog(), &mut rng())
            .unwrap();
        state.skip_player("p4").unwrap();

        let card = first_card(&state, "p4");
        state.play_card("p4", &[card]).unwrap();
        assert!(!state.skipped_players.contains("p4"));
        assert_eq!(state.phase, GamePhase::Submitting);
    }
}
