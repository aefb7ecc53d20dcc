//! The per-lobby game document and its round transition engine.
//!
//! Every operation is a method on [`GameState`] that validates its input
//! against the current phase before touching anything, so a failed call
//! leaves the state exactly as it was.

mod codec;
mod game;
mod judging;
mod player;
mod round;
mod submission;
mod view;

pub use codec::{decode_game_state, encode_game_state};
pub use judging::{RevealOutcome, WinnerOutcome};
pub use round::NextRoundOutcome;
pub use submission::{PlayOutcome, SkipOutcome};
pub use view::GameView;

use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub phase: GamePhase,
    #[serde(default)]
    pub judge_id: Option<PlayerId>,
    #[serde(default)]
    pub black_card: Option<BlackCard>,
    #[serde(default)]
    pub hands: BTreeMap<PlayerId, Vec<CardId>>,
    #[serde(default)]
    pub submissions: BTreeMap<PlayerId, Vec<CardId>>,
    /// Mirror of `submissions` kept for older clients
    #[serde(default)]
    pub played_cards: BTreeMap<PlayerId, Vec<CardId>>,
    #[serde(default)]
    pub scores: BTreeMap<PlayerId, u32>,
    #[serde(default)]
    pub round: u32,
    #[serde(default)]
    pub round_winner: Option<PlayerId>,
    #[serde(default)]
    pub winning_cards: Vec<CardId>,
    #[serde(default)]
    pub white_deck: Vec<CardId>,
    #[serde(default)]
    pub black_deck: Vec<CardId>,
    #[serde(default)]
    pub discard_white: Vec<CardId>,
    #[serde(default)]
    pub discard_black: Vec<CardId>,
    #[serde(default)]
    pub skipped_players: BTreeSet<PlayerId>,
    #[serde(default)]
    pub revealed_cards: BTreeMap<PlayerId, bool>,
    /// Join order; judge rotation walks this and skips anyone without a hand
    #[serde(default)]
    pub player_order: Vec<PlayerId>,
    #[serde(default)]
    pub game_end_time: Option<String>,
    pub config: GameConfig,
}

impl GameState {
    /// A fresh lobby that has not dealt a game yet
    pub fn waiting(config: GameConfig) -> Self {
        Self {
            phase: GamePhase::Waiting,
            judge_id: None,
            black_card: None,
            hands: BTreeMap::new(),
            submissions: BTreeMap::new(),
            played_cards: BTreeMap::new(),
            scores: BTreeMap::new(),
            round: 0,
            round_winner: None,
            winning_cards: Vec::new(),
            white_deck: Vec::new(),
            black_deck: Vec::new(),
            discard_white: Vec::new(),
            discard_black: Vec::new(),
            skipped_players: BTreeSet::new(),
            revealed_cards: BTreeMap::new(),
            player_order: Vec::new(),
            game_end_time: None,
            config,
        }
    }

    pub fn is_judge(&self, player_id: &str) -> bool {
        self.judge_id.as_deref() == Some(player_id)
    }

    pub fn is_in_game(&self, player_id: &str) -> bool {
        self.hands.contains_key(player_id)
    }

    /// Cards each submission must carry this round
    pub fn pick(&self) -> usize {
        self.black_card.as_ref().map(|c| c.pick).unwrap_or(1)
    }

    /// Players who still owe a submission: everyone dealt in, minus judge and skipped
    pub fn required_submitters(&self) -> Vec<&PlayerId> {
        self.hands
            .keys()
            .filter(|id| !self.is_judge(id) && !self.skipped_players.contains(*id))
            .collect()
    }

    pub fn all_submitted(&self) -> bool {
        !self.submissions.is_empty()
            && self
                .required_submitters()
                .into_iter()
                .all(|id| self.submissions.contains_key(id))
    }

    /// Move to judging once every required submitter is in. Returns whether it advanced.
    pub(crate) fn advance_if_all_submitted(&mut self) -> bool {
        if self.phase == GamePhase::Submitting && self.all_submitted() {
            tracing::debug!(
                "All {} submission(s) in for round {}, moving to judging",
                self.submissions.len(),
                self.round
            );
            self.phase = GamePhase::Judging;
            true
        } else {
            false
        }
    }

    /// Count of every white card id currently tracked by the game
    pub fn white_card_census(&self) -> HashMap<&CardId, usize> {
        let mut census: HashMap<&CardId, usize> = HashMap::new();
        let tracked = self
            .hands
            .values()
            .chain(self.submissions.values())
            .flatten()
            .chain(self.white_deck.iter())
            .chain(self.discard_white.iter());
        for id in tracked {
            *census.entry(id).or_default() += 1;
        }
        census
    }

    /// White card ids that appear more than once; empty for a consistent state
    pub fn duplicate_white_cards(&self) -> Vec<CardId> {
        let mut dups: Vec<CardId> = self
            .white_card_census()
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(id, _)| id.clone())
            .collect();
        dups.sort();
        dups
    }

    pub(crate) fn sync_played_cards(&mut self) {
        self.played_cards = self.submissions.clone();
    }

    pub(crate) fn clear_round(&mut self) {
        self.submissions.clear();
        self.played_cards.clear();
        self.revealed_cards.clear();
        self.skipped_players.clear();
        self.round_winner = None;
        self.winning_cards.clear();
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_waiting_state_is_empty() {
        let state = GameState::waiting(GameConfig::default());
        assert_eq!(state.phase, GamePhase::Waiting);
        assert!(state.judge_id.is_none());
        assert!(state.black_card.is_none());
        assert_eq!(state.round, 0);
        assert!(!state.all_submitted());
    }

    #[test]
    fn test_required_submitters_excludes_judge_and_skipped() {
        let mut state = started(5);
        let required: Vec<_> = state.required_submitters().into_iter().cloned().collect();
        assert_eq!(required, players(&["p2", "p3"]));

        state.skipped_players.insert("p3".to_string());
        let required: Vec<_> = state.required_submitters().into_iter().cloned().collect();
        assert_eq!(required, players(&["p2"]));
    }

    #[test]
    fn test_census_detects_duplicates() {
        let mut state = started(5);
        assert!(state.duplicate_white_cards().is_empty());

        let card = first_card(&state, "p2");
        state.discard_white.push(card.clone());
        assert_eq!(state.duplicate_white_cards(), vec![card]);
    }
}
