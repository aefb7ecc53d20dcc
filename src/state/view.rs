use super::GameState;
use crate::deck::CardCatalog;
use crate::types::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// What one player is allowed to see of the game document.
///
/// Other hands and the draw piles are reduced to counts; submissions are only
/// shown once the judging phase has started. `card_text` carries the text of
/// every white card the viewer can see.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub phase: GamePhase,
    pub round: u32,
    pub judge_id: Option<PlayerId>,
    pub black_card: Option<BlackCard>,
    pub hand: Vec<CardId>,
    pub hand_sizes: BTreeMap<PlayerId, usize>,
    pub submitted: Vec<PlayerId>,
    pub submissions: BTreeMap<PlayerId, Vec<CardId>>,
    pub revealed_cards: BTreeMap<PlayerId, bool>,
    pub skipped_players: Vec<PlayerId>,
    pub scores: BTreeMap<PlayerId, u32>,
    pub round_winner: Option<PlayerId>,
    pub winning_cards: Vec<CardId>,
    pub white_deck_size: usize,
    pub black_deck_size: usize,
    pub game_end_time: Option<String>,
    pub config: GameConfig,
    pub card_text: BTreeMap<CardId, String>,
}

impl GameState {
    pub fn view_for(&self, viewer: &str, catalog: &CardCatalog) -> GameView {
        let submissions_visible = matches!(
            self.phase,
            GamePhase::Judging | GamePhase::RoundEnd | GamePhase::Complete
        );
        let submissions = if submissions_visible {
            self.submissions.clone()
        } else {
            // The player may always see their own pending submission
            self.submissions
                .iter()
                .filter(|(id, _)| id.as_str() == viewer)
                .map(|(id, cards)| (id.clone(), cards.clone()))
                .collect()
        };

        let hand = self.hands.get(viewer).cloned().unwrap_or_default();
        let card_text = hand
            .iter()
            .chain(submissions.values().flatten())
            .chain(self.winning_cards.iter())
            .filter_map(|id| catalog.white_card(id))
            .map(|card| (card.id.clone(), card.text.clone()))
            .collect();

        GameView {
            phase: self.phase,
            round: self.round,
            judge_id: self.judge_id.clone(),
            black_card: self.black_card.clone(),
            hand,
            hand_sizes: self
                .hands
                .iter()
                .map(|(id, hand)| (id.clone(), hand.len()))
                .collect(),
            submitted: self.submissions.keys().cloned().collect(),
            submissions,
            revealed_cards: self.revealed_cards.clone(),
            skipped_players: self.skipped_players.iter().cloned().collect(),
            scores: self.scores.clone(),
            round_winner: self.round_winner.clone(),
            winning_cards: self.winning_cards.clone(),
            white_deck_size: self.white_deck.len(),
            black_deck_size: self.black_deck.len(),
            game_end_time: self.game_end_time.clone(),
            config: self.config.clone(),
            card_text,
        }
    }
}
