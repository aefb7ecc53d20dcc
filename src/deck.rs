//! Card catalog, deck building, shuffling and dealing.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::GameError;
use crate::types::{BlackCard, CardId, PackId, WhiteCard};

/// Built-in card data, used unless CARD_PACKS_PATH points elsewhere
const BUILTIN_CARDS: &str = include_str!("../data/cards.json");

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeckError {
    #[error("Not enough cards left to deal")]
    Exhausted,

    #[error("Unknown card pack: {0}")]
    UnknownPack(PackId),

    #[error("No card packs selected")]
    NoPacks,
}

impl From<DeckError> for GameError {
    fn from(err: DeckError) -> Self {
        match err {
            DeckError::Exhausted => GameError::DeckExhausted,
            DeckError::UnknownPack(id) => GameError::UnknownCardPack(id),
            DeckError::NoPacks => GameError::NoCardPacks,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read card packs: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse card packs: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid card packs: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardPack {
    pub id: PackId,
    pub name: String,
    #[serde(default)]
    pub white: Vec<WhiteCard>,
    #[serde(default)]
    pub black: Vec<BlackCard>,
}

/// All known card packs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCatalog {
    pub packs: Vec<CardPack>,
}

impl CardCatalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CARDS)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: CardCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Card ids must be unique across every pack, or dealing could duplicate a card
    fn validate(&self) -> Result<(), CatalogError> {
        let mut pack_ids = HashSet::new();
        let mut card_ids = HashSet::new();

        for pack in &self.packs {
            if !pack_ids.insert(pack.id.as_str()) {
                return Err(CatalogError::Invalid(format!(
                    "duplicate pack id '{}'",
                    pack.id
                )));
            }
            let ids = pack
                .white
                .iter()
                .map(|c| c.id.as_str())
                .chain(pack.black.iter().map(|c| c.id.as_str()));
            for id in ids {
                if !card_ids.insert(id) {
                    return Err(CatalogError::Invalid(format!("duplicate card id '{}'", id)));
                }
            }
            if let Some(card) = pack.black.iter().find(|c| c.pick == 0) {
                return Err(CatalogError::Invalid(format!(
                    "black card '{}' must pick at least one card",
                    card.id
                )));
            }
        }
        Ok(())
    }

    pub fn pack(&self, pack_id: &str) -> Option<&CardPack> {
        self.packs.iter().find(|p| p.id == pack_id)
    }

    pub fn black_card(&self, card_id: &str) -> Option<&BlackCard> {
        self.packs
            .iter()
            .flat_map(|p| p.black.iter())
            .find(|c| c.id == card_id)
    }

    pub fn white_card(&self, card_id: &str) -> Option<&WhiteCard> {
        self.packs
            .iter()
            .flat_map(|p| p.white.iter())
            .find(|c| c.id == card_id)
    }
}

/// Unshuffled draw piles for a set of packs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decks {
    pub white: Vec<CardId>,
    pub black: Vec<CardId>,
}

/// Collect every card id belonging to the selected packs
pub fn build_decks(catalog: &CardCatalog, pack_ids: &[PackId]) -> Result<Decks, DeckError> {
    if pack_ids.is_empty() {
        return Err(DeckError::NoPacks);
    }

    let mut seen = HashSet::new();
    let mut decks = Decks::default();
    for pack_id in pack_ids {
        // Selecting a pack twice must not put its cards in the deck twice
        if !seen.insert(pack_id.as_str()) {
            continue;
        }
        let pack = catalog
            .pack(pack_id)
            .ok_or_else(|| DeckError::UnknownPack(pack_id.clone()))?;
        decks.white.extend(pack.white.iter().map(|c| c.id.clone()));
        decks.black.extend(pack.black.iter().map(|c| c.id.clone()));
    }
    Ok(decks)
}

/// Uniform index in `0..bound`, rejecting the biased tail of the u64 range
pub fn uniform_index<R: RngCore + ?Sized>(rng: &mut R, bound: usize) -> usize {
    debug_assert!(bound > 0, "uniform_index needs a non-empty range");
    let m = bound as u64;
    // Largest multiple of m that fits in u64; draws at or above it are discarded
    let limit = u64::MAX - (u64::MAX % m);
    loop {
        let x = rng.next_u64();
        if x < limit {
            return (x % m) as usize;
        }
    }
}

/// Fisher-Yates shuffle
pub fn shuffle<T, R: RngCore + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = uniform_index(rng, i + 1);
        items.swap(i, j);
    }
}

/// Take the first `n` cards off the deck
pub fn deal(deck: &mut Vec<CardId>, n: usize) -> Result<Vec<CardId>, DeckError> {
    if deck.len() < n {
        return Err(DeckError::Exhausted);
    }
    Ok(deck.drain(..n).collect())
}

/// Deal `n` cards, reshuffling the discard pile under the deck if it runs short
pub fn draw<R: RngCore + ?Sized>(
    deck: &mut Vec<CardId>,
    discard: &mut Vec<CardId>,
    n: usize,
    rng: &mut R,
) -> Result<Vec<CardId>, DeckError> {
    if deck.len() < n && !discard.is_empty() {
        tracing::debug!(
            "Reshuffling {} discarded card(s) into a deck of {}",
            discard.len(),
            deck.len()
        );
        let mut recycled = std::mem::take(discard);
        shuffle(&mut recycled, rng);
        deck.extend(recycled);
    }
    deal(deck, n)
}
