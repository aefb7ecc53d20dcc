//! Wire format for the game document stored on the lobby record.

use super::GameState;

pub fn encode_game_state(state: &GameState) -> String {
    // Maps keyed by strings and plain data only; serialization cannot fail
    serde_json::to_string(state).unwrap_or_else(|e| {
        tracing::error!("Failed to encode game state: {}", e);
        String::from("{}")
    })
}

/// Parse a stored game document.
///
/// Malformed or partial documents yield `None` instead of an error, so callers
/// treat them the same as a lobby whose game was never initialised.
pub fn decode_game_state(raw: &str) -> Option<GameState> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!("Discarding unreadable game state: {}", e);
            None
        }
    }
}
