use serde::{Deserialize, Serialize};

/// Opaque ID types for readability
pub type LobbyId = String;
pub type PlayerId = String;
pub type UserId = String;
pub type CardId = String;
pub type PackId = String;

/// Reserved prefix for bot player ids
pub const BOT_PREFIX: &str = "bot-";

/// Minimum number of players needed to deal a game
pub const MIN_PLAYERS: usize = 3;

/// A running round needs a judge and at least one submitter
pub const MIN_ROUND_PLAYERS: usize = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    Waiting,
    Submitting,
    Judging,
    RoundEnd,
    Complete,
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GamePhase::Waiting => "waiting",
            GamePhase::Submitting => "submitting",
            GamePhase::Judging => "judging",
            GamePhase::RoundEnd => "roundEnd",
            GamePhase::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WhiteCard {
    pub id: CardId,
    pub text: String,
}

/// A prompt card; `pick` is how many white cards each submission carries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlackCard {
    pub id: CardId,
    pub text: String,
    #[serde(default = "default_pick")]
    pub pick: usize,
}

fn default_pick() -> usize {
    1
}

/// Per-lobby settings, fixed when the lobby is created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub max_points: u32,
    pub cards_per_player: usize,
    pub card_packs: Vec<PackId>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub lobby_name: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_points: 10,
            cards_per_player: 10,
            card_packs: vec!["base".to_string()],
            is_private: false,
            lobby_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LobbyStatus {
    Waiting,
    Playing,
    Complete,
}

impl From<GamePhase> for LobbyStatus {
    fn from(phase: GamePhase) -> Self {
        match phase {
            GamePhase::Waiting => LobbyStatus::Waiting,
            GamePhase::Submitting | GamePhase::Judging | GamePhase::RoundEnd => {
                LobbyStatus::Playing
            }
            GamePhase::Complete => LobbyStatus::Complete,
        }
    }
}

/// Lobby document as held by the document store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lobby {
    pub id: LobbyId,
    pub code: String,
    pub host_user_id: UserId,
    pub status: LobbyStatus,
    /// Encoded `GameState`
    pub game_state: String,
    pub updated_at: String, // ISO timestamp of the last write
    /// Bumped by the store on every write; the compare-and-swap token
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlayerKind {
    Human,
    Bot {
        #[serde(rename = "controlledBy")]
        controlled_by: UserId,
    },
}

/// Player document, one per lobby member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub lobby_id: LobbyId,
    pub name: String,
    pub kind: PlayerKind,
    #[serde(default)]
    pub spectator: bool,
    pub joined_at: String,
}

impl Player {
    /// True when `user_id` may act on behalf of this bot
    pub fn is_bot_controlled_by(&self, user_id: &str) -> bool {
        matches!(&self.kind, PlayerKind::Bot { controlled_by } if controlled_by == user_id)
    }

    pub fn is_bot(&self) -> bool {
        matches!(self.kind, PlayerKind::Bot { .. })
    }
}

pub fn is_bot_id(player_id: &str) -> bool {
    player_id.starts_with(BOT_PREFIX)
}
