//! Error taxonomy shared by the engine, the concurrency guard and the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::types::{CardId, GamePhase, PackId, PlayerId};

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    // Validation
    #[error("Submissions are only accepted while submitting (phase is {0})")]
    NotAcceptingSubmissions(GamePhase),

    #[error("The card czar cannot play cards this round")]
    CzarCannotPlay,

    #[error("Player {0} has already submitted this round")]
    AlreadySubmitted(PlayerId),

    #[error("Card {0} is not in the player's hand")]
    CardNotInHand(CardId),

    #[error("Card {0} was submitted more than once")]
    DuplicateCard(CardId),

    #[error("Expected {expected} card(s), got {got}")]
    WrongCardCount { expected: usize, got: usize },

    #[error("Only allowed while judging (phase is {0})")]
    NotJudgingPhase(GamePhase),

    #[error("Expected phase {expected}, but the game is in {actual}")]
    WrongPhase {
        expected: GamePhase,
        actual: GamePhase,
    },

    #[error("The deck ran out of cards")]
    DeckExhausted,

    #[error("At least {required} players are needed, found {found}")]
    NotEnoughPlayers { required: usize, found: usize },

    #[error("Player {0} has no submission this round")]
    NoSubmission(PlayerId),

    #[error("The card czar cannot be skipped")]
    CannotSkipJudge,

    #[error("Skipping would leave no submissions to judge")]
    NoSubmissionsRemaining,

    #[error("Player {0} is already in the game")]
    AlreadyPlaying(PlayerId),

    #[error("Player {0} is not part of this game")]
    PlayerNotInGame(PlayerId),

    #[error("The card czar cannot leave while a round is in progress")]
    CannotRemoveJudge,

    #[error("Unknown card pack: {0}")]
    UnknownCardPack(PackId),

    #[error("At least one card pack must be selected")]
    NoCardPacks,

    #[error("Invalid lobby configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid player name: {0}")]
    InvalidPlayerName(String),

    #[error("The stored game state is missing or malformed")]
    InvalidGameState,

    #[error("Malformed request: {0}")]
    BadRequest(String),

    // Authorization
    #[error("Missing caller identity")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Not found
    #[error("Lobby {0} not found")]
    LobbyNotFound(String),

    // Conflict
    #[error("The game was modified concurrently; gave up after {attempts} attempt(s)")]
    ConcurrentModification { attempts: u32 },

    // Infrastructure
    #[error("Document store error: {0}")]
    Store(String),
}

/// Coarse classification used for status codes and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    Internal,
}

impl GameError {
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::Forbidden(detail.into())
    }

    pub fn class(&self) -> ErrorClass {
        use GameError::*;
        match self {
            Unauthenticated | Forbidden(_) => ErrorClass::Authorization,
            LobbyNotFound(_) => ErrorClass::NotFound,
            ConcurrentModification { .. } => ErrorClass::Conflict,
            Store(_) => ErrorClass::Internal,
            _ => ErrorClass::Validation,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GameError::Unauthenticated => StatusCode::UNAUTHORIZED,
            _ => match self.class() {
                ErrorClass::Validation => StatusCode::BAD_REQUEST,
                ErrorClass::Authorization => StatusCode::FORBIDDEN,
                ErrorClass::NotFound => StatusCode::NOT_FOUND,
                ErrorClass::Conflict => StatusCode::CONFLICT,
                ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        use GameError::*;
        match self {
            NotAcceptingSubmissions(_) => "NOT_ACCEPTING_SUBMISSIONS",
            CzarCannotPlay => "CZAR_CANNOT_PLAY",
            AlreadySubmitted(_) => "ALREADY_SUBMITTED",
            CardNotInHand(_) => "CARD_NOT_IN_HAND",
            DuplicateCard(_) => "DUPLICATE_CARD",
            WrongCardCount { .. } => "WRONG_CARD_COUNT",
            NotJudgingPhase(_) => "NOT_JUDGING_PHASE",
            WrongPhase { .. } => "WRONG_PHASE",
            DeckExhausted => "DECK_EXHAUSTED",
            NotEnoughPlayers { .. } => "NOT_ENOUGH_PLAYERS",
            NoSubmission(_) => "NO_SUBMISSION",
            CannotSkipJudge => "CANNOT_SKIP_JUDGE",
            NoSubmissionsRemaining => "NO_SUBMISSIONS_REMAINING",
            AlreadyPlaying(_) => "ALREADY_PLAYING",
            PlayerNotInGame(_) => "PLAYER_NOT_IN_GAME",
            CannotRemoveJudge => "CANNOT_REMOVE_JUDGE",
            UnknownCardPack(_) => "UNKNOWN_CARD_PACK",
            NoCardPacks => "NO_CARD_PACKS",
            InvalidConfig(_) => "INVALID_CONFIG",
            InvalidPlayerName(_) => "INVALID_PLAYER_NAME",
            InvalidGameState => "INVALID_GAME_STATE",
            BadRequest(_) => "BAD_REQUEST",
            Unauthenticated => "UNAUTHENTICATED",
            Forbidden(_) => "FORBIDDEN",
            LobbyNotFound(_) => "LOBBY_NOT_FOUND",
            ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Store(_) => "STORE_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", self.code(), self);
        }

        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(GameError::CzarCannotPlay.class(), ErrorClass::Validation);
        assert_eq!(
            GameError::forbidden("judge only").class(),
            ErrorClass::Authorization
        );
        assert_eq!(
            GameError::ConcurrentModification { attempts: 3 }.class(),
            ErrorClass::Conflict
        );
        assert_eq!(
            GameError::Store("down".to_string()).class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GameError::DeckExhausted.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GameError::forbidden("host only").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GameError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GameError::LobbyNotFound("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GameError::ConcurrentModification { attempts: 3 }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            GameError::Store("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_name_the_phase() {
        let err = GameError::WrongPhase {
            expected: GamePhase::RoundEnd,
            actual: GamePhase::Complete,
        };
        assert_eq!(
            err.to_string(),
            "Expected phase roundEnd, but the game is in complete"
        );
        assert_eq!(err.code(), "WRONG_PHASE");
    }
}
