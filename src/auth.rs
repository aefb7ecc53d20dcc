//! Caller identity and role checks
//!
//! Users are authenticated by the fronting gateway, which forwards the user id
//! in `X-User-Id`. When `GATEWAY_TOKEN` is set the gateway must also present
//! it as a bearer token, so the header can't be forged by going around it.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::{GameError, GameResult};
use crate::state::GameState;
use crate::types::*;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Shared secret expected from the gateway (None = check disabled)
    pub gateway_token: Option<String>,
}

impl AuthConfig {
    /// Load auth config from environment variables
    pub fn from_env() -> Self {
        let gateway_token = std::env::var("GATEWAY_TOKEN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if gateway_token.is_some() {
            tracing::info!("Gateway token check enabled");
        } else {
            tracing::warn!(
                "Gateway token check DISABLED - any client can claim any X-User-Id!"
            );
        }
        Self { gateway_token }
    }

    pub fn is_enabled(&self) -> bool {
        self.gateway_token.is_some()
    }

    /// Validate a presented bearer token
    pub fn validate(&self, token: &str) -> bool {
        match &self.gateway_token {
            Some(expected) => constant_time_eq(expected.as_bytes(), token.as_bytes()),
            None => true,
        }
    }
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Middleware requiring the gateway bearer token on API routes
pub async fn gateway_auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !auth_config.is_enabled() {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| auth_config.validate(token.trim()))
        .unwrap_or(false);

    if authorized {
        return next.run(request).await;
    }
    tracing::warn!(
        "Rejected request to {} without a valid gateway token",
        request.uri().path()
    );
    GameError::Unauthenticated.into_response()
}

/// The authenticated user making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub UserId);

impl Caller {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = GameError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Caller(id.to_string()))
            .ok_or(GameError::Unauthenticated)
    }
}

/// Host-only commands
pub fn require_host(caller: &Caller, lobby: &Lobby) -> GameResult<()> {
    if caller.id() != lobby.host_user_id {
        return Err(GameError::forbidden("only the host can do that"));
    }
    Ok(())
}

/// Resolve the player the caller is acting as.
///
/// Callers act as themselves; the host may also act for a bot it controls.
pub fn require_player<'a>(
    caller: &Caller,
    lobby: &Lobby,
    players: &'a [Player],
    player_id: &str,
) -> GameResult<&'a Player> {
    let player = players
        .iter()
        .find(|p| p.id == player_id)
        .ok_or_else(|| GameError::forbidden("not a member of this lobby"))?;

    if player.id == caller.id() {
        return Ok(player);
    }
    if caller.id() == lobby.host_user_id && player.is_bot_controlled_by(caller.id()) {
        return Ok(player);
    }
    Err(GameError::forbidden(format!("cannot act for player {}", player_id)))
}

/// Judge-only commands. Returns the judge's player id.
///
/// The host may judge on behalf of a bot czar it controls.
pub fn require_judge(
    caller: &Caller,
    lobby: &Lobby,
    state: &GameState,
    players: &[Player],
) -> GameResult<PlayerId> {
    let judge_id = state
        .judge_id
        .clone()
        .ok_or_else(|| GameError::forbidden("there is no card czar yet"))?;

    if judge_id == caller.id() {
        return Ok(judge_id);
    }
    let judge_is_hosts_bot = players
        .iter()
        .any(|p| p.id == judge_id && p.is_bot_controlled_by(caller.id()));
    if caller.id() == lobby.host_user_id && judge_is_hosts_bot {
        return Ok(judge_id);
    }
    Err(GameError::forbidden("only the card czar can do that"))
}

/// Commands either the host or the card czar may issue
pub fn require_host_or_judge(
    caller: &Caller,
    lobby: &Lobby,
    state: &GameState,
    players: &[Player],
) -> GameResult<()> {
    if require_host(caller, lobby).is_ok() {
        return Ok(());
    }
    require_judge(caller, lobby, state, players)
        .map(|_| ())
        .map_err(|_| GameError::forbidden("only the host or the card czar can do that"))
}
