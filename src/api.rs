//! HTTP API endpoints.
//!
//! Every game command is a POST with a JSON body naming the lobby. Successful
//! responses carry `"success": true` next to the command's outcome; failures
//! are rendered by [`GameError`]'s `IntoResponse`.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Request, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{self, AuthConfig, Caller};
use crate::error::GameError;
use crate::handlers::{
    Applied, BotAdded, Converted, GameService, Joined, Left, LobbyCreated, LobbyView,
    ResetOutcome, StartOutcome,
};
use crate::state::{NextRoundOutcome, PlayOutcome, RevealOutcome, SkipOutcome, WinnerOutcome};
use crate::types::*;

type ApiResult<T> = Result<Json<Success<T>>, GameError>;

#[derive(Debug, Serialize)]
pub struct Success<T> {
    success: bool,
    #[serde(flatten)]
    data: T,
}

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(Success {
        success: true,
        data,
    }))
}

/// JSON body whose rejection uses the API error format
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = GameError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(GameError::BadRequest(rejection.body_text())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyRequest {
    pub player_name: String,
    #[serde(default)]
    pub config: GameConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinLobbyRequest {
    pub code: String,
    pub player_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyRequest {
    pub lobby_id: LobbyId,
}

/// Commands aimed at one player of the lobby
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    pub lobby_id: LobbyId,
    pub player_id: PlayerId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayCardRequest {
    pub lobby_id: LobbyId,
    pub card_ids: Vec<CardId>,
    /// Set when the host plays for one of its bots
    #[serde(default)]
    pub player_id: Option<PlayerId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectWinnerRequest {
    pub lobby_id: LobbyId,
    pub winner_id: PlayerId,
}

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
}

/// Build the application router
pub fn router(service: GameService, auth_config: Arc<AuthConfig>) -> Router {
    let api = Router::new()
        .route("/lobbies", post(create_lobby))
        .route("/lobbies/join", post(join_lobby))
        .route("/lobbies/leave", post(leave_lobby))
        .route("/lobbies/{lobby_id}", get(get_lobby))
        .route("/game/start", post(start_game))
        .route("/game/play-card", post(play_card))
        .route("/game/skip-player", post(skip_player))
        .route("/game/reveal-card", post(reveal_card))
        .route("/game/select-winner", post(select_winner))
        .route("/game/next-round", post(next_round))
        .route("/game/convert-spectator", post(convert_spectator))
        .route("/game/reset", post(reset_game))
        .route("/bots/add", post(add_bot))
        .route("/bots/remove", post(remove_bot))
        .layer(middleware::from_fn_with_state(
            auth_config,
            auth::gateway_auth_middleware,
        ));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// GET /health
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// POST /api/lobbies
pub async fn create_lobby(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<CreateLobbyRequest>,
) -> ApiResult<LobbyCreated> {
    ok(service
        .create_lobby(&caller, &req.player_name, req.config)
        .await?)
}

/// POST /api/lobbies/join
pub async fn join_lobby(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<JoinLobbyRequest>,
) -> ApiResult<Joined> {
    ok(service
        .join_lobby(&caller, &req.code, &req.player_name)
        .await?)
}

/// POST /api/lobbies/leave
pub async fn leave_lobby(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<LobbyRequest>,
) -> ApiResult<Left> {
    ok(service.leave_lobby(&caller, &req.lobby_id).await?)
}

/// GET /api/lobbies/{lobby_id}
pub async fn get_lobby(
    State(service): State<GameService>,
    caller: Caller,
    Path(lobby_id): Path<LobbyId>,
) -> ApiResult<LobbyView> {
    ok(service.lobby_view(&caller, &lobby_id).await?)
}

pub async fn start_game(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<LobbyRequest>,
) -> ApiResult<Applied<StartOutcome>> {
    ok(service.start_game(&caller, &req.lobby_id).await?)
}

pub async fn play_card(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<PlayCardRequest>,
) -> ApiResult<Applied<PlayOutcome>> {
    ok(service
        .play_card(&caller, &req.lobby_id, req.player_id, req.card_ids)
        .await?)
}

pub async fn skip_player(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<PlayerRequest>,
) -> ApiResult<Applied<SkipOutcome>> {
    ok(service
        .skip_player(&caller, &req.lobby_id, &req.player_id)
        .await?)
}

pub async fn reveal_card(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<PlayerRequest>,
) -> ApiResult<Applied<RevealOutcome>> {
    ok(service
        .reveal_card(&caller, &req.lobby_id, &req.player_id)
        .await?)
}

pub async fn select_winner(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<SelectWinnerRequest>,
) -> ApiResult<Applied<WinnerOutcome>> {
    ok(service
        .select_winner(&caller, &req.lobby_id, &req.winner_id)
        .await?)
}

pub async fn next_round(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<LobbyRequest>,
) -> ApiResult<Applied<NextRoundOutcome>> {
    ok(service.next_round(&caller, &req.lobby_id).await?)
}

pub async fn convert_spectator(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<PlayerRequest>,
) -> ApiResult<Applied<Converted>> {
    ok(service
        .convert_spectator(&caller, &req.lobby_id, &req.player_id)
        .await?)
}

pub async fn reset_game(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<LobbyRequest>,
) -> ApiResult<Applied<ResetOutcome>> {
    ok(service.reset_game(&caller, &req.lobby_id).await?)
}

pub async fn add_bot(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<LobbyRequest>,
) -> ApiResult<BotAdded> {
    ok(service.add_bot(&caller, &req.lobby_id).await?)
}

pub async fn remove_bot(
    State(service): State<GameService>,
    caller: Caller,
    ApiJson(req): ApiJson<PlayerRequest>,
) -> ApiResult<Left> {
    ok(service
        .remove_bot(&caller, &req.lobby_id, &req.player_id)
        .await?)
}
