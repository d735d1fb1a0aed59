use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shakmaty::uci::UciMove;
use shakmaty::Position;
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, warn};
use uci_engine::{EngineError, EngineHandle};

use crate::opponents::{Level, OpponentProfile};
use crate::play::{self, MoveResult, PlayError, AI_COLOR};

#[derive(Clone)]
pub struct AppState {
    // The one engine process, shared by every request
    pub engine: Arc<EngineHandle>,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    pub fen: String,
    pub level: i64,
}

#[derive(Serialize)]
pub struct MoveResponse {
    #[serde(rename = "move")]
    pub uci: String,
    pub fen: String,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_check: bool,
}

impl From<MoveResult> for MoveResponse {
    fn from(result: MoveResult) -> Self {
        Self {
            uci: result.uci,
            fen: result.fen,
            is_checkmate: result.is_checkmate,
            is_stalemate: result.is_stalemate,
            is_check: result.is_check,
        }
    }
}

#[derive(Deserialize)]
pub struct ValidateMoveParams {
    pub fen: String,
    #[serde(rename = "move")]
    pub uci: String,
}

#[derive(Serialize)]
pub struct ValidateMoveResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_checkmate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_stalemate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_check: Option<bool>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub engine_ready: bool,
}

/// Errors surfaced to HTTP callers, serialized as `{"detail": ...}`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid level")]
    InvalidLevel,

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Game is already over")]
    GameOver,

    #[error("It's not AI's turn - White to move")]
    WrongTurn,

    #[error(transparent)]
    Play(#[from] PlayError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidLevel
            | ApiError::InvalidFen(_)
            | ApiError::InvalidMove(_)
            | ApiError::GameOver
            | ApiError::WrongTurn => StatusCode::BAD_REQUEST,
            ApiError::Play(PlayError::Engine(EngineError::Unavailable)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Play(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {self}");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub fn router(engine: Arc<EngineHandle>) -> Router {
    let state = AppState { engine };

    Router::new()
        .route("/", get(root))
        .route("/opponents", get(opponents))
        .route("/get-move", post(get_move))
        .route("/validate-move", post(validate_move))
        .route("/health", get(health))
        .layer(cors_layer())
        .with_state(state)
}

/// Browser clients are the Next.js frontend, locally and on Vercel.
/// Wildcards cannot be combined with credentials, so methods and headers
/// are mirrored from the request instead.
fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring malformed CORS origin {origin:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn allowed_origins() -> Vec<String> {
    match std::env::var("ALLOWED_ORIGINS") {
        Ok(raw) => raw
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect(),
        Err(_) => vec![
            "http://localhost:3000".to_string(),
            "https://ai-chess-game-eight.vercel.app".to_string(),
        ],
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Chess AI Backend is running!" }))
}

async fn opponents() -> Json<BTreeMap<u8, &'static OpponentProfile>> {
    let table = Level::ALL
        .iter()
        .map(|level| (level.as_int(), level.profile()))
        .collect();
    Json(table)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine_ready = state.engine.is_ready().await;
    Json(HealthResponse {
        status: if engine_ready { "ok" } else { "degraded" },
        engine_ready,
    })
}

async fn get_move(
    State(state): State<AppState>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, ApiError> {
    // 1. Resolve the difficulty level
    let level = Level::from_int(request.level).ok_or(ApiError::InvalidLevel)?;
    let profile = level.profile();

    // 2. Parse the position
    let pos = play::parse_fen(&request.fen).map_err(ApiError::InvalidFen)?;

    // 3. Reject finished games, then positions where it is not our turn
    if pos.is_game_over() {
        return Err(ApiError::GameOver);
    }
    if pos.turn() != AI_COLOR {
        return Err(ApiError::WrongTurn);
    }

    info!(
        "{} ({}) to move on {}",
        profile.name, profile.title, request.fen
    );

    // 4. Pick and apply the move
    let mut rng = StdRng::from_rng(&mut rand::rng());
    let result = play::select_move(pos, profile, state.engine.as_ref(), &mut rng).await?;

    Ok(Json(MoveResponse::from(result)))
}

/// Checks a human move against the rules without involving the engine.
async fn validate_move(
    Query(params): Query<ValidateMoveParams>,
) -> Result<Json<ValidateMoveResponse>, ApiError> {
    let pos = play::parse_fen(&params.fen).map_err(ApiError::InvalidFen)?;
    let uci = params
        .uci
        .parse::<UciMove>()
        .map_err(|e| ApiError::InvalidMove(e.to_string()))?;

    let response = match play::apply_uci_move(pos, &uci) {
        Some(result) => ValidateMoveResponse {
            valid: true,
            fen: Some(result.fen),
            is_checkmate: Some(result.is_checkmate),
            is_stalemate: Some(result.is_stalemate),
            is_check: Some(result.is_check),
        },
        None => ValidateMoveResponse {
            valid: false,
            fen: None,
            is_checkmate: None,
            is_stalemate: None,
            is_check: None,
        },
    };
    Ok(Json(response))
}
