use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;

use super::db::DbHandle;
#[cfg(test)]
use super::db::BoardDb;
use super::models::*;
use crate::errors::BoardError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardRequest {
    pub id: String,
    pub board_name: String,
    #[serde(default)]
    pub cards: Vec<CardInput>,
}

/// A card posted together with a new board. The client stamps the id.
#[derive(Deserialize)]
pub struct CardInput {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub column: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCardRequest {
    pub title: String,
    pub description: Option<String>,
    pub column: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub column: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCardRequest {
    pub dest_column: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameBoardRequest {
    pub board_name: String,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest {
        error: String,
        details: Option<String>,
    },
    Internal {
        error: String,
        details: String,
    },
}

impl ApiError {
    /// Classify a store error. `context` names the failed operation and
    /// becomes the `error` field of a 500 response.
    fn from_board(err: BoardError, context: &str) -> Self {
        match err {
            BoardError::BoardNotFound { .. } => ApiError::NotFound("Board not found".into()),
            BoardError::CardNotFound { .. } => ApiError::NotFound("Card not found".into()),
            BoardError::DuplicateBoard { id } => ApiError::BadRequest {
                error: "Duplicate key error".into(),
                details: Some(format!("A board with id {} already exists", id)),
            },
            BoardError::InvalidColumn(column) => ApiError::BadRequest {
                error: "Invalid column".into(),
                details: Some(format!(
                    "'{}' is not one of todoCards, inProgressCards, doneCards",
                    column
                )),
            },
            BoardError::Validation(msg) => ApiError::BadRequest {
                error: "Validation error".into(),
                details: Some(msg),
            },
            other => {
                tracing::error!(error = %other, "{}", context);
                ApiError::Internal {
                    error: context.to_string(),
                    details: other.to_string(),
                }
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest {
            error: "Invalid request body".into(),
            details: Some(rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(error) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error,
                    details: None,
                },
            ),
            ApiError::BadRequest { error, details } => {
                (StatusCode::BAD_REQUEST, ErrorBody { error, details })
            }
            ApiError::Internal { error, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error,
                    details: Some(details),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/boards", get(list_boards).post(create_board))
        .route(
            "/boards/{board_id}",
            get(get_board).put(rename_board).delete(delete_board),
        )
        .route("/boards/{board_id}/cards", post(add_card))
        .route(
            "/boards/{board_id}/cards/{card_id}",
            put(update_card).delete(delete_card),
        )
        .route("/boards/{board_id}/cards/{card_id}/move", put(move_card))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

fn parse_column(column: Option<String>) -> Result<Option<Column>, BoardError> {
    column
        .map(|c| c.parse::<Column>().map_err(|_| BoardError::InvalidColumn(c)))
        .transpose()
}

impl CreateBoardRequest {
    fn into_board(self) -> Result<Board, BoardError> {
        let cards = self
            .cards
            .into_iter()
            .map(|c| {
                Ok(Card {
                    id: c.id.unwrap_or_default(),
                    title: c.title,
                    description: c.description,
                    column: parse_column(c.column)?,
                })
            })
            .collect::<Result<Vec<_>, BoardError>>()?;
        Ok(Board {
            id: self.id,
            board_name: self.board_name,
            cards,
        })
    }
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn create_board(
    State(state): State<SharedState>,
    payload: Result<Json<CreateBoardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let board = req
        .into_board()
        .map_err(|e| ApiError::from_board(e, "Error creating board"))?;
    let saved = state
        .db
        .call(move |db| db.create_board(&board))
        .await
        .map_err(|e| ApiError::from_board(e, "Error creating board"))?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn get_board(
    State(state): State<SharedState>,
    Path(board_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = board_id.clone();
    let board = state
        .db
        .call(move |db| db.get_board(&id))
        .await
        .map_err(|e| ApiError::from_board(e, "Error fetching board"))?;
    match board {
        Some(board) => Ok(Json(board)),
        None => {
            tracing::debug!(%board_id, "board lookup missed");
            Err(ApiError::NotFound("Board not found".into()))
        }
    }
}

async fn list_boards(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let boards = state
        .db
        .call(|db| db.list_boards())
        .await
        .map_err(|e| ApiError::from_board(e, "Error fetching all boards"))?;
    Ok(Json(boards))
}

async fn add_card(
    State(state): State<SharedState>,
    Path(board_id): Path<String>,
    payload: Result<Json<CreateCardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let new_card = NewCard {
        title: req.title,
        description: req.description,
        column: parse_column(req.column).map_err(|e| ApiError::from_board(e, "Error adding card"))?,
    };
    let card = state
        .db
        .call(move |db| db.add_card(&board_id, new_card))
        .await
        .map_err(|e| ApiError::from_board(e, "Error adding card"))?;
    Ok((StatusCode::CREATED, Json(card)))
}

async fn update_card(
    State(state): State<SharedState>,
    Path((board_id, card_id)): Path<(String, String)>,
    payload: Result<Json<UpdateCardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let patch = CardPatch {
        title: req.title,
        description: req.description,
        column: parse_column(req.column)
            .map_err(|e| ApiError::from_board(e, "Error updating card"))?,
    };
    let card = state
        .db
        .call(move |db| db.update_card(&board_id, &card_id, &patch))
        .await
        .map_err(|e| ApiError::from_board(e, "Error updating card"))?;
    Ok(Json(CardEnvelope {
        message: "Card updated".into(),
        card,
    }))
}

async fn delete_card(
    State(state): State<SharedState>,
    Path((board_id, card_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let id = card_id.clone();
    state
        .db
        .call(move |db| db.delete_card(&board_id, &id))
        .await
        .map_err(|e| ApiError::from_board(e, "Error deleting card"))?;
    Ok(Json(CardDeleted {
        message: "Card deleted".into(),
        card_id,
    }))
}

async fn move_card(
    State(state): State<SharedState>,
    Path((board_id, card_id)): Path<(String, String)>,
    payload: Result<Json<MoveCardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let dest = req.dest_column.parse::<Column>().map_err(|_| {
        ApiError::from_board(BoardError::InvalidColumn(req.dest_column), "Error moving card")
    })?;
    let card = state
        .db
        .call(move |db| db.move_card(&board_id, &card_id, dest))
        .await
        .map_err(|e| ApiError::from_board(e, "Error moving card"))?;
    Ok(Json(CardEnvelope {
        message: "Card moved".into(),
        card,
    }))
}

async fn rename_board(
    State(state): State<SharedState>,
    Path(board_id): Path<String>,
    payload: Result<Json<RenameBoardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let board = state
        .db
        .call(move |db| db.rename_board(&board_id, &req.board_name))
        .await
        .map_err(|e| ApiError::from_board(e, "Error updating board"))?;
    Ok(Json(board))
}

async fn delete_board(
    State(state): State<SharedState>,
    Path(board_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = board_id.clone();
    state
        .db
        .call(move |db| db.delete_board(&id))
        .await
        .map_err(|e| ApiError::from_board(e, "Error deleting board"))?;
    Ok(Json(BoardDeleted {
        message: "Board deleted".into(),
        id: board_id,
    }))
}
