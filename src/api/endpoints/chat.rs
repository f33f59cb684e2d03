//! Chat endpoints.
//!
//! - `POST /api/process`: route, answer and persist one message
//! - `GET /api/history`: full session
//! - `POST /api/reset`, `POST /api/chats/new`: start a fresh session
//! - `GET /api/chats/list`: session summaries, newest first
//! - `POST /api/sessions/:id/turns`: save a turn returned by a failed save

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::error::ApiError;
use crate::api::types::{blocking, ApiContext};
use crate::models::{HandlerKind, RoutingMetadata, SessionSummary, Turn};
use crate::pipeline::orchestrator::ChatOutcome;

#[derive(Deserialize)]
pub struct ProcessRequest {
    pub text: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub session_id: String,
    pub original: String,
    pub response: String,
    pub handler: HandlerKind,
    pub confidence: f64,
    pub degraded: bool,
    pub booking_suggested: bool,
    pub routing: RoutingMetadata,
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatOutcome> for ProcessResponse {
    fn from(outcome: ChatOutcome) -> Self {
        let booking_suggested = outcome.booking_suggested();
        let turn = outcome.turn;
        Self {
            session_id: outcome.session_id,
            original: turn.user_text,
            response: turn.response,
            handler: turn.handler,
            confidence: turn.confidence,
            degraded: turn.degraded,
            booking_suggested,
            routing: turn.routing,
            metadata: turn.metadata,
            timestamp: turn.created_at,
        }
    }
}

/// `POST /api/process`
pub async fn process(
    State(ctx): State<ApiContext>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let outcome = ctx
        .orchestrator
        .handle_message(req.session_id.as_deref(), &req.text)
        .await?;
    Ok(Json(outcome.into()))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub message_count: usize,
    pub turns: Vec<Turn>,
}

/// `GET /api/history?session_id=`. An unknown id yields an empty history.
pub async fn history(
    State(ctx): State<ApiContext>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session_id = query
        .session_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("session_id is required".into()))?;

    let sessions = ctx.sessions();
    let id = session_id.clone();
    let session = blocking(move || sessions.load(&id)).await?;
    let turns = session.map(|s| s.turns).unwrap_or_default();

    Ok(Json(HistoryResponse {
        session_id,
        message_count: turns.len(),
        turns,
    }))
}

#[derive(Deserialize, Default)]
pub struct ResetRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub message: &'static str,
}

/// `POST /api/reset` and `POST /api/chats/new`. The previous session, when
/// named, is deleted once any message in flight for it has finished.
pub async fn reset(
    State(ctx): State<ApiContext>,
    body: Option<Json<ResetRequest>>,
) -> Result<Json<ResetResponse>, ApiError> {
    let previous = body
        .and_then(|Json(req)| req.session_id)
        .filter(|s| !s.trim().is_empty());
    let session = ctx.orchestrator.reset_session(previous.as_deref()).await?;

    Ok(Json(ResetResponse {
        session_id: session.session_id,
        message: "New conversation started",
    }))
}

#[derive(Serialize)]
pub struct ChatListResponse {
    pub chats: Vec<SessionSummary>,
    pub count: usize,
}

/// `GET /api/chats/list`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<ChatListResponse>, ApiError> {
    let sessions = ctx.sessions();
    let chats = blocking(move || sessions.list()).await?;
    Ok(Json(ChatListResponse {
        count: chats.len(),
        chats,
    }))
}

#[derive(Serialize)]
pub struct AppendResponse {
    pub session_id: String,
    pub message_count: usize,
}

/// `POST /api/sessions/:id/turns`. Rejects turns with out-of-range
/// confidences or a handler that differs from the routed target.
pub async fn append_turn(
    State(ctx): State<ApiContext>,
    Path(session_id): Path<String>,
    Json(turn): Json<Turn>,
) -> Result<Json<AppendResponse>, ApiError> {
    let session = ctx.orchestrator.append_turn(&session_id, turn).await?;
    Ok(Json(AppendResponse {
        session_id: session.session_id,
        message_count: session.turns.len(),
    }))
}

