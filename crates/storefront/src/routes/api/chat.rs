//! Smokers Lounge: per-region chat over polling.
//!
//! ```text
//! GET  /api/chat?room=&limit=&after=
//! POST /api/chat
//! ```

use axum::{
    Json,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use openweed_core::chat::{POLL_INTERVAL_SECS, clamp_limit, normalize_message, normalize_room};
use openweed_core::{ChatMessageId, MessageType};

use super::{ApiJson, ApiQuery};
use crate::db::ChatRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::ChatMessage;
use crate::state::AppState;

/// Seconds clients should wait between polls.
pub const POLL_INTERVAL_HEADER: HeaderName = HeaderName::from_static("x-poll-interval");

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub room: Option<String>,
    pub limit: Option<i64>,
    pub after: Option<ChatMessageId>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub room: Option<String>,
    pub message: String,
    #[serde(default, rename = "type")]
    pub message_type: MessageType,
}

/// GET /api/chat
pub async fn history(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Response> {
    let room = normalize_room(query.room.as_deref())?;
    let limit = clamp_limit(query.limit);

    let messages = ChatRepository::new(state.pool())
        .recent(&room, limit, query.after)
        .await?;

    Ok((
        [(POLL_INTERVAL_HEADER, HeaderValue::from(POLL_INTERVAL_SECS))],
        Json(messages),
    )
        .into_response())
}

/// POST /api/chat
pub async fn post(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<PostMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>)> {
    if req.message_type == MessageType::System && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins can post system messages".to_string(),
        ));
    }
    let room = normalize_room(req.room.as_deref())?;
    let message = normalize_message(&req.message)?;

    let posted = ChatRepository::new(state.pool())
        .post(user.id, &room, &message, req.message_type)
        .await?;
    tracing::debug!(message_id = %posted.id, room = %room, "lounge message posted");
    Ok((StatusCode::CREATED, Json(posted)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_post_request_defaults_to_text() {
        let req: PostMessageRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.message_type, MessageType::Text);
        assert!(req.room.is_none());

        let req: PostMessageRequest =
            serde_json::from_str(r#"{"message":"closing early","type":"SYSTEM"}"#).unwrap();
        assert_eq!(req.message_type, MessageType::System);
    }
}
