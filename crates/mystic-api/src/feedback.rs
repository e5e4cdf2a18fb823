//! Public endpoints for anonymous senders. No auth gate in front of these.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use mystic_types::api::{ApiEnvelope, PublicQuestion, SendMessageRequest};

use crate::auth::AppState;
use crate::convert::parse_uuid;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionQuery {
    pub que_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub id: Uuid,
}

pub async fn get_question(
    State(state): State<AppState>,
    Query(query): Query<QuestionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_question(&query.que_id.to_string())?
        .ok_or_else(|| ApiError::not_found("Question not found"))?;

    // Anonymous senders never see the owner id or the message count
    let question = PublicQuestion {
        id: parse_uuid(&row.id, "question id"),
        content: row.content,
        is_accepting_messages: row.is_accepting_messages,
    };

    Ok(Json(ApiEnvelope::new(
        200,
        question,
        "question fetched successfully",
    )))
}

pub async fn get_username(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(&query.id.to_string())?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(ApiEnvelope::new(
        200,
        user.username,
        "username fetched successfully",
    )))
}

/// The single write path that creates a Message. The acceptance flag is
/// checked here, unconditionally, before anything is inserted.
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = state
        .db
        .get_question(&req.question_id.to_string())?
        .ok_or_else(|| ApiError::not_found("Question not found"))?;

    if !question.is_accepting_messages {
        return Err(ApiError::forbidden(
            "This question is not accepting messages",
        ));
    }

    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::bad_request("Message content is required"));
    }
    // The store's CHECK constraint is the backstop for this limit
    if content.chars().count() > 200 {
        return Err(ApiError::bad_request(
            "Message should be at most 200 characters long",
        ));
    }

    let message_id = Uuid::new_v4();

    // Run the blocking insert off the async runtime
    let db = state.clone();
    let qid = req.question_id.to_string();
    let mid = message_id.to_string();
    tokio::task::spawn_blocking(move || db.db.insert_message(&mid, &qid, &content))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })??;

    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::<()>::empty(201, "Message sent successfully")),
    ))
}
