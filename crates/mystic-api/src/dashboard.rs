use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use mystic_types::api::{
    AcceptanceData, ApiEnvelope, CreateQuestionRequest, DeletedCountData, MessageListData,
    QuestionListData, UpdateAcceptanceRequest,
};
use mystic_types::models::Question;

use crate::auth::AppState;
use crate::convert::{message_from_row, question_from_row};
use crate::error::ApiError;
use crate::token::AccessClaims;

pub async fn create_question(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Json(req): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Question content is required"));
    }
    if content.chars().count() > 200 {
        return Err(ApiError::bad_request(
            "Question should be at most 200 characters long",
        ));
    }

    let question_id = Uuid::new_v4();
    state
        .db
        .create_question(&question_id.to_string(), &claims.sub.to_string(), content)?;

    let question: Question = state
        .db
        .get_question(&question_id.to_string())?
        .map(question_from_row)
        .ok_or_else(ApiError::internal)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::new(201, question, "Question created successfully")),
    ))
}

pub async fn list_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<impl IntoResponse, ApiError> {
    // Run blocking DB reads off the async runtime
    let db = state.clone();
    let owner = claims.sub.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.get_questions_for_owner(&owner))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })??;

    let questions: Vec<Question> = rows.into_iter().map(question_from_row).collect();

    Ok(Json(ApiEnvelope::new(
        200,
        QuestionListData { questions },
        "Questions retrieved successfully",
    )))
}

pub async fn get_question_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Path(question_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    owned_question(&state, question_id, claims.sub)?;

    let db = state.clone();
    let qid = question_id.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.get_messages_for_question(&qid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })??;

    let messages = rows.into_iter().map(message_from_row).collect();

    Ok(Json(ApiEnvelope::new(
        200,
        MessageListData { messages },
        "Messages retrieved successfully",
    )))
}

pub async fn get_acceptance(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Path(question_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let question = owned_question(&state, question_id, claims.sub)?;

    Ok(Json(ApiEnvelope::new(
        200,
        AcceptanceData {
            is_accepting_messages: question.is_accepting_messages,
        },
        "Message acceptance status retrieved successfully",
    )))
}

pub async fn update_acceptance(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Path(question_id): Path<Uuid>,
    Json(req): Json<UpdateAcceptanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.db.set_question_acceptance(
        &question_id.to_string(),
        &claims.sub.to_string(),
        req.accept_messages,
    )?;
    if !updated {
        return Err(ApiError::not_found("Question not found"));
    }

    Ok(Json(ApiEnvelope::new(
        200,
        AcceptanceData {
            is_accepting_messages: req.accept_messages,
        },
        "Message acceptance status updated successfully",
    )))
}

/// Deletes the question and all of its messages in one transaction.
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Path(question_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .delete_question_cascade(&question_id.to_string(), &claims.sub.to_string())?;
    if !deleted {
        return Err(ApiError::not_found("Question not found"));
    }

    Ok(Json(ApiEnvelope::<()>::empty(
        200,
        "Question deleted successfully",
    )))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .delete_message(&message_id.to_string(), &claims.sub.to_string())?;
    if !deleted {
        return Err(ApiError::not_found("Message not found"));
    }

    Ok(Json(ApiEnvelope::<()>::empty(
        200,
        "Message deleted successfully",
    )))
}

pub async fn delete_all_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Path(question_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    owned_question(&state, question_id, claims.sub)?;

    let deleted = state
        .db
        .delete_messages_for_question(&question_id.to_string())?;

    Ok(Json(ApiEnvelope::new(
        200,
        DeletedCountData { deleted },
        "Messages deleted successfully",
    )))
}

/// Load a question and require that `owner` owns it. 404 hides the
/// existence of other users' questions.
fn owned_question(state: &AppState, question_id: Uuid, owner: Uuid) -> Result<Question, ApiError> {
    let question = state
        .db
        .get_question(&question_id.to_string())?
        .map(question_from_row)
        .ok_or_else(|| ApiError::not_found("Question not found"))?;

    if question.owner_id != owner {
        return Err(ApiError::not_found("Question not found"));
    }
    Ok(question)
}
