use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Question, User};

// -- Response envelope --

/// Uniform response envelope every endpoint returns, success or failure:
/// `{statusCode, data, message, success, messages}`. `success` is derived
/// from the status code so the two can never disagree.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub status_code: u16,
    pub data: Option<T>,
    pub message: String,
    pub success: bool,
    pub messages: Vec<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn new(status_code: u16, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code,
            data: Some(data),
            message: message.into(),
            success: status_code < 400,
            messages: Vec::new(),
        }
    }

    pub fn empty(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            data: None,
            message: message.into(),
            success: status_code < 400,
            messages: Vec::new(),
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login accepts either a username or an email alongside the password.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUserData {
    pub user: User,
}

// -- Dashboard --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateQuestionRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListData {
    pub questions: Vec<Question>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageListData {
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct UpdateAcceptanceRequest {
    pub accept_messages: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceData {
    pub is_accepting_messages: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCountData {
    pub deleted: u64,
}

// -- Feedback (public) --

/// What an anonymous visitor gets to see about a question. No owner id,
/// no message count.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: Uuid,
    pub content: String,
    pub is_accepting_messages: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub question_id: Uuid,
    pub content: String,
}
