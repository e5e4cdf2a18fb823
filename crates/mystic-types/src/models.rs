use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public view of a user. The password hash never leaves the db layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A shareable feedback prompt. Anonymous senders see only the content and
/// the acceptance flag; messages accumulate under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub content: String,
    pub is_accepting_messages: bool,
    pub message_count: u64,
    pub created_at: DateTime<Utc>,
}

/// A single anonymous feedback submission. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub question_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
