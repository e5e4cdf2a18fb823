//! Row-to-model conversion. SQLite hands back strings; corrupt values are
//! logged and defaulted rather than failing the whole request.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use mystic_db::models::{MessageRow, QuestionRow, UserRow};
use mystic_types::models::{Message, Question, User};

pub(crate) fn parse_uuid(value: &str, what: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, value, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(value: &str, what: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}': {}", what, value, e);
            DateTime::default()
        })
}

pub(crate) fn user_from_row(row: UserRow) -> User {
    User {
        id: parse_uuid(&row.id, "user id"),
        username: row.username,
        email: row.email,
        created_at: parse_timestamp(&row.created_at, "user created_at"),
    }
}

pub(crate) fn question_from_row(row: QuestionRow) -> Question {
    Question {
        id: parse_uuid(&row.id, "question id"),
        owner_id: parse_uuid(&row.owner_id, "question owner_id"),
        content: row.content,
        is_accepting_messages: row.is_accepting_messages,
        message_count: row.message_count,
        created_at: parse_timestamp(&row.created_at, "question created_at"),
    }
}

pub(crate) fn message_from_row(row: MessageRow) -> Message {
    Message {
        id: parse_uuid(&row.id, "message id"),
        question_id: parse_uuid(&row.question_id, "message question_id"),
        content: row.content,
        created_at: parse_timestamp(&row.created_at, "message created_at"),
    }
}
