/// Database row types — these map directly to SQLite rows.
/// Distinct from mystic-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub refresh_token: String,
    pub created_at: String,
}

pub struct QuestionRow {
    pub id: String,
    pub owner_id: String,
    pub content: String,
    pub is_accepting_messages: bool,
    pub message_count: u64,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub question_id: String,
    pub content: String,
    pub created_at: String,
}
