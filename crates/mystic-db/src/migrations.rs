use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per logged-in device. Logout deletes the row, which also
        -- kills the refresh token before its JWT expiry.
        CREATE TABLE IF NOT EXISTS sessions (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            refresh_token   TEXT NOT NULL UNIQUE,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user
            ON sessions(user_id);

        CREATE TABLE IF NOT EXISTS questions (
            id                      TEXT PRIMARY KEY,
            owner_id                TEXT NOT NULL REFERENCES users(id),
            content                 TEXT NOT NULL
                                        CHECK (length(content) <= 200),
            is_accepting_messages   INTEGER NOT NULL DEFAULT 1,
            created_at              TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_questions_owner
            ON questions(owner_id);

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            question_id     TEXT NOT NULL REFERENCES questions(id),
            content         TEXT NOT NULL
                                CHECK (length(content) > 0 AND length(content) <= 200),
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_question
            ON messages(question_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
