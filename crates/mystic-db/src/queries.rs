use crate::models::{MessageRow, QuestionRow, SessionRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    /// Register-time duplicate check across both unique columns.
    pub fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let taken: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM users WHERE username = ?1 OR email = ?2",
                    (username, email),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(taken.is_some())
        })
    }

    // -- Sessions --

    pub fn create_session(&self, id: &str, user_id: &str, refresh_token: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, refresh_token) VALUES (?1, ?2, ?3)",
                (id, user_id, refresh_token),
            )?;
            Ok(())
        })
    }

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_id, refresh_token, created_at FROM sessions WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(SessionRow {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            refresh_token: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Returns true if a session was actually removed.
    pub fn delete_session(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    /// Revoke whichever session holds this exact refresh token. Used when a
    /// presented refresh token fails verification: the stored copy is dead
    /// weight and must not survive.
    pub fn delete_session_by_token(&self, refresh_token: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM sessions WHERE refresh_token = ?1",
                [refresh_token],
            )?;
            Ok(n > 0)
        })
    }

    // -- Questions --

    pub fn create_question(&self, id: &str, owner_id: &str, content: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO questions (id, owner_id, content) VALUES (?1, ?2, ?3)",
                (id, owner_id, content),
            )?;
            Ok(())
        })
    }

    pub fn get_question(&self, id: &str) -> Result<Option<QuestionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(QUESTION_SELECT_ONE)?;
            let row = stmt.query_row([id], map_question_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_questions_for_owner(&self, owner_id: &str) -> Result<Vec<QuestionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT q.id, q.owner_id, q.content, q.is_accepting_messages,
                        (SELECT COUNT(*) FROM messages m WHERE m.question_id = q.id),
                        q.created_at
                 FROM questions q
                 WHERE q.owner_id = ?1
                 ORDER BY q.created_at DESC, q.rowid DESC",
            )?;
            let rows = stmt
                .query_map([owner_id], map_question_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flip the acceptance flag. Ownership is part of the WHERE clause, so a
    /// false return covers both "no such question" and "not yours".
    pub fn set_question_acceptance(
        &self,
        question_id: &str,
        owner_id: &str,
        accepting: bool,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE questions SET is_accepting_messages = ?1 WHERE id = ?2 AND owner_id = ?3",
                (accepting, question_id, owner_id),
            )?;
            Ok(n > 0)
        })
    }

    /// Delete a question and every message under it in one transaction.
    /// Partial failure rolls back; no orphaned messages are possible.
    pub fn delete_question_cascade(&self, question_id: &str, owner_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let owned: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM questions WHERE id = ?1 AND owner_id = ?2",
                    (question_id, owner_id),
                    |row| row.get(0),
                )
                .optional()?;
            if owned.is_none() {
                return Ok(false);
            }

            tx.execute("DELETE FROM messages WHERE question_id = ?1", [question_id])?;
            tx.execute("DELETE FROM questions WHERE id = ?1", [question_id])?;
            tx.commit()?;
            Ok(true)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, id: &str, question_id: &str, content: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, question_id, content) VALUES (?1, ?2, ?3)",
                (id, question_id, content),
            )?;
            Ok(())
        })
    }

    /// Newest first; rowid breaks same-second ties in insertion order.
    pub fn get_messages_for_question(&self, question_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, question_id, content, created_at
                 FROM messages
                 WHERE question_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([question_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        question_id: row.get(1)?,
                        content: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete one message, with ownership checked through the owning question.
    pub fn delete_message(&self, message_id: &str, owner_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM messages
                 WHERE id = ?1
                   AND question_id IN (SELECT id FROM questions WHERE owner_id = ?2)",
                (message_id, owner_id),
            )?;
            Ok(n > 0)
        })
    }

    /// Bulk-delete a question's messages. Caller checks ownership first.
    pub fn delete_messages_for_question(&self, question_id: &str) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM messages WHERE question_id = ?1", [question_id])?;
            Ok(n as u64)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always a compile-time constant, never user input
    let sql = format!(
        "SELECT id, username, email, password, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

const QUESTION_SELECT_ONE: &str =
    "SELECT q.id, q.owner_id, q.content, q.is_accepting_messages,
            (SELECT COUNT(*) FROM messages m WHERE m.question_id = q.id),
            q.created_at
     FROM questions q
     WHERE q.id = ?1";

fn map_question_row(row: &rusqlite::Row<'_>) -> std::result::Result<QuestionRow, rusqlite::Error> {
    Ok(QuestionRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        content: row.get(2)?,
        is_accepting_messages: row.get(3)?,
        message_count: row.get::<_, i64>(4)? as u64,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db_with_user(username: &str, email: &str) -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        db.create_user(&id, username, email, "hash").unwrap();
        (db, id)
    }

    #[test]
    fn duplicate_username_rejected_by_store() {
        let (db, _) = db_with_user("alice", "alice@example.com");
        let err = db
            .create_user(
                &uuid::Uuid::new_v4().to_string(),
                "alice",
                "other@example.com",
                "hash",
            )
            .unwrap_err();
        // Callers distinguish the lost-race case from real failures
        assert!(crate::is_unique_violation(&err));
        assert!(!crate::is_unique_violation(&anyhow::anyhow!("disk on fire")));
        assert!(db.username_or_email_taken("alice", "nobody@example.com").unwrap());
        assert!(db.username_or_email_taken("nobody", "alice@example.com").unwrap());
        assert!(!db.username_or_email_taken("nobody", "nobody@example.com").unwrap());
    }

    #[test]
    fn message_over_200_chars_rejected_by_store() {
        let (db, owner) = db_with_user("bob", "bob@example.com");
        let qid = uuid::Uuid::new_v4().to_string();
        db.create_question(&qid, &owner, "How am I doing?").unwrap();

        let long = "x".repeat(201);
        assert!(db.insert_message(&uuid::Uuid::new_v4().to_string(), &qid, &long).is_err());

        let ok = "x".repeat(200);
        db.insert_message(&uuid::Uuid::new_v4().to_string(), &qid, &ok).unwrap();
        assert_eq!(db.get_messages_for_question(&qid).unwrap().len(), 1);
    }

    #[test]
    fn cascade_delete_removes_messages_atomically() {
        let (db, owner) = db_with_user("carol", "carol@example.com");
        let qid = uuid::Uuid::new_v4().to_string();
        db.create_question(&qid, &owner, "Feedback?").unwrap();
        for _ in 0..3 {
            db.insert_message(&uuid::Uuid::new_v4().to_string(), &qid, "hi").unwrap();
        }

        // Someone else cannot delete it
        assert!(!db.delete_question_cascade(&qid, "not-the-owner").unwrap());
        assert_eq!(db.get_messages_for_question(&qid).unwrap().len(), 3);

        assert!(db.delete_question_cascade(&qid, &owner).unwrap());
        assert!(db.get_question(&qid).unwrap().is_none());
        assert!(db.get_messages_for_question(&qid).unwrap().is_empty());
    }

    #[test]
    fn sessions_are_independent_per_device() {
        let (db, user) = db_with_user("dave", "dave@example.com");
        db.create_session("s1", &user, "token-1").unwrap();
        db.create_session("s2", &user, "token-2").unwrap();

        assert!(db.delete_session("s1").unwrap());
        assert!(db.get_session("s1").unwrap().is_none());
        // Other device stays logged in
        assert!(db.get_session("s2").unwrap().is_some());

        assert!(db.delete_session_by_token("token-2").unwrap());
        assert!(!db.delete_session_by_token("token-2").unwrap());
    }

    #[test]
    fn question_ownership_gates_updates() {
        let (db, owner) = db_with_user("erin", "erin@example.com");
        let qid = uuid::Uuid::new_v4().to_string();
        db.create_question(&qid, &owner, "Thoughts?").unwrap();

        assert!(db.set_question_acceptance(&qid, &owner, false).unwrap());
        assert!(!db.set_question_acceptance(&qid, "someone-else", true).unwrap());

        let q = db.get_question(&qid).unwrap().unwrap();
        assert!(!q.is_accepting_messages);
    }
}
