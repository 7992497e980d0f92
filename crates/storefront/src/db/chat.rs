//! Lounge message repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use openweed_core::chat::HistoryWindow;
use openweed_core::{ChatMessageId, MessageType, UserId};

use super::RepositoryError;
use crate::models::{ChatAuthor, ChatMessage};

#[derive(Debug, sqlx::FromRow)]
struct ChatMessageRow {
    id: ChatMessageId,
    user_id: UserId,
    room: String,
    message: String,
    #[sqlx(rename = "type")]
    message_type: MessageType,
    created_at: DateTime<Utc>,
    author_name: String,
}

impl From<ChatMessageRow> for ChatMessage {
    fn from(row: ChatMessageRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            room: row.room,
            message: row.message,
            message_type: row.message_type,
            created_at: row.created_at,
            user: ChatAuthor {
                name: row.author_name,
            },
        }
    }
}

const HISTORY_SELECT: &str = r#"
    SELECT m.id, m.user_id, m.room, m.message, m."type", m.created_at,
           u.name AS author_name
    FROM marketplace.chat_message m
    JOIN marketplace.user_account u ON u.id = m.user_id
    WHERE m.room = $1 AND ($2::int IS NULL OR m.id > $2)
"#;

pub struct ChatRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChatRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A page of at most `limit` messages from a room, oldest first.
    ///
    /// Without `after` this is the newest page. With `after` it is the first
    /// `limit` messages past that id, so a poller that falls behind catches
    /// up over several requests without gaps.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(
        &self,
        room: &str,
        limit: i64,
        after: Option<ChatMessageId>,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let window = HistoryWindow::from_cursor(after);
        let query = match window {
            HistoryWindow::Latest => format!("{HISTORY_SELECT} ORDER BY m.id DESC LIMIT $3"),
            HistoryWindow::After(_) => format!("{HISTORY_SELECT} ORDER BY m.id ASC LIMIT $3"),
        };

        let mut rows = sqlx::query_as::<_, ChatMessageRow>(&query)
            .bind(room)
            .bind(after)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;

        if window.newest_first() {
            rows.reverse();
        }
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn post(
        &self,
        user_id: UserId,
        room: &str,
        message: &str,
        message_type: MessageType,
    ) -> Result<ChatMessage, RepositoryError> {
        let row = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            WITH inserted AS (
                INSERT INTO marketplace.chat_message (user_id, room, message, "type")
                VALUES ($1, $2, $3, $4)
                RETURNING id, user_id, room, message, "type", created_at
            )
            SELECT i.id, i.user_id, i.room, i.message, i."type", i.created_at,
                   u.name AS author_name
            FROM inserted i
            JOIN marketplace.user_account u ON u.id = i.user_id
            "#,
        )
        .bind(user_id)
        .bind(room)
        .bind(message)
        .bind(message_type)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}
