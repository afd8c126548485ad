//! SQLite-backed append-only chat log.
//!
//! Messages are never updated or deleted; retention is unbounded but live
//! queries only surface the trailing history window. Timestamps are stored as
//! fixed-width RFC 3339 UTC strings so that lexicographic comparison in SQL
//! matches chronological order.

use std::path::Path;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::info;

use crate::error::{RelayError, Result};
use crate::models::{ChatMessage, MessagePayload};

pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    pub async fn new(db_path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let store = Self { pool };
        store.init_schema().await?;
        info!(path = %db_path.display(), "message store initialized");
        Ok(store)
    }

    /// Base table plus additive column patches. `video` and `broadcast`
    /// arrived in later schema iterations, so they are applied as standalone
    /// ALTERs that fail harmlessly once present.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
              id        INTEGER PRIMARY KEY AUTOINCREMENT,
              user      TEXT,
              message   TEXT,
              image     TEXT,
              file      TEXT,
              file_name TEXT,
              file_type TEXT,
              timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for patch in [
            "ALTER TABLE chat_messages ADD COLUMN video TEXT",
            "ALTER TABLE chat_messages ADD COLUMN broadcast TEXT",
        ] {
            let _ = sqlx::query(patch).execute(&self.pool).await;
        }

        Ok(())
    }

    /// Persist a message, assigning its row id and timestamp. Fails with
    /// [`RelayError::EmptyMessage`] when the payload has no content.
    pub async fn append(
        &self,
        user: Option<&str>,
        payload: &MessagePayload,
    ) -> Result<(i64, DateTime<Utc>)> {
        if payload.is_empty() {
            return Err(RelayError::EmptyMessage);
        }

        let timestamp = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO chat_messages
              (user, message, image, video, broadcast, file, file_name, file_type, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user)
        .bind(payload.message.as_deref())
        .bind(payload.image.as_deref())
        .bind(payload.video.as_deref())
        .bind(payload.broadcast.as_deref())
        .bind(payload.file.as_deref())
        .bind(payload.file_name.as_deref())
        .bind(payload.file_type.as_deref())
        .bind(encode_timestamp(timestamp))
        .execute(&self.pool)
        .await?;

        Ok((result.last_insert_rowid(), timestamp))
    }

    /// Messages from the trailing window, ascending by timestamp (row id
    /// breaks ties between same-instant inserts).
    pub async fn query_recent(&self, window_hours: i64) -> Result<Vec<ChatMessage>> {
        let cutoff = encode_timestamp(Utc::now() - Duration::hours(window_hours));
        let rows = sqlx::query(
            r#"
            SELECT id, user, message, image, video, broadcast, file, file_name, file_type, timestamp
            FROM chat_messages
            WHERE timestamp >= ?
            ORDER BY timestamp, id
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }

    /// Case-insensitive substring search over author and text body, bounded
    /// to the same trailing window. An empty or whitespace-only term yields
    /// an empty result without touching the database.
    pub async fn search(&self, term: &str, window_hours: i64) -> Result<Vec<ChatMessage>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let cutoff = encode_timestamp(Utc::now() - Duration::hours(window_hours));
        let pattern = format!("%{term}%");
        let rows = sqlx::query(
            r#"
            SELECT id, user, message, image, video, broadcast, file, file_name, file_type, timestamp
            FROM chat_messages
            WHERE timestamp >= ? AND (message LIKE ? OR user LIKE ?)
            ORDER BY timestamp, id
            "#,
        )
        .bind(cutoff)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }
}

/// Fixed-width RFC 3339 UTC so string comparison equals time comparison.
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_row(row: &SqliteRow) -> Result<ChatMessage> {
    let raw: String = row.try_get("timestamp")?;
    let timestamp = DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| RelayError::Store(sqlx::Error::Decode(Box::new(err))))?;

    Ok(ChatMessage {
        id: row.try_get("id")?,
        user: row.try_get("user")?,
        message: row.try_get("message")?,
        image: row.try_get("image")?,
        video: row.try_get("video")?,
        broadcast: row.try_get("broadcast")?,
        file: row.try_get("file")?,
        file_name: row.try_get("file_name")?,
        file_type: row.try_get("file_type")?,
        timestamp,
    })
}
