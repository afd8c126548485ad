use chat_relay::error::RelayError;
use chat_relay::models::MessagePayload;
use chat_relay::store::MessageStore;
use chrono::{Duration, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::tempdir;

fn text(msg: &str) -> MessagePayload {
    MessagePayload {
        message: Some(msg.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn append_then_query_preserves_insert_order() {
    let dir = tempdir().unwrap();
    let store = MessageStore::new(&dir.path().join("relay.db")).await.unwrap();

    let (first_id, first_ts) = store.append(Some("ana"), &text("one")).await.unwrap();
    let (second_id, second_ts) = store.append(Some("bob"), &text("two")).await.unwrap();
    assert!(second_id > first_id);
    assert!(second_ts >= first_ts);

    let messages = store.query_recent(24).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message.as_deref(), Some("one"));
    assert_eq!(messages[1].message.as_deref(), Some("two"));
    assert_eq!(messages[1].user.as_deref(), Some("bob"));
}

#[tokio::test]
async fn empty_payload_is_rejected_and_not_persisted() {
    let dir = tempdir().unwrap();
    let store = MessageStore::new(&dir.path().join("relay.db")).await.unwrap();

    let result = store.append(Some("ana"), &MessagePayload::default()).await;
    assert!(matches!(result, Err(RelayError::EmptyMessage)));
    assert!(store.query_recent(24).await.unwrap().is_empty());
}

#[tokio::test]
async fn media_only_payload_is_persisted() {
    let dir = tempdir().unwrap();
    let store = MessageStore::new(&dir.path().join("relay.db")).await.unwrap();

    let payload = MessagePayload {
        file: Some("data:application/pdf;base64,AAAA".into()),
        file_name: Some("report.pdf".into()),
        file_type: Some("application/pdf".into()),
        ..Default::default()
    };
    store.append(Some("ana"), &payload).await.unwrap();

    let messages = store.query_recent(24).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].message.is_none());
    assert_eq!(messages[0].file_name.as_deref(), Some("report.pdf"));
}

#[tokio::test]
async fn search_matches_author_and_body_case_insensitively() {
    let dir = tempdir().unwrap();
    let store = MessageStore::new(&dir.path().join("relay.db")).await.unwrap();

    store.append(Some("Ana"), &text("Hello World")).await.unwrap();
    store.append(Some("bob"), &text("unrelated")).await.unwrap();

    let by_body = store.search("hello", 24).await.unwrap();
    assert_eq!(by_body.len(), 1);
    assert_eq!(by_body[0].user.as_deref(), Some("Ana"));

    let by_author = store.search("ANA", 24).await.unwrap();
    assert_eq!(by_author.len(), 1);

    assert!(store.search("nothing here", 24).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_search_term_returns_nothing() {
    let dir = tempdir().unwrap();
    let store = MessageStore::new(&dir.path().join("relay.db")).await.unwrap();

    store.append(Some("ana"), &text("hello")).await.unwrap();
    assert!(store.search("", 24).await.unwrap().is_empty());
    assert!(store.search("   ", 24).await.unwrap().is_empty());
}

#[tokio::test]
async fn queries_exclude_messages_outside_the_window() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("relay.db");
    let store = MessageStore::new(&db_path).await.unwrap();
    store.append(Some("ana"), &text("fresh hello")).await.unwrap();

    // Backdate a matching row two days, past the 24h window.
    let pool = SqlitePoolOptions::new()
        .connect_with(SqliteConnectOptions::new().filename(&db_path))
        .await
        .unwrap();
    let old_ts = (Utc::now() - Duration::hours(48)).to_rfc3339_opts(SecondsFormat::Micros, true);
    sqlx::query("INSERT INTO chat_messages (user, message, timestamp) VALUES (?, ?, ?)")
        .bind("ana")
        .bind("stale hello")
        .bind(&old_ts)
        .execute(&pool)
        .await
        .unwrap();

    let recent = store.query_recent(24).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].message.as_deref(), Some("fresh hello"));

    // Search is bounded the same way even though the old row matches.
    let hits = store.search("hello", 24).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message.as_deref(), Some("fresh hello"));

    // A wider window surfaces it again.
    assert_eq!(store.query_recent(72).await.unwrap().len(), 2);
}

#[tokio::test]
async fn schema_init_is_idempotent_across_reopens() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("relay.db");

    {
        let store = MessageStore::new(&db_path).await.unwrap();
        store.append(Some("ana"), &text("persisted")).await.unwrap();
    }

    // Reopening re-runs the additive column patches against the existing file.
    let store = MessageStore::new(&db_path).await.unwrap();
    let messages = store.query_recent(24).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].message.as_deref(), Some("persisted"));
}
