//! Integration tests for database initialization
//!
//! Each test works on a file database in its own temporary directory.

use punocracy_common::db::init::init_database;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("punocracy.db");
    assert!(!db_path.exists());

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());

    // Parent directory and file both created
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("punocracy.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO words (word, homophone_group) VALUES ('flour', 0)")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    // Second open keeps existing data
    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM words")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_connection_pragmas() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("punocracy.db")).await.unwrap();

    let journal_mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(journal_mode.to_lowercase(), "wal");

    let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[tokio::test]
async fn test_phrase_words_reject_unknown_word() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("punocracy.db")).await.unwrap();

    sqlx::query(
        "INSERT INTO phrases (guid, submitter_user_id, submission_date, phrase_text, display_state)
         VALUES ('00000000-0000-0000-0000-000000000001', 1, '2024-01-01T00:00:00Z', 'x', 'unreviewed')",
    )
    .execute(&pool)
    .await
    .unwrap();

    // Foreign keys are enforced on file databases
    let result = sqlx::query(
        "INSERT INTO phrase_words (phrase_guid, word_id) VALUES ('00000000-0000-0000-0000-000000000001', 999)",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());
}
