//! Shared fixtures for unit tests

use super::init::create_schema;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Homophone groups loaded by [`setup_seeded_db`]
pub(crate) const SEED_GROUPS: &[&[&str]] = &[
    &["to", "two", "too"],
    &["your", "you're"],
    &["base", "bass"],
    &["are", "our"],
    &["be", "bee"],
    &["sea", "see"],
    &["knight", "night"],
    &["flour", "flower"],
];

/// Single-connection in-memory database with the schema applied
///
/// One connection only: every `sqlite::memory:` connection is its own database.
pub(crate) async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    pool
}

/// In-memory database with [`SEED_GROUPS`] loaded into `words`
pub(crate) async fn setup_seeded_db() -> SqlitePool {
    let pool = setup_test_db().await;
    for (group, words) in SEED_GROUPS.iter().enumerate() {
        for word in words.iter() {
            sqlx::query("INSERT INTO words (word, homophone_group) VALUES (?, ?)")
                .bind(*word)
                .bind(group as i64)
                .execute(&pool)
                .await
                .unwrap();
        }
    }
    pool
}
