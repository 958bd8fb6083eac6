//! Database initialization
//!
//! Opens (creating if needed) the SQLite file and creates the schema
//! idempotently. Safe to call on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every connection
///
/// Writers that find the database locked wait up to this long for the lock
/// instead of failing immediately.
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL allows concurrent readers alongside the single writer
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index used by the curation core
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_words_table(pool).await?;
    create_phrases_table(pool).await?;
    create_phrase_words_table(pool).await?;
    create_user_ratings_table(pool).await?;
    Ok(())
}

/// Homophone reference data
async fn create_words_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS words (
            word_id INTEGER PRIMARY KEY,
            word TEXT NOT NULL UNIQUE COLLATE NOCASE,
            homophone_group INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_words_homophone_group ON words(homophone_group)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_phrases_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS phrases (
            guid TEXT PRIMARY KEY,
            submitter_user_id INTEGER NOT NULL,
            submission_date TIMESTAMP NOT NULL,
            rating_one INTEGER NOT NULL DEFAULT 0 CHECK (rating_one >= 0),
            rating_two INTEGER NOT NULL DEFAULT 0 CHECK (rating_two >= 0),
            rating_three INTEGER NOT NULL DEFAULT 0 CHECK (rating_three >= 0),
            rating_four INTEGER NOT NULL DEFAULT 0 CHECK (rating_four >= 0),
            rating_five INTEGER NOT NULL DEFAULT 0 CHECK (rating_five >= 0),
            reviewed_by INTEGER,
            review_date TIMESTAMP,
            claim_seq INTEGER,
            phrase_text TEXT NOT NULL,
            display_state TEXT NOT NULL DEFAULT 'unreviewed'
                CHECK (display_state IN ('unreviewed', 'in_review', 'accepted', 'rejected'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_phrases_state_reviewer ON phrases(display_state, reviewed_by)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_phrases_submitter ON phrases(submitter_user_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Link table holding each phrase's homophone word IDs
async fn create_phrase_words_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS phrase_words (
            phrase_guid TEXT NOT NULL REFERENCES phrases(guid) ON DELETE CASCADE,
            word_id INTEGER NOT NULL REFERENCES words(word_id),
            PRIMARY KEY (phrase_guid, word_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_phrase_words_word ON phrase_words(word_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// One row per (user, phrase); the UNIQUE constraint backs the
/// single-rating-per-user invariant at the store level
async fn create_user_ratings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_ratings (
            guid TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            phrase_guid TEXT NOT NULL REFERENCES phrases(guid) ON DELETE CASCADE,
            rating_value INTEGER NOT NULL CHECK (rating_value BETWEEN 1 AND 5),
            rate_date TIMESTAMP NOT NULL,
            UNIQUE (user_id, phrase_guid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_user_ratings_user_date ON user_ratings(user_id, rate_date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
