//! Homophone word lookups
//!
//! The `words` table is reference data; nothing here writes to it.

use super::models::WordRow;
use super::placeholders;
use crate::{Error, Result};
use sqlx::{Pool, Row, Sqlite};
use std::collections::BTreeSet;
use tracing::debug;

fn word_row(row: &sqlx::sqlite::SqliteRow) -> Result<WordRow> {
    Ok(WordRow {
        word_id: row.try_get("word_id")?,
        word: row.try_get("word")?,
        homophone_group: row.try_get("homophone_group")?,
    })
}

/// Resolve words to the IDs of those present in the homophone table
///
/// Words are case-folded and deduplicated before lookup. IDs come back in
/// ascending order. Fails with `NotFound` when nothing matches.
pub async fn resolve_word_ids<I, S>(db: &Pool<Sqlite>, words: I) -> Result<Vec<i64>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let folded: BTreeSet<String> = words
        .into_iter()
        .map(|w| w.as_ref().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();

    if folded.is_empty() {
        return Err(Error::NotFound("no words to resolve".to_string()));
    }

    let sql = format!(
        "SELECT word_id FROM words WHERE word IN ({}) ORDER BY word_id",
        placeholders(folded.len())
    );
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for word in &folded {
        query = query.bind(word);
    }
    let ids = query.fetch_all(db).await?;

    debug!(requested = folded.len(), resolved = ids.len(), "Resolved word IDs");

    if ids.is_empty() {
        return Err(Error::NotFound(format!(
            "none of {} word(s) are homophones",
            folded.len()
        )));
    }

    Ok(ids)
}

/// All words beginning with `letter`, alphabetically
///
/// Only letters and digits are accepted.
pub async fn words_by_letter(db: &Pool<Sqlite>, letter: char) -> Result<Vec<WordRow>> {
    if !letter.is_alphanumeric() {
        return Err(Error::Validation(format!(
            "'{}' is not a letter or digit",
            letter
        )));
    }

    let rows = sqlx::query(
        "SELECT word_id, word, homophone_group FROM words WHERE substr(word, 1, 1) = ? ORDER BY word",
    )
    .bind(letter.to_lowercase().to_string())
    .fetch_all(db)
    .await?;

    rows.iter().map(word_row).collect()
}

/// Every word sharing a homophone group with `word`, including `word` itself
pub async fn homophones_of(db: &Pool<Sqlite>, word: &str) -> Result<Vec<WordRow>> {
    let rows = sqlx::query(
        r#"
        SELECT w.word_id, w.word, w.homophone_group
        FROM words w
        WHERE w.homophone_group = (SELECT homophone_group FROM words WHERE word = ?)
        ORDER BY w.word
        "#,
    )
    .bind(word.to_lowercase())
    .fetch_all(db)
    .await?;

    if rows.is_empty() {
        return Err(Error::NotFound(format!("word '{}'", word)));
    }

    rows.iter().map(word_row).collect()
}

/// Up to `count` words picked at random
pub async fn random_words(db: &Pool<Sqlite>, count: u32) -> Result<Vec<WordRow>> {
    let rows = sqlx::query(
        "SELECT word_id, word, homophone_group FROM words ORDER BY RANDOM() LIMIT ?",
    )
    .bind(i64::from(count))
    .fetch_all(db)
    .await?;

    rows.iter().map(word_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::setup_seeded_db;

    #[tokio::test]
    async fn test_resolve_is_case_insensitive_and_deduplicated() {
        let pool = setup_seeded_db().await;

        let ids = resolve_word_ids(&pool, ["Base", "BASE", "base", "nothing"])
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);

        let ids = resolve_word_ids(&pool, ["two", "bee", "sea"]).await.unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "IDs should be ascending");
    }

    #[tokio::test]
    async fn test_resolve_nothing_is_not_found() {
        let pool = setup_seeded_db().await;

        let result = resolve_word_ids(&pool, ["zero", "homophones"]).await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        let result = resolve_word_ids(&pool, Vec::<String>::new()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_words_by_letter() {
        let pool = setup_seeded_db().await;

        let words: Vec<String> = words_by_letter(&pool, 'B')
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.word)
            .collect();
        assert_eq!(words, vec!["base", "bass", "be", "bee"]);
    }

    #[tokio::test]
    async fn test_words_by_letter_rejects_wildcards() {
        let pool = setup_seeded_db().await;

        for letter in ['%', '_', ' '] {
            assert!(matches!(
                words_by_letter(&pool, letter).await,
                Err(Error::Validation(_))
            ));
        }
        assert!(words_by_letter(&pool, 'z').await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_homophones_of_returns_whole_group() {
        let pool = setup_seeded_db().await;

        let group = homophones_of(&pool, "Too").await.unwrap();
        let words: Vec<&str> = group.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["to", "too", "two"]);
        assert!(group.iter().all(|w| w.homophone_group == group[0].homophone_group));

        assert!(matches!(
            homophones_of(&pool, "pun").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_random_words_respects_count() {
        let pool = setup_seeded_db().await;

        assert_eq!(random_words(&pool, 3).await.unwrap().len(), 3);
        assert_eq!(random_words(&pool, 0).await.unwrap().len(), 0);
        // More than exist: returns everything
        assert_eq!(random_words(&pool, 1000).await.unwrap().len(), 17);
    }
}
