//! Phrase submission
//!
//! A phrase is only accepted into the review pipeline when at least one of
//! its words belongs to the homophone table.

use crate::db::models::{DisplayState, Phrase, RatingAggregate};
use crate::db::{phrases, words};
use crate::{Error, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Split text into distinct lowercase words
///
/// Tokens are whitespace-separated; punctuation at either end of a token is
/// dropped so `"us."` and `"us"` are the same word. Inner apostrophes and
/// hyphens stay (`"you're"`).
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|token| {
            token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

/// Validate and store a user-submitted phrase
///
/// Nothing is written when the text contains no known homophone.
pub async fn submit_phrase(db: &Pool<Sqlite>, text: &str, submitter: i64) -> Result<Phrase> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Err(Error::Validation("phrase is empty".to_string()));
    }

    let word_ids = match words::resolve_word_ids(db, &tokens).await {
        Ok(ids) => ids,
        Err(Error::NotFound(_)) => {
            debug!(submitter, tokens = tokens.len(), "Rejected phrase without homophones");
            return Err(Error::Validation(
                "no homophones in candidate phrase".to_string(),
            ));
        }
        Err(e) => return Err(e),
    };

    let phrase = Phrase {
        id: Uuid::new_v4(),
        submitter_user_id: submitter,
        submission_date: Utc::now(),
        ratings: RatingAggregate::default(),
        word_ids,
        reviewed_by: None,
        review_date: None,
        text: text.to_string(),
        display_state: DisplayState::Unreviewed,
    };

    phrases::insert_phrase(db, &phrase).await?;

    info!(
        phrase_id = %phrase.id,
        submitter,
        homophones = phrase.word_ids.len(),
        "Phrase submitted for review"
    );

    Ok(phrase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::setup_seeded_db;

    #[test]
    fn test_tokenize_lowercases_and_deduplicates() {
        let tokens = tokenize("To be, or not TO   be.");
        let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
        assert_eq!(tokens, vec!["be", "not", "or", "to"]);
    }

    #[test]
    fn test_tokenize_keeps_inner_punctuation() {
        let tokens = tokenize("\"You're\" ... here!");
        assert!(tokens.contains("you're"));
        assert!(tokens.contains("here"));
        assert_eq!(tokens.len(), 2);
    }

    #[tokio::test]
    async fn test_phrase_without_homophones_is_rejected() {
        let pool = setup_seeded_db().await;

        let result = submit_phrase(&pool, "This has zero homophones within it.", 7).await;
        assert!(matches!(result, Err(Error::Validation(_))));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM phrases")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0, "no phrase should be written");
    }

    #[tokio::test]
    async fn test_blank_phrase_is_rejected() {
        let pool = setup_seeded_db().await;
        let result = submit_phrase(&pool, "   ...  ", 7).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_phrase_with_homophones_is_stored_unreviewed() {
        let pool = setup_seeded_db().await;

        let phrase = submit_phrase(&pool, "All your base are belong to us.", 7)
            .await
            .unwrap();

        // your, base, are, to
        assert_eq!(phrase.word_ids.len(), 4);
        assert_eq!(phrase.display_state, DisplayState::Unreviewed);
        assert_eq!(phrase.reviewed_by, None);
        assert_eq!(phrase.ratings, RatingAggregate::default());
        assert_eq!(phrase.text, "All your base are belong to us.");

        let stored = phrases::get_phrase(&pool, phrase.id).await.unwrap();
        assert_eq!(stored.word_ids, phrase.word_ids);
        assert_eq!(stored.submitter_user_id, 7);
        assert_eq!(stored.display_state, DisplayState::Unreviewed);
    }
}
