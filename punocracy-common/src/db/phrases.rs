//! Phrase database queries
//!
//! Row mapping and the individual store statements used by submission,
//! curation, and display. Multi-step logic lives in the callers.

use super::models::{parse_guid, DisplayState, Phrase, RatingAggregate};
use super::placeholders;
use crate::ranking::{AVERAGE_RATING_SQL, TOTAL_RATINGS_SQL};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

/// Column list shared by every phrase SELECT (table aliased `p`)
const PHRASE_COLUMNS: &str = r#"
    p.guid, p.submitter_user_id, p.submission_date,
    p.rating_one, p.rating_two, p.rating_three, p.rating_four, p.rating_five,
    p.reviewed_by, p.review_date, p.phrase_text, p.display_state,
    (SELECT GROUP_CONCAT(pw.word_id) FROM phrase_words pw WHERE pw.phrase_guid = p.guid) AS word_ids
"#;

fn parse_word_ids(raw: Option<String>) -> Result<Vec<i64>> {
    let mut ids = raw
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim()
                .parse::<i64>()
                .map_err(|e| Error::DataIntegrity(format!("invalid word id '{}': {}", s, e)))
        })
        .collect::<Result<Vec<i64>>>()?;
    ids.sort_unstable();
    Ok(ids)
}

fn phrase_from_row(row: &SqliteRow) -> Result<Phrase> {
    let guid: String = row.try_get("guid")?;
    let state: String = row.try_get("display_state")?;

    Ok(Phrase {
        id: parse_guid(&guid)?,
        submitter_user_id: row.try_get("submitter_user_id")?,
        submission_date: row.try_get("submission_date")?,
        ratings: RatingAggregate {
            one_star: row.try_get("rating_one")?,
            two_star: row.try_get("rating_two")?,
            three_star: row.try_get("rating_three")?,
            four_star: row.try_get("rating_four")?,
            five_star: row.try_get("rating_five")?,
        },
        word_ids: parse_word_ids(row.try_get("word_ids")?)?,
        reviewed_by: row.try_get("reviewed_by")?,
        review_date: row.try_get("review_date")?,
        text: row.try_get("phrase_text")?,
        display_state: DisplayState::parse(&state)?,
    })
}

fn phrases_from_rows(rows: &[SqliteRow]) -> Result<Vec<Phrase>> {
    rows.iter().map(phrase_from_row).collect()
}

/// Persist a new phrase and its word links atomically
pub async fn insert_phrase(db: &Pool<Sqlite>, phrase: &Phrase) -> Result<()> {
    if phrase.word_ids.is_empty() {
        return Err(Error::Validation(
            "a phrase must reference at least one homophone".to_string(),
        ));
    }

    let mut tx = db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO phrases (
            guid, submitter_user_id, submission_date,
            rating_one, rating_two, rating_three, rating_four, rating_five,
            reviewed_by, review_date, phrase_text, display_state
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(phrase.id.to_string())
    .bind(phrase.submitter_user_id)
    .bind(phrase.submission_date)
    .bind(phrase.ratings.one_star)
    .bind(phrase.ratings.two_star)
    .bind(phrase.ratings.three_star)
    .bind(phrase.ratings.four_star)
    .bind(phrase.ratings.five_star)
    .bind(phrase.reviewed_by)
    .bind(phrase.review_date)
    .bind(&phrase.text)
    .bind(phrase.display_state.as_str())
    .execute(&mut *tx)
    .await?;

    for word_id in &phrase.word_ids {
        sqlx::query("INSERT INTO phrase_words (phrase_guid, word_id) VALUES (?, ?)")
            .bind(phrase.id.to_string())
            .bind(word_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Get a phrase by ID
pub async fn get_phrase(db: &Pool<Sqlite>, phrase_id: Uuid) -> Result<Phrase> {
    let sql = format!("SELECT {} FROM phrases p WHERE p.guid = ?", PHRASE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(phrase_id.to_string())
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::NotFound(format!("phrase {}", phrase_id)))?;

    phrase_from_row(&row)
}

/// Current display state of a phrase
pub async fn get_display_state(db: &Pool<Sqlite>, phrase_id: Uuid) -> Result<DisplayState> {
    let state: String = sqlx::query_scalar("SELECT display_state FROM phrases WHERE guid = ?")
        .bind(phrase_id.to_string())
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::NotFound(format!("phrase {}", phrase_id)))?;

    DisplayState::parse(&state)
}

/// Phrases a curator has claimed but not yet decided
///
/// Ordered by claim batch (oldest first), then ascending average rating,
/// then ID.
pub async fn in_review_for_curator(
    db: &Pool<Sqlite>,
    curator: i64,
    limit: u32,
) -> Result<Vec<Phrase>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM phrases p
        WHERE p.display_state = ? AND p.reviewed_by = ?
        ORDER BY p.claim_seq ASC, {} ASC, p.guid ASC
        LIMIT ?
        "#,
        PHRASE_COLUMNS, AVERAGE_RATING_SQL
    );
    let rows = sqlx::query(&sql)
        .bind(DisplayState::InReview.as_str())
        .bind(curator)
        .bind(i64::from(limit))
        .fetch_all(db)
        .await?;

    phrases_from_rows(&rows)
}

/// Unclaimed phrases, oldest submission first
pub async fn unreviewed(db: &Pool<Sqlite>, limit: u32) -> Result<Vec<Phrase>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM phrases p
        WHERE p.display_state = ?
        ORDER BY p.submission_date ASC, p.guid ASC
        LIMIT ?
        "#,
        PHRASE_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(DisplayState::Unreviewed.as_str())
        .bind(i64::from(limit))
        .fetch_all(db)
        .await?;

    phrases_from_rows(&rows)
}

/// Claim phrases for a curator in one conditional update
///
/// Only rows still `unreviewed` at write time are claimed; the rest were
/// taken by someone else in the meantime. Every row claimed here shares one
/// new claim batch number for `curator`. Returns the IDs actually claimed.
pub async fn claim_unreviewed(
    db: &Pool<Sqlite>,
    phrase_ids: &[Uuid],
    curator: i64,
) -> Result<Vec<Uuid>> {
    if phrase_ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        r#"
        UPDATE phrases
        SET reviewed_by = ?,
            display_state = ?,
            claim_seq = (SELECT COALESCE(MAX(claim_seq), 0) + 1 FROM phrases WHERE reviewed_by = ?)
        WHERE display_state = ? AND guid IN ({})
        RETURNING guid
        "#,
        placeholders(phrase_ids.len())
    );

    let mut query = sqlx::query_scalar::<_, String>(&sql)
        .bind(curator)
        .bind(DisplayState::InReview.as_str())
        .bind(curator)
        .bind(DisplayState::Unreviewed.as_str());
    for id in phrase_ids {
        query = query.bind(id.to_string());
    }

    let claimed = query.fetch_all(db).await?;
    claimed.iter().map(|guid| parse_guid(guid)).collect()
}

/// Record a curator's decision; returns false when the phrase does not exist
pub async fn set_review_decision(
    db: &Pool<Sqlite>,
    phrase_id: Uuid,
    reviewer: i64,
    state: DisplayState,
    review_date: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE phrases SET reviewed_by = ?, review_date = ?, display_state = ? WHERE guid = ?",
    )
    .bind(reviewer)
    .bind(review_date)
    .bind(state.as_str())
    .bind(phrase_id.to_string())
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Accepted phrases that contain any of the given words, best rated first
pub async fn accepted_phrases_for_words(db: &Pool<Sqlite>, word_ids: &[i64]) -> Result<Vec<Phrase>> {
    if word_ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        r#"
        SELECT {}
        FROM phrases p
        WHERE p.display_state = ?
          AND EXISTS (
              SELECT 1 FROM phrase_words pw
              WHERE pw.phrase_guid = p.guid AND pw.word_id IN ({})
          )
        ORDER BY {} DESC, {} DESC, p.guid ASC
        "#,
        PHRASE_COLUMNS,
        placeholders(word_ids.len()),
        AVERAGE_RATING_SQL,
        TOTAL_RATINGS_SQL
    );

    let mut query = sqlx::query(&sql).bind(DisplayState::Accepted.as_str());
    for id in word_ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(db).await?;

    phrases_from_rows(&rows)
}

/// Every phrase a user has submitted, newest first
pub async fn phrases_by_submitter(db: &Pool<Sqlite>, user_id: i64) -> Result<Vec<Phrase>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM phrases p
        WHERE p.submitter_user_id = ?
        ORDER BY p.submission_date DESC, p.guid ASC
        "#,
        PHRASE_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(user_id).fetch_all(db).await?;

    phrases_from_rows(&rows)
}

/// Highest-rated accepted phrases; ties go to the phrase with more ratings
pub async fn top_phrases(db: &Pool<Sqlite>, limit: u32) -> Result<Vec<Phrase>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM phrases p
        WHERE p.display_state = ?
        ORDER BY {} DESC, {} DESC, p.guid ASC
        LIMIT ?
        "#,
        PHRASE_COLUMNS, AVERAGE_RATING_SQL, TOTAL_RATINGS_SQL
    );
    let rows = sqlx::query(&sql)
        .bind(DisplayState::Accepted.as_str())
        .bind(i64::from(limit))
        .fetch_all(db)
        .await?;

    phrases_from_rows(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::setup_seeded_db;
    use crate::submission::submit_phrase;

    #[test]
    fn test_parse_word_ids() {
        assert_eq!(parse_word_ids(Some("12,3,7".to_string())).unwrap(), vec![3, 7, 12]);
        assert_eq!(parse_word_ids(None).unwrap(), Vec::<i64>::new());
        assert!(matches!(
            parse_word_ids(Some("1,x".to_string())),
            Err(Error::DataIntegrity(_))
        ));
    }

    #[tokio::test]
    async fn test_claim_skips_phrases_already_taken() {
        let pool = setup_seeded_db().await;
        let a = submit_phrase(&pool, "two be", 1).await.unwrap().id;
        let b = submit_phrase(&pool, "see the sea", 1).await.unwrap().id;

        assert_eq!(claim_unreviewed(&pool, &[a], 1).await.unwrap(), vec![a]);

        // Curator 2 read both before curator 1's update landed
        let claimed = claim_unreviewed(&pool, &[a, b], 2).await.unwrap();
        assert_eq!(claimed, vec![b]);

        let first = get_phrase(&pool, a).await.unwrap();
        assert_eq!(first.reviewed_by, Some(1));
        assert_eq!(first.display_state, DisplayState::InReview);

        let second = get_phrase(&pool, b).await.unwrap();
        assert_eq!(second.reviewed_by, Some(2));
        assert_eq!(second.display_state, DisplayState::InReview);
    }

    #[tokio::test]
    async fn test_claim_of_empty_list_is_noop() {
        let pool = setup_seeded_db().await;
        assert!(claim_unreviewed(&pool, &[], 1).await.unwrap().is_empty());
    }
}
