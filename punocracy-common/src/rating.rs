//! Rating aggregation
//!
//! Keeps two records in step: the per-user `user_ratings` row and the
//! per-phrase star buckets on `phrases`. For every phrase and star value the
//! bucket equals the number of user ratings with that value. Buckets are only
//! ever adjusted by deltas inside the same transaction that changes the user
//! rating, never recomputed.
//!
//! Each operation opens its transaction with a write to the phrase row, so it
//! holds the store's write lock before it reads the user's existing rating.
//! Concurrent re-ratings of the same phrase therefore run one after another.

use crate::db::models::{StarRating, UserRating};
use crate::db::ratings;
use crate::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};
use uuid::Uuid;

/// What [`add_or_change_rating`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RatingChange {
    /// First rating by this user for this phrase
    Added,
    /// Existing rating moved from `previous` to the new value
    Changed { previous: StarRating },
    /// Same value resubmitted; nothing written
    Unchanged,
}

/// Record `user_id`'s rating of a phrase, replacing any earlier rating
pub async fn add_or_change_rating(
    db: &Pool<Sqlite>,
    user_id: i64,
    rating: StarRating,
    phrase_id: Uuid,
) -> Result<RatingChange> {
    let mut tx = db.begin().await?;

    if !ratings::lock_phrase(&mut *tx, phrase_id).await? {
        return Err(Error::NotFound(format!("phrase {}", phrase_id)));
    }

    let change = match ratings::find_user_rating(&mut *tx, user_id, phrase_id).await? {
        None => {
            let entry = UserRating {
                id: Uuid::new_v4(),
                user_id,
                phrase_id,
                rating,
                rate_date: Utc::now(),
            };
            ratings::insert_user_rating(&mut *tx, &entry).await?;
            ratings::increment_bucket(&mut *tx, phrase_id, rating).await?;
            RatingChange::Added
        }
        Some(existing) if existing.rating == rating => {
            debug!(user_id, phrase_id = %phrase_id, %rating, "Rating unchanged");
            // Dropping the transaction rolls back the no-op lock write
            return Ok(RatingChange::Unchanged);
        }
        Some(existing) => {
            ratings::update_user_rating(&mut *tx, existing.id, rating, Utc::now()).await?;
            if !ratings::move_bucket(&mut *tx, phrase_id, existing.rating, rating).await? {
                return Err(Error::DataIntegrity(format!(
                    "phrase {} has no {}-star ratings to move to {} stars",
                    phrase_id, existing.rating, rating
                )));
            }
            RatingChange::Changed {
                previous: existing.rating,
            }
        }
    };

    tx.commit().await?;

    info!(user_id, phrase_id = %phrase_id, %rating, ?change, "Rating recorded");
    Ok(change)
}

/// Withdraw `user_id`'s rating of a phrase
///
/// Returns the value that was removed. Fails with `NotFound` when the phrase
/// or the rating does not exist.
pub async fn remove_rating(db: &Pool<Sqlite>, user_id: i64, phrase_id: Uuid) -> Result<StarRating> {
    let mut tx = db.begin().await?;

    if !ratings::lock_phrase(&mut *tx, phrase_id).await? {
        return Err(Error::NotFound(format!("phrase {}", phrase_id)));
    }

    let existing = ratings::find_user_rating(&mut *tx, user_id, phrase_id)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!("rating by user {} for phrase {}", user_id, phrase_id))
        })?;

    ratings::delete_user_rating(&mut *tx, existing.id).await?;
    if !ratings::decrement_bucket(&mut *tx, phrase_id, existing.rating).await? {
        return Err(Error::DataIntegrity(format!(
            "phrase {} has no {}-star ratings to remove",
            phrase_id, existing.rating
        )));
    }

    tx.commit().await?;

    info!(user_id, phrase_id = %phrase_id, rating = %existing.rating, "Rating removed");
    Ok(existing.rating)
}

/// A user's ratings, most recent first
pub async fn ratings_by_user(db: &Pool<Sqlite>, user_id: i64) -> Result<Vec<UserRating>> {
    ratings::ratings_by_user(db, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::RatingAggregate;
    use crate::db::phrases;
    use crate::db::test_support::setup_seeded_db;
    use crate::submission::submit_phrase;
    use std::time::Duration;

    fn stars(value: i64) -> StarRating {
        StarRating::try_from(value).unwrap()
    }

    async fn aggregate(db: &Pool<Sqlite>, phrase_id: Uuid) -> RatingAggregate {
        phrases::get_phrase(db, phrase_id).await.unwrap().ratings
    }

    async fn rating_rows(db: &Pool<Sqlite>, user_id: i64, phrase_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM user_ratings WHERE user_id = ? AND phrase_guid = ?")
            .bind(user_id)
            .bind(phrase_id.to_string())
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_rating_increments_bucket() {
        let pool = setup_seeded_db().await;
        let phrase = submit_phrase(&pool, "to be", 1).await.unwrap();

        let change = add_or_change_rating(&pool, 9, stars(4), phrase.id).await.unwrap();
        assert_eq!(change, RatingChange::Added);

        let agg = aggregate(&pool, phrase.id).await;
        assert_eq!(agg.four_star, 1);
        assert_eq!(agg.total(), 1);
        assert_eq!(rating_rows(&pool, 9, phrase.id).await, 1);
    }

    #[tokio::test]
    async fn test_same_rating_twice_counts_once() {
        let pool = setup_seeded_db().await;
        let phrase = submit_phrase(&pool, "to be", 1).await.unwrap();

        add_or_change_rating(&pool, 9, stars(3), phrase.id).await.unwrap();
        let before = ratings_by_user(&pool, 9).await.unwrap();

        let change = add_or_change_rating(&pool, 9, stars(3), phrase.id).await.unwrap();
        assert_eq!(change, RatingChange::Unchanged);

        let agg = aggregate(&pool, phrase.id).await;
        assert_eq!(agg.three_star, 1);
        assert_eq!(agg.total(), 1);

        // rate_date untouched by the resubmission
        let after = ratings_by_user(&pool, 9).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_changed_rating_moves_between_buckets() {
        let pool = setup_seeded_db().await;
        let phrase = submit_phrase(&pool, "to be", 1).await.unwrap();
        // Another user's rating must be left alone
        add_or_change_rating(&pool, 8, stars(2), phrase.id).await.unwrap();

        add_or_change_rating(&pool, 9, stars(2), phrase.id).await.unwrap();
        let change = add_or_change_rating(&pool, 9, stars(5), phrase.id).await.unwrap();
        assert_eq!(change, RatingChange::Changed { previous: stars(2) });

        let agg = aggregate(&pool, phrase.id).await;
        assert_eq!(agg.two_star, 1);
        assert_eq!(agg.five_star, 1);
        assert_eq!(agg.total(), 2);

        assert_eq!(rating_rows(&pool, 9, phrase.id).await, 1);
        let mine = ratings_by_user(&pool, 9).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].rating, stars(5));
    }

    #[tokio::test]
    async fn test_rating_missing_phrase_is_not_found() {
        let pool = setup_seeded_db().await;
        let missing = Uuid::new_v4();

        let result = add_or_change_rating(&pool, 9, stars(4), missing).await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_ratings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_corrupt_bucket_fails_without_partial_write() {
        let pool = setup_seeded_db().await;
        let phrase = submit_phrase(&pool, "to be", 1).await.unwrap();
        add_or_change_rating(&pool, 9, stars(3), phrase.id).await.unwrap();

        // Simulate prior corruption: the 3-star bucket lost its count
        sqlx::query("UPDATE phrases SET rating_three = 0 WHERE guid = ?")
            .bind(phrase.id.to_string())
            .execute(&pool)
            .await
            .unwrap();

        let result = add_or_change_rating(&pool, 9, stars(1), phrase.id).await;
        assert!(matches!(result, Err(Error::DataIntegrity(_))));

        // The user rating update was rolled back with the failed delta
        let mine = ratings_by_user(&pool, 9).await.unwrap();
        assert_eq!(mine[0].rating, stars(3));
        assert_eq!(aggregate(&pool, phrase.id).await.one_star, 0);
    }

    #[tokio::test]
    async fn test_remove_rating_decrements_bucket() {
        let pool = setup_seeded_db().await;
        let phrase = submit_phrase(&pool, "to be", 1).await.unwrap();
        add_or_change_rating(&pool, 9, stars(4), phrase.id).await.unwrap();

        let removed = remove_rating(&pool, 9, phrase.id).await.unwrap();
        assert_eq!(removed, stars(4));
        assert_eq!(aggregate(&pool, phrase.id).await.total(), 0);
        assert_eq!(rating_rows(&pool, 9, phrase.id).await, 0);

        let again = remove_rating(&pool, 9, phrase.id).await;
        assert!(matches!(again, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_ratings_by_user_newest_first() {
        let pool = setup_seeded_db().await;
        let first = submit_phrase(&pool, "to be", 1).await.unwrap();
        let second = submit_phrase(&pool, "see the sea", 1).await.unwrap();

        add_or_change_rating(&pool, 9, stars(2), first.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        add_or_change_rating(&pool, 9, stars(4), second.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        // Re-rating refreshes rate_date
        add_or_change_rating(&pool, 9, stars(5), first.id).await.unwrap();

        let order: Vec<Uuid> = ratings_by_user(&pool, 9)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.phrase_id)
            .collect();
        assert_eq!(order, vec![first.id, second.id]);

        assert!(ratings_by_user(&pool, 10).await.unwrap().is_empty());
    }
}
