//! User rating and aggregate-bucket statements
//!
//! Everything except [`ratings_by_user`] runs on a caller-owned connection so
//! the rating engine can compose them inside one transaction.

use super::models::{parse_guid, StarRating, UserRating};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite, SqliteConnection};
use uuid::Uuid;

fn user_rating_from_row(row: &SqliteRow) -> Result<UserRating> {
    let guid: String = row.try_get("guid")?;
    let phrase_guid: String = row.try_get("phrase_guid")?;
    let value: i64 = row.try_get("rating_value")?;

    Ok(UserRating {
        id: parse_guid(&guid)?,
        user_id: row.try_get("user_id")?,
        phrase_id: parse_guid(&phrase_guid)?,
        rating: StarRating::try_from(value)?,
        rate_date: row.try_get("rate_date")?,
    })
}

/// Take the write lock on the store by touching the phrase row
///
/// Must be the first statement of the transaction: once a transaction holds
/// the write lock, no other writer can interleave between its reads and
/// writes. Returns false when the phrase does not exist.
pub async fn lock_phrase(conn: &mut SqliteConnection, phrase_id: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE phrases SET rating_one = rating_one WHERE guid = ?")
        .bind(phrase_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// The rating `user_id` currently holds for a phrase, if any
pub async fn find_user_rating(
    conn: &mut SqliteConnection,
    user_id: i64,
    phrase_id: Uuid,
) -> Result<Option<UserRating>> {
    let row = sqlx::query(
        r#"
        SELECT guid, user_id, phrase_guid, rating_value, rate_date
        FROM user_ratings
        WHERE user_id = ? AND phrase_guid = ?
        "#,
    )
    .bind(user_id)
    .bind(phrase_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(user_rating_from_row).transpose()
}

pub async fn insert_user_rating(conn: &mut SqliteConnection, rating: &UserRating) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_ratings (guid, user_id, phrase_guid, rating_value, rate_date)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(rating.id.to_string())
    .bind(rating.user_id)
    .bind(rating.phrase_id.to_string())
    .bind(i64::from(rating.rating))
    .bind(rating.rate_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn update_user_rating(
    conn: &mut SqliteConnection,
    rating_id: Uuid,
    rating: StarRating,
    rate_date: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE user_ratings SET rating_value = ?, rate_date = ? WHERE guid = ?")
        .bind(i64::from(rating))
        .bind(rate_date)
        .bind(rating_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn delete_user_rating(conn: &mut SqliteConnection, rating_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM user_ratings WHERE guid = ?")
        .bind(rating_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Add one to a phrase's bucket for `rating`
pub async fn increment_bucket(
    conn: &mut SqliteConnection,
    phrase_id: Uuid,
    rating: StarRating,
) -> Result<()> {
    let column = rating.column();
    let sql = format!("UPDATE phrases SET {0} = {0} + 1 WHERE guid = ?", column);
    sqlx::query(&sql)
        .bind(phrase_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Subtract one from a phrase's bucket for `rating`
///
/// Guarded by `bucket > 0`; returns false (and writes nothing) when the
/// bucket is already empty.
pub async fn decrement_bucket(
    conn: &mut SqliteConnection,
    phrase_id: Uuid,
    rating: StarRating,
) -> Result<bool> {
    let column = rating.column();
    let sql = format!(
        "UPDATE phrases SET {0} = {0} - 1 WHERE guid = ? AND {0} > 0",
        column
    );
    let result = sqlx::query(&sql)
        .bind(phrase_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Move one rating from the `from` bucket to the `to` bucket in one statement
///
/// Guarded like [`decrement_bucket`]. `from` and `to` must differ.
pub async fn move_bucket(
    conn: &mut SqliteConnection,
    phrase_id: Uuid,
    from: StarRating,
    to: StarRating,
) -> Result<bool> {
    debug_assert_ne!(from, to);
    let sql = format!(
        "UPDATE phrases SET {0} = {0} - 1, {1} = {1} + 1 WHERE guid = ? AND {0} > 0",
        from.column(),
        to.column()
    );
    let result = sqlx::query(&sql)
        .bind(phrase_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Every rating a user holds, most recently rated first
pub async fn ratings_by_user(db: &Pool<Sqlite>, user_id: i64) -> Result<Vec<UserRating>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, user_id, phrase_guid, rating_value, rate_date
        FROM user_ratings
        WHERE user_id = ?
        ORDER BY rate_date DESC, guid ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    rows.iter().map(user_rating_from_row).collect()
}
