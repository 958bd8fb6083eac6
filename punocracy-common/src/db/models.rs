//! Database models

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One entry of the homophone reference table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRow {
    pub word_id: i64,
    pub word: String,
    pub homophone_group: i64,
}

/// Review lifecycle stage of a phrase
///
/// Transitions only move forward: `Unreviewed -> InReview -> Accepted | Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    /// Submitted, not yet handed to a curator
    Unreviewed,
    /// Claimed by a curator, decision pending
    InReview,
    /// Published
    Accepted,
    /// Kept but never displayed
    Rejected,
}

impl DisplayState {
    /// Column value stored in `phrases.display_state`
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayState::Unreviewed => "unreviewed",
            DisplayState::InReview => "in_review",
            DisplayState::Accepted => "accepted",
            DisplayState::Rejected => "rejected",
        }
    }

    /// Parse a stored column value
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "unreviewed" => Ok(DisplayState::Unreviewed),
            "in_review" => Ok(DisplayState::InReview),
            "accepted" => Ok(DisplayState::Accepted),
            "rejected" => Ok(DisplayState::Rejected),
            other => Err(Error::DataIntegrity(format!(
                "unknown display state '{}'",
                other
            ))),
        }
    }

    /// Whether the lifecycle permits moving from `self` to `next`
    pub fn can_transition_to(self, next: DisplayState) -> bool {
        match (self, next) {
            (DisplayState::Unreviewed, DisplayState::InReview) => true,
            (DisplayState::InReview, DisplayState::Accepted) => true,
            (DisplayState::InReview, DisplayState::Rejected) => true,
            (DisplayState::Unreviewed, _)
            | (DisplayState::InReview, _)
            | (DisplayState::Accepted, _)
            | (DisplayState::Rejected, _) => false,
        }
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A star rating, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct StarRating(u8);

impl StarRating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn value(self) -> u8 {
        self.0
    }

    /// Aggregate column on `phrases` that counts this rating
    pub fn column(self) -> &'static str {
        match self.0 {
            1 => "rating_one",
            2 => "rating_two",
            3 => "rating_three",
            4 => "rating_four",
            5 => "rating_five",
            other => unreachable!("StarRating constructed with {}", other),
        }
    }
}

impl TryFrom<i64> for StarRating {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(StarRating(value as u8))
        } else {
            Err(Error::DataIntegrity(format!(
                "rating value {} outside {}..={}",
                value,
                Self::MIN,
                Self::MAX
            )))
        }
    }
}

impl From<StarRating> for i64 {
    fn from(rating: StarRating) -> i64 {
        i64::from(rating.0)
    }
}

impl fmt::Display for StarRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-phrase count of ratings at each star level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub one_star: i64,
    pub two_star: i64,
    pub three_star: i64,
    pub four_star: i64,
    pub five_star: i64,
}

impl RatingAggregate {
    /// Number of ratings recorded at `rating`
    pub fn count(&self, rating: StarRating) -> i64 {
        match rating.value() {
            1 => self.one_star,
            2 => self.two_star,
            3 => self.three_star,
            4 => self.four_star,
            5 => self.five_star,
            other => unreachable!("StarRating constructed with {}", other),
        }
    }

    /// Total number of ratings across all buckets
    pub fn total(&self) -> i64 {
        self.one_star + self.two_star + self.three_star + self.four_star + self.five_star
    }

    /// Sum of `stars * count` across all buckets
    pub fn weighted_sum(&self) -> i64 {
        self.one_star
            + 2 * self.two_star
            + 3 * self.three_star
            + 4 * self.four_star
            + 5 * self.five_star
    }
}

/// A user-submitted phrase and its review/rating state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub id: Uuid,
    pub submitter_user_id: i64,
    pub submission_date: DateTime<Utc>,
    pub ratings: RatingAggregate,
    /// Homophone word IDs found in the text; never empty once persisted
    pub word_ids: Vec<i64>,
    pub reviewed_by: Option<i64>,
    pub review_date: Option<DateTime<Utc>>,
    pub text: String,
    pub display_state: DisplayState,
}

/// One user's current rating of one phrase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRating {
    pub id: Uuid,
    pub user_id: i64,
    pub phrase_id: Uuid,
    pub rating: StarRating,
    pub rate_date: DateTime<Utc>,
}

/// Parse a stored GUID column
pub(crate) fn parse_guid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| Error::DataIntegrity(format!("invalid guid '{}': {}", raw, e)))
}
