//! Average-rating computation and the orderings built on it

use crate::db::models::{Phrase, RatingAggregate};
use std::cmp::Ordering;

/// SQL expression computing [`average_rating`] over a `phrases` row aliased `p`
///
/// Evaluates in the same IEEE-754 operations as the Rust function so store-side
/// and in-memory orderings agree exactly.
pub const AVERAGE_RATING_SQL: &str = "CASE \
    WHEN (p.rating_one + p.rating_two + p.rating_three + p.rating_four + p.rating_five) = 0 THEN 0.0 \
    ELSE CAST(p.rating_one + 2 * p.rating_two + 3 * p.rating_three + 4 * p.rating_four + 5 * p.rating_five AS REAL) \
        / CAST(p.rating_one + p.rating_two + p.rating_three + p.rating_four + p.rating_five AS REAL) \
    END";

/// SQL expression for the total number of ratings of a `phrases` row aliased `p`
pub const TOTAL_RATINGS_SQL: &str =
    "(p.rating_one + p.rating_two + p.rating_three + p.rating_four + p.rating_five)";

/// Plain weighted mean on the 1-5 scale; 0 when nobody has rated
pub fn average_rating(aggregate: &RatingAggregate) -> f64 {
    let total = aggregate.total();
    if total == 0 {
        return 0.0;
    }
    aggregate.weighted_sum() as f64 / total as f64
}

/// Review ordering: ascending average rating, ties broken by phrase ID
pub fn review_order(a: &Phrase, b: &Phrase) -> Ordering {
    average_rating(&a.ratings)
        .total_cmp(&average_rating(&b.ratings))
        .then_with(|| a.id.cmp(&b.id))
}

/// Display ordering: best average first, then most ratings
pub fn display_order(a: &Phrase, b: &Phrase) -> Ordering {
    average_rating(&b.ratings)
        .total_cmp(&average_rating(&a.ratings))
        .then_with(|| b.ratings.total().cmp(&a.ratings.total()))
}

/// Sort phrases for a curator: lowest-rated first
pub fn sort_for_review(phrases: &mut [Phrase]) {
    phrases.sort_by(review_order);
}
