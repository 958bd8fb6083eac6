//! Pun generation
//!
//! A pun is an accepted phrase with every homophone of the query word swapped
//! for the query word itself.

use crate::db::models::{Phrase, WordRow};
use crate::db::{phrases, words};
use crate::ranking::average_rating;
use crate::Result;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use std::collections::HashSet;
use tracing::debug;

/// A generated pun and the phrase it came from
#[derive(Debug, Clone, Serialize)]
pub struct Pun {
    pub text: String,
    pub average_rating: f64,
    pub phrase: Phrase,
}

/// Substitute `query_word` for each homophone occurring in `text`
///
/// Matching is case-insensitive on the token with surrounding punctuation
/// removed; the punctuation is kept around the replacement.
pub fn substitute(query_word: &str, homophones: &HashSet<String>, text: &str) -> String {
    text.split_whitespace()
        .map(|token| {
            let core = token.trim_matches(|c: char| !c.is_alphanumeric());
            if core.is_empty() || !homophones.contains(&core.to_lowercase()) {
                return token.to_string();
            }
            let start = token.find(core).unwrap_or(0);
            let end = start + core.len();
            format!("{}{}{}", &token[..start], query_word, &token[end..])
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build one pun per phrase
pub fn generate_puns(query_word: &str, homophones: &[WordRow], phrases: &[Phrase]) -> Vec<String> {
    let words: HashSet<String> = homophones.iter().map(|w| w.word.to_lowercase()).collect();
    phrases
        .iter()
        .map(|phrase| substitute(query_word, &words, &phrase.text))
        .collect()
}

/// Puns for `query_word` built from accepted phrases, best rated first
///
/// Fails with `NotFound` when the word is not in the homophone table.
pub async fn puns_for_word(db: &Pool<Sqlite>, query_word: &str) -> Result<Vec<Pun>> {
    let homophones = words::homophones_of(db, query_word).await?;
    let word_ids: Vec<i64> = homophones.iter().map(|w| w.word_id).collect();
    let accepted = phrases::accepted_phrases_for_words(db, &word_ids).await?;

    debug!(query_word, homophones = homophones.len(), phrases = accepted.len(), "Generating puns");

    let texts = generate_puns(query_word, &homophones, &accepted);
    Ok(accepted
        .into_iter()
        .zip(texts)
        .map(|(phrase, text)| Pun {
            text,
            average_rating: average_rating(&phrase.ratings),
            phrase,
        })
        .collect())
}
