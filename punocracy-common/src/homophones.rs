//! Homophone list import
//!
//! Input is one homophone group per line, words separated by commas:
//!
//! ```text
//! to,two,too
//! knight,night
//! ```
//!
//! A group is identified by its first word. If that word is already in the
//! table the line is a repeat and is skipped, so re-importing the same file
//! is harmless.

use crate::Result;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use std::io::BufRead;
use tracing::{debug, info};

/// Counts reported by [`import_homophone_groups`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub groups_added: u64,
    pub words_added: u64,
    pub lines_skipped: u64,
}

fn parse_group(line: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in line.split(',') {
        let word = word.trim().to_lowercase();
        if !word.is_empty() && !words.contains(&word) {
            words.push(word);
        }
    }
    words
}

/// Load homophone groups into the `words` table in one transaction
pub async fn import_homophone_groups<R: BufRead>(db: &Pool<Sqlite>, reader: R) -> Result<ImportSummary> {
    let mut groups = Vec::new();
    for line in reader.lines() {
        let words = parse_group(&line?);
        if !words.is_empty() {
            groups.push(words);
        }
    }

    let mut summary = ImportSummary::default();
    let mut tx = db.begin().await?;

    let mut next_group: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(homophone_group) + 1, 0) FROM words")
            .fetch_one(&mut *tx)
            .await?;

    for words in &groups {
        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM words WHERE word = ?")
            .bind(&words[0])
            .fetch_one(&mut *tx)
            .await?;
        if known > 0 {
            summary.lines_skipped += 1;
            continue;
        }

        for word in words {
            let result = sqlx::query("INSERT OR IGNORE INTO words (word, homophone_group) VALUES (?, ?)")
                .bind(word)
                .bind(next_group)
                .execute(&mut *tx)
                .await?;
            summary.words_added += result.rows_affected();
        }

        debug!(group = next_group, words = words.len(), "Imported homophone group");
        next_group += 1;
        summary.groups_added += 1;
    }

    tx.commit().await?;

    info!(
        groups_added = summary.groups_added,
        words_added = summary.words_added,
        lines_skipped = summary.lines_skipped,
        "Homophone import complete"
    );
    Ok(summary)
}
