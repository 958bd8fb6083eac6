//! Subcommand definitions and handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use punocracy_common::config::TomlConfig;
use punocracy_common::curation::{self, ReviewDecision};
use punocracy_common::db::models::{Phrase, StarRating, UserRating, WordRow};
use punocracy_common::db::{phrases, words};
use punocracy_common::homophones::import_homophone_groups;
use punocracy_common::puns::{self, Pun};
use punocracy_common::ranking::average_rating;
use punocracy_common::rating::{self, RatingChange};
use punocracy_common::submission::submit_phrase;
use serde::Serialize;
use sqlx::SqlitePool;
use std::io::BufReader;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load homophone groups (one comma-separated group per line; "-" reads stdin)
    ImportWords {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Submit a phrase for review
    Submit {
        #[arg(short, long)]
        user: i64,
        text: String,
    },

    /// Show a single phrase
    Show { phrase_id: Uuid },

    /// Fetch the curator's current review batch
    Curate {
        #[arg(short, long)]
        curator: i64,

        /// Batch size (defaults to curation.batch_size from the config file)
        #[arg(short = 'n', long)]
        count: Option<u32>,
    },

    /// Accept or reject a phrase
    Decide {
        #[arg(short, long)]
        curator: i64,
        phrase_id: Uuid,
        decision: ReviewDecision,
    },

    /// Rate a phrase from 1 to 5 stars
    Rate {
        #[arg(short, long)]
        user: i64,
        phrase_id: Uuid,
        #[arg(value_parser = clap::value_parser!(i64).range(1..=5))]
        stars: i64,
    },

    /// Withdraw a rating
    Unrate {
        #[arg(short, long)]
        user: i64,
        phrase_id: Uuid,
    },

    /// List a user's ratings, newest first
    Ratings {
        #[arg(short, long)]
        user: i64,
    },

    /// List a user's submitted phrases, newest first
    History {
        #[arg(short, long)]
        user: i64,
    },

    /// Highest rated accepted phrases
    Top {
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Generate puns for a word from accepted phrases
    Puns { word: String },

    /// Words beginning with a letter
    Words { letter: char },

    /// Homophones of a word
    Homophones { word: String },

    /// Random words from the homophone list
    Random {
        #[arg(short = 'n', long, default_value = "10")]
        count: u32,
    },
}

/// Print `value` as JSON, or hand it to `text` for plain output
fn emit<T: Serialize + ?Sized>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn phrase_line(phrase: &Phrase) -> String {
    format!(
        "{}  {:<10} {:.2} ({:>3})  {}",
        phrase.id,
        phrase.display_state.as_str(),
        average_rating(&phrase.ratings),
        phrase.ratings.total(),
        phrase.text
    )
}

fn print_phrases(list: &[Phrase]) {
    if list.is_empty() {
        println!("(no phrases)");
    }
    for phrase in list {
        println!("{}", phrase_line(phrase));
    }
}

fn print_words(list: &[WordRow]) {
    for word in list {
        println!("{:>6}  group {:>5}  {}", word.word_id, word.homophone_group, word.word);
    }
}

fn print_ratings(list: &[UserRating]) {
    if list.is_empty() {
        println!("(no ratings)");
    }
    for entry in list {
        println!(
            "{}  {}  {}",
            entry.phrase_id,
            entry.rating,
            entry.rate_date.to_rfc3339()
        );
    }
}

fn print_puns(list: &[Pun]) {
    if list.is_empty() {
        println!("(no puns)");
    }
    for pun in list {
        println!("{:.2}  {}", pun.average_rating, pun.text);
    }
}

#[derive(Serialize)]
struct Decided {
    phrase_id: Uuid,
    decision: ReviewDecision,
}

#[derive(Serialize)]
struct Rated {
    phrase_id: Uuid,
    stars: StarRating,
    #[serde(flatten)]
    change: RatingChange,
}

#[derive(Serialize)]
struct Unrated {
    phrase_id: Uuid,
    removed: StarRating,
}

/// Run one subcommand against an open database
pub async fn run(command: Command, pool: &SqlitePool, config: &TomlConfig, json: bool) -> Result<()> {
    match command {
        Command::ImportWords { file } => {
            let summary = if file.as_os_str() == "-" {
                import_homophone_groups(pool, std::io::stdin().lock()).await?
            } else {
                let handle = std::fs::File::open(&file)
                    .with_context(|| format!("Failed to open {}", file.display()))?;
                import_homophone_groups(pool, BufReader::new(handle)).await?
            };
            emit(json, &summary, |s| {
                println!(
                    "Imported {} group(s), {} word(s); skipped {} known group(s)",
                    s.groups_added, s.words_added, s.lines_skipped
                )
            })
        }

        Command::Submit { user, text } => {
            let phrase = submit_phrase(pool, &text, user).await?;
            emit(json, &phrase, |p| {
                println!("Submitted {} ({} homophone(s))", p.id, p.word_ids.len())
            })
        }

        Command::Show { phrase_id } => {
            let phrase = phrases::get_phrase(pool, phrase_id).await?;
            emit(json, &phrase, |p| println!("{}", phrase_line(p)))
        }

        Command::Curate { curator, count } => {
            let count = count.unwrap_or(config.curation.batch_size);
            let batch = curation::assign_batch(pool, curator, count).await?;
            emit(json, batch.as_slice(), print_phrases)
        }

        Command::Decide {
            curator,
            phrase_id,
            decision,
        } => {
            curation::apply_decision(pool, phrase_id, curator, decision).await?;
            emit(json, &Decided { phrase_id, decision }, |d| {
                println!("{} {}", d.decision, d.phrase_id)
            })
        }

        Command::Rate {
            user,
            phrase_id,
            stars,
        } => {
            let stars = StarRating::try_from(stars)?;
            let change = rating::add_or_change_rating(pool, user, stars, phrase_id).await?;
            let rated = Rated {
                phrase_id,
                stars,
                change,
            };
            emit(json, &rated, |r| match r.change {
                RatingChange::Added => println!("Rated {} {} star(s)", r.phrase_id, r.stars),
                RatingChange::Changed { previous } => println!(
                    "Changed rating of {} from {} to {} star(s)",
                    r.phrase_id, previous, r.stars
                ),
                RatingChange::Unchanged => println!("Rating of {} unchanged", r.phrase_id),
            })
        }

        Command::Unrate { user, phrase_id } => {
            let removed = rating::remove_rating(pool, user, phrase_id).await?;
            emit(json, &Unrated { phrase_id, removed }, |u| {
                println!("Removed {}-star rating of {}", u.removed, u.phrase_id)
            })
        }

        Command::Ratings { user } => {
            let list = rating::ratings_by_user(pool, user).await?;
            emit(json, list.as_slice(), print_ratings)
        }

        Command::History { user } => {
            let list = phrases::phrases_by_submitter(pool, user).await?;
            emit(json, list.as_slice(), print_phrases)
        }

        Command::Top { limit } => {
            let list = phrases::top_phrases(pool, limit).await?;
            emit(json, list.as_slice(), print_phrases)
        }

        Command::Puns { word } => {
            let list = puns::puns_for_word(pool, &word).await?;
            emit(json, list.as_slice(), print_puns)
        }

        Command::Words { letter } => {
            let list = words::words_by_letter(pool, letter).await?;
            emit(json, list.as_slice(), print_words)
        }

        Command::Homophones { word } => {
            let list = words::homophones_of(pool, &word).await?;
            emit(json, list.as_slice(), print_words)
        }

        Command::Random { count } => {
            let list = words::random_words(pool, count).await?;
            emit(json, list.as_slice(), print_words)
        }
    }
}
