//! # Punocracy Common Library
//!
//! Phrase curation and rating consistency for Punocracy:
//! - Phrase submission gated on known homophones
//! - Curator work queue and review decisions
//! - Per-user ratings kept in step with per-phrase star counts
//! - Pun generation and homophone list import
//! - Database initialization and configuration loading

pub mod config;
pub mod curation;
pub mod db;
pub mod error;
pub mod homophones;
pub mod puns;
pub mod ranking;
pub mod rating;
pub mod submission;

pub use error::{Error, Result};
