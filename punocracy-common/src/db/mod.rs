//! Database models and queries

pub mod init;
pub mod models;
pub mod phrases;
pub mod ratings;
pub mod words;

#[cfg(test)]
pub(crate) mod test_support;

pub use init::*;
pub use models::*;

/// `?, ?, ?` bind list for an `IN (...)` clause of `count` values
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
