//! Curator work queue and review decisions
//!
//! # Batch assignment
//!
//! [`assign_batch`] hands a curator up to `max_count` phrases:
//!
//! 1. phrases the curator already holds (`in_review`, `reviewed_by = curator`),
//!    oldest claim batch first, lowest average rating first within a batch;
//! 2. topped up from the `unreviewed` pool. The claim is one conditional
//!    update, so a phrase taken by another curator between our read and our
//!    write is dropped from the batch rather than double-assigned.
//!
//! Claimed phrases stay with the curator until decided, so fetching twice in
//! a row returns the same batch in the same order.

use crate::db::models::{DisplayState, Phrase};
use crate::db::phrases;
use crate::ranking::sort_for_review;
use crate::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default batch size shown to a curator
pub const DEFAULT_BATCH_SIZE: u32 = 5;

/// Outcome of reviewing one phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Accept,
    Reject,
}

impl ReviewDecision {
    /// Display state a phrase ends in after this decision
    pub fn target_state(self) -> DisplayState {
        match self {
            ReviewDecision::Accept => DisplayState::Accepted,
            ReviewDecision::Reject => DisplayState::Rejected,
        }
    }
}

impl FromStr for ReviewDecision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "accept" => Ok(ReviewDecision::Accept),
            "reject" => Ok(ReviewDecision::Reject),
            other => Err(Error::Validation(format!(
                "unknown review decision '{}' (expected accept or reject)",
                other
            ))),
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewDecision::Accept => f.write_str("accept"),
            ReviewDecision::Reject => f.write_str("reject"),
        }
    }
}

/// Hand out up to `max_count` phrases for `curator` to review
///
/// Previously claimed work comes first, newly claimed work after it. A batch
/// shorter than `max_count` means the unreviewed pool ran dry or another
/// curator claimed some of the candidates first; lost candidates are not
/// replaced.
pub async fn assign_batch(db: &Pool<Sqlite>, curator: i64, max_count: u32) -> Result<Vec<Phrase>> {
    if max_count == 0 {
        return Ok(Vec::new());
    }

    let mut batch = phrases::in_review_for_curator(db, curator, max_count).await?;
    let held = batch.len();

    let wanted = max_count - held as u32;
    if wanted > 0 {
        let candidates = phrases::unreviewed(db, wanted).await?;
        batch.extend(claim_candidates(db, curator, candidates).await?);
    }

    debug!(curator, held, total = batch.len(), max_count, "Assigned review batch");
    Ok(batch)
}

/// Claim `candidates` for `curator`, keeping only those still unreviewed
///
/// Candidates taken by another curator since they were read are dropped, so
/// the result may be shorter than the input. Sorted for review.
async fn claim_candidates(
    db: &Pool<Sqlite>,
    curator: i64,
    candidates: Vec<Phrase>,
) -> Result<Vec<Phrase>> {
    let candidate_ids: Vec<Uuid> = candidates.iter().map(|p| p.id).collect();

    let claimed: HashSet<Uuid> = phrases::claim_unreviewed(db, &candidate_ids, curator)
        .await?
        .into_iter()
        .collect();

    if claimed.len() < candidates.len() {
        debug!(
            curator,
            lost = candidates.len() - claimed.len(),
            "Phrases claimed by another curator before our update"
        );
    }

    let mut fresh: Vec<Phrase> = candidates
        .into_iter()
        .filter(|p| claimed.contains(&p.id))
        .map(|mut p| {
            p.reviewed_by = Some(curator);
            p.display_state = DisplayState::InReview;
            p
        })
        .collect();
    sort_for_review(&mut fresh);

    if !fresh.is_empty() {
        info!(curator, claimed = fresh.len(), "Claimed phrases for review");
    }
    Ok(fresh)
}

/// Apply a curator's accept/reject decision to a phrase
///
/// Sets the reviewer, review date, and final display state. The phrase's
/// current state is not checked; deciding a phrase that is not in review is
/// applied anyway and logged.
pub async fn apply_decision(
    db: &Pool<Sqlite>,
    phrase_id: Uuid,
    reviewer: i64,
    decision: ReviewDecision,
) -> Result<()> {
    let target = decision.target_state();

    let current = phrases::get_display_state(db, phrase_id).await?;
    if !current.can_transition_to(target) {
        warn!(
            phrase_id = %phrase_id,
            reviewer,
            from = %current,
            to = %target,
            "Applying review decision outside the normal lifecycle"
        );
    }

    let found = phrases::set_review_decision(db, phrase_id, reviewer, target, Utc::now()).await?;
    if !found {
        return Err(Error::NotFound(format!("phrase {}", phrase_id)));
    }

    info!(phrase_id = %phrase_id, reviewer, decision = %decision, "Review decision applied");
    Ok(())
}
