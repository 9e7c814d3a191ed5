//! Bulk moderation of court updates and reports, with retry of the failed subset.

use tracing::{info, warn};
use validator::Validate;

use crate::{
    dto::bulk::{BulkReviewRequest, ReviewAction, ReviewTarget},
    error::ServiceError,
    services::{court_session::remote, require_viewer},
    state::{ActionTarget, SharedState},
};

/// One id the backend could not process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub id: i64,
    pub error: String,
}

/// Per-id result of a bulk review; keeps the request so the failures can be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome {
    pub target: ReviewTarget,
    pub action: ReviewAction,
    pub reviewer_notes: Option<String>,
    pub processed: Vec<i64>,
    pub failed: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Positive failed ids, first occurrence order.
    pub fn failed_ids(&self) -> Vec<i64> {
        dedupe_positive(self.failed.iter().map(|failure| failure.id))
    }
}

fn dedupe_positive(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut unique = Vec::new();
    for id in ids {
        if id > 0 && !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

/// Apply `action` to every id in `ids`.
///
/// Partial failures come back inside the outcome. When the request as a whole fails every id is
/// reported failed with the error text; only an expired session is returned as an error.
pub async fn bulk_review(
    state: &SharedState,
    target: ReviewTarget,
    ids: Vec<i64>,
    action: ReviewAction,
    reviewer_notes: Option<String>,
) -> Result<BulkOutcome, ServiceError> {
    require_viewer(state)?;
    if !target.accepts(action) {
        return Err(ServiceError::InvalidInput(format!(
            "{action:?} is not a valid action for {target:?}"
        )));
    }
    let reviewer_notes = reviewer_notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty());
    let request = BulkReviewRequest {
        ids: dedupe_positive(ids),
        action,
        reviewer_notes: reviewer_notes.clone(),
    };
    request.validate()?;

    let mut outcome = BulkOutcome {
        target,
        action,
        reviewer_notes,
        processed: Vec::new(),
        failed: Vec::new(),
    };
    let ids = request.ids.clone();
    let reservation = state.claim_untracked(ActionTarget::Review(target))?;
    let response = remote(state, state.api().bulk_review(target, request)).await;
    drop(reservation);

    match response {
        Ok(response) => {
            outcome.processed = response.processed_ids;
            outcome.failed = response
                .failed
                .into_iter()
                .map(|failure| BulkFailure {
                    id: failure.id,
                    error: failure.error.unwrap_or_else(|| "Failed".to_string()),
                })
                .collect();
            info!(
                ?target,
                ?action,
                processed = outcome.processed.len(),
                failed = outcome.failed.len(),
                "bulk review finished"
            );
        }
        Err(err @ ServiceError::Unauthorized(_)) => return Err(err),
        Err(err) => {
            warn!(?target, ?action, error = %err, "bulk review request failed");
            let error = err.user_message();
            outcome.failed = ids
                .into_iter()
                .map(|id| BulkFailure {
                    id,
                    error: error.clone(),
                })
                .collect();
        }
    }
    Ok(outcome)
}

/// Re-post only the ids that failed last time, with the same action and notes.
pub async fn retry_failed_only(
    state: &SharedState,
    previous: &BulkOutcome,
) -> Result<BulkOutcome, ServiceError> {
    let ids = previous.failed_ids();
    if ids.is_empty() {
        return Err(ServiceError::InvalidInput("Nothing to retry".into()));
    }
    bulk_review(
        state,
        previous.target,
        ids,
        previous.action,
        previous.reviewer_notes.clone(),
    )
    .await
}
