use serde::{Deserialize, Serialize};
use validator::Validate;

/// Which moderation queue a bulk review targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewTarget {
    /// Court update submissions (`approve` / `reject`).
    Updates,
    /// Court reports (`resolve` / `dismiss`).
    Reports,
}

impl ReviewTarget {
    /// Endpoint path, relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            ReviewTarget::Updates => "/api/courts/updates/review/bulk",
            ReviewTarget::Reports => "/api/courts/reports/review/bulk",
        }
    }

    /// Whether `action` is one the backend accepts for this queue.
    pub fn accepts(self, action: ReviewAction) -> bool {
        matches!(
            (self, action),
            (ReviewTarget::Updates, ReviewAction::Approve | ReviewAction::Reject)
                | (ReviewTarget::Reports, ReviewAction::Resolve | ReviewAction::Dismiss)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
    Resolve,
    Dismiss,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct BulkReviewRequest {
    #[validate(length(min = 1, max = 200, message = "Provide between 1 and 200 ids"))]
    pub ids: Vec<i64>,
    pub action: ReviewAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub reviewer_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkReviewResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub processed_count: usize,
    #[serde(default)]
    pub failed_count: usize,
    #[serde(default)]
    pub processed_ids: Vec<i64>,
    #[serde(default)]
    pub failed: Vec<BulkFailureDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BulkFailureDto {
    pub id: i64,
    #[serde(default)]
    pub error: Option<String>,
}
