/// Sorting of court items into action buckets.
pub mod classifier;
/// All-or-nothing court snapshot loading.
pub mod court_session;
/// Lobby responses, starts and challenges.
pub mod lobby_service;
/// Match creation, scoring and confirmation.
pub mod match_service;
/// Queue presence.
pub mod queue_service;
/// View model and change-only repainting.
pub mod render;
/// Bulk moderation review with per-item outcomes.
pub mod review_service;
/// Periodic refresh loop.
pub mod scheduler;
/// Tournament registration and host management.
pub mod tournament_service;

#[cfg(test)]
pub(crate) mod test_support;

use crate::{dto::UserId, error::ServiceError, state::SharedState};

/// Signed-in viewer, or the error every mutating intent fails with when anonymous.
pub(crate) fn require_viewer(state: &SharedState) -> Result<UserId, ServiceError> {
    state
        .viewer()
        .ok_or_else(|| ServiceError::Unauthorized("sign in to play ranked".into()))
}
