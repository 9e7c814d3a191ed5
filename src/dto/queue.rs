use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::dto::common::{CourtId, MatchType, UserId, UserSummary, naive_iso};

/// One player waiting in a court's ranked queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntryDto {
    pub id: i64,
    pub user_id: UserId,
    pub court_id: CourtId,
    pub match_type: MatchType,
    #[serde(default, with = "naive_iso::option")]
    pub joined_at: Option<PrimitiveDateTime>,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueResponse {
    #[serde(default)]
    pub queue: Vec<QueueEntryDto>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct JoinQueueRequest {
    pub court_id: CourtId,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LeaveQueueRequest {
    pub court_id: CourtId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinQueueResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub entry: Option<QueueEntryDto>,
}
