use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};
use time::PrimitiveDateTime;

use crate::dto::common::{
    CourtId, CourtSummary, MatchId, MatchType, TournamentId, UserId, UserSummary, naive_iso,
};

/// Match status exactly as the backend spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatusDto {
    InProgress,
    PendingConfirmation,
    Completed,
    Cancelled,
}

/// Ranked match payload (`Match.to_dict()` on the backend).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDto {
    pub id: MatchId,
    pub court_id: CourtId,
    #[serde(default)]
    pub tournament_id: Option<TournamentId>,
    #[serde(default)]
    pub bracket_round: Option<u32>,
    #[serde(default)]
    pub bracket_slot: Option<u32>,
    pub match_type: MatchType,
    pub status: MatchStatusDto,
    #[serde(default)]
    pub team1_score: Option<i64>,
    #[serde(default)]
    pub team2_score: Option<i64>,
    #[serde(default)]
    pub winner_team: Option<u8>,
    #[serde(default)]
    pub submitted_by: Option<UserId>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub players: Vec<MatchPlayerDto>,
    #[serde(default)]
    pub court: Option<CourtSummary>,
    #[serde(default, with = "naive_iso::option")]
    pub created_at: Option<PrimitiveDateTime>,
    #[serde(default, with = "naive_iso::option")]
    pub completed_at: Option<PrimitiveDateTime>,
}

/// Per-player row of a match, including confirmation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPlayerDto {
    pub user_id: UserId,
    pub team: u8,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub elo_before: Option<f64>,
    #[serde(default)]
    pub elo_after: Option<f64>,
    #[serde(default)]
    pub elo_change: Option<f64>,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchesResponse {
    #[serde(default)]
    pub matches: Vec<MatchDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchResponse {
    #[serde(rename = "match")]
    pub match_: MatchDto,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `POST /match/{id}/score`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitScoreResponse {
    #[serde(rename = "match")]
    pub match_: MatchDto,
    #[serde(default)]
    pub pending_confirmation: bool,
}

/// Response of `POST /match/{id}/confirm`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmMatchResponse {
    #[serde(rename = "match")]
    pub match_: MatchDto,
    #[serde(default)]
    pub all_confirmed: bool,
}

/// Body of `POST /match/{id}/score`; built from a validated score only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmitScoreRequest {
    pub team1_score: u8,
    pub team2_score: u8,
}
