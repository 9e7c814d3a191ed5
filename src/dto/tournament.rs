use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};
use time::PrimitiveDateTime;
use validator::{Validate, ValidationError};

use crate::dto::{
    common::{CourtId, MatchType, TournamentId, UserId, UserSummary, naive_iso},
    matches::MatchDto,
    validation::validate_future_timestamp,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatusDto {
    Upcoming,
    Live,
    Completed,
    Cancelled,
}

impl TournamentStatusDto {
    /// Value used in the `status` query filter.
    pub fn as_query(self) -> &'static str {
        match self {
            TournamentStatusDto::Upcoming => "upcoming",
            TournamentStatusDto::Live => "live",
            TournamentStatusDto::Completed => "completed",
            TournamentStatusDto::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    Open,
    InviteOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoShowPolicy {
    #[default]
    AutoForfeit,
    HostMark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    #[default]
    None,
    Invited,
    Accepted,
    Declined,
}

/// Registration state of a participant.
///
/// The backend records a declined invitation as `declined`; the client treats it as a
/// withdrawal since both leave the participant out of the bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Invited,
    Registered,
    CheckedIn,
    NoShow,
    Eliminated,
    #[serde(alias = "declined")]
    Withdrawn,
    Winner,
}

impl ParticipantStatus {
    /// Whether the participant currently counts towards the bracket.
    pub fn is_registered(self) -> bool {
        matches!(
            self,
            ParticipantStatus::Registered | ParticipantStatus::CheckedIn
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantDto {
    pub user_id: UserId,
    #[serde(default)]
    pub invited_by_user_id: Option<UserId>,
    #[serde(default)]
    pub invite_status: InviteStatus,
    pub participant_status: ParticipantStatus,
    #[serde(default)]
    pub seed: Option<u32>,
    #[serde(default)]
    pub final_placement: Option<u32>,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub points: i64,
    #[serde(default, with = "naive_iso::option")]
    pub checked_in_at: Option<PrimitiveDateTime>,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BracketDto {
    #[serde(default)]
    pub rounds: Vec<BracketRoundDto>,
    #[serde(default)]
    pub total_matches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketRoundDto {
    pub round: u32,
    #[serde(default)]
    pub matches: Vec<MatchDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentResultDto {
    pub placement: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

/// Tournament payload. List endpoints omit participants, bracket and results.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentDto {
    pub id: TournamentId,
    pub court_id: CourtId,
    pub host_user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TournamentStatusDto,
    #[serde(default)]
    pub access_mode: AccessMode,
    pub match_type: MatchType,
    #[serde(default = "default_true")]
    pub affects_elo: bool,
    #[serde(default, with = "naive_iso::option")]
    pub start_time: Option<PrimitiveDateTime>,
    #[serde(default, with = "naive_iso::option")]
    pub registration_close_time: Option<PrimitiveDateTime>,
    pub max_players: u32,
    pub min_participants: u32,
    #[serde(default)]
    pub check_in_required: bool,
    #[serde(default)]
    pub no_show_policy: NoShowPolicy,
    #[serde(default)]
    pub no_show_grace_minutes: u32,
    #[serde(default)]
    pub bracket_size: Option<u32>,
    #[serde(default)]
    pub total_rounds: Option<u32>,
    #[serde(default)]
    pub registered_count: u32,
    #[serde(default)]
    pub checked_in_count: u32,
    /// Only present on detail loads; court listings leave it out.
    #[serde(default)]
    pub participants: Option<Vec<ParticipantDto>>,
    #[serde(default)]
    pub bracket: Option<BracketDto>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub results: Vec<TournamentResultDto>,
    #[serde(default)]
    pub my_participation: Option<ParticipantDto>,
    #[serde(default)]
    pub host_user: Option<UserSummary>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TournamentsResponse {
    #[serde(default)]
    pub tournaments: Vec<TournamentDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TournamentResponse {
    #[serde(default)]
    pub tournament: Option<TournamentDto>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /api/ranked/tournaments`.
#[derive(Debug, Clone, Serialize, Validate)]
#[validate(schema(function = "validate_participant_bounds"))]
pub struct CreateTournamentRequest {
    pub court_id: CourtId,
    #[validate(length(min = 1, max = 200, message = "Tournament name required"))]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "naive_iso")]
    #[validate(custom(function = "validate_future_timestamp"))]
    pub start_time: PrimitiveDateTime,
    pub access_mode: AccessMode,
    pub no_show_policy: NoShowPolicy,
    #[validate(range(min = 2, max = 128, message = "max_players must be between 2 and 128"))]
    pub max_players: u32,
    #[validate(range(min = 2, message = "min_participants must be between 2 and max_players"))]
    pub min_participants: u32,
    pub check_in_required: bool,
    pub affects_elo: bool,
    #[validate(range(
        max = 180,
        message = "no_show_grace_minutes must be between 0 and 180"
    ))]
    pub no_show_grace_minutes: u32,
    pub invite_user_ids: Vec<UserId>,
}

fn validate_participant_bounds(request: &CreateTournamentRequest) -> Result<(), ValidationError> {
    if request.min_participants > request.max_players {
        let mut err = ValidationError::new("min_participants_bounds");
        err.message = Some("min_participants must be between 2 and max_players".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct InvitePlayersRequest {
    #[validate(length(min = 1, message = "Provide at least one player ID"))]
    pub user_ids: Vec<UserId>,
}
