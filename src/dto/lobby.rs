use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::dto::{
    common::{CourtId, LobbyId, MatchId, MatchType, UserId, UserSummary, naive_iso},
    matches::MatchDto,
    validation::validate_future_timestamp,
};

/// Where a lobby came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbySource {
    Queue,
    CourtChallenge,
    ScheduledChallenge,
    FriendsChallenge,
    LeaderboardChallenge,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyStatusDto {
    PendingAcceptance,
    Ready,
    Started,
    Cancelled,
    Declined,
    Expired,
}

/// Per-player invitation state inside a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceStatus {
    Pending,
    Accepted,
    Declined,
}

/// Challenge lobby payload (`_lobby_to_dict` on the backend).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyDto {
    pub id: LobbyId,
    pub court_id: CourtId,
    #[serde(default)]
    pub created_by_id: Option<UserId>,
    pub match_type: MatchType,
    pub source: LobbySource,
    #[serde(default, with = "naive_iso::option")]
    pub scheduled_for: Option<PrimitiveDateTime>,
    pub status: LobbyStatusDto,
    #[serde(default)]
    pub started_match_id: Option<MatchId>,
    #[serde(default, with = "naive_iso::option")]
    pub created_at: Option<PrimitiveDateTime>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub players: Vec<LobbyPlayerDto>,
    #[serde(default)]
    pub created_by: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyPlayerDto {
    pub user_id: UserId,
    pub team: u8,
    pub acceptance_status: AcceptanceStatus,
    #[serde(default, with = "naive_iso::option")]
    pub responded_at: Option<PrimitiveDateTime>,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

/// `GET /api/ranked/court/{id}/lobbies`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourtLobbiesResponse {
    #[serde(default)]
    pub ready_lobbies: Vec<LobbyDto>,
    #[serde(default)]
    pub scheduled_lobbies: Vec<LobbyDto>,
    #[serde(default)]
    pub pending_lobbies: Vec<LobbyDto>,
}

impl CourtLobbiesResponse {
    /// Flatten the three server-side categories, ready lobbies first.
    pub fn into_all(self) -> Vec<LobbyDto> {
        self.ready_lobbies
            .into_iter()
            .chain(self.scheduled_lobbies)
            .chain(self.pending_lobbies)
            .collect()
    }
}

/// Accept or decline an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RespondAction {
    Accept,
    Decline,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RespondRequest {
    pub action: RespondAction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LobbyResponse {
    pub lobby: LobbyDto,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespondLobbyResponse {
    pub lobby: LobbyDto,
    #[serde(default)]
    pub all_accepted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartLobbyResponse {
    #[serde(rename = "match")]
    pub match_: MatchDto,
    pub lobby: LobbyDto,
}

/// `POST /api/ranked/lobby/queue`: build a game out of queued players.
#[derive(Debug, Clone, Serialize)]
pub struct CreateLobbyRequest {
    pub court_id: CourtId,
    pub match_type: MatchType,
    pub team1: Vec<UserId>,
    pub team2: Vec<UserId>,
    pub start_immediately: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLobbyResponse {
    pub lobby: LobbyDto,
    #[serde(default, rename = "match")]
    pub match_: Option<MatchDto>,
}

/// `POST /api/ranked/challenge/court`.
#[derive(Debug, Clone, Serialize)]
pub struct CourtChallengeRequest {
    pub court_id: CourtId,
    pub match_type: MatchType,
    pub team1: Vec<UserId>,
    pub team2: Vec<UserId>,
}

/// `POST /api/ranked/challenge/scheduled`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct ScheduledChallengeRequest {
    pub court_id: CourtId,
    pub match_type: MatchType,
    pub team1: Vec<UserId>,
    pub team2: Vec<UserId>,
    #[serde(with = "naive_iso")]
    #[validate(custom(function = "validate_future_timestamp"))]
    pub scheduled_for: PrimitiveDateTime,
    pub source: LobbySource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_lobby_categories_in_order() {
        let lobby = |id: i64, status: &str| {
            serde_json::from_value::<LobbyDto>(serde_json::json!({
                "id": id, "court_id": 1, "match_type": "singles",
                "source": "court_challenge", "status": status, "players": []
            }))
            .unwrap()
        };
        let response = CourtLobbiesResponse {
            ready_lobbies: vec![lobby(1, "ready")],
            scheduled_lobbies: vec![lobby(2, "ready")],
            pending_lobbies: vec![lobby(3, "pending_acceptance")],
        };

        let ids: Vec<_> = response.into_all().into_iter().map(|l| l.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn respond_action_serializes_lowercase() {
        let body = serde_json::to_string(&RespondRequest {
            action: RespondAction::Decline,
        })
        .unwrap();
        assert_eq!(body, r#"{"action":"decline"}"#);
    }
}
