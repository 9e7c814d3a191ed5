#[cfg(feature = "http-api")]
pub mod http;

use futures::future::BoxFuture;

use crate::dao::api::ApiResult;
use crate::dto::{
    CourtId, LobbyId, MatchId, TournamentId, UserId, UserSummary,
    bulk::{BulkReviewRequest, BulkReviewResponse, ReviewTarget},
    common::MessageResponse,
    lobby::{
        CourtChallengeRequest, CourtLobbiesResponse, CreateLobbyRequest, CreateLobbyResponse,
        LobbyResponse, RespondAction, RespondLobbyResponse, ScheduledChallengeRequest,
        StartLobbyResponse,
    },
    matches::{
        ConfirmMatchResponse, MatchDto, MatchResponse, SubmitScoreRequest, SubmitScoreResponse,
    },
    notifications::NotificationsResponse,
    queue::{JoinQueueRequest, JoinQueueResponse, LeaveQueueRequest, QueueEntryDto},
    tournament::{
        CreateTournamentRequest, InvitePlayersRequest, TournamentDto, TournamentResponse,
        TournamentStatusDto,
    },
};

/// Mutating tournament endpoints sharing the `/tournaments/{id}/...` prefix.
#[derive(Debug, Clone, PartialEq)]
pub enum TournamentCall {
    Join,
    Respond(RespondAction),
    CheckIn,
    Withdraw,
    Cancel,
    Start,
    Invite(InvitePlayersRequest),
    MarkNoShow(UserId),
}

impl TournamentCall {
    /// Path below `/api/ranked/tournaments/{id}`.
    pub fn suffix(&self) -> String {
        match self {
            TournamentCall::Join => "join".into(),
            TournamentCall::Respond(_) => "respond".into(),
            TournamentCall::CheckIn => "check-in".into(),
            TournamentCall::Withdraw => "withdraw".into(),
            TournamentCall::Cancel => "cancel".into(),
            TournamentCall::Start => "start".into(),
            TournamentCall::Invite(_) => "invite".into(),
            TournamentCall::MarkNoShow(user_id) => format!("participants/{user_id}/no-show"),
        }
    }
}

/// The remote ranked-play backend.
///
/// Every call returns a `'static` future so implementations can be shared behind an `Arc`.
pub trait RankedApi: Send + Sync {
    fn queue(&self, court_id: CourtId) -> BoxFuture<'static, ApiResult<Vec<QueueEntryDto>>>;
    fn active_matches(&self, court_id: CourtId) -> BoxFuture<'static, ApiResult<Vec<MatchDto>>>;
    /// Matches awaiting the viewer's confirmation, across all courts.
    fn pending_matches(&self) -> BoxFuture<'static, ApiResult<Vec<MatchDto>>>;
    fn court_lobbies(&self, court_id: CourtId)
    -> BoxFuture<'static, ApiResult<CourtLobbiesResponse>>;
    fn tournaments(
        &self,
        court_id: CourtId,
        status: TournamentStatusDto,
    ) -> BoxFuture<'static, ApiResult<Vec<TournamentDto>>>;
    fn tournament(&self, id: TournamentId) -> BoxFuture<'static, ApiResult<TournamentDto>>;
    fn create_tournament(
        &self,
        request: CreateTournamentRequest,
    ) -> BoxFuture<'static, ApiResult<TournamentDto>>;
    fn tournament_call(
        &self,
        id: TournamentId,
        call: TournamentCall,
    ) -> BoxFuture<'static, ApiResult<TournamentResponse>>;

    fn join_queue(
        &self,
        request: JoinQueueRequest,
    ) -> BoxFuture<'static, ApiResult<JoinQueueResponse>>;
    fn leave_queue(
        &self,
        request: LeaveQueueRequest,
    ) -> BoxFuture<'static, ApiResult<MessageResponse>>;
    fn create_lobby(
        &self,
        request: CreateLobbyRequest,
    ) -> BoxFuture<'static, ApiResult<CreateLobbyResponse>>;
    fn respond_lobby(
        &self,
        id: LobbyId,
        action: RespondAction,
    ) -> BoxFuture<'static, ApiResult<RespondLobbyResponse>>;
    fn start_lobby(&self, id: LobbyId) -> BoxFuture<'static, ApiResult<StartLobbyResponse>>;

    fn submit_score(
        &self,
        id: MatchId,
        request: SubmitScoreRequest,
    ) -> BoxFuture<'static, ApiResult<SubmitScoreResponse>>;
    fn confirm_match(&self, id: MatchId) -> BoxFuture<'static, ApiResult<ConfirmMatchResponse>>;
    fn reject_match(&self, id: MatchId) -> BoxFuture<'static, ApiResult<MatchResponse>>;
    fn cancel_match(&self, id: MatchId) -> BoxFuture<'static, ApiResult<MatchResponse>>;

    fn court_challenge(
        &self,
        request: CourtChallengeRequest,
    ) -> BoxFuture<'static, ApiResult<LobbyResponse>>;
    fn scheduled_challenge(
        &self,
        request: ScheduledChallengeRequest,
    ) -> BoxFuture<'static, ApiResult<LobbyResponse>>;

    fn notifications(&self) -> BoxFuture<'static, ApiResult<NotificationsResponse>>;
    /// Profile of the signed-in user, used to resolve the viewer from a bare token.
    fn profile(&self) -> BoxFuture<'static, ApiResult<UserSummary>>;
    fn bulk_review(
        &self,
        target: ReviewTarget,
        request: BulkReviewRequest,
    ) -> BoxFuture<'static, ApiResult<BulkReviewResponse>>;
}
