//! In-memory stand-in for the ranked backend, shared by the service tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use serde_json::json;

use crate::dao::{
    api::{ApiError, ApiResult},
    ranked_api::{RankedApi, TournamentCall},
};
use crate::dto::{
    CourtId, LobbyId, MatchId, MatchType, TournamentId, UserId, UserSummary,
    bulk::{BulkReviewRequest, BulkReviewResponse, ReviewTarget},
    common::MessageResponse,
    lobby::{
        AcceptanceStatus, CourtChallengeRequest, CourtLobbiesResponse, CreateLobbyRequest,
        CreateLobbyResponse, LobbyDto, LobbyResponse, LobbySource, LobbyStatusDto, RespondAction,
        RespondLobbyResponse, ScheduledChallengeRequest, StartLobbyResponse,
    },
    matches::{
        ConfirmMatchResponse, MatchDto, MatchResponse, MatchStatusDto, SubmitScoreRequest,
        SubmitScoreResponse,
    },
    notifications::NotificationsResponse,
    queue::{JoinQueueRequest, JoinQueueResponse, LeaveQueueRequest, QueueEntryDto},
    tournament::{CreateTournamentRequest, TournamentDto, TournamentResponse, TournamentStatusDto},
};

/// Forced failure for every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outage {
    Unauthorized,
    Transport,
}

/// Fake backend: serves canned collections, applies simple mutations and counts calls.
pub(crate) struct MockRankedApi {
    pub viewer: Mutex<UserId>,
    pub queue: Mutex<Vec<QueueEntryDto>>,
    pub active: Mutex<Vec<MatchDto>>,
    pub pending: Mutex<Vec<MatchDto>>,
    pub lobbies: Mutex<CourtLobbiesResponse>,
    pub tournaments: Mutex<Vec<TournamentDto>>,
    pub notifications: Mutex<NotificationsResponse>,
    pub profile: Mutex<Option<UserSummary>>,
    pub bulk_response: Mutex<Option<BulkReviewResponse>>,
    pub outage: Mutex<Option<Outage>>,
    pub rejections: Mutex<HashMap<&'static str, (u16, String)>>,
    pub delays: Mutex<HashMap<&'static str, Duration>>,
    pub tournament_calls: Mutex<Vec<(TournamentId, TournamentCall)>>,
    pub bulk_requests: Mutex<Vec<(ReviewTarget, BulkReviewRequest)>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    next_id: AtomicI64,
}

impl Default for MockRankedApi {
    fn default() -> Self {
        Self {
            viewer: Mutex::new(UserId(1)),
            queue: Mutex::default(),
            active: Mutex::default(),
            pending: Mutex::default(),
            lobbies: Mutex::default(),
            tournaments: Mutex::default(),
            notifications: Mutex::default(),
            profile: Mutex::default(),
            bulk_response: Mutex::default(),
            outage: Mutex::default(),
            rejections: Mutex::default(),
            delays: Mutex::default(),
            tournament_calls: Mutex::default(),
            bulk_requests: Mutex::default(),
            calls: Mutex::default(),
            next_id: AtomicI64::new(1_000),
        }
    }
}

pub(crate) fn match_dto(
    id: i64,
    court: i64,
    status: &str,
    players: &[(i64, u8, bool)],
) -> MatchDto {
    serde_json::from_value(json!({
        "id": id, "court_id": court,
        "match_type": if players.len() > 2 { "doubles" } else { "singles" },
        "status": status,
        "team1_score": if status == "in_progress" { None } else { Some(11) },
        "team2_score": if status == "in_progress" { None } else { Some(7) },
        "players": players.iter().map(|(user, team, confirmed)| json!({
            "user_id": user, "team": team, "confirmed": confirmed
        })).collect::<Vec<_>>()
    }))
    .unwrap()
}

pub(crate) fn lobby_dto(
    id: i64,
    court: i64,
    status: &str,
    players: &[(i64, u8, &str)],
    scheduled_for: Option<&str>,
) -> LobbyDto {
    serde_json::from_value(json!({
        "id": id, "court_id": court,
        "match_type": if players.len() > 2 { "doubles" } else { "singles" },
        "source": if scheduled_for.is_some() { "scheduled_challenge" } else { "court_challenge" },
        "status": status, "scheduled_for": scheduled_for,
        "created_by_id": players.first().map(|(user, _, _)| user),
        "players": players.iter().map(|(user, team, acceptance)| json!({
            "user_id": user, "team": team, "acceptance_status": acceptance
        })).collect::<Vec<_>>()
    }))
    .unwrap()
}

pub(crate) fn tournament_dto(id: i64, court: i64, host: i64, status: &str) -> TournamentDto {
    serde_json::from_value(json!({
        "id": id, "court_id": court, "host_user_id": host, "name": format!("Cup {id}"),
        "status": status, "match_type": "singles", "max_players": 8,
        "min_participants": 2, "registered_count": 0
    }))
    .unwrap()
}

impl MockRankedApi {
    pub(crate) fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub(crate) fn reject(&self, method: &'static str, status: u16, message: &str) {
        self.rejections
            .lock()
            .unwrap()
            .insert(method, (status, message.to_string()));
    }

    pub(crate) fn delay(&self, method: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(method, delay);
    }

    pub(crate) fn set_outage(&self, outage: Option<Outage>) {
        *self.outage.lock().unwrap() = outage;
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn viewer(&self) -> UserId {
        *self.viewer.lock().unwrap()
    }

    /// Count the call, then either fail or run `respond` before the configured delay elapses.
    fn serve<T, F>(&self, method: &'static str, respond: F) -> BoxFuture<'static, ApiResult<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> ApiResult<T>,
    {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
        let outcome = match *self.outage.lock().unwrap() {
            Some(Outage::Unauthorized) => Err(ApiError::Unauthorized),
            Some(Outage::Transport) => Err(ApiError::transport(
                format!("{method} failed"),
                std::io::Error::other("connection refused"),
            )),
            None => match self.rejections.lock().unwrap().get(method).cloned() {
                Some((status, message)) => Err(ApiError::rejected(status, message)),
                None => respond(),
            },
        };
        let delay = self.delays.lock().unwrap().get(method).copied();
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        })
    }

    fn find_match(&self, id: MatchId) -> ApiResult<MatchDto> {
        self.active
            .lock()
            .unwrap()
            .iter()
            .chain(self.pending.lock().unwrap().iter())
            .find(|game| game.id == id)
            .cloned()
            .ok_or_else(|| ApiError::rejected(404, "Match not found"))
    }

    fn update_match(&self, id: MatchId, update: impl Fn(&mut MatchDto)) -> ApiResult<MatchDto> {
        let mut active = self.active.lock().unwrap();
        match active.iter_mut().find(|game| game.id == id) {
            Some(game) => {
                update(game);
                Ok(game.clone())
            }
            None => {
                drop(active);
                let mut game = self.find_match(id)?;
                update(&mut game);
                Ok(game)
            }
        }
    }

    /// Mutate a lobby in place, then file it under the category its new status belongs to.
    fn update_lobby(&self, id: LobbyId, update: impl FnOnce(&mut LobbyDto)) -> ApiResult<LobbyDto> {
        let mut lobbies = self.lobbies.lock().unwrap();
        let mut all = std::mem::take(&mut *lobbies).into_all();
        let updated = all.iter_mut().find(|lobby| lobby.id == id).map(|lobby| {
            update(lobby);
            lobby.clone()
        });
        for lobby in all {
            match (lobby.status, lobby.scheduled_for.is_some()) {
                (LobbyStatusDto::Ready, false) => lobbies.ready_lobbies.push(lobby),
                (LobbyStatusDto::Ready, true) => lobbies.scheduled_lobbies.push(lobby),
                (LobbyStatusDto::PendingAcceptance, _) => lobbies.pending_lobbies.push(lobby),
                _ => {}
            }
        }
        updated.ok_or_else(|| ApiError::rejected(404, "Lobby not found"))
    }

    fn find_tournament(&self, id: TournamentId) -> ApiResult<TournamentDto> {
        self.tournaments
            .lock()
            .unwrap()
            .iter()
            .find(|tournament| tournament.id == id)
            .cloned()
            .ok_or_else(|| ApiError::rejected(404, "Tournament not found"))
    }

    fn new_lobby(
        &self,
        court_id: CourtId,
        match_type: MatchType,
        team1: &[UserId],
        team2: &[UserId],
        scheduled_for: Option<String>,
    ) -> LobbyDto {
        let viewer = self.viewer();
        let players: Vec<_> = team1
            .iter()
            .map(|user| (*user, 1))
            .chain(team2.iter().map(|user| (*user, 2)))
            .map(|(user, team)| {
                let acceptance = if user == viewer { "accepted" } else { "pending" };
                json!({"user_id": user, "team": team, "acceptance_status": acceptance})
            })
            .collect();
        let source = if scheduled_for.is_some() {
            "scheduled_challenge"
        } else {
            "court_challenge"
        };
        let lobby: LobbyDto = serde_json::from_value(json!({
            "id": self.next_id(), "court_id": court_id, "match_type": match_type,
            "source": source,
            "status": "pending_acceptance", "scheduled_for": scheduled_for,
            "created_by_id": viewer, "players": players
        }))
        .unwrap();
        self.lobbies
            .lock()
            .unwrap()
            .pending_lobbies
            .push(lobby.clone());
        lobby
    }
}

impl RankedApi for MockRankedApi {
    fn queue(&self, court_id: CourtId) -> BoxFuture<'static, ApiResult<Vec<QueueEntryDto>>> {
        self.serve("queue", || {
            Ok(self
                .queue
                .lock()
                .unwrap()
                .iter()
                .filter(|entry| entry.court_id == court_id)
                .cloned()
                .collect())
        })
    }

    fn active_matches(&self, court_id: CourtId) -> BoxFuture<'static, ApiResult<Vec<MatchDto>>> {
        self.serve("active_matches", || {
            Ok(self
                .active
                .lock()
                .unwrap()
                .iter()
                .filter(|game| game.court_id == court_id)
                .cloned()
                .collect())
        })
    }

    fn pending_matches(&self) -> BoxFuture<'static, ApiResult<Vec<MatchDto>>> {
        self.serve("pending_matches", || Ok(self.pending.lock().unwrap().clone()))
    }

    fn court_lobbies(
        &self,
        court_id: CourtId,
    ) -> BoxFuture<'static, ApiResult<CourtLobbiesResponse>> {
        self.serve("court_lobbies", || {
            let all = self.lobbies.lock().unwrap().clone();
            let on_court = |lobbies: Vec<LobbyDto>| {
                lobbies
                    .into_iter()
                    .filter(|lobby| lobby.court_id == court_id)
                    .collect()
            };
            Ok(CourtLobbiesResponse {
                ready_lobbies: on_court(all.ready_lobbies),
                scheduled_lobbies: on_court(all.scheduled_lobbies),
                pending_lobbies: on_court(all.pending_lobbies),
            })
        })
    }

    fn tournaments(
        &self,
        court_id: CourtId,
        status: TournamentStatusDto,
    ) -> BoxFuture<'static, ApiResult<Vec<TournamentDto>>> {
        self.serve("tournaments", || {
            Ok(self
                .tournaments
                .lock()
                .unwrap()
                .iter()
                .filter(|tournament| {
                    tournament.court_id == court_id && tournament.status == status
                })
                .map(|tournament| TournamentDto {
                    participants: None,
                    my_participation: None,
                    ..tournament.clone()
                })
                .collect())
        })
    }

    fn tournament(&self, id: TournamentId) -> BoxFuture<'static, ApiResult<TournamentDto>> {
        self.serve("tournament", || self.find_tournament(id))
    }

    fn create_tournament(
        &self,
        request: CreateTournamentRequest,
    ) -> BoxFuture<'static, ApiResult<TournamentDto>> {
        self.serve("create_tournament", || {
            let mut tournament = tournament_dto(
                self.next_id(),
                request.court_id.0,
                self.viewer().0,
                "upcoming",
            );
            tournament.name = request.name.clone();
            tournament.max_players = request.max_players;
            tournament.min_participants = request.min_participants;
            tournament.check_in_required = request.check_in_required;
            self.tournaments.lock().unwrap().push(tournament.clone());
            Ok(tournament)
        })
    }

    fn tournament_call(
        &self,
        id: TournamentId,
        call: TournamentCall,
    ) -> BoxFuture<'static, ApiResult<TournamentResponse>> {
        self.serve("tournament_call", || {
            let tournament = self.find_tournament(id)?;
            self.tournament_calls.lock().unwrap().push((id, call));
            Ok(TournamentResponse {
                tournament: Some(tournament),
                message: None,
            })
        })
    }

    fn join_queue(
        &self,
        request: JoinQueueRequest,
    ) -> BoxFuture<'static, ApiResult<JoinQueueResponse>> {
        self.serve("join_queue", || {
            let viewer = self.viewer();
            let mut queue = self.queue.lock().unwrap();
            if queue
                .iter()
                .any(|entry| entry.user_id == viewer && entry.court_id == request.court_id)
            {
                return Err(ApiError::rejected(400, "Already in queue at this court"));
            }
            let entry = QueueEntryDto {
                id: self.next_id(),
                user_id: viewer,
                court_id: request.court_id,
                match_type: request.match_type,
                joined_at: None,
                user: None,
            };
            queue.push(entry.clone());
            Ok(JoinQueueResponse {
                message: Some("Joined queue".into()),
                entry: Some(entry),
            })
        })
    }

    fn leave_queue(
        &self,
        request: LeaveQueueRequest,
    ) -> BoxFuture<'static, ApiResult<MessageResponse>> {
        self.serve("leave_queue", || {
            let viewer = self.viewer();
            let mut queue = self.queue.lock().unwrap();
            let before = queue.len();
            queue.retain(|entry| !(entry.user_id == viewer && entry.court_id == request.court_id));
            if queue.len() == before {
                return Err(ApiError::rejected(404, "Not in queue"));
            }
            Ok(MessageResponse {
                message: Some("Left queue".into()),
            })
        })
    }

    fn create_lobby(
        &self,
        request: CreateLobbyRequest,
    ) -> BoxFuture<'static, ApiResult<CreateLobbyResponse>> {
        self.serve("create_lobby", || {
            let mut lobby = self.new_lobby(
                request.court_id,
                request.match_type,
                &request.team1,
                &request.team2,
                None,
            );
            lobby.source = LobbySource::Queue;
            let mut created = None;
            if request.start_immediately {
                let players: Vec<_> = request
                    .team1
                    .iter()
                    .map(|user| (user.0, 1, false))
                    .chain(request.team2.iter().map(|user| (user.0, 2, false)))
                    .collect();
                let game = match_dto(self.next_id(), request.court_id.0, "in_progress", &players);
                self.active.lock().unwrap().push(game.clone());
                lobby.status = LobbyStatusDto::Started;
                lobby.started_match_id = Some(game.id);
                created = Some(game);
            }
            Ok(CreateLobbyResponse {
                lobby,
                match_: created,
            })
        })
    }

    fn respond_lobby(
        &self,
        id: LobbyId,
        action: RespondAction,
    ) -> BoxFuture<'static, ApiResult<RespondLobbyResponse>> {
        self.serve("respond_lobby", || {
            let viewer = self.viewer();
            let lobby = self.update_lobby(id, |lobby| {
                for player in lobby.players.iter_mut().filter(|p| p.user_id == viewer) {
                    player.acceptance_status = match action {
                        RespondAction::Accept => AcceptanceStatus::Accepted,
                        RespondAction::Decline => AcceptanceStatus::Declined,
                    };
                }
                let statuses = lobby.players.iter().map(|player| player.acceptance_status);
                if statuses.clone().any(|status| status == AcceptanceStatus::Declined) {
                    lobby.status = LobbyStatusDto::Declined;
                } else if statuses.clone().all(|status| status == AcceptanceStatus::Accepted) {
                    lobby.status = LobbyStatusDto::Ready;
                }
            })?;
            let all_accepted = lobby.status == LobbyStatusDto::Ready;
            Ok(RespondLobbyResponse { lobby, all_accepted })
        })
    }

    fn start_lobby(&self, id: LobbyId) -> BoxFuture<'static, ApiResult<StartLobbyResponse>> {
        self.serve("start_lobby", || {
            let game_id = self.next_id();
            let lobby = self.update_lobby(id, |lobby| {
                lobby.status = LobbyStatusDto::Started;
                lobby.started_match_id = Some(MatchId(game_id));
            })?;
            let players: Vec<_> = lobby
                .players
                .iter()
                .map(|player| (player.user_id.0, player.team, false))
                .collect();
            let game = match_dto(game_id, lobby.court_id.0, "in_progress", &players);
            self.active.lock().unwrap().push(game.clone());
            Ok(StartLobbyResponse {
                match_: game,
                lobby,
            })
        })
    }

    fn submit_score(
        &self,
        id: MatchId,
        request: SubmitScoreRequest,
    ) -> BoxFuture<'static, ApiResult<SubmitScoreResponse>> {
        self.serve("submit_score", || {
            let viewer = self.viewer();
            let game = self.update_match(id, |game| {
                game.status = MatchStatusDto::PendingConfirmation;
                game.team1_score = Some(request.team1_score.into());
                game.team2_score = Some(request.team2_score.into());
                game.submitted_by = Some(viewer);
                for player in &mut game.players {
                    player.confirmed = player.user_id == viewer;
                }
            })?;
            Ok(SubmitScoreResponse {
                match_: game,
                pending_confirmation: true,
            })
        })
    }

    fn confirm_match(&self, id: MatchId) -> BoxFuture<'static, ApiResult<ConfirmMatchResponse>> {
        self.serve("confirm_match", || {
            let viewer = self.viewer();
            let game = self.update_match(id, |game| {
                for player in game.players.iter_mut().filter(|p| p.user_id == viewer) {
                    player.confirmed = true;
                }
                if game.players.iter().all(|player| player.confirmed) {
                    game.status = MatchStatusDto::Completed;
                }
            })?;
            Ok(ConfirmMatchResponse {
                all_confirmed: game.status == MatchStatusDto::Completed,
                match_: game,
            })
        })
    }

    fn reject_match(&self, id: MatchId) -> BoxFuture<'static, ApiResult<MatchResponse>> {
        self.serve("reject_match", || {
            let game = self.update_match(id, |game| {
                game.status = MatchStatusDto::InProgress;
                game.team1_score = None;
                game.team2_score = None;
                for player in &mut game.players {
                    player.confirmed = false;
                }
            })?;
            Ok(MatchResponse {
                match_: game,
                message: None,
            })
        })
    }

    fn cancel_match(&self, id: MatchId) -> BoxFuture<'static, ApiResult<MatchResponse>> {
        self.serve("cancel_match", || {
            let game = self.update_match(id, |game| game.status = MatchStatusDto::Cancelled)?;
            Ok(MatchResponse {
                match_: game,
                message: None,
            })
        })
    }

    fn court_challenge(
        &self,
        request: CourtChallengeRequest,
    ) -> BoxFuture<'static, ApiResult<LobbyResponse>> {
        self.serve("court_challenge", || {
            let lobby = self.new_lobby(
                request.court_id,
                request.match_type,
                &request.team1,
                &request.team2,
                None,
            );
            Ok(LobbyResponse { lobby })
        })
    }

    fn scheduled_challenge(
        &self,
        request: ScheduledChallengeRequest,
    ) -> BoxFuture<'static, ApiResult<LobbyResponse>> {
        self.serve("scheduled_challenge", || {
            let lobby = self.new_lobby(
                request.court_id,
                request.match_type,
                &request.team1,
                &request.team2,
                Some(crate::dto::common::naive_iso::format(&request.scheduled_for)),
            );
            Ok(LobbyResponse { lobby })
        })
    }

    fn notifications(&self) -> BoxFuture<'static, ApiResult<NotificationsResponse>> {
        self.serve("notifications", || {
            Ok(self.notifications.lock().unwrap().clone())
        })
    }

    fn profile(&self) -> BoxFuture<'static, ApiResult<UserSummary>> {
        self.serve("profile", || {
            self.profile
                .lock()
                .unwrap()
                .clone()
                .ok_or(ApiError::Unauthorized)
        })
    }

    fn bulk_review(
        &self,
        target: ReviewTarget,
        request: BulkReviewRequest,
    ) -> BoxFuture<'static, ApiResult<BulkReviewResponse>> {
        self.serve("bulk_review", || {
            let processed = request.ids.clone();
            self.bulk_requests.lock().unwrap().push((target, request));
            Ok(self
                .bulk_response
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| BulkReviewResponse {
                    message: None,
                    processed_count: processed.len(),
                    failed_count: 0,
                    processed_ids: processed,
                    failed: Vec::new(),
                }))
        })
    }
}
