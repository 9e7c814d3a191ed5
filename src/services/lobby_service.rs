//! Challenge lobbies: issuing challenges, answering invitations and starting ready games.

use time::PrimitiveDateTime;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{
        CourtId, LobbyId, MatchType, UserId,
        common::utc_now,
        lobby::{CourtChallengeRequest, LobbySource, RespondAction, ScheduledChallengeRequest},
    },
    error::ServiceError,
    services::{
        court_session::{court_snapshot, remote},
        require_viewer,
    },
    state::{
        ActionTarget, SharedState,
        guards::check_schedule,
        lifecycle::{LobbyEvent, LobbyLifecycle, MatchEvent, MatchLifecycle},
        model::{Lobby, Match},
        state_machine::StateMachine,
        transitions::run_transition_with_reload,
    },
};

async fn open_lobby(state: &SharedState, lobby_id: LobbyId) -> Result<Lobby, ServiceError> {
    let not_found = || ServiceError::NotFound("Lobby not found".into());
    let court_id = state.open_court().ok_or_else(not_found)?;
    court_snapshot(state, court_id)
        .await?
        .lobbies
        .swap_remove(&lobby_id)
        .ok_or_else(not_found)
}

async fn lobby_machine(
    state: &SharedState,
    lobby_id: LobbyId,
) -> Result<(UserId, StateMachine<LobbyLifecycle>), ServiceError> {
    let viewer = require_viewer(state)?;
    let lobby = open_lobby(state, lobby_id).await?;
    Ok((viewer, StateMachine::new(LobbyLifecycle::from(&lobby))))
}

/// Accept or decline a challenge invitation. A decline voids the lobby for everyone.
pub async fn respond(
    state: &SharedState,
    lobby_id: LobbyId,
    action: RespondAction,
) -> Result<Lobby, ServiceError> {
    let (viewer, machine) = lobby_machine(state, lobby_id).await?;
    run_transition_with_reload(
        state,
        ActionTarget::Lobby(lobby_id),
        machine,
        LobbyEvent::Respond { by: viewer, action },
        move || async move {
            let response = remote(state, state.api().respond_lobby(lobby_id, action)).await?;
            info!(
                lobby_id = %lobby_id,
                ?action,
                all_accepted = response.all_accepted,
                "challenge answered"
            );
            Ok(Lobby::try_from(response.lobby)?)
        },
    )
    .await
}

/// Start a ready lobby; scheduled lobbies only once their time has come.
pub async fn start(state: &SharedState, lobby_id: LobbyId) -> Result<Match, ServiceError> {
    let (viewer, machine) = lobby_machine(state, lobby_id).await?;
    run_transition_with_reload(
        state,
        ActionTarget::Lobby(lobby_id),
        machine,
        LobbyEvent::Start {
            by: viewer,
            at: utc_now(),
        },
        move || async move {
            let response = remote(state, state.api().start_lobby(lobby_id)).await?;
            let game = Match::try_from(response.match_)?;
            info!(lobby_id = %lobby_id, match_id = %game.id, "challenge started");
            Ok(game)
        },
    )
    .await
}

fn challenge_event(match_type: MatchType, team1: &[UserId], team2: &[UserId]) -> MatchEvent {
    MatchEvent::CreateMatch {
        match_type,
        team1: team1.to_vec(),
        team2: team2.to_vec(),
    }
}

/// Challenge players present at the court; every invitee has to accept first.
pub async fn court_challenge(
    state: &SharedState,
    court_id: CourtId,
    match_type: MatchType,
    team1: Vec<UserId>,
    team2: Vec<UserId>,
) -> Result<Lobby, ServiceError> {
    require_viewer(state)?;
    let event = challenge_event(match_type, &team1, &team2);
    let request = CourtChallengeRequest {
        court_id,
        match_type,
        team1,
        team2,
    };

    run_transition_with_reload(
        state,
        ActionTarget::Challenge(court_id),
        StateMachine::new(MatchLifecycle::queued()),
        event,
        move || async move {
            let response = remote(state, state.api().court_challenge(request)).await?;
            let lobby = Lobby::try_from(response.lobby)?;
            info!(court_id = %court_id, lobby_id = %lobby.id, "court challenge sent");
            Ok(lobby)
        },
    )
    .await
}

/// Challenge for a future time slot. The time must lie ahead of now.
pub async fn scheduled_challenge(
    state: &SharedState,
    court_id: CourtId,
    match_type: MatchType,
    team1: Vec<UserId>,
    team2: Vec<UserId>,
    scheduled_for: PrimitiveDateTime,
) -> Result<Lobby, ServiceError> {
    require_viewer(state)?;
    check_schedule(scheduled_for, utc_now())?;
    let event = challenge_event(match_type, &team1, &team2);
    let request = ScheduledChallengeRequest {
        court_id,
        match_type,
        team1,
        team2,
        scheduled_for,
        source: LobbySource::ScheduledChallenge,
    };
    request.validate()?;

    run_transition_with_reload(
        state,
        ActionTarget::Challenge(court_id),
        StateMachine::new(MatchLifecycle::queued()),
        event,
        move || async move {
            let response = remote(state, state.api().scheduled_challenge(request)).await?;
            let lobby = Lobby::try_from(response.lobby)?;
            info!(
                court_id = %court_id,
                lobby_id = %lobby.id,
                scheduled_for = %scheduled_for,
                "scheduled challenge sent"
            );
            Ok(lobby)
        },
    )
    .await
}
