//! Tournament registration, host management and the detail view.

use tracing::{info, warn};
use validator::Validate;

use crate::{
    dao::ranked_api::TournamentCall,
    dto::{
        TournamentId, UserId,
        lobby::RespondAction,
        tournament::{CreateTournamentRequest, InvitePlayersRequest},
    },
    error::ServiceError,
    services::{
        classifier::classify_tournament,
        court_session::{load_tournament, remote},
        render::{TournamentView, render_tournament},
        require_viewer,
        scheduler::{refresh_now, repaint},
    },
    state::{
        ActionTarget, SharedState,
        lifecycle::{TournamentEvent, TournamentLifecycle},
        model::Tournament,
        state_machine::StateMachine,
        transitions::run_transition_with_reload,
    },
};

/// Plan `event` against the freshly loaded tournament, then send `call` if it is allowed.
///
/// Returns the tournament as the backend reports it after the call, when it sends one back.
async fn tournament_action(
    state: &SharedState,
    tournament_id: TournamentId,
    event: impl FnOnce(UserId) -> TournamentEvent,
    call: TournamentCall,
) -> Result<Option<Tournament>, ServiceError> {
    let viewer = require_viewer(state)?;
    let tournament = load_tournament(state, tournament_id).await?;
    let machine = StateMachine::new(TournamentLifecycle::from(&tournament));

    run_transition_with_reload(
        state,
        ActionTarget::Tournament(tournament_id),
        machine,
        event(viewer),
        move || async move {
            let endpoint = call.suffix();
            let response = remote(state, state.api().tournament_call(tournament_id, call)).await?;
            info!(
                tournament_id = %tournament_id,
                endpoint = %endpoint,
                message = response.message.as_deref().unwrap_or(""),
                "tournament updated"
            );
            Ok(response.tournament.map(Tournament::try_from).transpose()?)
        },
    )
    .await
}

pub async fn join(
    state: &SharedState,
    tournament_id: TournamentId,
) -> Result<Option<Tournament>, ServiceError> {
    tournament_action(
        state,
        tournament_id,
        |by| TournamentEvent::Join { by },
        TournamentCall::Join,
    )
    .await
}

/// Answer a tournament invitation. Declining leaves the participant withdrawn.
pub async fn respond_invite(
    state: &SharedState,
    tournament_id: TournamentId,
    action: RespondAction,
) -> Result<Option<Tournament>, ServiceError> {
    tournament_action(
        state,
        tournament_id,
        |by| TournamentEvent::RespondInvite { by, action },
        TournamentCall::Respond(action),
    )
    .await
}

pub async fn check_in(
    state: &SharedState,
    tournament_id: TournamentId,
) -> Result<Option<Tournament>, ServiceError> {
    tournament_action(
        state,
        tournament_id,
        |by| TournamentEvent::CheckIn { by },
        TournamentCall::CheckIn,
    )
    .await
}

pub async fn withdraw(
    state: &SharedState,
    tournament_id: TournamentId,
) -> Result<Option<Tournament>, ServiceError> {
    tournament_action(
        state,
        tournament_id,
        |by| TournamentEvent::Withdraw { by },
        TournamentCall::Withdraw,
    )
    .await
}

/// Invite players (host only). The host and repeated ids are dropped from the list.
pub async fn invite(
    state: &SharedState,
    tournament_id: TournamentId,
    user_ids: Vec<UserId>,
) -> Result<Option<Tournament>, ServiceError> {
    let viewer = require_viewer(state)?;
    let mut invitees: Vec<UserId> = Vec::with_capacity(user_ids.len());
    for user_id in user_ids {
        if user_id != viewer && !invitees.contains(&user_id) {
            invitees.push(user_id);
        }
    }
    let request = InvitePlayersRequest {
        user_ids: invitees.clone(),
    };
    request.validate()?;

    tournament_action(
        state,
        tournament_id,
        move |by| TournamentEvent::Invite {
            by,
            users: invitees,
        },
        TournamentCall::Invite(request),
    )
    .await
}

/// Mark a participant who did not show up (host only, before the tournament starts).
pub async fn mark_no_show(
    state: &SharedState,
    tournament_id: TournamentId,
    user_id: UserId,
) -> Result<Option<Tournament>, ServiceError> {
    tournament_action(
        state,
        tournament_id,
        |by| TournamentEvent::MarkNoShow { by, user: user_id },
        TournamentCall::MarkNoShow(user_id),
    )
    .await
}

/// Start the tournament (host only). Withheld locally until the bracket can be seeded.
pub async fn start(
    state: &SharedState,
    tournament_id: TournamentId,
) -> Result<Option<Tournament>, ServiceError> {
    tournament_action(
        state,
        tournament_id,
        |by| TournamentEvent::Start { by },
        TournamentCall::Start,
    )
    .await
}

pub async fn cancel(
    state: &SharedState,
    tournament_id: TournamentId,
) -> Result<Option<Tournament>, ServiceError> {
    tournament_action(
        state,
        tournament_id,
        |by| TournamentEvent::Cancel { by },
        TournamentCall::Cancel,
    )
    .await
}

/// Create a tournament hosted by the viewer on `request.court_id`.
pub async fn create(
    state: &SharedState,
    request: CreateTournamentRequest,
) -> Result<Tournament, ServiceError> {
    require_viewer(state)?;
    request.validate()?;
    let court_id = request.court_id;
    let reservation = state.claim_untracked(ActionTarget::NewTournament(court_id))?;

    let created = remote(state, state.api().create_tournament(request)).await?;
    let tournament = Tournament::try_from(created)?;
    info!(
        court_id = %court_id,
        tournament_id = %tournament.id,
        name = %tournament.name,
        "tournament created"
    );

    if let Err(err) = refresh_now(state).await {
        warn!(court_id = %court_id, error = %err, "reload after tournament creation failed");
    }
    drop(reservation);
    repaint(state).await;
    Ok(tournament)
}

/// Detail view of one tournament for the current viewer.
pub async fn view(
    state: &SharedState,
    tournament_id: TournamentId,
) -> Result<TournamentView, ServiceError> {
    let tournament = load_tournament(state, tournament_id).await?;
    let actions = classify_tournament(&tournament, state.viewer());
    let busy = state
        .pending_targets()
        .contains(&ActionTarget::Tournament(tournament_id));
    Ok(render_tournament(&tournament, &actions, busy))
}
