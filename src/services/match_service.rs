use tracing::info;

use crate::{
    dto::{
        CourtId, MatchId, MatchType, UserId,
        lobby::CreateLobbyRequest,
        matches::SubmitScoreRequest,
    },
    error::ServiceError,
    services::{
        court_session::{court_snapshot, remote},
        require_viewer,
    },
    state::{
        ActionTarget, SharedState,
        guards::{Score, parse_score},
        lifecycle::{MatchEvent, MatchLifecycle},
        model::{Lobby, Match},
        state_machine::StateMachine,
        transitions::run_transition_with_reload,
    },
};

/// Result of assembling a game from queued players.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedGame {
    pub lobby: Lobby,
    /// Set when the game was started immediately.
    pub started: Option<Match>,
}

/// Build a game out of queued players, optionally starting it right away.
///
/// Team shape is checked locally; a bad assembly never reaches the backend.
pub async fn create_game(
    state: &SharedState,
    court_id: CourtId,
    match_type: MatchType,
    team1: Vec<UserId>,
    team2: Vec<UserId>,
    start_immediately: bool,
) -> Result<CreatedGame, ServiceError> {
    require_viewer(state)?;
    let event = MatchEvent::CreateMatch {
        match_type,
        team1: team1.clone(),
        team2: team2.clone(),
    };
    let request = CreateLobbyRequest {
        court_id,
        match_type,
        team1,
        team2,
        start_immediately,
    };

    run_transition_with_reload(
        state,
        ActionTarget::NewGame(court_id),
        StateMachine::new(MatchLifecycle::queued()),
        event,
        move || async move {
            let response = remote(state, state.api().create_lobby(request)).await?;
            let lobby = Lobby::try_from(response.lobby)?;
            let started = response.match_.map(Match::try_from).transpose()?;
            info!(
                court_id = %court_id,
                lobby_id = %lobby.id,
                started = started.is_some(),
                "ranked game created"
            );
            Ok(CreatedGame { lobby, started })
        },
    )
    .await
}

/// Match of the open court, from the installed snapshot when there is one.
async fn open_match(state: &SharedState, match_id: MatchId) -> Result<Match, ServiceError> {
    let not_found = || ServiceError::NotFound("Match not found".into());
    let court_id = state.open_court().ok_or_else(not_found)?;
    court_snapshot(state, court_id)
        .await?
        .matches
        .swap_remove(&match_id)
        .ok_or_else(not_found)
}

async fn match_machine(
    state: &SharedState,
    match_id: MatchId,
) -> Result<(UserId, StateMachine<MatchLifecycle>), ServiceError> {
    let viewer = require_viewer(state)?;
    let game = open_match(state, match_id).await?;
    Ok((viewer, StateMachine::new(MatchLifecycle::from(&game))))
}

/// Report the final score; the other players then confirm or reject it.
pub async fn submit_score(
    state: &SharedState,
    match_id: MatchId,
    score: Score,
) -> Result<Match, ServiceError> {
    let (viewer, machine) = match_machine(state, match_id).await?;
    run_transition_with_reload(
        state,
        ActionTarget::Match(match_id),
        machine,
        MatchEvent::SubmitScore { by: viewer, score },
        move || async move {
            let request = SubmitScoreRequest {
                team1_score: score.team1(),
                team2_score: score.team2(),
            };
            let response = remote(state, state.api().submit_score(match_id, request)).await?;
            info!(
                match_id = %match_id,
                team1 = score.team1(),
                team2 = score.team2(),
                "score submitted"
            );
            Ok(Match::try_from(response.match_)?)
        },
    )
    .await
}

/// [`submit_score`] from the two raw input fields.
pub async fn submit_score_input(
    state: &SharedState,
    match_id: MatchId,
    team1: &str,
    team2: &str,
) -> Result<Match, ServiceError> {
    let score = parse_score(team1, team2)?;
    submit_score(state, match_id, score).await
}

pub async fn confirm_score(state: &SharedState, match_id: MatchId) -> Result<Match, ServiceError> {
    let (viewer, machine) = match_machine(state, match_id).await?;
    run_transition_with_reload(
        state,
        ActionTarget::Match(match_id),
        machine,
        MatchEvent::Confirm { by: viewer },
        move || async move {
            let response = remote(state, state.api().confirm_match(match_id)).await?;
            info!(match_id = %match_id, all_confirmed = response.all_confirmed, "score confirmed");
            Ok(Match::try_from(response.match_)?)
        },
    )
    .await
}

/// Dispute the reported score; the match goes back to in progress for a new report.
pub async fn reject_score(state: &SharedState, match_id: MatchId) -> Result<Match, ServiceError> {
    let (viewer, machine) = match_machine(state, match_id).await?;
    run_transition_with_reload(
        state,
        ActionTarget::Match(match_id),
        machine,
        MatchEvent::Reject { by: viewer },
        move || async move {
            let response = remote(state, state.api().reject_match(match_id)).await?;
            info!(match_id = %match_id, "score rejected");
            Ok(Match::try_from(response.match_)?)
        },
    )
    .await
}

pub async fn cancel_match(state: &SharedState, match_id: MatchId) -> Result<Match, ServiceError> {
    let (viewer, machine) = match_machine(state, match_id).await?;
    run_transition_with_reload(
        state,
        ActionTarget::Match(match_id),
        machine,
        MatchEvent::Cancel { by: viewer },
        move || async move {
            let response = remote(state, state.api().cancel_match(match_id)).await?;
            info!(match_id = %match_id, "match cancelled");
            Ok(Match::try_from(response.match_)?)
        },
    )
    .await
}
