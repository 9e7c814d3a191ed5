//! Loading a court's ranked state in one all-or-nothing round of fetches.

use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::{
    dao::api::ApiResult,
    dto::{CourtId, TournamentId, tournament::TournamentStatusDto},
    error::ServiceError,
    state::{
        SharedState,
        model::Tournament,
        snapshot::{CourtFeeds, CourtSnapshot},
    },
};

/// Fetch every ranked collection of `court_id` and install the result as the court snapshot.
///
/// Any failing call fails the whole load and the previous snapshot stays in place. A 401 signs
/// the viewer out and drops the snapshot. The snapshot is only installed when `court_id` is
/// still the open court once the fetches complete.
pub async fn load_court_session(
    state: &SharedState,
    court_id: CourtId,
) -> Result<CourtSnapshot, ServiceError> {
    let api = state.api();
    let fetched = tokio::try_join!(
        api.queue(court_id),
        api.active_matches(court_id),
        api.pending_matches(),
        api.court_lobbies(court_id),
        api.tournaments(court_id, TournamentStatusDto::Live),
        api.tournaments(court_id, TournamentStatusDto::Upcoming),
        api.tournaments(court_id, TournamentStatusDto::Completed),
    );

    let (queue, active, pending, lobbies, live, upcoming, completed) = match fetched {
        Ok(collections) => collections,
        Err(err) => return Err(handle_failure(state, err.into()).await),
    };

    let snapshot = CourtSnapshot::assemble(
        court_id,
        CourtFeeds {
            queue,
            active,
            pending,
            lobbies,
            live,
            upcoming,
            completed,
        },
    );

    if !state.install_snapshot(snapshot.clone()).await {
        debug!(court_id = %court_id, "court changed during load; discarding snapshot");
    }
    Ok(snapshot)
}

/// Snapshot of `court_id`, loading it when none is installed for that court.
pub(crate) async fn court_snapshot(
    state: &SharedState,
    court_id: CourtId,
) -> Result<CourtSnapshot, ServiceError> {
    match state.snapshot_for(court_id).await {
        Some(snapshot) => Ok(snapshot),
        None => load_court_session(state, court_id).await,
    }
}

/// Detailed tournament: participants, bracket, standings and the viewer's participation.
pub async fn load_tournament(
    state: &SharedState,
    tournament_id: TournamentId,
) -> Result<Tournament, ServiceError> {
    let dto = remote(state, state.api().tournament(tournament_id)).await?;
    Ok(Tournament::try_from(dto)?)
}

/// Await one backend call, applying the sign-out side effect on 401.
pub(crate) async fn remote<T>(
    state: &SharedState,
    request: BoxFuture<'static, ApiResult<T>>,
) -> Result<T, ServiceError> {
    match request.await {
        Ok(value) => Ok(value),
        Err(err) => Err(handle_failure(state, err.into()).await),
    }
}

/// Sign-out side effect applied to every failed backend call.
pub(crate) async fn handle_failure(state: &SharedState, err: ServiceError) -> ServiceError {
    if let ServiceError::Unauthorized(_) = err {
        info!("session rejected by backend; continuing anonymously");
        state.session().clear();
        state.clear_snapshot().await;
    }
    err
}
