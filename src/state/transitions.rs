use std::future::Future;

use tracing::warn;

use crate::{
    error::ServiceError,
    services::scheduler::{refresh_now, repaint},
    state::{
        ActionTarget, SharedState,
        state_machine::{Lifecycle, StateMachine},
    },
};

/// Execute a planned transition, then reload the open court so the view reflects the server.
///
/// `target` stays reserved until the reload has landed, so a follow-up intent plans against the
/// new snapshot. The mutation already succeeded when the reload runs, so a failed reload is
/// logged and the caller still gets the mutation's result.
pub async fn run_transition_with_reload<L, F, Fut, T>(
    state: &SharedState,
    target: ActionTarget,
    machine: StateMachine<L>,
    event: L::Event,
    work: F,
) -> Result<T, ServiceError>
where
    L: Lifecycle,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let (res, _next, reservation) = state
        .run_transition_held(target, machine, event, work)
        .await?;
    if let Err(err) = refresh_now(state).await {
        warn!(target = ?target, error = %err, "reload after mutation failed");
    }
    drop(reservation);
    repaint(state).await;
    Ok(res)
}
