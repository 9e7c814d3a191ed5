pub mod guards;
mod in_flight;
pub mod lifecycle;
pub mod model;
pub mod snapshot;
pub mod state_machine;
pub mod transitions;

use std::{collections::HashSet, future::Future, sync::Arc, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{ranked_api::RankedApi, session::SessionStore},
    dto::{CourtId, LobbyId, MatchId, TournamentId, UserId, bulk::ReviewTarget},
    error::{ACTION_IN_PROGRESS, ServiceError},
    services::render::{Paint, ReconcilingRenderer},
};

pub use self::in_flight::{InFlight, InFlightGuard, RefreshScope};
use self::{
    snapshot::CourtSnapshot,
    state_machine::{Lifecycle, Plan, PlanId, StateMachine},
};

pub type SharedState = Arc<AppState>;
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(10);

/// What a user intent acts on; one request per target may be in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionTarget {
    Queue(CourtId),
    NewGame(CourtId),
    Challenge(CourtId),
    Match(MatchId),
    Lobby(LobbyId),
    Tournament(TournamentId),
    NewTournament(CourtId),
    Review(ReviewTarget),
}

/// Reservation of an [`ActionTarget`]; dropping it re-enables the control.
pub struct PendingAction {
    registry: Arc<DashMap<ActionTarget, PlanId>>,
    target: ActionTarget,
    plan_id: PlanId,
}

impl Drop for PendingAction {
    fn drop(&mut self) {
        let plan_id = self.plan_id;
        self.registry
            .remove_if(&self.target, |_, owner| *owner == plan_id);
    }
}

/// Central client state shared by the scheduler and every service.
pub struct AppState {
    api: Arc<dyn RankedApi>,
    session: Arc<dyn SessionStore>,
    open_court: watch::Sender<Option<CourtId>>,
    snapshot: RwLock<Option<CourtSnapshot>>,
    in_flight: InFlight,
    pending_actions: Arc<DashMap<ActionTarget, PlanId>>,
    unread: watch::Sender<usize>,
    renderer: Mutex<ReconcilingRenderer>,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        api: Arc<dyn RankedApi>,
        session: Arc<dyn SessionStore>,
        painter: Box<dyn Paint>,
    ) -> SharedState {
        Self::with_timeout(api, session, painter, Some(DEFAULT_TRANSITION_TIMEOUT))
    }

    pub fn with_timeout(
        api: Arc<dyn RankedApi>,
        session: Arc<dyn SessionStore>,
        painter: Box<dyn Paint>,
        transition_timeout: Option<Duration>,
    ) -> SharedState {
        let (open_court, _rx) = watch::channel(None);
        let (unread, _rx) = watch::channel(0);
        Arc::new(Self {
            api,
            session,
            open_court,
            snapshot: RwLock::new(None),
            in_flight: InFlight::new(),
            pending_actions: Arc::new(DashMap::new()),
            unread,
            renderer: Mutex::new(ReconcilingRenderer::new(painter)),
            transition_timeout,
        })
    }

    pub fn api(&self) -> Arc<dyn RankedApi> {
        self.api.clone()
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Signed-in user, `None` when anonymous.
    pub fn viewer(&self) -> Option<UserId> {
        self.session.viewer()
    }

    pub fn open_court(&self) -> Option<CourtId> {
        *self.open_court.borrow()
    }

    pub fn open_court_watcher(&self) -> watch::Receiver<Option<CourtId>> {
        self.open_court.subscribe()
    }

    /// Switch the open court; the snapshot of the previous court is dropped.
    pub async fn set_open_court(&self, court_id: Option<CourtId>) {
        let changed = self.open_court.send_if_modified(|current| {
            let changed = *current != court_id;
            *current = court_id;
            changed
        });
        if changed {
            self.clear_snapshot().await;
        }
    }

    /// Copy of the installed snapshot.
    pub async fn snapshot(&self) -> Option<CourtSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Installed snapshot if it belongs to `court_id`.
    pub async fn snapshot_for(&self, court_id: CourtId) -> Option<CourtSnapshot> {
        self.snapshot
            .read()
            .await
            .as_ref()
            .filter(|snapshot| snapshot.court_id == court_id)
            .cloned()
    }

    /// Replace the snapshot wholesale, unless the user has moved to another court meanwhile.
    pub(crate) async fn install_snapshot(&self, snapshot: CourtSnapshot) -> bool {
        let mut slot = self.snapshot.write().await;
        if self.open_court() != Some(snapshot.court_id) {
            return false;
        }
        *slot = Some(snapshot);
        true
    }

    pub(crate) async fn clear_snapshot(&self) {
        self.snapshot.write().await.take();
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub fn unread_count(&self) -> usize {
        *self.unread.borrow()
    }

    pub fn unread_watcher(&self) -> watch::Receiver<usize> {
        self.unread.subscribe()
    }

    pub(crate) fn set_unread(&self, count: usize) {
        self.unread.send_if_modified(|current| {
            let changed = *current != count;
            *current = count;
            changed
        });
    }

    pub fn renderer(&self) -> &Mutex<ReconcilingRenderer> {
        &self.renderer
    }

    /// Targets whose controls are disabled because a request is in flight.
    pub fn pending_targets(&self) -> HashSet<ActionTarget> {
        self.pending_actions
            .iter()
            .map(|entry| *entry.key())
            .collect()
    }

    /// Reserve `target` for the request identified by `plan_id`.
    pub fn claim_action(
        &self,
        target: ActionTarget,
        plan_id: PlanId,
    ) -> Result<PendingAction, ServiceError> {
        match self.pending_actions.entry(target) {
            Entry::Occupied(_) => Err(ServiceError::InvalidState(ACTION_IN_PROGRESS.into())),
            Entry::Vacant(slot) => {
                slot.insert(plan_id);
                Ok(PendingAction {
                    registry: self.pending_actions.clone(),
                    target,
                    plan_id,
                })
            }
        }
    }

    /// Reserve `target` for a request that is not driven by a lifecycle.
    pub fn claim_untracked(&self, target: ActionTarget) -> Result<PendingAction, ServiceError> {
        self.claim_action(target, Uuid::new_v4())
    }

    /// Plan `event` on `machine`, run `work` while `target` is reserved, then apply or abort.
    ///
    /// Nothing is sent when planning fails; a second intent on the same target while the first
    /// is in flight fails with "action already in progress".
    pub async fn run_transition<L, F, Fut, T>(
        &self,
        target: ActionTarget,
        machine: StateMachine<L>,
        event: L::Event,
        work: F,
    ) -> Result<(T, L), ServiceError>
    where
        L: Lifecycle,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let (value, next, _reservation) = self
            .run_transition_held(target, machine, event, work)
            .await?;
        Ok((value, next))
    }

    /// Same as [`AppState::run_transition`], but a successful run hands back the reservation so
    /// `target` stays claimed until the caller drops it.
    pub(crate) async fn run_transition_held<L, F, Fut, T>(
        &self,
        target: ActionTarget,
        mut machine: StateMachine<L>,
        event: L::Event,
        work: F,
    ) -> Result<(T, L, PendingAction), ServiceError>
    where
        L: Lifecycle,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let Plan { id: plan_id, .. } = machine.plan(event.clone())?;
        let reservation = self.claim_action(target, plan_id)?;

        let work_future = work();
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(abort_err) = machine.abort(plan_id) {
                        warn!(
                            event = ?event,
                            plan_id = %plan_id,
                            error = ?abort_err,
                            "failed to abort transition after timeout"
                        );
                    }
                    drop(reservation);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let next = machine.apply(plan_id)?.clone();
                Ok((value, next, reservation))
            }
            Err(err) => {
                if let Err(abort_err) = machine.abort(plan_id) {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(reservation);
                Err(err)
            }
        }
    }
}
