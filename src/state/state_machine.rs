use std::{fmt, time::Instant};

use thiserror::Error;
use uuid::Uuid;

use crate::state::guards::GuardViolation;

/// A ranked entity whose state advances through named phases.
///
/// `transition` is pure: it computes the state that applying `event` would produce, or explains
/// why the event is not allowed right now.
pub trait Lifecycle: Clone + fmt::Debug {
    /// Coarse phase used in errors and snapshots.
    type Phase: Clone + fmt::Debug + PartialEq;
    /// Intents that can be applied to the entity.
    type Event: Clone + fmt::Debug + PartialEq;

    /// Current phase of this state.
    fn phase(&self) -> Self::Phase;

    /// Compute the state after `event`.
    fn transition(&self, event: &Self::Event) -> Result<Self, Refusal>;
}

/// Reason a lifecycle refuses an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// The event has no meaning in the current phase.
    Illegal,
    /// The event is meaningful but a local rule blocks it.
    Guard(GuardViolation),
}

impl From<GuardViolation> for Refusal {
    fn from(violation: GuardViolation) -> Self {
        Refusal::Guard(violation)
    }
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition<P: fmt::Debug, E: fmt::Debug> {
    /// The phase the state machine was in when the invalid event was received.
    pub from: P,
    /// The event that cannot be applied from this phase.
    pub event: E,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError<P: fmt::Debug, E: fmt::Debug> {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition<P, E>),
    /// A local rule rejected the transition.
    Guard(GuardViolation),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyError<P> {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch { expected: PlanId, got: PlanId },
    /// State machine phase changed since the plan was created.
    PhaseMismatch { expected: P, actual: P },
    /// State machine version changed since the plan was created.
    VersionMismatch { expected: usize, actual: usize },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch { expected: PlanId, got: PlanId },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan<L: Lifecycle> {
    pub id: PlanId,
    pub from: L::Phase,
    /// State the machine moves to on apply.
    pub to: L,
    pub event: L::Event,
    pub version_next: usize,
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<P> {
    pub phase: P,
    pub version: usize,
    /// Phase a pending plan would move to.
    pub pending: Option<P>,
}

/// Plan/apply/abort driver around one lifecycle value.
///
/// A plan reserves the machine: no second plan is accepted until the first one is applied or
/// aborted, which is what keeps a control disabled while its request is in flight.
#[derive(Debug, Clone)]
pub struct StateMachine<L: Lifecycle> {
    state: L,
    version: usize,
    pending: Option<Plan<L>>,
}

impl<L: Lifecycle> StateMachine<L> {
    pub fn new(state: L) -> Self {
        Self {
            state,
            version: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> &L {
        &self.state
    }

    pub fn phase(&self) -> L::Phase {
        self.state.phase()
    }

    pub fn snapshot(&self) -> Snapshot<L::Phase> {
        Snapshot {
            phase: self.state.phase(),
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to.phase()),
        }
    }

    /// Whether `event` would currently be accepted, without reserving anything.
    pub fn permits(&self, event: &L::Event) -> bool {
        self.pending.is_none() && self.state.transition(event).is_ok()
    }

    /// Validate `event` against the current phase and guards, reserving the machine.
    pub fn plan(&mut self, event: L::Event) -> Result<Plan<L>, PlanError<L::Phase, L::Event>> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self.state.transition(&event).map_err(|refusal| match refusal {
            Refusal::Illegal => PlanError::InvalidTransition(InvalidTransition {
                from: self.state.phase(),
                event: event.clone(),
            }),
            Refusal::Guard(violation) => PlanError::Guard(violation),
        })?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.state.phase(),
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply the pending plan, returning the new state.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<&L, ApplyError<L::Phase>> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected,
                got: plan_id,
            });
        }

        let actual = self.state.phase();
        if actual != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.state = plan.to;
        self.version = plan.version_next;

        Ok(&self.state)
    }

    /// Drop the pending plan, leaving the state untouched.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }
}
