use std::fmt;

use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::api::ApiError,
    state::{
        guards::GuardViolation,
        model::ModelError,
        state_machine::{AbortError, ApplyError, PlanError},
    },
};

/// Message shown when the same control is used again before its request finished.
pub const ACTION_IN_PROGRESS: &str = "action already in progress";

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The backend could not be reached or answered with something unreadable.
    #[error("unable to load")]
    Unavailable(#[source] ApiError),
    /// The session expired; the viewer is anonymous until signing in again.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Input rejected locally, before any request was sent.
    #[error("{0}")]
    InvalidInput(String),
    /// The backend refused the request; the message is its own wording.
    #[error("{0}")]
    Rejected(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl ServiceError {
    /// Message suitable for an inline error next to the control that failed.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::InvalidInput(message)
            | ServiceError::Rejected(message)
            | ServiceError::NotFound(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ApiError> for ServiceError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => {
                ServiceError::Unauthorized("session expired, please sign in again".into())
            }
            ApiError::Rejected {
                status: 404,
                message,
                ..
            } => ServiceError::NotFound(message),
            ApiError::Rejected { message, .. } => ServiceError::Rejected(message),
            transport @ ApiError::Transport { .. } => ServiceError::Unavailable(transport),
        }
    }
}

impl From<GuardViolation> for ServiceError {
    fn from(violation: GuardViolation) -> Self {
        ServiceError::InvalidInput(violation.to_string())
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        // first human-readable message; schema-level errors are listed under `__all__`
        let message = err
            .field_errors()
            .into_values()
            .flatten()
            .find_map(|error| error.message.as_ref().map(|message| message.to_string()));
        ServiceError::InvalidInput(message.unwrap_or_else(|| format!("validation failed: {err}")))
    }
}

impl<P: fmt::Debug, E: fmt::Debug> From<PlanError<P, E>> for ServiceError {
    fn from(err: PlanError<P, E>) -> Self {
        match err {
            PlanError::AlreadyPending => ServiceError::InvalidState(ACTION_IN_PROGRESS.into()),
            PlanError::InvalidTransition(invalid) => {
                ServiceError::InvalidState(invalid.to_string())
            }
            PlanError::Guard(violation) => violation.into(),
        }
    }
}

impl<P: fmt::Debug> From<ApplyError<P>> for ServiceError {
    fn from(err: ApplyError<P>) -> Self {
        match err {
            ApplyError::NoPending => ServiceError::InvalidState("no transition is pending".into()),
            ApplyError::IdMismatch { .. } => {
                ServiceError::InvalidState("pending transition does not match".into())
            }
            ApplyError::PhaseMismatch { expected, actual } => ServiceError::InvalidState(format!(
                "state changed during transition (expected {expected:?}, got {actual:?})"
            )),
            ApplyError::VersionMismatch { expected, actual } => {
                ServiceError::InvalidState(format!(
                    "state version mismatch during transition (expected {expected}, got {actual})"
                ))
            }
        }
    }
}

impl From<AbortError> for ServiceError {
    fn from(err: AbortError) -> Self {
        match err {
            AbortError::NoPending => ServiceError::InvalidState("no pending transition".into()),
            AbortError::IdMismatch { .. } => {
                ServiceError::InvalidState("transition plan does not match".into())
            }
        }
    }
}
