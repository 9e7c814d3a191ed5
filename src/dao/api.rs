use std::error::Error;

use serde_json::{Map, Value};
use thiserror::Error;

/// Result alias for remote API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error raised by remote API clients regardless of the transport underneath.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable response: connection failure, undecodable body, missing configuration.
    #[error("unable to load: {message}")]
    Transport {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend answered 401; the stored session has already been cleared.
    #[error("session expired, please sign in again")]
    Unauthorized,
    /// The backend refused the request; `message` is its own wording.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        details: Map<String, Value>,
    },
}

impl ApiError {
    /// Construct a transport error from any client failure.
    pub fn transport(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        ApiError::Transport {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a rejection carrying the service message verbatim.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        ApiError::Rejected {
            status,
            message: message.into(),
            details: Map::new(),
        }
    }

    /// HTTP status of a rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Unauthorized => Some(401),
            ApiError::Transport { .. } => None,
        }
    }
}
