//! Error types of the reqwest-backed API client.

use thiserror::Error;

/// Convenient result alias returning [`HttpApiError`] failures.
pub type HttpResult<T> = Result<T, HttpApiError>;

/// Failures that can occur while talking to the ranked backend over HTTP.
#[derive(Debug, Error)]
pub enum HttpApiError {
    /// Required environment variable is missing.
    #[error("missing API environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or no response arrived.
    #[error("failed to send request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// Response payload could not be parsed into the expected JSON shape.
    #[error("failed to decode response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}
