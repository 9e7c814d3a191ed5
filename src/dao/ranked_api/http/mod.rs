mod client;
mod config;
mod error;

pub use client::HttpRankedApi;
pub use config::ApiConfig;
pub use error::{HttpApiError, HttpResult};

use crate::dao::api::ApiError;

impl From<HttpApiError> for ApiError {
    fn from(err: HttpApiError) -> Self {
        ApiError::transport(err.to_string(), err)
    }
}
