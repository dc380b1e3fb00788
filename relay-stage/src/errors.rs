use crate::relay::RelayError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that stop a stage process. Request-scoped failures never become one of these.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not build relay client: {0}")]
    RelayClient(#[from] reqwest::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors answered to the caller of a single request.
#[derive(thiserror::Error, Debug)]
pub enum StageApiError {
    #[error("invalid request body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("value {0} is out of range")]
    ValueOutOfRange(i64),

    #[error("{0}")]
    Relay(#[from] RelayError),
}

impl StageApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            StageApiError::Decode(_) | StageApiError::ValueOutOfRange(_) => StatusCode::BAD_REQUEST,
            StageApiError::Relay(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for StageApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
