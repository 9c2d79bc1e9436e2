//! Web Crate Error

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::error;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] gv_store::error::Error),

    #[error(transparent)]
    Config(#[from] gv_config::error::Error),

    #[error(transparent)]
    TaskJoin(#[from] tokio::task::JoinError),

    /// The resolved path does not name a regular file.
    #[error("File not found")]
    FileNotFound,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        let not_found = match self {
            Error::Store(err) => err.is_not_found(),
            Error::IO(err) => matches!(
                err.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
            ),
            Error::FileNotFound => true,
            Error::Config(_) | Error::TaskJoin(_) => false,
        };
        if not_found {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        error!("Creating API error response for error: {:?}", self);
        let status = self.status();
        let message = if status == StatusCode::NOT_FOUND {
            "Not found"
        } else {
            "Internal server error"
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "status": status.as_u16()
            }
        }));
        (status, body).into_response()
    }
}
