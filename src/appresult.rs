use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// Bad input; nothing was written.
    Validation(String),
    /// The addressed event does not exist.
    NotFound(&'static str),
    /// The store or another collaborator failed; the caller may retry.
    Transport(anyhow::Error),
    /// The live channel could not be established; fall back to fetching.
    Subscription(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            AppError::Transport(err) => {
                tracing::error!("transport failure: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage unavailable, please retry".to_owned(),
                )
            }
            AppError::Subscription(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        (status, Json(json!({ "error": { "message": message } }))).into_response()
    }
}

macro_rules! transport_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Transport(anyhow::Error::from(err))
            }
        }
    };
}

transport_impl!(sqlx::Error);
transport_impl!(tower_sessions::session::Error);
transport_impl!(axum::Error);
transport_impl!(serde_json::Error);
