pub mod chat;
pub mod events;
pub mod model;
pub mod session;
pub mod store;
pub mod sync;
pub mod tally;

mod appresult;

pub use appresult::{AppError, AppResult};

use axum::extract::FromRef;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::sync::Change;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub tx: broadcast::Sender<Change>,
}
