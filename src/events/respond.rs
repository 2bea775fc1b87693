use std::collections::BTreeMap;

use axum::{
    Json, debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{AppError, AppResult, AppState, store, sync::Change};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitAvailabilityQuery {
    user_name: String,
    /// slot id -> available. Slots left out keep the user's earlier answer.
    responses: BTreeMap<String, bool>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn submit_availability(
    Path(event_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<Change>>,
    Json(SubmitAvailabilityQuery {
        user_name,
        responses,
    }): Json<SubmitAvailabilityQuery>,
) -> AppResult<Response> {
    let event_id = event_id.to_string();
    let user_name = user_name.trim();
    if user_name.is_empty() {
        return Err(AppError::Validation("your name is required".to_owned()));
    }
    if responses.is_empty() {
        return Err(AppError::Validation(
            "mark your availability for at least one time slot".to_owned(),
        ));
    }
    if store::fetch_event(&db_pool, &event_id).await?.is_none() {
        return Err(AppError::NotFound("event"));
    }

    let changes = store::submit_responses(&db_pool, &event_id, user_name, &responses).await?;

    // Broadcast only after commit, so feeds observe commit order.
    for change in changes {
        let _ = tx.send(change);
    }
    tracing::debug!(event = %event_id, user = user_name, "availability submitted");

    Ok(().into_response())
}
