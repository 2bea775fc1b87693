use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    AppError, AppResult, AppState,
    model::{EventSnapshot, TimeSlot},
    store,
};

/// Full consistent read of one event, including slots, invited contacts,
/// responses and chat backlog.
#[debug_handler(state = AppState)]
pub(crate) async fn event(
    Path(event_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<EventSnapshot>> {
    store::fetch_snapshot(&db_pool, &event_id.to_string())
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("event"))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_slots(
    Path(event_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<TimeSlot>>> {
    let event_id = event_id.to_string();
    if store::fetch_event(&db_pool, &event_id).await?.is_none() {
        return Err(AppError::NotFound("event"));
    }

    Ok(Json(store::list_slots(&db_pool, &event_id).await?))
}
