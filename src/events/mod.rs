mod event;
mod new;
mod respond;
mod summary;

use axum::{
    Json, Router, debug_handler,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    AppResult, AppState,
    model::Event,
    store, sync,
    tally::{EventStatus, Tally},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(new::create_event).get(list_events))
        .route("/{event_id}", get(event::event))
        .route("/{event_id}/slots", get(event::list_slots))
        .route("/{event_id}/responses", post(respond::submit_availability))
        .route("/{event_id}/summary", get(summary::summary))
        .route("/{event_id}/ws", get(sync::ws::event_ws))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventListItem {
    #[serde(flatten)]
    event: Event,
    status: EventStatus,
}

/// Compact per-event status line for the sidebar.
#[debug_handler(state = AppState)]
async fn list_events(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<EventListItem>>> {
    let mut items = Vec::new();
    for event in store::list_events(&db_pool).await? {
        let slots = store::list_slots(&db_pool, &event.id).await?;
        let responses = store::list_responses(&db_pool, &event.id).await?;
        let status = Tally::from_rows(&responses).status(&slots);
        items.push(EventListItem { event, status });
    }
    Ok(Json(items))
}
