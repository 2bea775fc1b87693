use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    AppError, AppResult, AppState,
    model::TimeSlot,
    store,
    tally::{EventStatus, Tally},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SlotSummary {
    #[serde(flatten)]
    slot: TimeSlot,
    available_count: usize,
    available_users: Vec<String>,
    unavailable_users: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventSummary {
    respondent_count: usize,
    has_consensus: bool,
    status: EventStatus,
    slots: Vec<SlotSummary>,
}

/// Derived consensus view, recomputed from a fresh snapshot on every call.
#[debug_handler(state = AppState)]
pub(crate) async fn summary(
    Path(event_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<EventSummary>> {
    let event_id = event_id.to_string();
    if store::fetch_event(&db_pool, &event_id).await?.is_none() {
        return Err(AppError::NotFound("event"));
    }

    let slots = store::list_slots(&db_pool, &event_id).await?;
    let responses = store::list_responses(&db_pool, &event_id).await?;
    let tally = Tally::from_rows(&responses);

    let slot_summaries = slots
        .iter()
        .map(|slot| SlotSummary {
            available_count: tally.availability_count(&slot.id),
            available_users: tally.available_users(&slot.id),
            unavailable_users: tally.unavailable_users(&slot.id),
            slot: slot.clone(),
        })
        .collect();

    Ok(Json(EventSummary {
        respondent_count: tally.respondent_count(),
        has_consensus: tally.has_consensus(&slots),
        status: tally.status(&slots),
        slots: slot_summaries,
    }))
}
