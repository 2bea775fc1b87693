use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppError, AppResult, AppState,
    model::{Event, PhoneContact, TimeSlot},
    session, store,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewEventQuery {
    name: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    time_slots: Vec<NewTimeSlot>,
    #[serde(default)]
    phone_contacts: Vec<NewPhoneContact>,
}

#[derive(Debug, Deserialize)]
struct NewTimeSlot {
    date: String,
    time: String,
}

#[derive(Debug, Deserialize)]
struct NewPhoneContact {
    number: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatedEvent {
    #[serde(flatten)]
    event: Event,
    time_slots: Vec<TimeSlot>,
    phone_contacts: Vec<PhoneContact>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_event(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(query): Json<NewEventQuery>,
) -> AppResult<Json<CreatedEvent>> {
    let name = query.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("event name is required".to_owned()));
    }

    // Half-filled slot rows from the form are dropped, not rejected.
    let filled: Vec<&NewTimeSlot> = query
        .time_slots
        .iter()
        .filter(|slot| !slot.date.trim().is_empty() && !slot.time.trim().is_empty())
        .collect();
    if filled.is_empty() {
        return Err(AppError::Validation(
            "at least one date and time is required".to_owned(),
        ));
    }

    let creator_id = session::ensure_user_id(&session).await?;
    let event_id = Uuid::now_v7().to_string();
    let event = Event {
        id: event_id.clone(),
        name: name.to_owned(),
        location: query
            .location
            .as_deref()
            .map(str::trim)
            .filter(|location| !location.is_empty())
            .map(str::to_owned),
        creator_id,
    };

    let time_slots: Vec<TimeSlot> = filled
        .iter()
        .map(|slot| TimeSlot {
            id: Uuid::now_v7().to_string(),
            event_id: event_id.clone(),
            date: slot.date.trim().to_owned(),
            time: slot.time.trim().to_owned(),
        })
        .collect();

    let phone_contacts: Vec<PhoneContact> = query
        .phone_contacts
        .iter()
        .filter(|contact| !contact.number.trim().is_empty())
        .map(|contact| PhoneContact {
            id: Uuid::now_v7().to_string(),
            event_id: event_id.clone(),
            number: contact.number.trim().to_owned(),
            name: contact
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned),
        })
        .collect();

    store::create_event(&db_pool, &event, &time_slots, &phone_contacts).await?;
    tracing::info!(event = %event.id, slots = time_slots.len(), "event created");

    Ok(Json(CreatedEvent {
        event,
        time_slots,
        phone_contacts,
    }))
}
