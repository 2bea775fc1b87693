use std::collections::{BTreeMap, HashSet};

use sqlx::SqlitePool;

use crate::{
    AppError, AppResult,
    model::{ChatMessage, Event, EventSnapshot, PhoneContact, Response, TimeSlot},
    sync::Change,
};

const SCHEMA: &str = include_str!("../schema.sql");

pub async fn init_schema(db_pool: &SqlitePool) -> AppResult<()> {
    sqlx::raw_sql(SCHEMA).execute(db_pool).await?;
    Ok(())
}

pub fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub async fn create_event(
    db_pool: &SqlitePool,
    event: &Event,
    slots: &[TimeSlot],
    contacts: &[PhoneContact],
) -> AppResult<()> {
    let mut tx = db_pool.begin().await?;

    sqlx::query("INSERT INTO events (id,name,location,creator_id) VALUES (?,?,?,?)")
        .bind(&event.id)
        .bind(&event.name)
        .bind(&event.location)
        .bind(&event.creator_id)
        .execute(&mut *tx)
        .await?;

    for slot in slots {
        sqlx::query("INSERT INTO time_slots (id,event_id,date,time) VALUES (?,?,?,?)")
            .bind(&slot.id)
            .bind(&slot.event_id)
            .bind(&slot.date)
            .bind(&slot.time)
            .execute(&mut *tx)
            .await?;
    }

    for contact in contacts {
        sqlx::query("INSERT INTO phone_contacts (id,event_id,number,name) VALUES (?,?,?,?)")
            .bind(&contact.id)
            .bind(&contact.event_id)
            .bind(&contact.number)
            .bind(&contact.name)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn fetch_event(db_pool: &SqlitePool, event_id: &str) -> AppResult<Option<Event>> {
    Ok(
        sqlx::query_as::<_, Event>("SELECT id,name,location,creator_id FROM events WHERE id=?")
            .bind(event_id)
            .fetch_optional(db_pool)
            .await?,
    )
}

pub async fn list_events(db_pool: &SqlitePool) -> AppResult<Vec<Event>> {
    Ok(
        sqlx::query_as::<_, Event>("SELECT id,name,location,creator_id FROM events ORDER BY id")
            .fetch_all(db_pool)
            .await?,
    )
}

pub async fn list_slots(db_pool: &SqlitePool, event_id: &str) -> AppResult<Vec<TimeSlot>> {
    Ok(sqlx::query_as::<_, TimeSlot>(
        "SELECT id,event_id,date,time FROM time_slots WHERE event_id=? ORDER BY id",
    )
    .bind(event_id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn list_responses(db_pool: &SqlitePool, event_id: &str) -> AppResult<Vec<Response>> {
    Ok(sqlx::query_as::<_, Response>(
        "SELECT event_id,time_slot_id,user_name,is_available FROM responses WHERE event_id=?",
    )
    .bind(event_id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn list_messages(db_pool: &SqlitePool, event_id: &str) -> AppResult<Vec<ChatMessage>> {
    Ok(sqlx::query_as::<_, ChatMessage>(
        "SELECT id,event_id,user_name,text,created_at FROM messages \
         WHERE event_id=? ORDER BY created_at,id",
    )
    .bind(event_id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn insert_message(db_pool: &SqlitePool, message: &ChatMessage) -> AppResult<()> {
    sqlx::query("INSERT INTO messages (id,event_id,user_name,text,created_at) VALUES (?,?,?,?,?)")
        .bind(&message.id)
        .bind(&message.event_id)
        .bind(&message.user_name)
        .bind(&message.text)
        .bind(message.created_at)
        .execute(db_pool)
        .await?;
    Ok(())
}

pub async fn fetch_snapshot(
    db_pool: &SqlitePool,
    event_id: &str,
) -> AppResult<Option<EventSnapshot>> {
    let Some(event) = fetch_event(db_pool, event_id).await? else {
        return Ok(None);
    };

    Ok(Some(EventSnapshot {
        time_slots: list_slots(db_pool, event_id).await?,
        phone_contacts: list_contacts(db_pool, event_id).await?,
        responses: list_responses(db_pool, event_id).await?,
        messages: list_messages(db_pool, event_id).await?,
        event,
    }))
}

pub async fn list_contacts(db_pool: &SqlitePool, event_id: &str) -> AppResult<Vec<PhoneContact>> {
    Ok(sqlx::query_as::<_, PhoneContact>(
        "SELECT id,event_id,number,name FROM phone_contacts WHERE event_id=? ORDER BY id",
    )
    .bind(event_id)
    .fetch_all(db_pool)
    .await?)
}

/// Upsert one user's answers in a single transaction. Only the slot ids present
/// in the map are touched; earlier answers for other slots survive (merge, not
/// replace). Returns the committed rows as change events, for broadcast after
/// commit.
pub async fn submit_responses(
    db_pool: &SqlitePool,
    event_id: &str,
    user_name: &str,
    answers: &BTreeMap<String, bool>,
) -> AppResult<Vec<Change>> {
    let known: HashSet<String> = list_slots(db_pool, event_id)
        .await?
        .into_iter()
        .map(|slot| slot.id)
        .collect();
    for slot_id in answers.keys() {
        if !known.contains(slot_id) {
            return Err(AppError::Validation(format!(
                "time slot {slot_id} does not belong to this event"
            )));
        }
    }

    let mut tx = db_pool.begin().await?;
    for (slot_id, is_available) in answers {
        sqlx::query(
            "INSERT INTO responses (event_id,time_slot_id,user_name,is_available) VALUES (?,?,?,?) \
             ON CONFLICT(event_id,time_slot_id,user_name) DO UPDATE SET is_available=excluded.is_available",
        )
        .bind(event_id)
        .bind(slot_id)
        .bind(user_name)
        .bind(is_available)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(answers
        .iter()
        .map(|(slot_id, is_available)| Change::Response {
            event_id: event_id.to_owned(),
            time_slot_id: slot_id.clone(),
            user_name: user_name.to_owned(),
            is_available: *is_available,
        })
        .collect())
}
