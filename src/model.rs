use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// All ids are v7 uuids stored as TEXT; id order is insertion order.

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub creator_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: String,
    pub event_id: String,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PhoneContact {
    pub id: String,
    pub event_id: String,
    pub number: String,
    pub name: Option<String>,
}

/// One availability fact. Logical key is (event_id, time_slot_id, user_name);
/// a missing row means "no opinion", never "unavailable".
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub event_id: String,
    pub time_slot_id: String,
    pub user_name: String,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub event_id: String,
    pub user_name: String,
    pub text: String,
    /// Unix milliseconds; rendering order is (created_at, id).
    pub created_at: i64,
}

/// Consistent full read of one event, as served to clients and used to reseed
/// a subscriber after a resync.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSnapshot {
    pub event: Event,
    pub time_slots: Vec<TimeSlot>,
    pub phone_contacts: Vec<PhoneContact>,
    pub responses: Vec<Response>,
    pub messages: Vec<ChatMessage>,
}
