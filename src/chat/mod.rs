mod msg;

pub use msg::{SendMessageQuery, send_msg};

use axum::{Router, routing::get};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{event_id}/messages",
        get(msg::list_messages).post(msg::send_message),
    )
}
