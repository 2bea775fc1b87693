use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{AppError, AppResult, AppState, model::ChatMessage, store, sync::Change};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageQuery {
    pub user_name: String,
    pub text: String,
}

/// Append one message and broadcast it. Shared by the HTTP handler and the
/// websocket receive loop. Blank name or text is rejected before any write.
pub async fn send_msg(
    db_pool: &SqlitePool,
    tx: &broadcast::Sender<Change>,
    event_id: &str,
    SendMessageQuery { user_name, text }: SendMessageQuery,
) -> AppResult<ChatMessage> {
    let user_name = user_name.trim();
    let text = text.trim();
    if user_name.is_empty() {
        return Err(AppError::Validation("display name is required".to_owned()));
    }
    if text.is_empty() {
        return Err(AppError::Validation("message text is required".to_owned()));
    }

    let message = ChatMessage {
        id: Uuid::now_v7().to_string(),
        event_id: event_id.to_owned(),
        user_name: user_name.to_owned(),
        text: text.to_owned(),
        created_at: store::now_millis(),
    };
    store::insert_message(db_pool, &message).await?;

    let _ = tx.send(Change::Message {
        event_id: event_id.to_owned(),
        message: message.clone(),
    });

    Ok(message)
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_message(
    Path(event_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<Change>>,
    Json(query): Json<SendMessageQuery>,
) -> AppResult<Json<ChatMessage>> {
    let event_id = event_id.to_string();
    if store::fetch_event(&db_pool, &event_id).await?.is_none() {
        return Err(AppError::NotFound("event"));
    }

    Ok(Json(send_msg(&db_pool, &tx, &event_id, query).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_messages(
    Path(event_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    let event_id = event_id.to_string();
    if store::fetch_event(&db_pool, &event_id).await?.is_none() {
        return Err(AppError::NotFound("event"));
    }

    Ok(Json(store::list_messages(&db_pool, &event_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Event;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool_with_event() -> (SqlitePool, String) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        store::init_schema(&pool).await.unwrap();

        let event = Event {
            id: Uuid::now_v7().to_string(),
            name: "Brunch".to_owned(),
            location: None,
            creator_id: "creator".to_owned(),
        };
        store::create_event(&pool, &event, &[], &[]).await.unwrap();
        (pool, event.id)
    }

    fn query(user_name: &str, text: &str) -> SendMessageQuery {
        SendMessageQuery {
            user_name: user_name.to_owned(),
            text: text.to_owned(),
        }
    }

    #[tokio::test]
    async fn blank_sender_or_text_writes_nothing() {
        let (pool, event_id) = test_pool_with_event().await;
        let (tx, _rx) = broadcast::channel(8);

        for bad in [query("", "hello"), query("Alice", ""), query("Alice", "  ")] {
            let result = send_msg(&pool, &tx, &event_id, bad).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
        assert!(
            store::list_messages(&pool, &event_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn send_trims_stores_and_broadcasts() {
        let (pool, event_id) = test_pool_with_event().await;
        let (tx, mut rx) = broadcast::channel(8);

        let sent = send_msg(&pool, &tx, &event_id, query("  Alice ", " hi there "))
            .await
            .unwrap();
        assert_eq!(sent.user_name, "Alice");
        assert_eq!(sent.text, "hi there");

        let stored = store::list_messages(&pool, &event_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, sent.id);

        match rx.recv().await.unwrap() {
            Change::Message {
                event_id: changed,
                message,
            } => {
                assert_eq!(changed, event_id);
                assert_eq!(message.id, sent.id);
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }
}
