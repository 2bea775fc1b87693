use std::time::Duration;

use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{AppError, AppResult, chat, store};

use super::{Change, EventFeed, FeedState};

/// Fixed cadence of the fallback poll when the push channel is gone.
const POLL_PERIOD: Duration = Duration::from_secs(2);

/// Message volume per event is small; past this the channel is oversubscribed
/// and new clients should one-shot fetch instead.
const MAX_SUBSCRIBERS: usize = 256;

#[axum::debug_handler(state = crate::AppState)]
pub async fn event_ws(
    Path(event_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<Change>>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let event_id = event_id.to_string();
    if store::fetch_event(&db_pool, &event_id).await?.is_none() {
        return Err(AppError::NotFound("event"));
    }
    if tx.receiver_count() >= MAX_SUBSCRIBERS {
        return Err(AppError::Subscription(
            "live channel is full, fetch instead".to_owned(),
        ));
    }

    Ok(ws.on_upgrade(move |stream| handle_socket(stream, db_pool, tx, event_id)))
}

async fn handle_socket(
    stream: WebSocket,
    db_pool: SqlitePool,
    tx: broadcast::Sender<Change>,
    event_id: String,
) {
    let mut feed = EventFeed::subscribe(&tx, event_id.clone());
    let (mut sender, mut receiver) = stream.split();

    let forward_pool = db_pool.clone();
    let forward_event = event_id.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            match feed.next().await {
                Some(change) => {
                    let Ok(body) = serde_json::to_string(&change) else {
                        break;
                    };
                    if sender.send(body.into()).await.is_err() {
                        break;
                    }
                }
                None if feed.state() == FeedState::Error => {
                    // Push channel is gone; degrade to snapshot polling rather
                    // than leave the client stale forever.
                    poll_snapshots(&forward_pool, &forward_event, &mut sender).await;
                    break;
                }
                None => break,
            }
        }
    });

    // Inbound frames are chat sends for this event.
    while let Some(Ok(frame)) = receiver.next().await {
        let Ok(query) = serde_json::from_slice(&frame.into_data()) else {
            continue;
        };

        if let Err(err) = chat::send_msg(&db_pool, &tx, &event_id, query).await {
            tracing::debug!("ws chat send rejected: {err:?}");
        }
    }

    // Client is gone; abort so a stale in-flight change is discarded, not
    // applied.
    forward_task.abort();
}

/// One snapshot per tick, sequentially, so a slow fetch can never overlap the
/// next poll.
async fn poll_snapshots(
    db_pool: &SqlitePool,
    event_id: &str,
    sender: &mut SplitSink<WebSocket, Message>,
) {
    let mut ticker = tokio::time::interval(POLL_PERIOD);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match store::fetch_snapshot(db_pool, event_id).await {
            Ok(Some(snapshot)) => {
                let frame = serde_json::json!({ "kind": "snapshot", "snapshot": snapshot });
                let Ok(body) = serde_json::to_string(&frame) else {
                    break;
                };
                if sender.send(body.into()).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                // Background refresh; log and try again next tick.
                tracing::warn!("poll refresh failed: {err:?}");
            }
        }
    }
}
