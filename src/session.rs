use tower_sessions::Session;
use uuid::Uuid;

use crate::AppResult;

pub const USER_ID: &str = "user_id";

/// Creator identity is an opaque per-session id, minted on first use.
/// Respondents and chat senders are free-text names, not tied to this.
pub async fn ensure_user_id(session: &Session) -> AppResult<String> {
    if let Some(user_id) = session.get::<String>(USER_ID).await? {
        return Ok(user_id);
    }

    let user_id = Uuid::now_v7().to_string();
    session.insert(USER_ID, &user_id).await?;
    Ok(user_id)
}
