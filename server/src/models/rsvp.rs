use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Existence of a row means the user is attending the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Rsvp {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
