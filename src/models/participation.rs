use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_REGISTERED: &str = "registered";
pub const STATUS_CANCELLED: &str = "cancelled";

/// A user's registration state for one event. Cancellation flips `status`
/// in place; rows are never deleted, so cancelled rows accumulate as
/// history and only a `registered` row counts as active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
