//! Parking session entity
//!
//! Append-only audit trail: sessions are opened once, closed exactly once
//! (`exit_time`, `total_minutes`, `amount` set together) and never deleted.
//! A partial unique index on `(user_name) WHERE exit_time IS NULL` enforces
//! at most one open session per user at the store level.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parking_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub vehicle_plate: String,

    pub slot_id: i32,

    #[sea_orm(column_type = "Text")]
    pub user_name: String,

    pub entry_time: DateTimeWithTimeZone,

    pub exit_time: Option<DateTimeWithTimeZone>,

    pub total_minutes: Option<f64>,

    pub amount: Option<f64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub idempotency_key: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// An open session has no exit time yet
    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    /// Wall-clock minutes elapsed so far (open) or billed (closed).
    ///
    /// Durations use the service clock with no skew correction; the parking
    /// service is the single writer for a session's times.
    pub fn elapsed_minutes(&self) -> f64 {
        let minutes = match (self.total_minutes, self.exit_time) {
            (Some(minutes), _) => minutes,
            (None, Some(exit)) => {
                (exit.with_timezone(&Utc) - self.entry_time.with_timezone(&Utc))
                    .num_seconds() as f64
                    / 60.0
            }
            (None, None) => {
                (Utc::now() - self.entry_time.with_timezone(&Utc)).num_seconds() as f64 / 60.0
            }
        };

        // Clock skew between instances must not yield a negative duration
        minutes.max(0.0)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(entry_offset_min: i64, exit_offset_min: Option<i64>) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            vehicle_plate: "AB123CD".into(),
            slot_id: 5,
            user_name: "alice".into(),
            entry_time: (now - Duration::minutes(entry_offset_min)).into(),
            exit_time: exit_offset_min.map(|m| (now - Duration::minutes(m)).into()),
            total_minutes: None,
            amount: None,
            idempotency_key: None,
            created_at: now.into(),
        }
    }

    #[test]
    fn test_open_session_elapsed_tracks_now() {
        let s = session(30, None);
        assert!(s.is_open());
        let minutes = s.elapsed_minutes();
        assert!((29.9..30.1).contains(&minutes), "got {minutes}");
    }

    #[test]
    fn test_closed_session_uses_exit_time() {
        let s = session(45, Some(5));
        assert!(!s.is_open());
        let minutes = s.elapsed_minutes();
        assert!((39.9..40.1).contains(&minutes), "got {minutes}");
    }

    #[test]
    fn test_stored_minutes_win() {
        let mut s = session(45, Some(5));
        s.total_minutes = Some(40.25);
        assert_eq!(s.elapsed_minutes(), 40.25);
    }

    #[test]
    fn test_skewed_entry_time_clamps_to_zero() {
        // Entry stamped by an instance whose clock runs ahead of ours
        let s = session(-3, None);
        assert_eq!(s.elapsed_minutes(), 0.0);

        let closed = session(-3, Some(0));
        assert_eq!(closed.elapsed_minutes(), 0.0);
    }
}
