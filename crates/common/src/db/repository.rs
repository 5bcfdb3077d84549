//! Repository pattern for database operations
//!
//! All state transitions are conditional updates keyed on the row's current
//! status, executed inside a single transaction when two entities must move
//! together (slot claim + session open, session close + slot release, mark
//! paid + payment insert). Zero rows affected is how the losing side of a
//! race finds out; nothing here takes an in-process lock.

use crate::errors::{AppError, Result};
use crate::db::DbPool;
use crate::db::models::*;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, Statement, TransactionTrait,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Slot Operations
    // ========================================================================

    /// List all slots with their status
    pub async fn list_slots(&self) -> Result<Vec<Slot>> {
        SlotEntity::find()
            .order_by_asc(SlotColumn::SlotId)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Session Operations
    // ========================================================================

    /// Open a session on a slot, atomically.
    ///
    /// One transaction spans the conditional slot claim and the session
    /// insert; either both land or neither does. The partial unique index on
    /// open sessions rejects a second open session for the same user even if
    /// two instances race past the application check.
    pub async fn start_session(
        &self,
        user: &str,
        vehicle_plate: &str,
        slot_id: i32,
        entry_time: DateTime<Utc>,
        idempotency_key: Option<String>,
    ) -> Result<ParkingSession> {
        let txn = self.write_conn().begin().await?;

        // Claim the slot: Available -> Occupied, or lose
        let claimed = txn
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "UPDATE parking_slots SET status = 'Occupied' \
                 WHERE slot_id = $1 AND status = 'Available'",
                vec![slot_id.into()],
            ))
            .await?;

        if claimed.rows_affected() == 0 {
            let exists = SlotEntity::find_by_id(slot_id).one(&txn).await?.is_some();
            return Err(if exists {
                AppError::SlotUnavailable { id: slot_id }
            } else {
                AppError::SlotNotFound { id: slot_id }
            });
        }

        let session = SessionActiveModel {
            id: Set(Uuid::new_v4()),
            vehicle_plate: Set(vehicle_plate.to_string()),
            slot_id: Set(slot_id),
            user_name: Set(user.to_string()),
            entry_time: Set(entry_time.into()),
            exit_time: Set(None),
            total_minutes: Set(None),
            amount: Set(None),
            idempotency_key: Set(idempotency_key.clone()),
            created_at: Set(entry_time.into()),
        };

        let session = match session.insert(&txn).await {
            Ok(session) => session,
            Err(err) => {
                if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
                    // Transaction rolls back on drop
                    drop(txn);

                    if detail.contains("idempotency") {
                        // A concurrent retry with the same key won; replay it
                        if let Some(ref key) = idempotency_key {
                            if let Some(existing) =
                                self.find_session_by_idempotency_key(user, key).await?
                            {
                                return Ok(existing);
                            }
                        }
                    }
                    return Err(AppError::SessionAlreadyActive);
                }
                return Err(err.into());
            }
        };

        txn.commit().await.map_err(|e| AppError::Transaction {
            message: format!("Session start commit failed: {}", e),
        })?;

        Ok(session)
    }

    /// Close a session and release its slot, atomically.
    ///
    /// The conditional `exit_time IS NULL` guard means exactly one of any
    /// number of concurrent closers wins; the rest see `NoActiveSession`.
    pub async fn close_session(
        &self,
        session_id: Uuid,
        slot_id: i32,
        exit_time: DateTime<Utc>,
        total_minutes: f64,
        amount: f64,
    ) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        let closed = txn
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "UPDATE parking_sessions \
                 SET exit_time = $2, total_minutes = $3, amount = $4 \
                 WHERE id = $1 AND exit_time IS NULL",
                vec![
                    session_id.into(),
                    exit_time.into(),
                    total_minutes.into(),
                    amount.into(),
                ],
            ))
            .await?;

        if closed.rows_affected() == 0 {
            return Err(AppError::NoActiveSession);
        }

        let released = txn
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "UPDATE parking_slots SET status = 'Available' \
                 WHERE slot_id = $1 AND status = 'Occupied'",
                vec![slot_id.into()],
            ))
            .await?;

        if released.rows_affected() == 0 {
            // An open session always pairs with an Occupied slot; anything
            // else is corruption and must not be committed.
            return Err(AppError::Transaction {
                message: format!(
                    "Slot {} was not occupied while closing session {}",
                    slot_id, session_id
                ),
            });
        }

        txn.commit().await.map_err(|e| AppError::Transaction {
            message: format!("Session close commit failed: {}", e),
        })?;

        Ok(())
    }

    /// Find a user's open session, if any
    pub async fn find_open_session_by_user(&self, user: &str) -> Result<Option<ParkingSession>> {
        SessionEntity::find()
            .filter(SessionColumn::UserName.eq(user))
            .filter(SessionColumn::ExitTime.is_null())
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a session by ID
    pub async fn find_session_by_id(&self, id: Uuid) -> Result<Option<ParkingSession>> {
        SessionEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a session created under an idempotency key
    pub async fn find_session_by_idempotency_key(
        &self,
        user: &str,
        key: &str,
    ) -> Result<Option<ParkingSession>> {
        // Replays race the original commit; a replica may not have the row
        // yet, so this lookup always goes to the primary.
        SessionEntity::find()
            .filter(SessionColumn::UserName.eq(user))
            .filter(SessionColumn::IdempotencyKey.eq(key))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// List all open sessions, oldest first
    pub async fn list_active_sessions(&self) -> Result<Vec<ParkingSession>> {
        SessionEntity::find()
            .filter(SessionColumn::ExitTime.is_null())
            .order_by_asc(SessionColumn::EntryTime)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Tariff Operations
    // ========================================================================

    /// The tariff currently in effect: newest `updated_at`, highest id on ties
    pub async fn current_tariff(&self) -> Result<Tariff> {
        TariffEntity::find()
            .order_by_desc(TariffColumn::UpdatedAt)
            .order_by_desc(TariffColumn::Id)
            .one(self.read_conn())
            .await?
            .ok_or(AppError::TariffNotConfigured)
    }

    /// Append a new tariff version; history is never mutated
    pub async fn append_tariff(&self, hourly_rate: f64, free_minutes: i32) -> Result<Tariff> {
        let tariff = TariffActiveModel {
            hourly_rate: Set(hourly_rate),
            free_minutes: Set(free_minutes),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        tariff.insert(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Payment Operations
    // ========================================================================

    /// Record a settlement, at most once per session.
    ///
    /// Returns the inserted row, or None when the session was already
    /// settled (the unique index on `session_id` absorbed the insert). The
    /// row comes back from the insert itself, so no replica read is needed
    /// to confirm a write that just committed.
    pub async fn record_payment(
        &self,
        session_id: Uuid,
        user: &str,
        amount: f64,
        method: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<Payment>> {
        PaymentEntity::find()
            .from_raw_sql(payment_insert(session_id, user, amount, method, paid_at))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// List a user's payments, newest first
    pub async fn list_payments_by_user(&self, user: &str) -> Result<Vec<Payment>> {
        PaymentEntity::find()
            .filter(PaymentColumn::UserName.eq(user))
            .order_by_desc(PaymentColumn::PaidAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Offline Payment Operations
    // ========================================================================

    /// Persist a freshly minted, unpaid offline code
    pub async fn create_offline_payment(
        &self,
        session_id: Uuid,
        amount: f64,
        code: &str,
    ) -> Result<OfflinePayment> {
        let record = OfflinePaymentActiveModel {
            id: Set(Uuid::new_v4()),
            session_id: Set(session_id),
            amount: Set(amount),
            code: Set(code.to_string()),
            is_paid: Set(false),
            created_at: Set(Utc::now().into()),
            paid_at: Set(None),
        };

        record.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Look up an offline payment by its redemption code
    pub async fn find_offline_by_code(&self, code: &str) -> Result<Option<OfflinePayment>> {
        OfflinePaymentEntity::find()
            .filter(OfflinePaymentColumn::Code.eq(code))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Re-read an offline payment on the primary.
    ///
    /// Used after losing the redemption race: the winner's commit may not
    /// have reached a replica yet, so this read must not go through one.
    pub async fn find_offline_by_id(&self, id: Uuid) -> Result<Option<OfflinePayment>> {
        OfflinePaymentEntity::find_by_id(id)
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Redeem an offline code: mark it paid and settle the session, in one
    /// transaction.
    ///
    /// Returns false when another redeemer won the `is_paid = FALSE` race;
    /// the caller re-reads and returns the prior result so redemption stays
    /// idempotent. The payment insert is conflict-absorbing so a session
    /// already settled online is not charged again.
    pub async fn redeem_offline_payment(
        &self,
        offline_id: Uuid,
        session_id: Uuid,
        owner: &str,
        amount: f64,
        method: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        let marked = txn
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "UPDATE offline_payments \
                 SET is_paid = TRUE, paid_at = $2, amount = $3 \
                 WHERE id = $1 AND is_paid = FALSE",
                vec![offline_id.into(), paid_at.into(), amount.into()],
            ))
            .await?;

        if marked.rows_affected() == 0 {
            return Ok(false);
        }

        txn.execute(payment_insert(session_id, owner, amount, method, paid_at))
            .await?;

        txn.commit().await.map_err(|e| AppError::Transaction {
            message: format!("Offline redemption commit failed: {}", e),
        })?;

        Ok(true)
    }
}

/// Conflict-absorbing payment insert, shared by both settlement paths.
///
/// `RETURNING` hands the committed row straight back (zero rows on
/// conflict); `rows_affected` still distinguishes win from absorb when the
/// statement runs through `execute`.
fn payment_insert(
    session_id: Uuid,
    user: &str,
    amount: f64,
    method: &str,
    paid_at: DateTime<Utc>,
) -> Statement {
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        "INSERT INTO payments (id, session_id, user_name, amount, method, paid_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (session_id) DO NOTHING \
         RETURNING id, session_id, user_name, amount, method, paid_at",
        vec![
            Uuid::new_v4().into(),
            session_id.into(),
            user.into(),
            amount.into(),
            method.into(),
            paid_at.into(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_insert_returns_committed_row() {
        let stmt = payment_insert(Uuid::new_v4(), "alice", 15.0, "Card", Utc::now());
        let sql = stmt.to_string();

        // One row per session, and the row must come back from the insert
        // itself rather than a follow-up read that could hit a lagging
        // replica.
        assert!(sql.contains("ON CONFLICT (session_id) DO NOTHING"));
        assert!(sql.contains("RETURNING id, session_id, user_name, amount, method, paid_at"));
    }
}
