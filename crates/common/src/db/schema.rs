//! Idempotent schema bootstrap
//!
//! Each service runs its own store's DDL at startup (the original services
//! did the same with `CREATE TABLE IF NOT EXISTS`). The unique and partial
//! unique indexes here are load-bearing: they are what turn the
//! one-open-session-per-user and one-payment-per-session rules into storage
//! guarantees under concurrent instances.

use crate::config::{ParkingConfig, TariffConfig};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use tracing::info;

const PARKING_DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS parking_slots (
        slot_id INT PRIMARY KEY,
        status  TEXT NOT NULL DEFAULT 'Available'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS parking_sessions (
        id              UUID PRIMARY KEY,
        vehicle_plate   TEXT NOT NULL,
        slot_id         INT NOT NULL,
        user_name       TEXT NOT NULL,
        entry_time      TIMESTAMPTZ NOT NULL,
        exit_time       TIMESTAMPTZ,
        total_minutes   DOUBLE PRECISION,
        amount          DOUBLE PRECISION,
        idempotency_key TEXT,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    // At most one open session per user, enforced by the store
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS parking_sessions_one_open_per_user
        ON parking_sessions (user_name) WHERE exit_time IS NULL
    "#,
    // Client retries of session start replay the original session
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS parking_sessions_idempotency_key
        ON parking_sessions (user_name, idempotency_key)
        WHERE idempotency_key IS NOT NULL
    "#,
];

const TARIFF_DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS tariffs (
        id           BIGSERIAL PRIMARY KEY,
        hourly_rate  DOUBLE PRECISION NOT NULL,
        free_minutes INT NOT NULL,
        updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

const PAYMENT_DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        id         UUID PRIMARY KEY,
        session_id UUID NOT NULL,
        user_name  TEXT NOT NULL,
        amount     DOUBLE PRECISION NOT NULL,
        method     TEXT NOT NULL,
        paid_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    // A session is settled at most once, across both payment paths
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS payments_one_per_session
        ON payments (session_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS offline_payments (
        id         UUID PRIMARY KEY,
        session_id UUID NOT NULL,
        amount     DOUBLE PRECISION NOT NULL,
        code       TEXT NOT NULL UNIQUE,
        is_paid    BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        paid_at    TIMESTAMPTZ
    )
    "#,
];

async fn run_ddl(db: &DatabaseConnection, statements: &[&str]) -> Result<()> {
    for ddl in statements {
        db.execute_unprepared(ddl).await?;
    }
    Ok(())
}

/// Bootstrap the slot/session manager's store and seed the slot inventory
pub async fn init_parking_schema(db: &DatabaseConnection, config: &ParkingConfig) -> Result<()> {
    run_ddl(db, PARKING_DDL).await?;

    let seeded = db
        .execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO parking_slots (slot_id)
            SELECT generate_series(1, $1)
            ON CONFLICT (slot_id) DO NOTHING
            "#,
            vec![(config.slot_count as i32).into()],
        ))
        .await?;

    info!(
        slot_count = config.slot_count,
        newly_seeded = seeded.rows_affected(),
        "Parking schema ready"
    );
    Ok(())
}

/// Bootstrap the tariff engine's store and seed a default tariff when empty
pub async fn init_tariff_schema(db: &DatabaseConnection, config: &TariffConfig) -> Result<()> {
    run_ddl(db, TARIFF_DDL).await?;

    let seeded = db
        .execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO tariffs (hourly_rate, free_minutes)
            SELECT $1, $2
            WHERE NOT EXISTS (SELECT 1 FROM tariffs)
            "#,
            vec![
                config.default_hourly_rate.into(),
                config.default_free_minutes.into(),
            ],
        ))
        .await?;

    if seeded.rows_affected() > 0 {
        info!(
            hourly_rate = config.default_hourly_rate,
            free_minutes = config.default_free_minutes,
            "Seeded default tariff"
        );
    }

    info!("Tariff schema ready");
    Ok(())
}

/// Bootstrap the payment settlement store
pub async fn init_payment_schema(db: &DatabaseConnection) -> Result<()> {
    run_ddl(db, PAYMENT_DDL).await?;
    info!("Payment schema ready");
    Ok(())
}
