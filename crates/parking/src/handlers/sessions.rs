//! Session lifecycle handlers
//!
//! Sessions pair a verified user's registered vehicle with a claimed slot.
//! Start and stop are the only writers of session rows; the fee is frozen
//! at stop time from the tariff engine's quote and never recomputed after.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use parkforge_common::{
    auth::{BearerToken, IdempotencyKey},
    clients::SessionSummary,
    db::models::ParkingSession,
    errors::{AppError, Result},
    metrics, round2,
};

use crate::AppState;

/// Session start request
#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[validate(range(min = 1))]
    pub slot_id: i32,
}

/// Session start response
#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub slot_id: i32,
    pub vehicle_plate: String,
    pub entry_time: String,
}

/// Session stop response
#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: Uuid,
    pub slot_id: i32,
    pub total_minutes: f64,
    pub fee: f64,
}

/// Session list query parameters
#[derive(Debug, Deserialize)]
pub struct ListSessionsParams {
    pub state: Option<String>,
}

/// Active session listing entry; `expected_fee` is a live quote and is
/// omitted when the tariff engine cannot be reached
#[derive(Debug, Serialize)]
pub struct ActiveSessionResponse {
    pub session_id: Uuid,
    pub vehicle_plate: String,
    pub slot_id: i32,
    pub user_name: String,
    pub entry_time: String,
    pub elapsed_minutes: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_fee: Option<f64>,
}

fn start_response(session: &ParkingSession) -> StartSessionResponse {
    StartSessionResponse {
        session_id: session.id,
        slot_id: session.slot_id,
        vehicle_plate: session.vehicle_plate.clone(),
        entry_time: session.entry_time.to_rfc3339(),
    }
}

/// Open a session: claim the slot and bind the caller's registered vehicle.
///
/// Replays of the same `Idempotency-Key` return the original session instead
/// of claiming a second slot.
pub async fn start_session(
    State(state): State<AppState>,
    token: BearerToken,
    IdempotencyKey(idempotency_key): IdempotencyKey,
    Json(request): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<StartSessionResponse>)> {
    let principal = state.clients.auth.verify(token.as_str()).await?;

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let plate = state
        .clients
        .vehicle
        .primary_plate(token.as_str())
        .await?
        .ok_or(AppError::NoVehicle)?;

    if let Some(key) = &idempotency_key {
        if let Some(existing) = state
            .repo
            .find_session_by_idempotency_key(&principal.user, key)
            .await?
        {
            tracing::info!(
                user = %principal.user,
                session_id = %existing.id,
                "Replayed session start"
            );
            return Ok((StatusCode::OK, Json(start_response(&existing))));
        }
    }

    let session = state
        .repo
        .start_session(
            &principal.user,
            &plate,
            request.slot_id,
            Utc::now(),
            idempotency_key,
        )
        .await?;

    metrics::record_session_start(session.slot_id);
    state.clients.notifier.notify(
        "parking_entry",
        format!(
            "Vehicle {} entered slot {} (user {})",
            session.vehicle_plate, session.slot_id, session.user_name
        ),
    );

    tracing::info!(
        user = %principal.user,
        session_id = %session.id,
        slot_id = session.slot_id,
        "Session started"
    );

    Ok((StatusCode::CREATED, Json(start_response(&session))))
}

/// Close the caller's open session: quote the fee, freeze it on the row,
/// and release the slot.
pub async fn stop_session(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<StopSessionResponse>> {
    let principal = state.clients.auth.verify(token.as_str()).await?;

    let session = state
        .repo
        .find_open_session_by_user(&principal.user)
        .await?
        .ok_or(AppError::NoActiveSession)?;

    let exit_time = Utc::now();
    // Clamped at zero: clock skew between instances must not produce a
    // negative duration the tariff engine would reject.
    let total_minutes = round2(
        ((exit_time - session.entry_time.with_timezone(&Utc)).num_seconds() as f64 / 60.0)
            .max(0.0),
    );

    // A session cannot close without a frozen fee; a missing tariff is a
    // dependency fault here, not a client error.
    let quote = state
        .clients
        .tariff
        .quote(total_minutes)
        .await
        .map_err(|err| match err {
            AppError::TariffNotConfigured => AppError::DependencyUnavailable {
                service: "tariff".to_string(),
            },
            other => other,
        })?;

    state
        .repo
        .close_session(session.id, session.slot_id, exit_time, total_minutes, quote.fee)
        .await?;

    metrics::record_session_close(session.slot_id, total_minutes);
    state.clients.notifier.notify(
        "parking_exit",
        format!(
            "Vehicle {} left slot {} after {:.2} min, fee {:.2}",
            session.vehicle_plate, session.slot_id, total_minutes, quote.fee
        ),
    );

    tracing::info!(
        user = %principal.user,
        session_id = %session.id,
        slot_id = session.slot_id,
        total_minutes,
        fee = quote.fee,
        "Session closed"
    );

    Ok(Json(StopSessionResponse {
        session_id: session.id,
        slot_id: session.slot_id,
        total_minutes,
        fee: quote.fee,
    }))
}

/// List open sessions with a live fee estimate per entry
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<ListSessionsParams>,
) -> Result<Json<Vec<ActiveSessionResponse>>> {
    match params.state.as_deref() {
        None | Some("active") => {}
        Some(other) => {
            return Err(AppError::Validation {
                message: format!("Unknown session state filter: {other}"),
                field: Some("state".to_string()),
            });
        }
    }

    let sessions = state.repo.list_active_sessions().await?;

    let mut response = Vec::with_capacity(sessions.len());
    for session in sessions {
        let elapsed = round2(session.elapsed_minutes());
        // Listing is best-effort; a tariff outage degrades the estimate,
        // it does not fail the whole listing.
        let expected_fee = match state.clients.tariff.quote(elapsed).await {
            Ok(quote) => Some(quote.fee),
            Err(err) => {
                tracing::warn!(session_id = %session.id, error = %err, "Fee estimate unavailable");
                None
            }
        };

        response.push(ActiveSessionResponse {
            session_id: session.id,
            vehicle_plate: session.vehicle_plate,
            slot_id: session.slot_id,
            user_name: session.user_name,
            entry_time: session.entry_time.to_rfc3339(),
            elapsed_minutes: elapsed,
            expected_fee,
        });
    }

    Ok(Json(response))
}

/// Fetch one session with its authoritative fee.
///
/// `calculated_fee` is re-derived from the current tariff for open sessions
/// and from the frozen minutes for closed ones; settlement trusts this value.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSummary>> {
    let session = state
        .repo
        .find_session_by_id(session_id)
        .await?
        .ok_or_else(|| AppError::SessionNotFound {
            id: session_id.to_string(),
        })?;

    let total_minutes = round2(session.elapsed_minutes());

    let quote = state
        .clients
        .tariff
        .quote(total_minutes)
        .await
        .map_err(|err| match err {
            AppError::TariffNotConfigured => AppError::DependencyUnavailable {
                service: "tariff".to_string(),
            },
            other => other,
        })?;

    Ok(Json(SessionSummary {
        session_id: session.id,
        vehicle_plate: session.vehicle_plate,
        slot_id: session.slot_id,
        user_name: session.user_name,
        entry_time: session.entry_time.with_timezone(&Utc),
        exit_time: session.exit_time.map(|t| t.with_timezone(&Utc)),
        total_minutes,
        calculated_fee: quote.fee,
        stored_amount: session.amount,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_request_ignores_extra_fields() {
        let request: StartSessionRequest =
            serde_json::from_str(r#"{"slot_id": 7, "amount": 999}"#).unwrap();
        assert_eq!(request.slot_id, 7);
    }

    #[test]
    fn test_start_request_rejects_non_positive_slot() {
        assert!(StartSessionRequest { slot_id: 0 }.validate().is_err());
        assert!(StartSessionRequest { slot_id: -3 }.validate().is_err());
        assert!(StartSessionRequest { slot_id: 1 }.validate().is_ok());
    }

    #[test]
    fn test_fee_estimate_omitted_when_unavailable() {
        let entry = ActiveSessionResponse {
            session_id: Uuid::new_v4(),
            vehicle_plate: "KA-01-HH-1234".to_string(),
            slot_id: 3,
            user_name: "alice".to_string(),
            entry_time: "2026-08-30T10:00:00+00:00".to_string(),
            elapsed_minutes: 12.5,
            expected_fee: None,
        };
        let body = serde_json::to_value(&entry).unwrap();
        assert!(body.get("expected_fee").is_none());
    }
}
