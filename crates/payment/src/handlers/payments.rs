//! Online settlement handlers
//!
//! The charged amount is always the slot/session manager's re-derived fee
//! for the session; client-supplied amounts are never accepted. One payment
//! row per session, enforced by the store.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parkforge_common::{
    auth::BearerToken,
    errors::{AppError, Result},
    metrics,
};

use crate::AppState;

const DEFAULT_METHOD: &str = "Card";

/// Online payment request; any amount field a client sends is ignored
#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub session_id: Uuid,
    pub method: Option<String>,
}

/// Settled payment response
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment_id: Uuid,
    pub session_id: Uuid,
    pub amount: f64,
    pub method: String,
    pub paid_at: String,
}

/// Settle a session online.
///
/// Only the session owner may pay, and a session settles at most once; a
/// second attempt reports the conflict instead of double-charging.
pub async fn pay(
    State(state): State<AppState>,
    token: BearerToken,
    Json(request): Json<PayRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>)> {
    let principal = state.clients.auth.verify(token.as_str()).await?;

    let summary = state.clients.parking.session(request.session_id).await?;

    if !principal.owns(&summary.user_name) {
        return Err(AppError::Unauthorized {
            message: "Session belongs to another user".to_string(),
        });
    }

    let method = request.method.unwrap_or_else(|| DEFAULT_METHOD.to_string());
    let amount = summary.calculated_fee;
    let paid_at = Utc::now();

    // The insert returns the committed row; a separate read-back could miss
    // it on a lagging replica.
    let payment = state
        .repo
        .record_payment(summary.session_id, &summary.user_name, amount, &method, paid_at)
        .await?
        .ok_or_else(|| AppError::AlreadySettled {
            session_id: summary.session_id.to_string(),
        })?;

    metrics::record_payment(&method, amount);
    state.clients.notifier.notify(
        "payment",
        format!(
            "Session {} settled for {:.2} via {} (user {})",
            summary.session_id, amount, method, summary.user_name
        ),
    );

    tracing::info!(
        user = %summary.user_name,
        session_id = %summary.session_id,
        amount,
        method = %payment.method,
        "Payment recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            payment_id: payment.id,
            session_id: payment.session_id,
            amount: payment.amount,
            method: payment.method,
            paid_at: payment.paid_at.to_rfc3339(),
        }),
    ))
}

/// List the caller's settled payments, newest first
pub async fn history(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<Vec<PaymentResponse>>> {
    let principal = state.clients.auth.verify(token.as_str()).await?;

    let payments = state.repo.list_payments_by_user(&principal.user).await?;

    let response = payments
        .into_iter()
        .map(|payment| PaymentResponse {
            payment_id: payment.id,
            session_id: payment.session_id,
            amount: payment.amount,
            method: payment.method,
            paid_at: payment.paid_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(response))
}
