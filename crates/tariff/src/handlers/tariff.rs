//! Tariff handlers
//!
//! The quote endpoint always reads the tariff in effect at query time;
//! callers with in-flight sessions get whichever version is current when
//! they ask. Updates append a version, history is never rewritten.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::billing::compute_fee;
use crate::AppState;
use parkforge_common::{
    auth::BearerToken,
    clients::FeeQuote,
    errors::{AppError, Result},
    round2,
};

/// Current tariff response
#[derive(Serialize)]
pub struct TariffResponse {
    pub hourly_rate: f64,
    pub free_minutes: i32,
    pub updated_at: String,
}

/// Quote query parameters; minutes arrives as text so malformed input maps
/// to the structured error body instead of an extractor rejection
#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub minutes: Option<String>,
}

/// Tariff update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTariffRequest {
    #[validate(range(exclusive_min = 0.0, max = 100_000.0))]
    pub hourly_rate: f64,

    #[validate(range(min = 0, max = 1440))]
    pub free_minutes: i32,
}

/// Get the tariff currently in effect
pub async fn get_current(State(state): State<AppState>) -> Result<Json<TariffResponse>> {
    let tariff = state.repo.current_tariff().await?;

    Ok(Json(TariffResponse {
        hourly_rate: tariff.hourly_rate,
        free_minutes: tariff.free_minutes,
        updated_at: tariff.updated_at.to_rfc3339(),
    }))
}

/// Quote the fee for an elapsed number of minutes
pub async fn quote(
    State(state): State<AppState>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<FeeQuote>> {
    let raw = params.minutes.ok_or_else(|| AppError::MissingField {
        field: "minutes".to_string(),
    })?;

    let minutes: f64 = raw.parse().map_err(|_| AppError::InvalidFormat {
        message: "minutes must be a number".to_string(),
    })?;

    if !minutes.is_finite() || minutes < 0.0 {
        return Err(AppError::Validation {
            message: "minutes must be non-negative".to_string(),
            field: Some("minutes".to_string()),
        });
    }

    let tariff = state.repo.current_tariff().await?;
    let fee = compute_fee(minutes, tariff.hourly_rate, tariff.free_minutes);

    Ok(Json(FeeQuote {
        minutes: round2(minutes),
        free_minutes: tariff.free_minutes,
        hourly_rate: tariff.hourly_rate,
        fee,
    }))
}

/// Append a new tariff version (admin only)
pub async fn update(
    State(state): State<AppState>,
    token: BearerToken,
    Json(request): Json<UpdateTariffRequest>,
) -> Result<(StatusCode, Json<TariffResponse>)> {
    let principal = state.clients.auth.verify(token.as_str()).await?;

    if !principal.is_admin() {
        return Err(AppError::Forbidden {
            message: "Tariff updates require the admin role".to_string(),
        });
    }

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let tariff = state
        .repo
        .append_tariff(request.hourly_rate, request.free_minutes)
        .await?;

    tracing::info!(
        user = %principal.user,
        hourly_rate = tariff.hourly_rate,
        free_minutes = tariff.free_minutes,
        "Tariff updated"
    );

    Ok((
        StatusCode::CREATED,
        Json(TariffResponse {
            hourly_rate: tariff.hourly_rate,
            free_minutes: tariff.free_minutes,
            updated_at: tariff.updated_at.to_rfc3339(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(hourly_rate: f64, free_minutes: i32) -> UpdateTariffRequest {
        UpdateTariffRequest {
            hourly_rate,
            free_minutes,
        }
    }

    #[test]
    fn test_update_request_bounds() {
        assert!(update(30.0, 2).validate().is_ok());
        assert!(update(0.01, 0).validate().is_ok());

        // Rate must be strictly positive and bounded
        assert!(update(0.0, 2).validate().is_err());
        assert!(update(-5.0, 2).validate().is_err());
        assert!(update(f64::INFINITY, 2).validate().is_err());
        assert!(update(f64::NAN, 2).validate().is_err());

        // Free allowance cannot be negative or exceed a day
        assert!(update(30.0, -1).validate().is_err());
        assert!(update(30.0, 1441).validate().is_err());
    }
}
