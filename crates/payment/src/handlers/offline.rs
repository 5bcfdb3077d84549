//! Offline settlement handlers
//!
//! An offline code is a bearer artifact: minted against a session, carried
//! out of band (printed or as a QR image), and redeemable exactly once.
//! Redemption is idempotent; replays report the original settlement.

use std::io::Cursor;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    Json,
};
use chrono::Utc;
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use parkforge_common::{
    auth::BearerToken,
    errors::{AppError, Result},
    metrics, OFFLINE_METHOD,
};

use crate::AppState;

/// Offline code issuance request; a zero or absent amount defers the charge
/// to the fee re-derived at redemption time
#[derive(Debug, Deserialize, Validate)]
pub struct InitOfflineRequest {
    pub session_id: Uuid,

    #[validate(range(min = 0.0, max = 1_000_000.0))]
    pub amount: Option<f64>,
}

/// Issued offline code response
#[derive(Debug, Serialize)]
pub struct OfflineCodeResponse {
    pub code: String,
    pub session_id: Uuid,
    pub amount: f64,
    pub qr_path: String,
}

/// Redemption request
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub qr_code: String,
}

/// Redemption outcome
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub session_id: Uuid,
    pub amount: f64,
    pub status: String,
}

fn mint_code() -> String {
    format!("OFF-{}", Uuid::new_v4())
}

/// The amount a redemption settles: a preset (non-zero) amount frozen at
/// issuance wins, a provisional zero defers to the authoritative fee.
fn settlement_amount(stored: f64, calculated_fee: f64) -> f64 {
    if stored > 0.0 {
        stored
    } else {
        calculated_fee
    }
}

/// Issue a redeemable offline code for a session
pub async fn init(
    State(state): State<AppState>,
    token: BearerToken,
    Json(request): Json<InitOfflineRequest>,
) -> Result<(StatusCode, Json<OfflineCodeResponse>)> {
    state.clients.auth.verify(token.as_str()).await?;

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let amount = request.amount.unwrap_or(0.0);

    // The session must exist before a code is bound to it
    let summary = state.clients.parking.session(request.session_id).await?;

    let code = mint_code();
    let record = state
        .repo
        .create_offline_payment(summary.session_id, amount, &code)
        .await?;

    metrics::record_offline("issued");

    tracing::info!(
        session_id = %record.session_id,
        code = %record.code,
        amount = record.amount,
        "Offline code issued"
    );

    let qr_path = format!("/offline/{}", record.code);
    Ok((
        StatusCode::CREATED,
        Json(OfflineCodeResponse {
            code: record.code,
            session_id: record.session_id,
            amount: record.amount,
            qr_path,
        }),
    ))
}

/// Render an offline code as a PNG QR image
pub async fn qr_image(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<([(header::HeaderName, &'static str); 1], Vec<u8>)> {
    let record = state
        .repo
        .find_offline_by_code(&code)
        .await?
        .ok_or(AppError::CodeNotFound)?;

    let qr = QrCode::new(record.code.as_bytes()).map_err(|e| AppError::Internal {
        message: format!("QR encoding failed: {e}"),
    })?;

    let image = qr
        .render::<image::Luma<u8>>()
        .min_dimensions(240, 240)
        .build();

    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| AppError::Internal {
            message: format!("PNG encoding failed: {e}"),
        })?;

    Ok(([(header::CONTENT_TYPE, "image/png")], buffer.into_inner()))
}

/// Redeem an offline code and settle its session.
///
/// A code with no preset amount charges the fee re-derived from the
/// slot/session manager at redemption time. Redeeming the same code again
/// returns the original settlement unchanged.
pub async fn redeem(
    State(state): State<AppState>,
    token: BearerToken,
    Json(request): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>> {
    state.clients.auth.verify(token.as_str()).await?;

    let offline = state
        .repo
        .find_offline_by_code(&request.qr_code)
        .await?
        .ok_or(AppError::CodeNotFound)?;

    if offline.is_paid {
        metrics::record_offline("replay");
        return Ok(Json(RedeemResponse {
            session_id: offline.session_id,
            amount: offline.amount,
            status: "already_redeemed".to_string(),
        }));
    }

    // The session owner is charged, whoever presents the code
    let summary = state.clients.parking.session(offline.session_id).await?;

    let amount = settlement_amount(offline.amount, summary.calculated_fee);

    let redeemed = state
        .repo
        .redeem_offline_payment(
            offline.id,
            offline.session_id,
            &summary.user_name,
            amount,
            OFFLINE_METHOD,
            Utc::now(),
        )
        .await?;

    if !redeemed {
        // Lost the race to a concurrent redeemer; report their settlement.
        // The re-read goes to the primary so the winner's commit is visible.
        let settled = state
            .repo
            .find_offline_by_id(offline.id)
            .await?
            .ok_or(AppError::CodeNotFound)?;

        metrics::record_offline("replay");
        return Ok(Json(RedeemResponse {
            session_id: settled.session_id,
            amount: settled.amount,
            status: "already_redeemed".to_string(),
        }));
    }

    metrics::record_offline("redeemed");
    metrics::record_payment(OFFLINE_METHOD, amount);
    state.clients.notifier.notify(
        "offline_payment",
        format!(
            "Offline code redeemed for session {} amount {:.2} (user {})",
            offline.session_id, amount, summary.user_name
        ),
    );

    tracing::info!(
        session_id = %offline.session_id,
        code = %offline.code,
        amount,
        "Offline code redeemed"
    );

    Ok(Json(RedeemResponse {
        session_id: offline.session_id,
        amount,
        status: "redeemed".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisional_zero_defers_to_authoritative_fee() {
        // A code minted while the session was open charges the fee the
        // slot/session manager reports at redemption time
        assert_eq!(settlement_amount(0.0, 12.5), 12.5);
    }

    #[test]
    fn test_preset_amount_wins() {
        assert_eq!(settlement_amount(40.0, 12.5), 40.0);
        // A preset amount holds even when the live fee would be higher
        assert_eq!(settlement_amount(8.0, 12.5), 8.0);
    }

    #[test]
    fn test_init_request_rejects_negative_amount() {
        let request = InitOfflineRequest {
            session_id: Uuid::new_v4(),
            amount: Some(-1.0),
        };
        assert!(request.validate().is_err());

        let request = InitOfflineRequest {
            session_id: Uuid::new_v4(),
            amount: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_minted_codes_are_prefixed_and_unique() {
        let a = mint_code();
        let b = mint_code();
        assert!(a.starts_with("OFF-"));
        assert_eq!(a.len(), 4 + 36);
        assert_ne!(a, b);
    }

    #[test]
    fn test_code_survives_qr_round_trip_encoding() {
        let code = mint_code();
        let qr = QrCode::new(code.as_bytes()).unwrap();
        let image = qr.render::<image::Luma<u8>>().min_dimensions(64, 64).build();
        assert!(image.width() >= 64);
        assert!(image.height() >= 64);
    }
}
