//! Outbound service clients
//!
//! Every cross-service call in ParkForge goes through one of these wrappers:
//! a fixed per-call timeout, and uniform translation of timeouts, connection
//! failures and unexpected statuses into [`AppError::DependencyUnavailable`].
//! The one exception is notification delivery, which is fire-and-forget and
//! swallows every failure.

use crate::auth::Principal;
use crate::config::DependenciesConfig;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire shape of the auth collaborator's verify response
#[derive(Debug, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Wire shape of one vehicle registry record
#[derive(Debug, Deserialize)]
pub struct VehicleRecord {
    pub license_plate: String,
}

/// Fee quote returned by the tariff engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeQuote {
    pub minutes: f64,
    pub free_minutes: i32,
    pub hourly_rate: f64,
    pub fee: f64,
}

/// Session summary served by the slot/session manager.
///
/// `calculated_fee` is re-derived from the tariff engine at query time and is
/// the only amount settlement trusts; `stored_amount` is the value frozen when
/// the session closed (null while open).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub vehicle_plate: String,
    pub slot_id: i32,
    pub user_name: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub total_minutes: f64,
    pub calculated_fee: f64,
    pub stored_amount: Option<f64>,
}

#[derive(Debug, Serialize)]
struct NotifyRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    message: &'a str,
}

fn transport_error(service: &str, err: reqwest::Error) -> AppError {
    tracing::warn!(service = service, error = %err, "Dependency call failed");
    crate::metrics::record_dependency(service, false);
    AppError::DependencyUnavailable {
        service: service.to_string(),
    }
}

fn status_error(service: &str, status: reqwest::StatusCode) -> AppError {
    tracing::warn!(service = service, status = status.as_u16(), "Dependency returned failure");
    crate::metrics::record_dependency(service, false);
    AppError::DependencyUnavailable {
        service: service.to_string(),
    }
}

/// Client for the identity collaborator
#[derive(Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Verify a bearer credential.
    ///
    /// Any response that is not a well-formed 200 with `valid = true` means
    /// the caller is not authenticated; only transport-level failures map to
    /// `DependencyUnavailable`.
    pub async fn verify(&self, token: &str) -> Result<Principal> {
        let url = format!("{}/auth/verify", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error("auth", e))?;

        crate::metrics::record_dependency("auth", true);

        if response.status() != reqwest::StatusCode::OK {
            return Err(AppError::Unauthorized {
                message: "Credential rejected".to_string(),
            });
        }

        let body: VerifyResponse = match response.json().await {
            Ok(body) => body,
            Err(_) => {
                // Malformed body is never treated as authenticated
                return Err(AppError::Unauthorized {
                    message: "Credential rejected".to_string(),
                });
            }
        };

        match (body.valid, body.user) {
            (true, Some(user)) => Ok(Principal {
                user,
                role: body.role.unwrap_or_else(|| "user".to_string()),
            }),
            _ => Err(AppError::Unauthorized {
                message: "Credential rejected".to_string(),
            }),
        }
    }
}

/// Client for the vehicle registry collaborator
#[derive(Clone)]
pub struct VehicleClient {
    client: reqwest::Client,
    base_url: String,
}

impl VehicleClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Resolve the caller's first registered plate, if any
    pub async fn primary_plate(&self, token: &str) -> Result<Option<String>> {
        let url = format!("{}/vehicle/mine", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error("vehicle", e))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(status_error("vehicle", response.status()));
        }

        crate::metrics::record_dependency("vehicle", true);

        let vehicles: Vec<VehicleRecord> = response
            .json()
            .await
            .map_err(|e| transport_error("vehicle", e))?;

        Ok(vehicles.into_iter().next().map(|v| v.license_plate))
    }
}

/// Client for the tariff engine
#[derive(Clone)]
pub struct TariffClient {
    client: reqwest::Client,
    base_url: String,
}

impl TariffClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Quote the fee for an elapsed number of minutes at the current tariff
    pub async fn quote(&self, minutes: f64) -> Result<FeeQuote> {
        let url = format!("{}/tariff/quote", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("minutes", minutes)])
            .send()
            .await
            .map_err(|e| transport_error("tariff", e))?;

        match response.status() {
            reqwest::StatusCode::OK => {
                crate::metrics::record_dependency("tariff", true);
                response
                    .json::<FeeQuote>()
                    .await
                    .map_err(|e| transport_error("tariff", e))
            }
            reqwest::StatusCode::NOT_FOUND => {
                crate::metrics::record_dependency("tariff", true);
                Err(AppError::TariffNotConfigured)
            }
            status => Err(status_error("tariff", status)),
        }
    }
}

/// Client for the slot/session manager (used by payment settlement)
#[derive(Clone)]
pub struct ParkingClient {
    client: reqwest::Client,
    base_url: String,
}

impl ParkingClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Fetch the authoritative summary for a session
    pub async fn session(&self, session_id: Uuid) -> Result<SessionSummary> {
        let url = format!("{}/sessions/{}", self.base_url, session_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error("parking", e))?;

        match response.status() {
            reqwest::StatusCode::OK => {
                crate::metrics::record_dependency("parking", true);
                response
                    .json::<SessionSummary>()
                    .await
                    .map_err(|e| transport_error("parking", e))
            }
            reqwest::StatusCode::NOT_FOUND => {
                crate::metrics::record_dependency("parking", true);
                Err(AppError::SessionNotFound {
                    id: session_id.to_string(),
                })
            }
            status => Err(status_error("parking", status)),
        }
    }
}

/// Fire-and-forget notification fan-out.
///
/// Delivery runs on a detached task with its own short timeout; failure is
/// logged and never reaches the caller.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    base_url: String,
}

impl Notifier {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn notify(&self, kind: &'static str, message: String) {
        let client = self.client.clone();
        let url = format!("{}/notify", self.base_url);

        tokio::spawn(async move {
            let payload = NotifyRequest {
                kind,
                message: &message,
            };

            match client.post(&url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    crate::metrics::record_notification(true);
                    tracing::debug!(kind = kind, "Notification delivered");
                }
                Ok(response) => {
                    crate::metrics::record_notification(false);
                    tracing::warn!(
                        kind = kind,
                        status = response.status().as_u16(),
                        "Notification rejected"
                    );
                }
                Err(err) => {
                    crate::metrics::record_notification(false);
                    tracing::warn!(kind = kind, error = %err, "Notification delivery failed");
                }
            }
        });
    }
}

/// All outbound clients for one service instance
#[derive(Clone)]
pub struct ServiceClients {
    pub auth: AuthClient,
    pub vehicle: VehicleClient,
    pub tariff: TariffClient,
    pub parking: ParkingClient,
    pub notifier: Notifier,
}

impl ServiceClients {
    /// Build the client set from dependency configuration
    pub fn new(deps: &DependenciesConfig) -> Result<Self> {
        let blocking = reqwest::Client::builder()
            .timeout(deps.call_timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        let notify = reqwest::Client::builder()
            .timeout(deps.notify_timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to build notification client: {}", e),
            })?;

        Ok(Self {
            auth: AuthClient::new(blocking.clone(), deps.auth_url.clone()),
            vehicle: VehicleClient::new(blocking.clone(), deps.vehicle_url.clone()),
            tariff: TariffClient::new(blocking.clone(), deps.tariff_url.clone()),
            parking: ParkingClient::new(blocking, deps.parking_url.clone()),
            notifier: Notifier::new(notify, deps.notify_url.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_response_defaults_to_invalid() {
        // A malformed or partial body must never read as authenticated
        let body: VerifyResponse = serde_json::from_str("{}").unwrap();
        assert!(!body.valid);
        assert!(body.user.is_none());

        let body: VerifyResponse =
            serde_json::from_str(r#"{"valid": true}"#).unwrap();
        assert!(body.valid);
        // valid without a user still cannot produce a Principal
        assert!(body.user.is_none());
    }

    #[test]
    fn test_session_summary_roundtrip() {
        let raw = r#"{
            "session_id": "7f3a2f9e-4d1c-4a0c-9a56-0a8f6a2d9c11",
            "vehicle_plate": "AB123CD",
            "slot_id": 5,
            "user_name": "alice",
            "entry_time": "2026-08-30T10:00:00Z",
            "exit_time": null,
            "total_minutes": 32.0,
            "calculated_fee": 15.0,
            "stored_amount": null
        }"#;

        let summary: SessionSummary = serde_json::from_str(raw).unwrap();
        assert_eq!(summary.slot_id, 5);
        assert_eq!(summary.calculated_fee, 15.0);
        assert!(summary.exit_time.is_none());
        assert!(summary.stored_amount.is_none());
    }

    #[test]
    fn test_clients_build_from_defaults() {
        let clients = ServiceClients::new(&DependenciesConfig::default());
        assert!(clients.is_ok());
    }
}
