//! ParkForge Common Library
//!
//! Shared code for all ParkForge services including:
//! - Database models and repository pattern
//! - Error types and handling
//! - Configuration management
//! - Bearer-credential extraction
//! - Outbound service clients (auth, vehicle, tariff, parking, notification)
//! - Metrics and observability

pub mod auth;
pub mod clients;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use clients::ServiceClients;
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Payment method recorded for kiosk redemptions
pub const OFFLINE_METHOD: &str = "Offline";

/// Round to 2 decimal places, half away from zero.
///
/// Every fee and duration that crosses a service boundary is normalized
/// through here, so stored and quoted amounts compare exactly.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_half_away_from_zero() {
        // 0.125 and 12.5 are exact in binary, so the tie is real
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(15.0), 15.0);
        assert_eq!(round2(0.0), 0.0);
    }
}
