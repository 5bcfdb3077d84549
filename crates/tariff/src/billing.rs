//! Fee computation
//!
//! `fee = round2(max(0, minutes - free_minutes) / 60 * hourly_rate)`,
//! rounded half away from zero. Minutes inside the free allowance cost
//! nothing; the allowance is a threshold, not a discount on every hour.

use parkforge_common::round2;

/// Compute the fee for an elapsed duration under a tariff
pub fn compute_fee(minutes: f64, hourly_rate: f64, free_minutes: i32) -> f64 {
    let billable = (minutes - f64::from(free_minutes)).max(0.0);
    round2(billable / 60.0 * hourly_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_scenario() {
        // 32 minutes at rate 30 with 2 free: (32 - 2) / 60 * 30 = 15.00
        assert_eq!(compute_fee(32.0, 30.0, 2), 15.0);
    }

    #[test]
    fn test_free_allowance_is_free() {
        assert_eq!(compute_fee(0.0, 30.0, 2), 0.0);
        assert_eq!(compute_fee(1.5, 30.0, 2), 0.0);
        assert_eq!(compute_fee(2.0, 30.0, 2), 0.0);
    }

    #[test]
    fn test_just_past_allowance() {
        // (3 - 2) / 60 * 30 = 0.5
        assert_eq!(compute_fee(3.0, 30.0, 2), 0.5);
    }

    #[test]
    fn test_no_free_minutes() {
        assert_eq!(compute_fee(60.0, 30.0, 0), 30.0);
        assert_eq!(compute_fee(90.0, 20.0, 0), 30.0);
    }

    #[test]
    fn test_rounding_is_half_up() {
        // 0.25 / 60 * 30 = 0.125 exactly; half away from zero gives 0.13
        assert_eq!(compute_fee(0.25, 30.0, 0), 0.13);
    }

    #[test]
    fn test_monotonically_non_decreasing() {
        let mut last = 0.0;
        for tenth in 0..6000 {
            let minutes = f64::from(tenth) / 10.0;
            let fee = compute_fee(minutes, 30.0, 2);
            assert!(
                fee >= last,
                "fee decreased at {} minutes: {} < {}",
                minutes,
                fee,
                last
            );
            last = fee;
        }
    }
}
