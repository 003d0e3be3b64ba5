//! Fee schedule implementation for order book trading fees.

use serde::{Deserialize, Serialize};

/// Configurable flat-plus-percentage fee schedule applied to every accepted
/// `NewOrderSingle`, regardless of whether it rests, fills or partially
/// fills. Rejected orders are never charged.
///
/// `fee = fixed_fee + price * quantity * percentage_fee`
///
/// Both components are expressed in ticks (1 tick = $0.01) to match the
/// book's internal price representation.
///
/// # Examples
///
/// ```
/// use lob_server::orderbook::fees::FeeSchedule;
///
/// // $0.01 flat fee plus 10 bps of notional
/// let schedule = FeeSchedule::new(1, 0.001);
///
/// // Notional of 500 shares @ $100.00 = 5,000,000 ticks
/// let fee = schedule.calculate_fee(10_000, 500);
/// assert_eq!(fee, 1 + 5_000); // flat fee + 0.1% of notional
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Flat fee charged per accepted order, in ticks.
    pub fixed_fee: i64,
    /// Fraction of notional charged per accepted order (e.g. `0.001` = 10 bps).
    pub percentage_fee: f64,
}

impl FeeSchedule {
    /// Create a new fee schedule.
    #[must_use = "FeeSchedule does nothing unless used"]
    pub fn new(fixed_fee: i64, percentage_fee: f64) -> Self {
        Self {
            fixed_fee,
            percentage_fee,
        }
    }

    /// Fee assessed for an order of `quantity` at `price` (both in ticks).
    ///
    /// Always non-negative for sane (non-negative) inputs; there is no maker
    /// rebate in this schedule, unlike the bps-based schedules some venues use.
    #[must_use = "fee calculation result must be used"]
    #[inline]
    pub fn calculate_fee(&self, price: i64, quantity: u64) -> i64 {
        let notional = price as f64 * quantity as f64;
        self.fixed_fee + (notional * self.percentage_fee).round() as i64
    }

    /// A fee schedule that charges nothing.
    #[must_use]
    pub fn zero_fee() -> Self {
        Self::new(0, 0.0)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::zero_fee()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fee_charges_nothing() {
        let schedule = FeeSchedule::zero_fee();
        assert_eq!(schedule.calculate_fee(10_000, 5), 0);
    }

    #[test]
    fn flat_plus_percentage() {
        let schedule = FeeSchedule::new(5, 0.01);
        // notional = 10_000 * 3 = 30_000 ticks; 1% of that is 300
        assert_eq!(schedule.calculate_fee(10_000, 3), 5 + 300);
    }

    #[test]
    fn serialization_round_trip() {
        let schedule = FeeSchedule::new(2, 0.0025);
        let json = serde_json::to_string(&schedule).unwrap();
        let restored: FeeSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(schedule, restored);
    }
}
