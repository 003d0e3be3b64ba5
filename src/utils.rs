//! Small time helpers shared across the order book, protocol codec and persistence layer.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in nanoseconds since the Unix epoch.
///
/// Used to timestamp orders and to drive price-time priority (`Order::timestamp`).
/// Relies on `SystemTime`, which is monotonic enough for a single process: two
/// calls in direct succession may return the same value but never go backwards
/// on platforms Rust supports as a first tier target.
pub fn current_time_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Used for the FIX-style `sending_time` header field and for snapshot/persistence
/// file naming.
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Current wall-clock time in microseconds since the Unix epoch.
///
/// FIX 4.4's `SendingTime` (tag 52) is conventionally carried with microsecond
/// precision; kept separate from [`current_time_millis`] so callers that need
/// the wire format don't have to multiply by 1000 themselves.
pub fn current_time_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Round a floating-point price to the nearest cent and return it as an
/// integer number of ticks (1 tick = $0.01).
///
/// Mirrors the Python reference's `round(price, 2)` at order-creation time
/// (see `Order.__init__`), but fixes the rounding into an integer
/// representation so that all downstream arithmetic (fills, fees, balances)
/// is exact.
pub fn price_to_ticks(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

/// Convert an integer tick price back into a floating-point dollar amount.
pub fn ticks_to_price(ticks: i64) -> f64 {
    ticks as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_nearest_cent() {
        assert_eq!(price_to_ticks(100.005), 10001);
        assert_eq!(price_to_ticks(100.0), 10000);
        assert_eq!(price_to_ticks(99.999), 10000);
    }

    #[test]
    fn ticks_round_trip() {
        assert_eq!(ticks_to_price(price_to_ticks(102.5)), 102.5);
    }

    #[test]
    fn timestamps_are_nonzero() {
        assert!(current_time_ns() > 0);
        assert!(current_time_millis() > 0);
        assert!(current_time_micros() > 0);
    }
}
