//! Time helpers shared by the collector and the sink.

use chrono::Utc;

/// Returns the current Unix timestamp in nanoseconds.
///
/// Falls back to microsecond precision scaled up once the
/// nanosecond range (year 2262) is exceeded.
pub fn now_ns() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ns_is_after_2020_and_non_decreasing() {
        let a = now_ns();
        let b = now_ns();
        assert!(a > 1_577_836_800_000_000_000);
        assert!(b >= a);
    }
}
