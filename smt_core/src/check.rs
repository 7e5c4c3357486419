//! Post-condition helpers.

use tracing::debug;

/// `|expected - actual| < max_delta`.
pub fn within_tolerance(expected: f64, actual: f64, max_delta: f64) -> bool {
    let delta = (expected - actual).abs();
    let in_range = delta < max_delta;
    debug!(expected, actual, delta, max_delta, in_range, "tolerance check");
    in_range
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_bound() {
        assert!(within_tolerance(10.0, 10.2, 0.25));
        assert!(within_tolerance(10.0, 9.8, 0.25));
        assert!(!within_tolerance(10.0, 10.5, 0.5));
        assert!(!within_tolerance(0.0, 0.0, 0.0));
    }
}
