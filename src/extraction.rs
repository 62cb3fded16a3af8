//! Closed-form extractor yield curve.
//!
//! An extractor program's per-cycle output is a time-decayed noisy
//! oscillation of its base value. The function is deterministic: the same
//! (base, cycle time, cycle index) always yields the same integer.

use chrono::{DateTime, Utc};
use std::cmp::max;

const DECAY_FACTOR: f64 = 0.012;
const NOISE_FACTOR: f64 = 0.8;
// One program "bar" spans 15 minutes of cycle time.
const BAR_SECONDS: f64 = 900.0;

/// Predicted output of 0-indexed cycle `n`.
pub fn predicted_output(base_value: i64, cycle_time: i64, cycle_index: i64) -> i64 {
    if cycle_time <= 0 || cycle_index < 0 {
        return 0;
    }
    let bar_width = cycle_time as f64 / BAR_SECONDS;
    let t = (cycle_index as f64 + 0.5) * bar_width;
    let decay = base_value as f64 / (1.0 + t * DECAY_FACTOR);
    let phase = (base_value as f64).powf(0.7);
    let sin_part = ((phase + t / 12.0).cos() + (phase / 2.0 + t / 5.0).cos() + (t / 2.0).cos())
        / 3.0;
    let sin_part = f64::max(sin_part, 0.0);
    let bar_height = decay * (1.0 + NOISE_FACTOR * sin_part);
    f64::floor(bar_width * bar_height) as i64
}

/// Output of the cycle that completes at `now`.
pub fn program_output(
    base_value: i64,
    install_time: DateTime<Utc>,
    now: DateTime<Utc>,
    cycle_time: i64,
) -> i64 {
    if cycle_time <= 0 {
        return 0;
    }
    let elapsed = (now - install_time).num_seconds() + 1;
    let cycle_index = max(elapsed.div_euclid(cycle_time) - 1, 0);
    predicted_output(base_value, cycle_time, cycle_index)
}

/// The whole program's predicted outputs, one entry per cycle.
pub fn program_output_prediction(base_value: i64, cycle_time: i64, num_cycles: i64) -> Vec<i64> {
    (0..max(num_cycles, 0))
        .map(|n| predicted_output(base_value, cycle_time, n))
        .collect()
}

/// 0-indexed cycle a running program is in at `now`, or -1 once expired.
pub fn current_cycle_index(
    install_time: DateTime<Utc>,
    expiry_time: DateTime<Utc>,
    now: DateTime<Utc>,
    cycle_time: i64,
) -> i64 {
    if cycle_time <= 0 {
        return -1;
    }
    let cycle_index = (now - install_time).num_seconds().div_euclid(cycle_time);
    let total_cycles = (expiry_time - install_time)
        .num_seconds()
        .div_euclid(cycle_time)
        - 1;
    if cycle_index <= total_cycles {
        cycle_index
    } else {
        -1
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ts(seconds: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(seconds, 0).unwrap()
    }

    #[test]
    fn test_yield_curve_sanity() {
        let prediction = program_output_prediction(1000, 3600, 5);
        assert_eq!(prediction.len(), 5);
        for (n, &output) in prediction.iter().enumerate() {
            assert!(output >= 0, "cycle {} yielded {}", n, output);
            // decay <= base, sin_part <= 1, bar_width = 4
            assert!(output <= (4.0 * 1000.0 * 1.8) as i64);
        }
    }

    #[test]
    fn test_prediction_matches_runtime_query() {
        let base = 73_251;
        let cycle_time = 7200;
        let prediction = program_output_prediction(base, cycle_time, 10);
        for (i, &expected) in prediction.iter().enumerate() {
            let now = ts((i as i64 + 1) * cycle_time);
            assert_eq!(program_output(base, ts(0), now, cycle_time), expected);
        }
    }

    #[test]
    fn test_zero_base_yields_nothing() {
        assert_eq!(predicted_output(0, 3600, 0), 0);
        assert_eq!(program_output(0, ts(0), ts(3600), 3600), 0);
    }

    #[test]
    fn test_first_cycle_index_clamped() {
        // half a cycle in, the "completed cycle" clamps to index 0
        assert_eq!(
            program_output(500, ts(0), ts(450), 900),
            predicted_output(500, 900, 0)
        );
    }

    #[test]
    fn test_current_cycle_index() {
        let install = ts(0);
        let expiry = ts(9000); // 10 cycles of 900s
        assert_eq!(current_cycle_index(install, expiry, ts(0), 900), 0);
        assert_eq!(current_cycle_index(install, expiry, ts(4500), 900), 5);
        assert_eq!(current_cycle_index(install, expiry, ts(8999), 900), 9);
        // past the final cycle: expired
        assert_eq!(current_cycle_index(install, expiry, ts(9000), 900), -1);
    }

    #[test]
    fn test_degenerate_cycle_time() {
        assert_eq!(predicted_output(1000, 0, 3), 0);
        assert_eq!(current_cycle_index(ts(0), ts(100), ts(10), 0), -1);
    }
}
