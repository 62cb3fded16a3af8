//! Compressed time-series of colony snapshots.

use crate::error::{Error, Result};
use crate::models::Colony;
use crate::sim::simulate;
use crate::util::CancelToken;
use chrono::Duration;
use std::collections::BTreeMap;

// Cap the timeline at 30 days of colony time.
const HORIZON_SECONDS: i64 = 30 * 24 * 3600;
const DEFAULT_INTERVAL_SECONDS: i64 = 360; // 0.1h
const MAX_SNAPSHOTS: usize = 300;

/// Simulates `colony` forward in half-cycle steps, returning snapshots
/// keyed by elapsed minutes. The series ends when an extractor program
/// expires, the colony halts, or the horizon is reached; the 0th entry is
/// the input state untouched.
pub fn generate_hourly_snapshots(
    colony: &Colony,
    cancel: &CancelToken,
) -> Result<BTreeMap<i64, Colony>> {
    let interval = sampling_interval(colony);
    let start = colony.current_sim_time;

    let mut snapshots = BTreeMap::new();
    snapshots.insert(0, colony.clone());
    let mut current = colony.clone();

    for i in 1.. {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let elapsed = i * interval;
        if elapsed >= HORIZON_SECONDS {
            break;
        }
        let target = start + Duration::seconds(elapsed);
        // an expiring program makes this the last sample worth taking
        let expiring = current.pins.values().any(|pin| {
            pin.active()
                && pin
                    .extractor_state()
                    .is_some_and(|e| e.expiry_time <= target)
        });
        current = simulate(&current, target);
        snapshots.insert((elapsed as f64 / 60.0).round() as i64, current.clone());
        if expiring || !current.is_working() {
            break;
        }
    }

    Ok(decimate(snapshots))
}

/// Half the shortest running cycle, in seconds.
fn sampling_interval(colony: &Colony) -> i64 {
    let mut min_cycle: Option<i64> = None;
    for pin in colony.pins.values() {
        let cycle = match (&pin.kind, pin.schematic()) {
            _ if !pin.active() => continue,
            (crate::models::PinKind::Extractor(e), _)
                if e.expiry_time > colony.current_sim_time && e.cycle_time > 0 =>
            {
                e.cycle_time
            }
            (crate::models::PinKind::Factory(_), Some(schematic)) if schematic.cycle_time > 0 => {
                schematic.cycle_time
            }
            _ => continue,
        };
        min_cycle = Some(min_cycle.map_or(cycle, |m: i64| m.min(cycle)));
    }
    min_cycle.map_or(DEFAULT_INTERVAL_SECONDS, |cycle| (cycle / 2).max(1))
}

/// Thins an over-long series to roughly `MAX_SNAPSHOTS`, always keeping the
/// first and last samples.
fn decimate(snapshots: BTreeMap<i64, Colony>) -> BTreeMap<i64, Colony> {
    let count = snapshots.len();
    if count <= MAX_SNAPSHOTS {
        return snapshots;
    }
    let stride = ((count as f64 / MAX_SNAPSHOTS as f64).round() as usize).max(1);
    let last_index = count - 1;
    snapshots
        .into_iter()
        .enumerate()
        .filter(|(index, _)| *index % stride == 0 || *index == last_index)
        .map(|(_, entry)| entry)
        .collect()
}
