//! Event-driven colony simulator.
//!
//! `simulate` advances a deep clone of a colony from its snapshot time to a
//! target time, deciding which pin runs when and moving commodities along
//! routes. The pass is strictly sequential over a (time, pin id) ordered
//! event queue, so identical inputs always produce identical output.

pub mod event_queue;
mod routing;
pub mod snapshots;

pub use event_queue::{Event, EventQueue};

use crate::extraction;
use crate::models::{Colony, CommodityType, Pin, PinKind};
use chrono::{DateTime, Duration, Utc};
use std::cmp::{max, min};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const HALT_CHECK_STRIDE: u64 = 50;
const PROGRESS_EVENT_STRIDE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryRun {
    NotProduced,
    StartedCycle,
    CompletedCycle,
}

/// Simulates `colony` forward to `end_time`, returning the mutated clone.
pub fn simulate(colony: &Colony, end_time: DateTime<Utc>) -> Colony {
    simulate_with_progress(colony, end_time, |_| {})
}

/// Simulates forward until the colony halts on its own.
pub fn simulate_to_halt(colony: &Colony) -> Colony {
    simulate_with_progress(colony, DateTime::<Utc>::MAX_UTC, |_| {})
}

pub fn simulate_with_progress(
    colony: &Colony,
    end_time: DateTime<Utc>,
    mut on_progress: impl FnMut(f64),
) -> Colony {
    let mut sim = colony.clone();
    let start_time = sim.current_sim_time;
    let mut queue = EventQueue::new();

    settle_overdue_factories(&mut sim, &mut queue);

    // Seed the queue: factories already mid-cycle wake at their cycle end,
    // everything else runnable before the target gets scheduled now.
    let now = sim.current_sim_time;
    let pin_ids: Vec<i64> = sim.pins.keys().copied().collect();
    for pin_id in pin_ids {
        let pin = &sim.pins[&pin_id];
        if pin.is_storage() {
            continue;
        }
        let mid_cycle_end = match (&pin.kind, pin.schematic()) {
            (PinKind::Factory(f), Some(schematic)) if pin.is_active => f
                .last_cycle_start_time
                .map(|t0| t0 + Duration::seconds(schematic.cycle_time)),
            _ => None,
        };
        match mid_cycle_end {
            Some(cycle_end) if cycle_end > now => queue.upsert(pin_id, cycle_end),
            _ => {
                if pin.can_run(end_time) {
                    schedule(&sim, &mut queue, pin_id, now);
                }
            }
        }
    }

    let run_to_halt = end_time == DateTime::<Utc>::MAX_UTC;
    let halt_stride = if run_to_halt { 1 } else { HALT_CHECK_STRIDE };
    let total_span = max((end_time - start_time).num_seconds(), 1);
    let mut sim_end_time: Option<DateTime<Utc>> = None;
    let mut last_event_time: Option<DateTime<Utc>> = None;
    let mut last_progress = 0.0;
    let mut processed: u64 = 0;

    while let Some(event) = queue.pop_front() {
        if event.time > end_time {
            break;
        }
        if sim_end_time.is_some_and(|halt| event.time > halt) {
            break;
        }
        sim.current_sim_time = event.time;
        last_event_time = Some(event.time);
        processed += 1;

        if !run_to_halt {
            let progress =
                ((event.time - start_time).num_seconds() as f64 / total_span as f64).clamp(0.0, 1.0);
            if processed % PROGRESS_EVENT_STRIDE == 0 || progress - last_progress >= 0.01 {
                on_progress(progress);
                last_progress = progress;
            }
        }

        let Some(pin) = sim.pins.get(&event.pin_id) else {
            continue;
        };
        let ready_factory = pin.is_consumer() && pin.has_enough_inputs();
        if !(pin.can_activate() || pin.active()) && !ready_factory {
            continue;
        }

        if pin.can_run(end_time) {
            let mut commodities = run_pin(&mut sim, &mut queue, event.pin_id, event.time);
            let pin = &sim.pins[&event.pin_id];
            if pin.is_consumer() {
                routing::route_inputs(&mut sim, &mut queue, event.pin_id, event.time);
            }
            let pin = &sim.pins[&event.pin_id];
            if pin.active() || pin.can_activate() {
                schedule(&sim, &mut queue, event.pin_id, event.time);
            }
            if !commodities.is_empty() {
                let mut seen = BTreeSet::new();
                routing::route_commodities(
                    &mut sim,
                    &mut queue,
                    event.pin_id,
                    &mut commodities,
                    event.time,
                    &mut seen,
                );
            }
        } else {
            let pin = &sim.pins[&event.pin_id];
            if pin.can_activate() || pin.active() {
                schedule(&sim, &mut queue, event.pin_id, event.time);
            }
        }

        if processed % halt_stride == 0 {
            let now = sim.current_sim_time;
            for pin in sim.pins.values_mut() {
                pin.update_status(now);
            }
            if !sim.is_working() {
                debug!("Colony {} halted at {}", sim.id, now);
                sim_end_time = Some(event.time);
                break;
            }
        }
    }

    let natural_end = if run_to_halt {
        last_event_time.unwrap_or(start_time)
    } else {
        end_time
    };
    sim.current_sim_time = min(sim_end_time.unwrap_or(natural_end), natural_end);

    // Safety net: an idle factory holding a full batch starts a cycle at
    // the final timestamp rather than being left runnable.
    let final_time = sim.current_sim_time;
    let ready: Vec<i64> = sim
        .pins
        .iter()
        .filter(|(_, pin)| pin.is_consumer() && !pin.is_active && pin.has_enough_inputs())
        .map(|(&id, _)| id)
        .collect();
    for pin_id in ready {
        let _ = run_factory(&mut sim, &mut queue, pin_id, final_time);
    }

    sim.update_status();
    on_progress(1.0);
    sim
}

/// Deposits and routes the batch of every factory whose cycle already ended
/// at or before the snapshot time.
fn settle_overdue_factories(sim: &mut Colony, queue: &mut EventQueue) {
    let now = sim.current_sim_time;
    let overdue: Vec<i64> = sim
        .pins
        .iter()
        .filter(|(_, pin)| {
            pin.is_active
                && match (pin.factory_state(), pin.schematic()) {
                    (Some(f), Some(schematic)) => f
                        .last_cycle_start_time
                        .is_some_and(|t0| t0 + Duration::seconds(schematic.cycle_time) <= now),
                    _ => false,
                }
        })
        .map(|(&id, _)| id)
        .collect();
    for pin_id in overdue {
        let schematic = sim.pins[&pin_id].schematic().cloned().unwrap();
        let harvested = {
            let pin = sim.pins.get_mut(&pin_id).unwrap();
            pin.add_commodity(&schematic.output_type, schematic.output_quantity);
            pin.factory_state_mut().unwrap().last_cycle_start_time = None;
            pin.remove_commodity(&schematic.output_type, schematic.output_quantity)
        };
        let mut commodities = BTreeMap::from([(schematic.output_type.clone(), harvested)]);
        let mut seen = BTreeSet::new();
        routing::route_commodities(sim, queue, pin_id, &mut commodities, now, &mut seen);
    }
}

/// Computes the pin's next wake-up and (re)inserts its event. Times are
/// clamped to at least one second past `now` so the loop always advances.
pub(crate) fn schedule(colony: &Colony, queue: &mut EventQueue, pin_id: i64, now: DateTime<Utc>) {
    let Some(pin) = colony.pins.get(&pin_id) else {
        return;
    };
    if pin.is_storage() {
        return;
    }
    let floor = now + Duration::seconds(1);
    let scheduled = if pin.is_consumer() && pin.has_received_inputs() && !pin.has_enough_inputs() {
        // inputs are trickling in; wait out a full cycle instead of
        // busy-looping on every delivery
        match (pin.last_run_time, pin.schematic()) {
            (Some(last_run), Some(schematic)) => {
                max(last_run + Duration::seconds(schematic.cycle_time), floor)
            }
            _ => floor,
        }
    } else {
        match pin.next_run_time() {
            Some(t) => max(t, floor),
            None => floor,
        }
    };
    queue.upsert(pin_id, scheduled);
}

fn run_pin(
    sim: &mut Colony,
    queue: &mut EventQueue,
    pin_id: i64,
    now: DateTime<Utc>,
) -> BTreeMap<CommodityType, i64> {
    match sim.pins.get(&pin_id).map(|pin| &pin.kind) {
        Some(PinKind::Extractor(_)) => {
            let pin = sim.pins.get_mut(&pin_id).unwrap();
            run_extractor(pin, now)
        }
        Some(PinKind::Factory(_)) => run_factory(sim, queue, pin_id, now).1,
        _ => BTreeMap::new(),
    }
}

/// Runs one extractor cycle ending at `now` and harvests the yield for
/// routing. An expired program yields nothing and deactivates.
fn run_extractor(pin: &mut Pin, now: DateTime<Utc>) -> BTreeMap<CommodityType, i64> {
    let PinKind::Extractor(state) = &pin.kind else {
        return BTreeMap::new();
    };
    let Some(product) = state.product_type.clone() else {
        return BTreeMap::new();
    };
    let expired = state.expiry_time <= now;
    let output = if expired {
        0
    } else {
        extraction::program_output(state.base_value, state.install_time, now, state.cycle_time)
    };
    pin.add_commodity(&product, output);
    pin.last_run_time = Some(now);
    if expired {
        pin.is_active = false;
    }
    let harvested = pin.harvest(&product);
    if harvested > 0 {
        BTreeMap::from([(product, harvested)])
    } else {
        BTreeMap::new()
    }
}

/// Advances a factory at `now`, returning what happened and any completed
/// batch harvested for routing.
fn run_factory(
    sim: &mut Colony,
    queue: &mut EventQueue,
    pin_id: i64,
    now: DateTime<Utc>,
) -> (FactoryRun, BTreeMap<CommodityType, i64>) {
    let Some(pin) = sim.pins.get(&pin_id) else {
        return (FactoryRun::NotProduced, BTreeMap::new());
    };
    let Some(schematic) = pin.schematic().cloned() else {
        return (FactoryRun::NotProduced, BTreeMap::new());
    };
    let cycle = Duration::seconds(schematic.cycle_time);

    let in_cycle_since = if pin.is_active {
        pin.factory_state().and_then(|f| f.last_cycle_start_time)
    } else {
        None
    };
    if let Some(t0) = in_cycle_since {
        if now < t0 + cycle {
            return (FactoryRun::StartedCycle, BTreeMap::new());
        }
        // cycle complete: deposit the batch, go idle, then try to restart
        {
            let pin = sim.pins.get_mut(&pin_id).unwrap();
            pin.add_commodity(&schematic.output_type, schematic.output_quantity);
            pin.factory_state_mut().unwrap().last_cycle_start_time = None;
            pin.is_active = false;
            pin.last_run_time = Some(now);
        }
        routing::refill_inputs(sim, queue, pin_id, now);
        if sim.pins[&pin_id].has_enough_inputs() {
            start_cycle(sim, pin_id, now);
            routing::refill_inputs(sim, queue, pin_id, now);
        }
        let harvested = sim
            .pins
            .get_mut(&pin_id)
            .unwrap()
            .remove_commodity(&schematic.output_type, schematic.output_quantity);
        let commodities = if harvested > 0 {
            BTreeMap::from([(schematic.output_type.clone(), harvested)])
        } else {
            BTreeMap::new()
        };
        return (FactoryRun::CompletedCycle, commodities);
    }

    let pin = &sim.pins[&pin_id];
    let enough = pin.has_enough_inputs();
    if let Some(last_run) = pin.last_run_time {
        if now < last_run + cycle && !enough {
            return (FactoryRun::NotProduced, BTreeMap::new());
        }
    }
    if enough {
        start_cycle(sim, pin_id, now);
        routing::refill_inputs(sim, queue, pin_id, now);
        (FactoryRun::StartedCycle, BTreeMap::new())
    } else {
        let pin = sim.pins.get_mut(&pin_id).unwrap();
        pin.is_active = false;
        pin.last_run_time = Some(now);
        let factory = pin.factory_state_mut().unwrap();
        factory.received_inputs_last_cycle = factory.has_received_inputs;
        factory.has_received_inputs = false;
        (FactoryRun::NotProduced, BTreeMap::new())
    }
}

/// Consumes one input batch and marks the factory mid-cycle as of `now`.
fn start_cycle(sim: &mut Colony, pin_id: i64, now: DateTime<Utc>) {
    let pin = sim.pins.get_mut(&pin_id).unwrap();
    let schematic = pin.schematic().cloned().unwrap();
    for (ctype, &quantity) in &schematic.inputs {
        pin.remove_commodity(ctype, quantity);
    }
    pin.is_active = true;
    pin.last_run_time = Some(now);
    let factory = pin.factory_state_mut().unwrap();
    factory.last_cycle_start_time = Some(now);
    factory.received_inputs_last_cycle = factory.has_received_inputs;
    factory.has_received_inputs = false;
}
