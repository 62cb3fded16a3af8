use crate::models::{CommodityType, Schematic};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::{max, min};
use std::collections::BTreeMap;

pub const STORAGE_CAPACITY: f64 = 12_000.0;
pub const LAUNCHPAD_CAPACITY: f64 = 10_000.0;
pub const COMMAND_CENTER_CAPACITY: f64 = 500.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorState {
    pub product_type: Option<CommodityType>,
    pub base_value: i64,
    pub install_time: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
    pub cycle_time: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactoryState {
    pub schematic: Option<Schematic>,
    pub last_cycle_start_time: Option<DateTime<Utc>>,
    pub has_received_inputs: bool,
    pub received_inputs_last_cycle: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PinKind {
    Extractor(ExtractorState),
    Factory(FactoryState),
    Storage,
    Launchpad,
    CommandCenter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum PinStatus {
    NotSetup,
    Extracting,
    Producing,
    Idle,
    Expired,
    Static,
}

/// A single colony facility ("pin" in the EVE API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    pub id: i64,
    pub type_id: i64,
    pub kind: PinKind,
    pub status: PinStatus,
    pub is_active: bool,
    pub contents: BTreeMap<CommodityType, i64>,
    pub capacity_used: f64,
    pub last_run_time: Option<DateTime<Utc>>,
}

impl Pin {
    pub fn new(id: i64, type_id: i64, kind: PinKind) -> Pin {
        let status = match kind {
            PinKind::Extractor(_) | PinKind::Factory(_) => PinStatus::NotSetup,
            _ => PinStatus::Static,
        };
        Pin {
            id,
            type_id,
            kind,
            status,
            is_active: false,
            contents: BTreeMap::new(),
            capacity_used: 0.0,
            last_run_time: None,
        }
    }

    pub fn capacity(&self) -> Option<f64> {
        match self.kind {
            PinKind::Storage => Some(STORAGE_CAPACITY),
            PinKind::Launchpad => Some(LAUNCHPAD_CAPACITY),
            PinKind::CommandCenter => Some(COMMAND_CENTER_CAPACITY),
            PinKind::Extractor(_) | PinKind::Factory(_) => None,
        }
    }

    pub fn is_storage(&self) -> bool {
        matches!(
            self.kind,
            PinKind::Storage | PinKind::Launchpad | PinKind::CommandCenter
        )
    }

    pub fn is_consumer(&self) -> bool {
        matches!(self.kind, PinKind::Factory(_))
    }

    pub fn extractor_state(&self) -> Option<&ExtractorState> {
        match &self.kind {
            PinKind::Extractor(e) => Some(e),
            _ => None,
        }
    }

    pub fn factory_state(&self) -> Option<&FactoryState> {
        match &self.kind {
            PinKind::Factory(f) => Some(f),
            _ => None,
        }
    }

    pub fn factory_state_mut(&mut self) -> Option<&mut FactoryState> {
        match &mut self.kind {
            PinKind::Factory(f) => Some(f),
            _ => None,
        }
    }

    pub fn schematic(&self) -> Option<&Schematic> {
        self.factory_state().and_then(|f| f.schematic.as_ref())
    }

    /// One full batch of every schematic input is present in the buffer.
    pub fn has_enough_inputs(&self) -> bool {
        match self.schematic() {
            Some(schematic) => schematic
                .inputs
                .iter()
                .all(|(ctype, &required)| self.quantity(ctype) >= required),
            None => false,
        }
    }

    pub fn has_received_inputs(&self) -> bool {
        self.factory_state().is_some_and(|f| f.has_received_inputs)
    }

    /// Whether the pin may be (re)started by the scheduler.
    ///
    /// An idle factory that already holds a full input batch deliberately
    /// returns false: `next_run_time` signals that case as `None` and the
    /// scheduler runs it immediately.
    pub fn can_activate(&self) -> bool {
        match &self.kind {
            PinKind::Extractor(e) => self.is_active && e.product_type.is_some(),
            PinKind::Factory(f) => {
                f.schematic.is_some()
                    && (self.is_active
                        || f.has_received_inputs
                        || f.received_inputs_last_cycle
                        || !self.has_enough_inputs())
            }
            _ => true,
        }
    }

    /// The running-state predicate (distinct from the raw `is_active` flag).
    pub fn active(&self) -> bool {
        match &self.kind {
            PinKind::Extractor(e) => self.is_active && e.product_type.is_some(),
            PinKind::Factory(_) => self.is_active,
            _ => true,
        }
    }

    /// When this pin should next run. `None` means either "run immediately"
    /// (idle factory with a full input buffer) or "never scheduled yet".
    pub fn next_run_time(&self) -> Option<DateTime<Utc>> {
        match &self.kind {
            PinKind::Extractor(e) => {
                let cycle = Duration::seconds(e.cycle_time);
                self.last_run_time.map(|t| t + cycle)
            }
            PinKind::Factory(f) => {
                let schematic = f.schematic.as_ref()?;
                let cycle = Duration::seconds(schematic.cycle_time);
                if self.is_active {
                    if let Some(t0) = f.last_cycle_start_time {
                        return Some(t0 + cycle);
                    }
                } else if self.has_enough_inputs() {
                    return None;
                }
                self.last_run_time.map(|t| t + cycle)
            }
            _ => None,
        }
    }

    /// Whether the pin has work to do at or before `end_time`.
    ///
    /// An extractor that has never run has no cycle to anchor to and is
    /// ineligible; an idle factory holding a full input batch (`None` from
    /// `next_run_time`) runs immediately.
    pub fn can_run(&self, end_time: DateTime<Utc>) -> bool {
        match &self.kind {
            PinKind::Extractor(e) => {
                if e.product_type.is_none() {
                    return false;
                }
                match self.next_run_time() {
                    Some(t) => t <= end_time,
                    None => false,
                }
            }
            PinKind::Factory(f) => {
                if f.schematic.is_none() {
                    return false;
                }
                match self.next_run_time() {
                    Some(t) => t <= end_time,
                    None => true,
                }
            }
            _ => false,
        }
    }

    pub fn quantity(&self, ctype: &CommodityType) -> i64 {
        self.contents.get(ctype).copied().unwrap_or(0)
    }

    pub fn free_capacity(&self) -> f64 {
        match self.capacity() {
            Some(capacity) => f64::max(capacity - self.capacity_used, 0.0),
            None => f64::INFINITY,
        }
    }

    /// How many of `offered` units this pin will actually take.
    pub fn acceptance_limit(&self, ctype: &CommodityType, offered: i64) -> i64 {
        match &self.kind {
            PinKind::Factory(f) => {
                let Some(schematic) = &f.schematic else {
                    return 0;
                };
                match schematic.inputs.get(ctype) {
                    Some(&required) => min(offered, max(required - self.quantity(ctype), 0)),
                    None => 0,
                }
            }
            PinKind::Storage | PinKind::Launchpad | PinKind::CommandCenter => {
                if ctype.volume <= 0.0 {
                    return offered;
                }
                min(offered, (self.free_capacity() / ctype.volume) as i64)
            }
            PinKind::Extractor(_) => 0,
        }
    }

    pub fn add_commodity(&mut self, ctype: &CommodityType, quantity: i64) {
        if quantity <= 0 {
            return;
        }
        *self.contents.entry(ctype.clone()).or_insert(0) += quantity;
        self.capacity_used += ctype.volume * quantity as f64;
    }

    /// Removes up to `quantity` units, returning how many were removed.
    pub fn remove_commodity(&mut self, ctype: &CommodityType, quantity: i64) -> i64 {
        if quantity <= 0 {
            return 0;
        }
        let held = self.quantity(ctype);
        let removed = min(held, quantity);
        if removed == 0 {
            return 0;
        }
        if held == removed {
            self.contents.remove(ctype);
        } else {
            self.contents.insert(ctype.clone(), held - removed);
        }
        self.capacity_used = f64::max(self.capacity_used - ctype.volume * removed as f64, 0.0);
        removed
    }

    /// Takes the pin's entire holding of `ctype`.
    pub fn harvest(&mut self, ctype: &CommodityType) -> i64 {
        let held = self.quantity(ctype);
        self.remove_commodity(ctype, held)
    }

    /// Fraction of the schematic's input requirement currently buffered,
    /// in [0, 1]. Used as the routing sort key for processor routes.
    pub fn input_buffer_fullness(&self) -> f64 {
        let Some(schematic) = self.schematic() else {
            return 0.0;
        };
        let required: i64 = schematic.inputs.values().sum();
        if required == 0 {
            return 0.0;
        }
        let held: i64 = schematic
            .inputs
            .iter()
            .map(|(ctype, &req)| min(self.quantity(ctype), req))
            .sum();
        f64::min(held as f64 / required as f64, 1.0)
    }

    pub fn update_status(&mut self, now: DateTime<Utc>) {
        self.status = match &self.kind {
            PinKind::Extractor(e) => {
                if e.product_type.is_none() {
                    PinStatus::NotSetup
                } else if !self.is_active || e.expiry_time <= now {
                    PinStatus::Expired
                } else {
                    PinStatus::Extracting
                }
            }
            PinKind::Factory(f) => {
                if f.schematic.is_none() {
                    PinStatus::NotSetup
                } else if self.is_active {
                    PinStatus::Producing
                } else {
                    PinStatus::Idle
                }
            }
            _ => PinStatus::Static,
        };
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use maplit::btreemap;

    fn p1() -> CommodityType {
        CommodityType::new(2268, 0.38)
    }

    fn factory(schematic: Option<Schematic>) -> Pin {
        Pin::new(
            1,
            2473,
            PinKind::Factory(FactoryState {
                schematic,
                ..Default::default()
            }),
        )
    }

    fn schematic() -> Schematic {
        Schematic {
            schematic_id: 121,
            cycle_time: 3600,
            output_type: CommodityType::new(2398, 1.5),
            output_quantity: 5,
            inputs: btreemap! { p1() => 40 },
        }
    }

    #[test]
    fn test_volume_accounting() {
        let mut pin = Pin::new(7, 2544, PinKind::Launchpad);
        pin.add_commodity(&p1(), 100);
        assert!((pin.capacity_used - 38.0).abs() < crate::util::VOLUME_EPSILON);
        let removed = pin.remove_commodity(&p1(), 40);
        assert_eq!(removed, 40);
        assert!((pin.capacity_used - 22.8).abs() < crate::util::VOLUME_EPSILON);
        let removed = pin.remove_commodity(&p1(), 1000);
        assert_eq!(removed, 60);
        assert_eq!(pin.capacity_used, 0.0);
        assert!(pin.contents.is_empty());
    }

    #[test]
    fn test_storage_acceptance_clamped_by_capacity() {
        let mut pin = Pin::new(3, 2256, PinKind::CommandCenter);
        // 500 m3 / 0.38 m3 per unit = 1315 units
        assert_eq!(pin.acceptance_limit(&p1(), 10_000), 1315);
        pin.add_commodity(&p1(), 1315);
        // 0.3 m3 left, not enough for another unit
        assert_eq!(pin.acceptance_limit(&p1(), 10_000), 0);
    }

    #[test]
    fn test_factory_acceptance_only_schematic_inputs() {
        let pin = factory(Some(schematic()));
        assert_eq!(pin.acceptance_limit(&p1(), 100), 40);
        let other = CommodityType::new(9999, 1.0);
        assert_eq!(pin.acceptance_limit(&other, 100), 0);
    }

    #[test]
    fn test_factory_without_schematic_never_runnable() {
        let pin = factory(None);
        assert!(!pin.can_run(DateTime::<Utc>::MAX_UTC));
        assert!(!pin.can_activate());
        assert!(!pin.has_enough_inputs());
    }

    #[test]
    fn test_idle_factory_with_full_buffer_runs_immediately() {
        let mut pin = factory(Some(schematic()));
        pin.add_commodity(&p1(), 40);
        assert!(pin.has_enough_inputs());
        // run-now is signalled through next_run_time, not can_activate
        assert!(!pin.can_activate());
        assert_eq!(pin.next_run_time(), None);
        assert!(pin.can_run(DateTime::<Utc>::MIN_UTC));
    }

    #[test]
    fn test_storage_never_runnable() {
        let pin = Pin::new(4, 2541, PinKind::Storage);
        assert!(!pin.can_run(DateTime::<Utc>::MAX_UTC));
        assert_eq!(pin.next_run_time(), None);
    }

    #[test]
    fn test_input_buffer_fullness() {
        let mut pin = factory(Some(schematic()));
        assert_eq!(pin.input_buffer_fullness(), 0.0);
        pin.add_commodity(&p1(), 20);
        assert!((pin.input_buffer_fullness() - 0.5).abs() < 1e-12);
        pin.add_commodity(&p1(), 100);
        assert_eq!(pin.input_buffer_fullness(), 1.0);
    }
}
