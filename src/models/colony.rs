use crate::api_client::api_models::PlanetDetail;
use crate::models::{
    CommodityType, ExtractorState, FactoryState, Pin, PinKind, Route, Schematic,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum ColonyStatus {
    NotSetup,
    Working,
    Halted,
}

/// Occupancy of the storage pins that final products are routed into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalProductStorage {
    pub capacity: f64,
    pub final_products_used: f64,
    pub other_used: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColonyOverview {
    pub producing: BTreeSet<CommodityType>,
    pub extracting: BTreeSet<CommodityType>,
    pub consuming: BTreeSet<CommodityType>,
    pub final_products: BTreeSet<CommodityType>,
    pub storage: FinalProductStorage,
}

/// How a pin type id maps onto the facility variants. Resolved from static
/// data by the caller; the colony model itself stays database-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinClass {
    Extractor,
    Factory,
    Storage,
    Launchpad,
    CommandCenter,
}

/// An owned set of pins and routes on a single planet. The simulator deep
/// clones a colony before mutating, so the caller's copy stays pristine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Colony {
    pub id: i64,
    pub current_sim_time: DateTime<Utc>,
    pub pins: BTreeMap<i64, Pin>,
    pub routes: Vec<Route>,
    pub status: ColonyStatus,
    pub overview: ColonyOverview,
}

impl Colony {
    pub fn new(id: i64, current_sim_time: DateTime<Utc>) -> Colony {
        Colony {
            id,
            current_sim_time,
            pins: BTreeMap::new(),
            routes: Vec::new(),
            status: ColonyStatus::NotSetup,
            overview: ColonyOverview::default(),
        }
    }

    /// Work remains: a live extractor, or a factory that is mid-cycle or
    /// holds a full input batch.
    pub fn is_working(&self) -> bool {
        let extracting = self.pins.values().any(|pin| match pin.extractor_state() {
            Some(e) => pin.active() && e.expiry_time > self.current_sim_time,
            None => false,
        });
        let producing = self
            .pins
            .values()
            .any(|pin| pin.is_consumer() && (pin.active() || pin.has_enough_inputs()));
        extracting || producing
    }

    pub fn update_status(&mut self) {
        let now = self.current_sim_time;
        for pin in self.pins.values_mut() {
            pin.update_status(now);
        }
        let configured = self.pins.values().any(|pin| {
            pin.extractor_state()
                .is_some_and(|e| e.product_type.is_some())
                || pin.schematic().is_some()
        });
        self.status = if !configured {
            ColonyStatus::NotSetup
        } else if self.is_working() {
            ColonyStatus::Working
        } else {
            ColonyStatus::Halted
        };
        self.overview = self.compute_overview();
    }

    fn compute_overview(&self) -> ColonyOverview {
        let mut producing = BTreeSet::new();
        let mut extracting = BTreeSet::new();
        let mut consuming = BTreeSet::new();
        for pin in self.pins.values() {
            if let Some(schematic) = pin.schematic() {
                producing.insert(schematic.output_type.clone());
                for input in schematic.inputs.keys() {
                    consuming.insert(input.clone());
                }
            }
            if let Some(product) = pin.extractor_state().and_then(|e| e.product_type.as_ref()) {
                extracting.insert(product.clone());
            }
        }
        let final_products: BTreeSet<CommodityType> = producing
            .union(&extracting)
            .filter(|ctype| !consuming.contains(*ctype))
            .cloned()
            .collect();

        // Storage pins on the receiving end of final-product routes.
        let destinations: BTreeSet<i64> = self
            .routes
            .iter()
            .filter(|route| final_products.contains(&route.commodity))
            .filter(|route| {
                self.pins
                    .get(&route.destination_id)
                    .is_some_and(|pin| pin.is_storage())
            })
            .map(|route| route.destination_id)
            .collect();
        let mut storage = FinalProductStorage::default();
        for id in &destinations {
            let pin = &self.pins[id];
            storage.capacity += pin.capacity().unwrap_or(0.0);
            for (ctype, &quantity) in &pin.contents {
                let used = ctype.volume * quantity as f64;
                if final_products.contains(ctype) {
                    storage.final_products_used += used;
                } else {
                    storage.other_used += used;
                }
            }
        }

        ColonyOverview {
            producing,
            extracting,
            consuming,
            final_products,
            storage,
        }
    }

    /// Builds a colony from a fetched planetary detail payload.
    ///
    /// `types` and `schematics` come from static data; `classify` maps a pin
    /// type id onto its facility variant. An extractor whose timestamps fail
    /// to parse is kept but inactive, yielding nothing.
    pub fn from_planet_detail(
        planet_id: i64,
        detail: &PlanetDetail,
        types: &BTreeMap<i64, CommodityType>,
        schematics: &BTreeMap<i64, Schematic>,
        classify: impl Fn(i64) -> PinClass,
        default_sim_time: DateTime<Utc>,
    ) -> Colony {
        let current_sim_time = parse_time(detail.current_sim_time.as_deref(), planet_id, "simTime")
            .unwrap_or(default_sim_time);
        let mut colony = Colony::new(planet_id, current_sim_time);

        for payload in &detail.pins {
            let lookup_type = |type_id: i64| -> CommodityType {
                types.get(&type_id).cloned().unwrap_or_else(|| {
                    warn!("No type data for {}, assuming zero volume", type_id);
                    CommodityType::new(type_id, 0.0)
                })
            };
            let mut pin = match classify(payload.type_id) {
                PinClass::Extractor => {
                    let details = payload.extractor_details.as_ref();
                    let install = parse_time(payload.install_time.as_deref(), payload.pin_id, "install");
                    let expiry = parse_time(payload.expiry_time.as_deref(), payload.pin_id, "expiry");
                    let times_ok = install.is_some() && expiry.is_some();
                    let product_type = details
                        .and_then(|d| d.product_type_id)
                        .map(lookup_type);
                    let state = ExtractorState {
                        product_type: product_type.clone(),
                        base_value: details.and_then(|d| d.qty_per_cycle).unwrap_or(0),
                        install_time: install.unwrap_or(DateTime::<Utc>::MIN_UTC),
                        expiry_time: expiry.unwrap_or(DateTime::<Utc>::MIN_UTC),
                        cycle_time: details.and_then(|d| d.cycle_time).unwrap_or(0),
                    };
                    let mut pin = Pin::new(payload.pin_id, payload.type_id, PinKind::Extractor(state));
                    pin.is_active = times_ok && product_type.is_some();
                    // a running program without a reported cycle start is
                    // anchored to its install time
                    pin.last_run_time =
                        parse_time(payload.last_cycle_start.as_deref(), payload.pin_id, "cycleStart")
                            .or(if pin.is_active { install } else { None });
                    pin
                }
                PinClass::Factory => {
                    let schematic = payload.schematic_id.and_then(|id| {
                        let found = schematics.get(&id).cloned();
                        if found.is_none() {
                            warn!("No schematic {} for pin {}", id, payload.pin_id);
                        }
                        found
                    });
                    let last_cycle_start =
                        parse_time(payload.last_cycle_start.as_deref(), payload.pin_id, "cycleStart");
                    let running = schematic.is_some() && last_cycle_start.is_some();
                    let state = FactoryState {
                        schematic,
                        last_cycle_start_time: if running { last_cycle_start } else { None },
                        has_received_inputs: false,
                        received_inputs_last_cycle: false,
                    };
                    let mut pin = Pin::new(payload.pin_id, payload.type_id, PinKind::Factory(state));
                    pin.is_active = running;
                    pin.last_run_time = last_cycle_start;
                    pin
                }
                PinClass::Storage => Pin::new(payload.pin_id, payload.type_id, PinKind::Storage),
                PinClass::Launchpad => Pin::new(payload.pin_id, payload.type_id, PinKind::Launchpad),
                PinClass::CommandCenter => {
                    Pin::new(payload.pin_id, payload.type_id, PinKind::CommandCenter)
                }
            };
            if pin.last_run_time.is_none() {
                pin.last_run_time =
                    parse_time(payload.last_cycle_start.as_deref(), payload.pin_id, "cycleStart");
            }
            for content in &payload.contents {
                pin.add_commodity(&lookup_type(content.type_id), content.amount);
            }
            colony.pins.insert(pin.id, pin);
        }

        for payload in &detail.routes {
            if payload.source_pin_id == payload.destination_pin_id {
                warn!("Dropping self-route on pin {}", payload.source_pin_id);
                continue;
            }
            let quantity = payload.quantity as i64;
            if quantity < 1 {
                warn!("Dropping empty route {}", payload.route_id);
                continue;
            }
            let commodity = types
                .get(&payload.content_type_id)
                .cloned()
                .unwrap_or_else(|| CommodityType::new(payload.content_type_id, 0.0));
            colony.routes.push(Route {
                source_id: payload.source_pin_id,
                destination_id: payload.destination_pin_id,
                commodity,
                quantity,
            });
        }

        colony.update_status();
        colony
    }
}

fn parse_time(value: Option<&str>, id: i64, what: &str) -> Option<DateTime<Utc>> {
    let raw = value?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(err) => {
            warn!("Unparseable {} time {:?} on {}: {}", what, raw, id, err);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use maplit::btreemap;

    fn ctype(id: i64, volume: f64) -> CommodityType {
        CommodityType::new(id, volume)
    }

    fn extractor(id: i64, product: CommodityType, expiry_s: i64) -> Pin {
        let mut pin = Pin::new(
            id,
            2848,
            PinKind::Extractor(ExtractorState {
                product_type: Some(product),
                base_value: 500,
                install_time: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
                expiry_time: DateTime::<Utc>::from_timestamp(expiry_s, 0).unwrap(),
                cycle_time: 900,
            }),
        );
        pin.is_active = true;
        pin
    }

    #[test]
    fn test_overview_final_products() {
        let p0 = ctype(2268, 0.01);
        let p1 = ctype(2398, 0.38);
        let mut colony = Colony::new(1, DateTime::<Utc>::from_timestamp(0, 0).unwrap());
        colony.pins.insert(1, extractor(1, p0.clone(), 86400));
        let mut factory = Pin::new(
            2,
            2473,
            PinKind::Factory(FactoryState {
                schematic: Some(Schematic {
                    schematic_id: 1,
                    cycle_time: 1800,
                    output_type: p1.clone(),
                    output_quantity: 20,
                    inputs: btreemap! { p0.clone() => 3000 },
                }),
                ..Default::default()
            }),
        );
        let mut launchpad = Pin::new(3, 2544, PinKind::Launchpad);
        launchpad.add_commodity(&p1, 100);
        launchpad.add_commodity(&p0, 10);
        factory.update_status(colony.current_sim_time);
        colony.pins.insert(2, factory);
        colony.pins.insert(3, launchpad);
        colony.routes.push(Route::new(2, 3, p1.clone(), 20));
        colony.update_status();

        assert_eq!(colony.status, ColonyStatus::Working);
        assert!(colony.overview.extracting.contains(&p0));
        assert!(colony.overview.producing.contains(&p1));
        assert!(colony.overview.consuming.contains(&p0));
        assert_eq!(
            colony.overview.final_products.iter().collect::<Vec<_>>(),
            vec![&p1]
        );
        let storage = &colony.overview.storage;
        assert_eq!(storage.capacity, crate::models::LAUNCHPAD_CAPACITY);
        assert!((storage.final_products_used - 38.0).abs() < 1e-9);
        assert!((storage.other_used - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_build_from_detail_with_bad_timestamp() {
        use crate::api_client::api_models::{
            ExtractorDetails, PinContent, PlanetPin, PlanetRoute,
        };

        fn pin_payload(pin_id: i64, type_id: i64) -> PlanetPin {
            PlanetPin {
                pin_id,
                type_id,
                schematic_id: None,
                extractor_details: None,
                install_time: None,
                expiry_time: None,
                last_cycle_start: None,
                contents: vec![],
                latitude: None,
                longitude: None,
            }
        }

        let detail = PlanetDetail {
            pins: vec![
                PlanetPin {
                    extractor_details: Some(ExtractorDetails {
                        cycle_time: Some(1800),
                        product_type_id: Some(2268),
                        qty_per_cycle: Some(1081),
                        head_radius: None,
                        heads: vec![],
                    }),
                    install_time: Some("not-a-timestamp".to_string()),
                    expiry_time: Some("2024-05-15T10:00:00Z".to_string()),
                    ..pin_payload(1, 2848)
                },
                PlanetPin {
                    contents: vec![PinContent {
                        type_id: 2268,
                        amount: 500,
                    }],
                    ..pin_payload(2, 2544)
                },
            ],
            routes: vec![PlanetRoute {
                route_id: 1,
                source_pin_id: 1,
                destination_pin_id: 2,
                content_type_id: 2268,
                quantity: 3000.0,
                waypoints: vec![],
            }],
            links: vec![],
            current_sim_time: Some("2024-05-02T10:00:00Z".to_string()),
        };
        let types = btreemap! { 2268 => ctype(2268, 0.01) };
        let classify = |type_id: i64| match type_id {
            2848 => PinClass::Extractor,
            _ => PinClass::Launchpad,
        };
        let colony = Colony::from_planet_detail(
            40_001_234,
            &detail,
            &types,
            &BTreeMap::new(),
            classify,
            DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
        );

        // unparseable install time degrades the extractor to inactive
        let extractor = &colony.pins[&1];
        assert!(!extractor.is_active);
        assert!(!extractor.can_run(DateTime::<Utc>::MAX_UTC));

        let launchpad = &colony.pins[&2];
        assert_eq!(launchpad.quantity(&ctype(2268, 0.0)), 500);
        assert!((launchpad.capacity_used - 5.0).abs() < 1e-9);

        assert_eq!(colony.routes.len(), 1);
        assert_eq!(colony.routes[0].quantity, 3000);
        assert_eq!(
            colony.current_sim_time,
            DateTime::parse_from_rfc3339("2024-05-02T10:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_expired_colony_is_halted() {
        let p0 = ctype(2268, 0.01);
        let mut colony = Colony::new(1, DateTime::<Utc>::from_timestamp(10_000, 0).unwrap());
        colony.pins.insert(1, extractor(1, p0, 9_000));
        colony.update_status();
        assert_eq!(colony.status, ColonyStatus::Halted);
        assert!(!colony.is_working());
    }
}
