//! Commodity movement between pins: the transfer primitive, producer output
//! routing, consumer-initiated input routing and factory buffer refill.

use super::{schedule, EventQueue};
use crate::models::{Colony, CommodityType, Route};
use crate::util::ceil_div;
use chrono::{DateTime, Utc};
use std::cmp::min;
use std::collections::{BTreeMap, BTreeSet};

/// Moves up to `requested` units of `ctype` from `source_id` to
/// `destination_id`, returning how many units were accepted.
///
/// `available` is the caller's view of what the source can give: the
/// source's own holding for storage sources, or the still-unrouted part of
/// a harvest for producer sources (whose buffers were already drained).
pub(crate) fn transfer(
    colony: &mut Colony,
    source_id: i64,
    destination_id: i64,
    ctype: &CommodityType,
    requested: i64,
    available: i64,
    max_override: Option<i64>,
) -> i64 {
    let amount = min(min(available, requested), max_override.unwrap_or(i64::MAX));
    if amount <= 0 {
        return 0;
    }
    let accepted = match colony.pins.get(&destination_id) {
        Some(destination) => destination.acceptance_limit(ctype, amount),
        None => 0,
    };
    if accepted <= 0 {
        return 0;
    }
    let source_is_storage = colony
        .pins
        .get(&source_id)
        .is_some_and(|pin| pin.is_storage());
    if source_is_storage {
        let source = colony.pins.get_mut(&source_id).unwrap();
        source.remove_commodity(ctype, accepted);
    }
    let destination = colony.pins.get_mut(&destination_id).unwrap();
    destination.add_commodity(ctype, accepted);
    if let Some(factory) = destination.factory_state_mut() {
        factory.has_received_inputs = true;
    }
    accepted
}

/// Routes a freshly-harvested multiset of commodities from `source_id` to
/// its outgoing routes: factories first (emptiest input buffer first), then
/// storage (tightest remaining capacity first, amounts split approximately
/// evenly). Storage destinations re-route what they received, so output
/// propagates through chains of storage hops; `seen` bounds that recursion.
pub(crate) fn route_commodities(
    colony: &mut Colony,
    queue: &mut EventQueue,
    source_id: i64,
    commodities: &mut BTreeMap<CommodityType, i64>,
    now: DateTime<Utc>,
    seen: &mut BTreeSet<i64>,
) {
    commodities.retain(|_, quantity| *quantity > 0);
    if commodities.is_empty() {
        return;
    }
    seen.insert(source_id);

    let mut processor_routes: Vec<Route> = Vec::new();
    let mut storage_routes: Vec<Route> = Vec::new();
    for route in &colony.routes {
        if route.source_id != source_id || !commodities.contains_key(&route.commodity) {
            continue;
        }
        match colony.pins.get(&route.destination_id) {
            Some(pin) if pin.is_consumer() => processor_routes.push(route.clone()),
            Some(pin) if pin.is_storage() => storage_routes.push(route.clone()),
            _ => {}
        }
    }
    processor_routes.sort_by(|a, b| {
        let fullness_a = colony.pins[&a.destination_id].input_buffer_fullness();
        let fullness_b = colony.pins[&b.destination_id].input_buffer_fullness();
        fullness_a
            .partial_cmp(&fullness_b)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.destination_id.cmp(&b.destination_id))
    });
    storage_routes.sort_by(|a, b| {
        let free_a = colony.pins[&a.destination_id].free_capacity();
        let free_b = colony.pins[&b.destination_id].free_capacity();
        free_a
            .partial_cmp(&free_b)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.destination_id.cmp(&b.destination_id))
    });

    let mut received: BTreeMap<i64, BTreeMap<CommodityType, i64>> = BTreeMap::new();

    for route in &processor_routes {
        let remaining = commodities.get(&route.commodity).copied().unwrap_or(0);
        if remaining <= 0 {
            continue;
        }
        let accepted = transfer(
            colony,
            source_id,
            route.destination_id,
            &route.commodity,
            min(route.quantity, remaining),
            remaining,
            None,
        );
        if accepted > 0 {
            *commodities.get_mut(&route.commodity).unwrap() -= accepted;
            *received
                .entry(route.destination_id)
                .or_default()
                .entry(route.commodity.clone())
                .or_insert(0) += accepted;
        }
        commodities.retain(|_, quantity| *quantity > 0);
        if commodities.is_empty() {
            break;
        }
    }

    let storage_count = storage_routes.len();
    for (index, route) in storage_routes.iter().enumerate() {
        let remaining = commodities.get(&route.commodity).copied().unwrap_or(0);
        if remaining <= 0 {
            continue;
        }
        // split what's left approximately evenly over the routes not yet
        // processed (the last route takes the remainder)
        let split = ceil_div(remaining, (storage_count - index) as i64);
        let accepted = transfer(
            colony,
            source_id,
            route.destination_id,
            &route.commodity,
            min(route.quantity, remaining),
            remaining,
            Some(split),
        );
        if accepted > 0 {
            *commodities.get_mut(&route.commodity).unwrap() -= accepted;
            *received
                .entry(route.destination_id)
                .or_default()
                .entry(route.commodity.clone())
                .or_insert(0) += accepted;
        }
        commodities.retain(|_, quantity| *quantity > 0);
        if commodities.is_empty() {
            break;
        }
    }

    for (destination_id, amounts) in received {
        let Some(destination) = colony.pins.get(&destination_id) else {
            continue;
        };
        if destination.is_consumer() {
            schedule(colony, queue, destination_id, now);
        } else if destination.is_storage() && !seen.contains(&destination_id) {
            let mut amounts = amounts;
            route_commodities(colony, queue, destination_id, &mut amounts, now, seen);
        }
    }
}

/// Consumer-initiated pull: walks the consumer's incoming routes from
/// storage pins in their listed order.
pub(crate) fn route_inputs(
    colony: &mut Colony,
    queue: &mut EventQueue,
    consumer_id: i64,
    now: DateTime<Utc>,
) {
    let incoming: Vec<Route> = colony
        .routes
        .iter()
        .filter(|route| route.destination_id == consumer_id)
        .cloned()
        .collect();
    let mut received = false;
    for route in incoming {
        let Some(source) = colony.pins.get(&route.source_id) else {
            continue;
        };
        if !source.is_storage() {
            continue;
        }
        let available = source.quantity(&route.commodity);
        if available <= 0 {
            continue;
        }
        let accepted = transfer(
            colony,
            route.source_id,
            consumer_id,
            &route.commodity,
            route.quantity,
            available,
            None,
        );
        received |= accepted > 0;
    }
    if received
        && colony
            .pins
            .get(&consumer_id)
            .is_some_and(|pin| pin.is_consumer())
    {
        schedule(colony, queue, consumer_id, now);
    }
}

/// Tops a factory's input buffer up from its incoming storage routes and
/// schedules it once a full batch is present.
pub(crate) fn refill_inputs(
    colony: &mut Colony,
    queue: &mut EventQueue,
    factory_id: i64,
    now: DateTime<Utc>,
) {
    let Some(schematic) = colony
        .pins
        .get(&factory_id)
        .and_then(|pin| pin.schematic())
        .cloned()
    else {
        return;
    };
    for (ctype, &required) in &schematic.inputs {
        let mut needed = required
            - colony
                .pins
                .get(&factory_id)
                .map_or(0, |pin| pin.quantity(ctype));
        if needed <= 0 {
            continue;
        }
        let routes: Vec<(i64, i64)> = colony
            .routes
            .iter()
            .filter(|route| route.destination_id == factory_id && &route.commodity == ctype)
            .map(|route| (route.source_id, route.quantity))
            .collect();
        for (source_id, route_quantity) in routes {
            if needed <= 0 {
                break;
            }
            let Some(source) = colony.pins.get(&source_id) else {
                continue;
            };
            if !source.is_storage() {
                continue;
            }
            let available = source.quantity(ctype);
            if available < 1 {
                continue;
            }
            let accepted = transfer(
                colony,
                source_id,
                factory_id,
                ctype,
                route_quantity,
                available,
                Some(needed),
            );
            needed -= accepted;
        }
    }
    if colony
        .pins
        .get(&factory_id)
        .is_some_and(|pin| pin.has_enough_inputs())
    {
        schedule(colony, queue, factory_id, now);
    }
}
