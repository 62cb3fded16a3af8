//! Ranks solar systems by their ability to supply the base resources a
//! planetary production chain needs, locally or within a few jumps.

use crate::error::{Error, Result};
use crate::recipes;
use crate::sde::SdeClient;
use crate::starmap::Starmap;
use crate::util::CancelToken;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

pub const PLANET_TEMPERATE: i64 = 11;
pub const PLANET_ICE: i64 = 12;
pub const PLANET_GAS: i64 = 13;
pub const PLANET_OCEANIC: i64 = 2014;
pub const PLANET_LAVA: i64 = 2015;
pub const PLANET_BARREN: i64 = 2016;
pub const PLANET_STORM: i64 = 2017;
pub const PLANET_PLASMA: i64 = 2063;

/// Per-system planet counts from the `universe` table.
#[derive(Debug, Clone, Default)]
pub struct SystemPlanets {
    pub solarsystem_id: i64,
    pub region_id: i64,
    pub security: f64,
    pub temperate: i64,
    pub barren: i64,
    pub oceanic: i64,
    pub ice: i64,
    pub gas: i64,
    pub lava: i64,
    pub storm: i64,
    pub plasma: i64,
}

impl SystemPlanets {
    pub fn count(&self, planet_type: i64) -> i64 {
        match planet_type {
            PLANET_TEMPERATE => self.temperate,
            PLANET_ICE => self.ice,
            PLANET_GAS => self.gas,
            PLANET_OCEANIC => self.oceanic,
            PLANET_LAVA => self.lava,
            PLANET_BARREN => self.barren,
            PLANET_STORM => self.storm,
            PLANET_PLASMA => self.plasma,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteScore {
    pub solarsystem_id: i64,
    pub score: f64,
    /// resource -> local planet count
    pub available: BTreeMap<i64, i64>,
    /// resource -> (first neighbour system providing it, jumps)
    pub neighbour_sources: BTreeMap<i64, (i64, u32)>,
}

#[derive(Debug, Clone)]
pub struct PlanetarySite {
    pub solarsystem_id: i64,
    pub system_name: String,
    pub region_name: String,
    pub security: f64,
    pub score: f64,
    pub available: BTreeMap<i64, i64>,
    pub neighbour_sources: BTreeMap<i64, (i64, u32)>,
}

/// Scores one candidate system, or None if some required resource is not
/// producible locally nor within `max_jumps`.
pub fn score_system(
    origin: i64,
    required: &BTreeMap<i64, BTreeSet<i64>>,
    systems: &BTreeMap<i64, SystemPlanets>,
    starmap: &Starmap,
    max_jumps: u32,
) -> Option<SiteScore> {
    let origin_system = systems.get(&origin)?;
    let coverage = |system: &SystemPlanets, planet_types: &BTreeSet<i64>| -> i64 {
        planet_types.iter().map(|&pt| system.count(pt)).sum()
    };

    let mut available: BTreeMap<i64, i64> = BTreeMap::new();
    let mut neighbour_sources: BTreeMap<i64, (i64, u32)> = BTreeMap::new();
    for (&resource, planet_types) in required {
        let local = coverage(origin_system, planet_types);
        available.insert(resource, local);
        if local > 0 {
            continue;
        }
        let found = starmap
            .neighbours_within(origin, max_jumps)
            .into_iter()
            .find(|(system_id, _)| {
                systems
                    .get(system_id)
                    .is_some_and(|system| coverage(system, planet_types) > 0)
            });
        match found {
            Some((system_id, jumps)) => {
                neighbour_sources.insert(resource, (system_id, jumps));
            }
            None => return None,
        }
    }

    let total_local: i64 = available.values().sum();
    let score = if total_local == 0 {
        1.0
    } else {
        let locally_available = available.values().filter(|&&count| count > 0).count();
        let balanced = available.values().filter(|&&count| count >= 2).count();
        let mut score = 10.0 * total_local as f64;
        score += 100.0 * balanced as f64 / locally_available as f64;
        if balanced == locally_available {
            score += 50.0;
        }
        for (_, (_, jumps)) in &neighbour_sources {
            score += 5.0 - 5.0 * *jumps as f64;
        }
        if neighbour_sources.is_empty() {
            score += 200.0;
        } else {
            score += 50.0;
        }
        score
    };

    Some(SiteScore {
        solarsystem_id: origin,
        score,
        available,
        neighbour_sources,
    })
}

/// Resolves the target product's base resources and returns the best-scoring
/// systems able to produce all of them. Sovereignty-filtered searches return
/// the top 10, open searches the top 20.
pub async fn find_sites(
    sde: &SdeClient,
    starmap: &Starmap,
    target_type_id: i64,
    max_jumps: u32,
    sovereignty: Option<&BTreeSet<i64>>,
    cancel: &CancelToken,
) -> Result<Vec<PlanetarySite>> {
    let resources = recipes::resolve_base_resources(sde, target_type_id).await?;
    if resources.is_empty() {
        warn!("No production chain found for type {}", target_type_id);
        return Ok(Vec::new());
    }
    let mut required: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for resource in &resources {
        let planet_types = sde.planet_types_for_resource(resource.type_id).await;
        if planet_types.is_empty() {
            // incomplete static data: an empty result beats a partial one
            warn!(
                "No planet type mapping for base resource {} ({})",
                resource.type_id, resource.name
            );
            return Ok(Vec::new());
        }
        required.insert(resource.type_id, planet_types.into_iter().collect());
    }

    let systems = sde.system_planet_counts().await;
    let mut scored: Vec<SiteScore> = Vec::new();
    for system_id in systems.keys() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if sovereignty.is_some_and(|sov| !sov.contains(system_id)) {
            continue;
        }
        if let Some(site) = score_system(*system_id, &required, &systems, starmap, max_jumps) {
            scored.push(site);
        }
    }
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.solarsystem_id.cmp(&b.solarsystem_id))
    });
    scored.truncate(if sovereignty.is_some() { 10 } else { 20 });

    let system_ids: Vec<i64> = scored.iter().map(|site| site.solarsystem_id).collect();
    let region_ids: Vec<i64> = scored
        .iter()
        .filter_map(|site| systems.get(&site.solarsystem_id).map(|s| s.region_id))
        .collect();
    let system_names = sde.system_names(&system_ids).await;
    let region_names = sde.region_names(&region_ids).await;
    Ok(scored
        .into_iter()
        .map(|site| {
            let info = &systems[&site.solarsystem_id];
            PlanetarySite {
                solarsystem_id: site.solarsystem_id,
                system_name: system_names
                    .get(&site.solarsystem_id)
                    .cloned()
                    .unwrap_or_default(),
                region_name: region_names.get(&info.region_id).cloned().unwrap_or_default(),
                security: info.security,
                score: site.score,
                available: site.available,
                neighbour_sources: site.neighbour_sources,
            }
        })
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use maplit::{btreemap, btreeset};

    fn system(id: i64, barren: i64, gas: i64, ice: i64) -> SystemPlanets {
        SystemPlanets {
            solarsystem_id: id,
            region_id: 10_000_001,
            security: 0.5,
            barren,
            gas,
            ice,
            ..Default::default()
        }
    }

    #[test]
    fn test_all_local_score() {
        // 3 barren produce r1, 2 gas produce r2: 10*5 + 100 + 50 + 200
        let systems = btreemap! { 30_000_001 => system(30_000_001, 3, 2, 0) };
        let required = btreemap! {
            1001 => btreeset! { PLANET_BARREN },
            1002 => btreeset! { PLANET_GAS },
        };
        let site = score_system(
            30_000_001,
            &required,
            &systems,
            &Starmap::default(),
            3,
        )
        .unwrap();
        assert_eq!(site.score, 400.0);
        assert!(site.neighbour_sources.is_empty());
    }

    #[test]
    fn test_neighbour_sourced_resource() {
        let systems = btreemap! {
            30_000_001 => system(30_000_001, 3, 0, 0),
            30_000_002 => system(30_000_002, 0, 1, 0),
        };
        let starmap = Starmap::from_adjacency(btreemap! {
            30_000_001 => vec![30_000_002],
        });
        let required = btreemap! {
            1001 => btreeset! { PLANET_BARREN },
            1002 => btreeset! { PLANET_GAS },
        };
        let site = score_system(30_000_001, &required, &systems, &starmap, 3).unwrap();
        // 10*3 + 100*(1/1) + 50 + (5 - 5*1) + 50
        assert_eq!(site.score, 230.0);
        assert_eq!(site.neighbour_sources[&1002], (30_000_002, 1));
    }

    #[test]
    fn test_unsatisfiable_system_is_dropped() {
        let systems = btreemap! { 30_000_001 => system(30_000_001, 3, 0, 0) };
        let required = btreemap! { 1002 => btreeset! { PLANET_GAS } };
        assert!(score_system(30_000_001, &required, &systems, &Starmap::default(), 3).is_none());
    }

    #[test]
    fn test_degenerate_score_for_fully_remote_coverage() {
        let systems = btreemap! {
            30_000_001 => system(30_000_001, 0, 0, 0),
            30_000_002 => system(30_000_002, 1, 1, 0),
        };
        let starmap = Starmap::from_adjacency(btreemap! {
            30_000_001 => vec![30_000_002],
        });
        let required = btreemap! { 1001 => btreeset! { PLANET_BARREN } };
        let site = score_system(30_000_001, &required, &systems, &starmap, 3).unwrap();
        assert_eq!(site.score, 1.0);
    }

    #[test]
    fn test_nearest_provider_wins() {
        let systems = btreemap! {
            1 => system(1, 1, 0, 0),
            2 => system(2, 0, 0, 0),
            3 => system(3, 0, 4, 0),
            4 => system(4, 0, 9, 0),
        };
        // 1 - 2 - 3 and 1 - 2 - 4: both provide gas at 2 jumps; lowest id wins
        let starmap = Starmap::from_adjacency(btreemap! {
            1 => vec![2],
            2 => vec![1, 3, 4],
            3 => vec![2],
            4 => vec![2],
        });
        let required = btreemap! { 1002 => btreeset! { PLANET_GAS } };
        let site = score_system(1, &required, &systems, &starmap, 3).unwrap();
        assert_eq!(site.neighbour_sources[&1002], (3, 2));
    }
}
