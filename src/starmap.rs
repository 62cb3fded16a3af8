//! Stellar adjacency graph, loaded once from a JSON file shaped as
//! `{"solarsystem_id": [neighbour_id, ...], ...}`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct Starmap {
    adjacency: BTreeMap<i64, Vec<i64>>,
}

impl Starmap {
    /// Reads and validates the adjacency file. Duplicate neighbours and
    /// asymmetric edges violate the file contract; both are repaired with a
    /// warning rather than rejected.
    pub fn load(path: &str) -> Starmap {
        let raw = std::fs::read_to_string(path)
            .unwrap_or_else(|err| panic!("Failed to read starmap {}: {}", path, err));
        let parsed: BTreeMap<String, Vec<i64>> =
            serde_json::from_str(&raw).expect("Malformed starmap json");
        let adjacency = parsed
            .into_iter()
            .map(|(system, neighbours)| {
                let system: i64 = system
                    .parse()
                    .unwrap_or_else(|_| panic!("Non-integer system id {:?} in starmap", system));
                (system, neighbours)
            })
            .collect();
        Starmap::from_adjacency(adjacency)
    }

    pub fn from_adjacency(raw: BTreeMap<i64, Vec<i64>>) -> Starmap {
        let mut adjacency: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
        for (system, neighbours) in &raw {
            let entry = adjacency.entry(*system).or_default();
            for neighbour in neighbours {
                if !entry.insert(*neighbour) {
                    warn!("Duplicate edge {} -> {} in starmap", system, neighbour);
                }
            }
        }
        // enforce symmetry
        let edges: Vec<(i64, i64)> = adjacency
            .iter()
            .flat_map(|(&system, neighbours)| neighbours.iter().map(move |&n| (system, n)))
            .collect();
        for (system, neighbour) in edges {
            if !adjacency
                .get(&neighbour)
                .is_some_and(|back| back.contains(&system))
            {
                warn!("Asymmetric edge {} -> {} in starmap", system, neighbour);
                adjacency.entry(neighbour).or_default().insert(system);
            }
        }
        let adjacency = adjacency
            .into_iter()
            .map(|(system, neighbours)| (system, neighbours.into_iter().collect()))
            .collect();
        Starmap { adjacency }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn contains(&self, system: i64) -> bool {
        self.adjacency.contains_key(&system)
    }

    pub fn neighbours(&self, system: i64) -> &[i64] {
        self.adjacency
            .get(&system)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Systems reachable within `max_jumps`, excluding the origin, in
    /// breadth-first order (distance ascending, id ascending per ring).
    pub fn neighbours_within(&self, origin: i64, max_jumps: u32) -> Vec<(i64, u32)> {
        let mut visited = BTreeSet::from([origin]);
        let mut queue = VecDeque::from([(origin, 0u32)]);
        let mut reachable = Vec::new();
        while let Some((system, jumps)) = queue.pop_front() {
            if jumps >= max_jumps {
                continue;
            }
            for &neighbour in self.neighbours(system) {
                if visited.insert(neighbour) {
                    reachable.push((neighbour, jumps + 1));
                    queue.push_back((neighbour, jumps + 1));
                }
            }
        }
        reachable
    }

    /// Fewest jumps between two systems, if connected.
    pub fn jumps_between(&self, from: i64, to: i64) -> Option<u32> {
        use pathfinding::directed::bfs::bfs;
        if from == to {
            return Some(0);
        }
        let path = bfs(
            &from,
            |&system| self.neighbours(system).iter().copied().collect::<Vec<_>>(),
            |&system| system == to,
        )?;
        Some((path.len() - 1) as u32)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use maplit::btreemap;

    fn chain() -> Starmap {
        // 1 - 2 - 3 - 4, with a spur 2 - 5
        Starmap::from_adjacency(btreemap! {
            1 => vec![2],
            2 => vec![1, 3, 5],
            3 => vec![2, 4],
            4 => vec![3],
            5 => vec![2],
        })
    }

    #[test]
    fn test_neighbours_within_rings() {
        let map = chain();
        assert_eq!(map.neighbours_within(1, 1), vec![(2, 1)]);
        assert_eq!(map.neighbours_within(1, 2), vec![(2, 1), (3, 2), (5, 2)]);
        assert_eq!(
            map.neighbours_within(1, 10),
            vec![(2, 1), (3, 2), (5, 2), (4, 3)]
        );
        assert!(map.neighbours_within(1, 0).is_empty());
    }

    #[test]
    fn test_jumps_between() {
        let map = chain();
        assert_eq!(map.jumps_between(1, 1), Some(0));
        assert_eq!(map.jumps_between(1, 4), Some(3));
        assert_eq!(map.jumps_between(5, 4), Some(3));
        assert_eq!(map.jumps_between(1, 99), None);
    }

    #[test]
    fn test_asymmetric_edges_are_repaired() {
        let map = Starmap::from_adjacency(btreemap! {
            1 => vec![2],
            2 => vec![],
        });
        assert_eq!(map.neighbours(2), &[1]);
    }
}
