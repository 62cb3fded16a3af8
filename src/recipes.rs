//! Resolves a product down to the base (P0) resources its production chain
//! ultimately consumes.

use crate::error::Result;
use crate::models::Schematic;
use std::collections::{BTreeMap, BTreeSet};

/// Level-wise access to the planet schematic table. Implemented by the SDE
/// client and by in-memory tables in tests.
#[allow(async_fn_in_trait)]
pub trait SchematicSource {
    /// All schematics whose output is one of `outputs`.
    async fn schematics_for_outputs(&self, outputs: &[i64]) -> Result<Vec<Schematic>>;
    /// Display names for the given type ids.
    async fn type_names(&self, ids: &[i64]) -> Result<BTreeMap<i64, String>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseResource {
    pub type_id: i64,
    pub name: String,
    pub depth: u32,
}

/// Breadth-first expansion over product -> input schematics. A type with no
/// schematic (other than the target itself) is a base resource at the depth
/// it was first reached. Returns resources sorted by depth, then type id.
pub async fn resolve_base_resources(
    source: &impl SchematicSource,
    target_type_id: i64,
) -> Result<Vec<BaseResource>> {
    let mut processed = BTreeSet::from([target_type_id]);
    let mut level = vec![target_type_id];
    let mut bases: Vec<(i64, u32)> = Vec::new();
    let mut depth = 0u32;

    while !level.is_empty() {
        let rows = source.schematics_for_outputs(&level).await?;
        let with_recipe: BTreeSet<i64> = rows
            .iter()
            .map(|schematic| schematic.output_type.type_id)
            .collect();
        for &type_id in &level {
            if !with_recipe.contains(&type_id) && type_id != target_type_id {
                bases.push((type_id, depth));
            }
        }
        let mut next = Vec::new();
        for schematic in &rows {
            for input in schematic.inputs.keys() {
                if processed.insert(input.type_id) {
                    next.push(input.type_id);
                }
            }
        }
        next.sort_unstable();
        level = next;
        depth += 1;
    }

    let ids: Vec<i64> = bases.iter().map(|(type_id, _)| *type_id).collect();
    let names = source.type_names(&ids).await?;
    let mut resources: Vec<BaseResource> = bases
        .into_iter()
        .map(|(type_id, depth)| BaseResource {
            type_id,
            name: names.get(&type_id).cloned().unwrap_or_default(),
            depth,
        })
        .collect();
    resources.sort_by_key(|resource| (resource.depth, resource.type_id));
    Ok(resources)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::CommodityType;
    use maplit::btreemap;

    struct TableSource {
        schematics: BTreeMap<i64, Schematic>,
    }

    impl SchematicSource for TableSource {
        async fn schematics_for_outputs(&self, outputs: &[i64]) -> Result<Vec<Schematic>> {
            Ok(outputs
                .iter()
                .filter_map(|id| self.schematics.get(id).cloned())
                .collect())
        }

        async fn type_names(&self, ids: &[i64]) -> Result<BTreeMap<i64, String>> {
            Ok(ids.iter().map(|&id| (id, format!("Type {}", id))).collect())
        }
    }

    fn schematic(output: i64, inputs: &[i64]) -> Schematic {
        Schematic {
            schematic_id: output,
            cycle_time: 3600,
            output_type: CommodityType::new(output, 1.0),
            output_quantity: 1,
            inputs: inputs
                .iter()
                .map(|&id| (CommodityType::new(id, 1.0), 10))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_depth_four_chain() {
        // P4 (400) <- two P3s <- P2s <- P1s <- P0s, with shared P0 inputs
        let source = TableSource {
            schematics: btreemap! {
                400 => schematic(400, &[300, 301]),
                300 => schematic(300, &[200]),
                301 => schematic(301, &[201]),
                200 => schematic(200, &[100, 101]),
                201 => schematic(201, &[101, 102]),
                100 => schematic(100, &[1, 2]),
                101 => schematic(101, &[2, 3]),
                102 => schematic(102, &[4]),
            },
        };
        let resources = resolve_base_resources(&source, 400).await.unwrap();
        let ids: Vec<i64> = resources.iter().map(|r| r.type_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(resources.iter().all(|r| r.depth == 4));
        assert_eq!(resources[0].name, "Type 1");
    }

    #[tokio::test]
    async fn test_mixed_depths_sorted_ascending() {
        // 200 consumes a raw input directly alongside a refined one
        let source = TableSource {
            schematics: btreemap! {
                200 => schematic(200, &[100, 7]),
                100 => schematic(100, &[5]),
            },
        };
        let resources = resolve_base_resources(&source, 200).await.unwrap();
        assert_eq!(
            resources
                .iter()
                .map(|r| (r.type_id, r.depth))
                .collect::<Vec<_>>(),
            vec![(7, 1), (5, 2)]
        );
    }

    #[tokio::test]
    async fn test_shared_input_reported_once() {
        let source = TableSource {
            schematics: btreemap! {
                300 => schematic(300, &[100, 101]),
                100 => schematic(100, &[9]),
                101 => schematic(101, &[9]),
            },
        };
        let resources = resolve_base_resources(&source, 300).await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].type_id, 9);
        assert_eq!(resources[0].depth, 2);
    }

    #[tokio::test]
    async fn test_target_without_recipe_is_empty() {
        let source = TableSource {
            schematics: BTreeMap::new(),
        };
        let resources = resolve_base_resources(&source, 2268).await.unwrap();
        assert!(resources.is_empty());
    }

    #[tokio::test]
    async fn test_cyclic_table_terminates() {
        let source = TableSource {
            schematics: btreemap! {
                100 => schematic(100, &[101]),
                101 => schematic(101, &[100, 6]),
            },
        };
        let resources = resolve_base_resources(&source, 100).await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].type_id, 6);
    }
}
