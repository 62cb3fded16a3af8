use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A planetary commodity type. Identity is the type id alone; the volume
/// and name ride along for capacity accounting and display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommodityType {
    pub type_id: i64,
    pub name: Option<String>,
    pub volume: f64,
}

impl CommodityType {
    pub fn new(type_id: i64, volume: f64) -> CommodityType {
        assert!(volume >= 0.0, "commodity volume must be non-negative");
        CommodityType {
            type_id,
            name: None,
            volume,
        }
    }

    pub fn named(type_id: i64, volume: f64, name: &str) -> CommodityType {
        CommodityType {
            name: Some(name.to_string()),
            ..CommodityType::new(type_id, volume)
        }
    }
}

impl PartialEq for CommodityType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}
impl Eq for CommodityType {}

impl PartialOrd for CommodityType {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for CommodityType {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.type_id.cmp(&other.type_id)
    }
}

impl std::hash::Hash for CommodityType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl std::fmt::Display for CommodityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "type {}", self.type_id),
        }
    }
}

/// A factory recipe: one batch of `output_quantity` units of `output_type`
/// per `cycle_time` seconds, consuming the full `inputs` map each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schematic {
    pub schematic_id: i64,
    pub cycle_time: i64,
    pub output_type: CommodityType,
    pub output_quantity: i64,
    pub inputs: BTreeMap<CommodityType, i64>,
}
