use crate::models::CommodityType;
use serde::{Deserialize, Serialize};

/// A directed commodity transfer edge between two pins. Duplicate routes
/// are permitted; a route never loops back to its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub source_id: i64,
    pub destination_id: i64,
    pub commodity: CommodityType,
    pub quantity: i64,
}

impl Route {
    pub fn new(source_id: i64, destination_id: i64, commodity: CommodityType, quantity: i64) -> Route {
        assert_ne!(source_id, destination_id, "route loops back to its source");
        assert!(quantity >= 1, "route quantity must be at least 1");
        Route {
            source_id,
            destination_id,
            commodity,
            quantity,
        }
    }
}
