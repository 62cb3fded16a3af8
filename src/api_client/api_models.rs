use serde::{Deserialize, Serialize};

/// One entry of a character's planetary colony list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanetSummary {
    pub planet_id: i64,
    pub solar_system_id: i64,
    pub planet_type: String,
    #[serde(default)]
    pub owner_id: Option<i64>,
    pub upgrade_level: i32,
    pub num_pins: i32,
    #[serde(default)]
    pub last_update: Option<String>,
}

/// Full layout of one colony. Timestamps stay as raw strings here: a
/// malformed one degrades that pin, not the whole payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanetDetail {
    #[serde(default)]
    pub pins: Vec<PlanetPin>,
    #[serde(default)]
    pub routes: Vec<PlanetRoute>,
    #[serde(default)]
    pub links: Vec<PlanetLink>,
    #[serde(default)]
    pub current_sim_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanetPin {
    pub pin_id: i64,
    pub type_id: i64,
    #[serde(default)]
    pub schematic_id: Option<i64>,
    #[serde(default)]
    pub extractor_details: Option<ExtractorDetails>,
    #[serde(default)]
    pub install_time: Option<String>,
    #[serde(default)]
    pub expiry_time: Option<String>,
    #[serde(default)]
    pub last_cycle_start: Option<String>,
    #[serde(default)]
    pub contents: Vec<PinContent>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorDetails {
    #[serde(default)]
    pub cycle_time: Option<i64>,
    #[serde(default)]
    pub product_type_id: Option<i64>,
    #[serde(default)]
    pub qty_per_cycle: Option<i64>,
    #[serde(default)]
    pub head_radius: Option<f64>,
    #[serde(default)]
    pub heads: Vec<ExtractorHead>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorHead {
    pub head_id: i32,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinContent {
    pub type_id: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanetRoute {
    pub route_id: i64,
    pub source_pin_id: i64,
    pub destination_pin_id: i64,
    pub content_type_id: i64,
    pub quantity: f64,
    #[serde(default)]
    pub waypoints: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanetLink {
    pub source_pin_id: i64,
    pub destination_pin_id: i64,
    pub link_level: i32,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deserialise_planet_list() {
        let json = r#"[{"last_update":"2024-05-01T10:03:00Z","num_pins":12,"owner_id":90000001,"planet_id":40001234,"planet_type":"barren","solar_system_id":30000142,"upgrade_level":4}]"#;
        let planets: Vec<PlanetSummary> = serde_json::from_str(json).unwrap();
        assert_eq!(planets.len(), 1);
        assert_eq!(planets[0].planet_id, 40_001_234);
        assert_eq!(planets[0].planet_type, "barren");
        assert_eq!(planets[0].upgrade_level, 4);
    }

    #[test]
    fn test_deserialise_planet_detail() {
        let json = r#"{
            "links":[{"destination_pin_id":1000000017022,"link_level":0,"source_pin_id":1000000017021}],
            "pins":[
                {"latitude":1.55087844973,"longitude":0.717145933308,"pin_id":1000000017021,"type_id":2254},
                {"extractor_details":{"cycle_time":1800,"head_radius":0.012,"heads":[{"head_id":0,"latitude":1.55,"longitude":0.72}],"product_type_id":2268,"qty_per_cycle":1081},
                 "expiry_time":"2024-05-15T10:00:00Z","install_time":"2024-05-01T10:00:00Z","last_cycle_start":"2024-05-02T09:30:00Z",
                 "pin_id":1000000017022,"type_id":2848,"contents":[{"amount":1081,"type_id":2268}]}
            ],
            "routes":[{"content_type_id":2268,"destination_pin_id":1000000017021,"quantity":3000.0,"route_id":5,"source_pin_id":1000000017022,"waypoints":[]}]
        }"#;
        let detail: PlanetDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.pins.len(), 2);
        assert_eq!(detail.routes.len(), 1);
        assert_eq!(detail.links.len(), 1);
        assert!(detail.pins[0].extractor_details.is_none());
        let extractor = detail.pins[1].extractor_details.as_ref().unwrap();
        assert_eq!(extractor.product_type_id, Some(2268));
        assert_eq!(extractor.qty_per_cycle, Some(1081));
        assert_eq!(detail.pins[1].contents[0].amount, 1081);
        assert_eq!(detail.routes[0].quantity, 3000.0);
    }

    #[test]
    fn test_detail_round_trips() {
        let detail = PlanetDetail {
            pins: vec![PlanetPin {
                pin_id: 1,
                type_id: 2544,
                schematic_id: None,
                extractor_details: None,
                install_time: None,
                expiry_time: None,
                last_cycle_start: None,
                contents: vec![],
                latitude: None,
                longitude: None,
            }],
            routes: vec![],
            links: vec![],
            current_sim_time: Some("2024-05-02T10:00:00Z".to_string()),
        };
        let json = serde_json::to_string(&detail).unwrap();
        let back: PlanetDetail = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pins.len(), 1);
        assert_eq!(back.current_sim_time.as_deref(), Some("2024-05-02T10:00:00Z"));
    }
}
