use chrono::Utc;
use evepi::api_client::api_models::PlanetDetail;
use evepi::api_client::ApiClient;
use evepi::models::{Colony, PinClass};
use evepi::names::pin_name;
use evepi::sde::SdeClient;
use evepi::sim_cache::simulate_cached;
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use tracing::info;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let character_id: i64 = env::var("CHARACTER_ID")
        .expect("CHARACTER_ID env var not set")
        .parse()
        .expect("Invalid CHARACTER_ID");
    let access_token = env::var("EVE_ACCESS_TOKEN").expect("EVE_ACCESS_TOKEN env var not set");

    let api_client = ApiClient::new();
    api_client.set_access_token(&access_token);
    let sde = SdeClient::new().await;

    info!("Loading colonies for character {}", character_id);
    let planets = api_client
        .fetch_character_planetary(character_id, false)
        .await
        .expect("Failed to fetch planet list");
    info!("Character has {} colonies", planets.len());

    let schematics = sde.schematics_by_id().await;
    let system_ids: Vec<i64> = planets.iter().map(|p| p.solar_system_id).collect();
    let system_names = sde.system_names(&system_ids).await;
    let now = Utc::now();

    let details = futures::future::join_all(
        planets
            .iter()
            .map(|p| api_client.fetch_planetary_detail(character_id, p.planet_id, false)),
    )
    .await;

    for (planet, detail) in planets.iter().zip(details) {
        let detail = detail.expect("Failed to fetch planet detail");

        let mut type_ids: BTreeSet<i64> = BTreeSet::new();
        for pin in &detail.pins {
            type_ids.insert(pin.type_id);
            type_ids.extend(pin.contents.iter().map(|c| c.type_id));
            if let Some(product) = pin.extractor_details.as_ref().and_then(|e| e.product_type_id)
            {
                type_ids.insert(product);
            }
        }
        type_ids.extend(detail.routes.iter().map(|r| r.content_type_id));
        let ids: Vec<i64> = type_ids.into_iter().collect();
        let types = sde.commodity_types(&ids).await;
        let names = sde.type_names(&ids).await;
        let classes = classify_pins(&detail, &names);

        let colony = Colony::from_planet_detail(
            planet.planet_id,
            &detail,
            &types,
            &schematics,
            |type_id| classes.get(&type_id).copied().unwrap_or(PinClass::Storage),
            now,
        );
        let simulated = simulate_cached(&colony, now, |_| {});

        let system = system_names
            .get(&planet.solar_system_id)
            .cloned()
            .unwrap_or_else(|| planet.solar_system_id.to_string());
        println!(
            "{} {} (level {}): {}",
            system, planet.planet_type, planet.upgrade_level, simulated.status
        );
        for (id, pin) in &simulated.pins {
            let contents: Vec<String> = pin
                .contents
                .iter()
                .map(|(ctype, quantity)| format!("{} x{}", ctype, quantity))
                .collect();
            println!(
                "  {} {:<12} {}",
                pin_name(*id),
                pin.status.to_string(),
                contents.join(", ")
            );
        }
        let finals: Vec<String> = simulated
            .overview
            .final_products
            .iter()
            .map(|ctype| ctype.to_string())
            .collect();
        if !finals.is_empty() {
            println!(
                "  final products: {} ({:.0}/{:.0} m3 stored)",
                finals.join(", "),
                simulated.overview.storage.final_products_used,
                simulated.overview.storage.capacity
            );
        }
    }
}

/// Maps each pin type onto a facility variant using payload hints first and
/// the type name as a fallback.
fn classify_pins(detail: &PlanetDetail, names: &BTreeMap<i64, String>) -> BTreeMap<i64, PinClass> {
    let mut classes = BTreeMap::new();
    for pin in &detail.pins {
        let name = names.get(&pin.type_id).map(String::as_str).unwrap_or("");
        let class = if pin.extractor_details.is_some() || name.contains("Extractor") {
            PinClass::Extractor
        } else if pin.schematic_id.is_some()
            || name.contains("Industry")
            || name.contains("Production Plant")
        {
            PinClass::Factory
        } else if name.contains("Launchpad") {
            PinClass::Launchpad
        } else if name.contains("Command Center") {
            PinClass::CommandCenter
        } else {
            PinClass::Storage
        };
        classes.insert(pin.type_id, class);
    }
    classes
}
