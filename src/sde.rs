//! Read-only client for the static data export, queried over Postgres.

use crate::error::Result;
use crate::models::{CommodityType, Schematic};
use crate::recipes::SchematicSource;
use crate::schema::*;
use crate::site_finder::SystemPlanets;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::QueryableByName;
use diesel_async::pooled_connection::deadpool::Object;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

const PLANET_TYPE_ATTRIBUTE: i64 = 1632;

#[derive(Clone)]
pub struct SdeClient {
    db: Pool<AsyncPgConnection>,
}

impl SdeClient {
    pub async fn new() -> SdeClient {
        let database_url = std::env::var("POSTGRES_URI").expect("POSTGRES_URI must be set");
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let db = Pool::builder(manager).max_size(5).build().unwrap();
        // Check the connection
        {
            let mut conn = db.get().await.unwrap();
            #[derive(QueryableByName)]
            struct Ret {
                #[diesel(sql_type = diesel::sql_types::Integer)]
                value: i32,
            }
            let result: Vec<Ret> = diesel::sql_query("SELECT 1 as value")
                .load(&mut conn)
                .await
                .unwrap();
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].value, 1);
            info!("Successfully connected to static database");
        }
        SdeClient { db }
    }

    pub async fn conn(&self) -> Object<AsyncPgConnection> {
        self.db
            .get()
            .await
            .expect("Timed out waiting for a database connection")
    }

    pub async fn commodity_types(&self, ids: &[i64]) -> BTreeMap<i64, CommodityType> {
        if ids.is_empty() {
            return BTreeMap::new();
        }
        let rows: Vec<(i64, Option<String>, Option<f64>)> = types::table
            .filter(types::type_id.eq_any(ids.to_vec()))
            .select((types::type_id, types::name, types::volume))
            .load(&mut self.conn().await)
            .await
            .expect("DB Query error");
        rows.into_iter()
            .map(|(type_id, name, volume)| {
                (
                    type_id,
                    CommodityType {
                        type_id,
                        name,
                        volume: volume.unwrap_or(0.0).max(0.0),
                    },
                )
            })
            .collect()
    }

    pub async fn type_names(&self, ids: &[i64]) -> BTreeMap<i64, String> {
        if ids.is_empty() {
            return BTreeMap::new();
        }
        let rows: Vec<(i64, Option<String>)> = types::table
            .filter(types::type_id.eq_any(ids.to_vec()))
            .select((types::type_id, types::name))
            .load(&mut self.conn().await)
            .await
            .expect("DB Query error");
        rows.into_iter()
            .filter_map(|(type_id, name)| name.map(|name| (type_id, name)))
            .collect()
    }

    pub async fn planet_schematics_for_outputs(&self, outputs: &[i64]) -> Vec<Schematic> {
        if outputs.is_empty() {
            return Vec::new();
        }
        let rows: Vec<SchematicRow> = planet_schematics::table
            .filter(planet_schematics::output_typeid.eq_any(outputs.to_vec()))
            .select((
                planet_schematics::schematic_id,
                planet_schematics::output_typeid,
                planet_schematics::output_value,
                planet_schematics::cycle_time,
                planet_schematics::input_typeid,
                planet_schematics::input_value,
            ))
            .load(&mut self.conn().await)
            .await
            .expect("DB Query error");
        self.build_schematics(rows).await
    }

    /// Every planet schematic, keyed by schematic id. Used to resolve the
    /// `schematic_id` a fetched factory pin carries.
    pub async fn schematics_by_id(&self) -> BTreeMap<i64, Schematic> {
        let rows: Vec<SchematicRow> = planet_schematics::table
            .select((
                planet_schematics::schematic_id,
                planet_schematics::output_typeid,
                planet_schematics::output_value,
                planet_schematics::cycle_time,
                planet_schematics::input_typeid,
                planet_schematics::input_value,
            ))
            .load(&mut self.conn().await)
            .await
            .expect("DB Query error");
        self.build_schematics(rows)
            .await
            .into_iter()
            .map(|schematic| (schematic.schematic_id, schematic))
            .collect()
    }

    async fn build_schematics(&self, rows: Vec<SchematicRow>) -> Vec<Schematic> {
        let mut type_ids: BTreeSet<i64> = BTreeSet::new();
        for row in &rows {
            type_ids.insert(row.1);
            if let Some(ids) = parse_id_csv(&row.4) {
                type_ids.extend(ids);
            }
        }
        let types = self
            .commodity_types(&type_ids.into_iter().collect::<Vec<_>>())
            .await;
        rows.into_iter()
            .filter_map(|row| build_schematic(row, &types))
            .collect()
    }

    /// Planet type ids able to produce the given base resource.
    pub async fn planet_types_for_resource(&self, resource_type_id: i64) -> Vec<i64> {
        let harvestable: Vec<i64> = planet_resource_harvest::table
            .filter(planet_resource_harvest::harvest_typeid.eq(resource_type_id))
            .select(planet_resource_harvest::typeid)
            .load(&mut self.conn().await)
            .await
            .expect("DB Query error");
        if harvestable.is_empty() {
            return Vec::new();
        }
        let values: Vec<Option<f64>> = type_attributes::table
            .filter(type_attributes::type_id.eq_any(harvestable))
            .filter(type_attributes::attribute_id.eq(PLANET_TYPE_ATTRIBUTE))
            .select(type_attributes::value)
            .load(&mut self.conn().await)
            .await
            .expect("DB Query error");
        let mut planet_types: Vec<i64> = values
            .into_iter()
            .flatten()
            .map(|value| value as i64)
            .collect();
        planet_types.sort_unstable();
        planet_types.dedup();
        planet_types
    }

    pub async fn system_planet_counts(&self) -> BTreeMap<i64, SystemPlanets> {
        let rows: Vec<(
            i64,
            i64,
            Option<f64>,
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        )> = universe::table
            .select((
                universe::solarsystem_id,
                universe::region_id,
                universe::system_security,
                universe::temperate,
                universe::barren,
                universe::oceanic,
                universe::ice,
                universe::gas,
                universe::lava,
                universe::storm,
                universe::plasma,
            ))
            .load(&mut self.conn().await)
            .await
            .expect("DB Query error");
        rows.into_iter()
            .map(
                |(
                    solarsystem_id,
                    region_id,
                    security,
                    temperate,
                    barren,
                    oceanic,
                    ice,
                    gas,
                    lava,
                    storm,
                    plasma,
                )| {
                    (
                        solarsystem_id,
                        SystemPlanets {
                            solarsystem_id,
                            region_id,
                            security: security.unwrap_or(0.0),
                            temperate,
                            barren,
                            oceanic,
                            ice,
                            gas,
                            lava,
                            storm,
                            plasma,
                        },
                    )
                },
            )
            .collect()
    }

    pub async fn system_names(&self, ids: &[i64]) -> BTreeMap<i64, String> {
        if ids.is_empty() {
            return BTreeMap::new();
        }
        let rows: Vec<(i64, String)> = solarsystems::table
            .filter(solarsystems::solar_system_id.eq_any(ids.to_vec()))
            .select((solarsystems::solar_system_id, solarsystems::solar_system_name))
            .load(&mut self.conn().await)
            .await
            .expect("DB Query error");
        rows.into_iter().collect()
    }

    pub async fn region_names(&self, ids: &[i64]) -> BTreeMap<i64, String> {
        if ids.is_empty() {
            return BTreeMap::new();
        }
        let rows: Vec<(i64, String)> = regions::table
            .filter(regions::region_id.eq_any(ids.to_vec()))
            .select((regions::region_id, regions::region_name))
            .load(&mut self.conn().await)
            .await
            .expect("DB Query error");
        rows.into_iter().collect()
    }

    /// Planet display names from `invNames`.
    pub async fn planet_names(&self, ids: &[i64]) -> BTreeMap<i64, String> {
        if ids.is_empty() {
            return BTreeMap::new();
        }
        let rows: Vec<(i64, String)> = inv_names::table
            .filter(inv_names::item_id.eq_any(ids.to_vec()))
            .select((inv_names::item_id, inv_names::item_name))
            .load(&mut self.conn().await)
            .await
            .expect("DB Query error");
        rows.into_iter().collect()
    }
}

impl SchematicSource for SdeClient {
    async fn schematics_for_outputs(&self, outputs: &[i64]) -> Result<Vec<Schematic>> {
        Ok(self.planet_schematics_for_outputs(outputs).await)
    }

    async fn type_names(&self, ids: &[i64]) -> Result<BTreeMap<i64, String>> {
        Ok(SdeClient::type_names(self, ids).await)
    }
}

// (schematic_id, output_typeid, output_value, cycle_time, input_typeid csv, input_value csv)
type SchematicRow = (i64, i64, i64, i64, Option<String>, Option<String>);

fn parse_id_csv(raw: &Option<String>) -> Option<Vec<i64>> {
    let raw = raw.as_deref().unwrap_or("");
    let mut parsed = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        parsed.push(token.parse().ok()?);
    }
    Some(parsed)
}

/// Builds a schematic from a raw row, or drops it when the row is
/// malformed (bad CSV arity, non-positive cycle or output, no inputs).
fn build_schematic(row: SchematicRow, types: &BTreeMap<i64, CommodityType>) -> Option<Schematic> {
    let (schematic_id, output_typeid, output_value, cycle_time, input_typeid, input_value) = row;
    let lookup = |type_id: i64| -> CommodityType {
        types.get(&type_id).cloned().unwrap_or_else(|| {
            warn!("No type data for {}, assuming zero volume", type_id);
            CommodityType::new(type_id, 0.0)
        })
    };
    if cycle_time <= 0 || output_value <= 0 {
        warn!("Skipping schematic {}: non-positive cycle or output", schematic_id);
        return None;
    }
    let (Some(input_ids), Some(input_values)) =
        (parse_id_csv(&input_typeid), parse_id_csv(&input_value))
    else {
        warn!("Skipping schematic {}: unparseable input CSV", schematic_id);
        return None;
    };
    if input_ids.len() != input_values.len() || input_ids.is_empty() {
        warn!("Skipping schematic {}: input CSV arity mismatch", schematic_id);
        return None;
    }
    let mut inputs = BTreeMap::new();
    for (&type_id, &quantity) in input_ids.iter().zip(input_values.iter()) {
        if quantity <= 0 {
            warn!("Skipping schematic {}: non-positive input quantity", schematic_id);
            return None;
        }
        if inputs.insert(lookup(type_id), quantity).is_some() {
            warn!("Schematic {} lists input {} twice", schematic_id, type_id);
        }
    }
    Some(Schematic {
        schematic_id,
        cycle_time,
        output_type: lookup(output_typeid),
        output_quantity: output_value,
        inputs,
    })
}
