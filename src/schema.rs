// Read-only view of the EVE static data export.

diesel::table! {
    types (type_id) {
        type_id -> Int8,
        name -> Nullable<Text>,
        icon_filename -> Nullable<Text>,
        volume -> Nullable<Float8>,
    }
}

diesel::table! {
    #[sql_name = "planetSchematics"]
    planet_schematics (schematic_id) {
        schematic_id -> Int8,
        output_typeid -> Int8,
        output_value -> Int8,
        cycle_time -> Int8,
        input_typeid -> Nullable<Text>,
        input_value -> Nullable<Text>,
        facilitys -> Nullable<Text>,
    }
}

diesel::table! {
    #[sql_name = "planetResourceHarvest"]
    planet_resource_harvest (typeid, harvest_typeid) {
        typeid -> Int8,
        harvest_typeid -> Int8,
    }
}

diesel::table! {
    #[sql_name = "typeAttributes"]
    type_attributes (type_id, attribute_id) {
        type_id -> Int8,
        attribute_id -> Int8,
        value -> Nullable<Float8>,
    }
}

diesel::table! {
    universe (solarsystem_id) {
        solarsystem_id -> Int8,
        region_id -> Int8,
        system_security -> Nullable<Float8>,
        temperate -> Int8,
        barren -> Int8,
        oceanic -> Int8,
        ice -> Int8,
        gas -> Int8,
        lava -> Int8,
        storm -> Int8,
        plasma -> Int8,
    }
}

diesel::table! {
    solarsystems (solar_system_id) {
        #[sql_name = "solarSystemID"]
        solar_system_id -> Int8,
        #[sql_name = "solarSystemName"]
        solar_system_name -> Text,
    }
}

diesel::table! {
    regions (region_id) {
        #[sql_name = "regionID"]
        region_id -> Int8,
        #[sql_name = "regionName"]
        region_name -> Text,
    }
}

diesel::table! {
    #[sql_name = "invNames"]
    inv_names (item_id) {
        #[sql_name = "itemID"]
        item_id -> Int8,
        #[sql_name = "itemName"]
        item_name -> Text,
    }
}
