//! Canonical sensor keys
//!
//! Vendors name the same physical quantity differently ("Battery" vs
//! "Battery SOC", "Daily Energy Bought" vs "Daily Energy Import"). Every
//! slot of the output model binds to one primary key plus an ordered list
//! of alternatives; lookup resolves the primary first, then each
//! alternative, and the first present value wins. This is the decoupling
//! layer between upstream naming and the uniform status model.

use std::collections::HashMap;

/// Decoded numeric sensor values, keyed by normalized sensor identifier.
///
/// Insertion keeps the first value seen for an identifier; later
/// collisions are ignored.
#[derive(Debug, Clone, Default)]
pub struct SensorValues {
    values: HashMap<String, f64>,
}

impl SensorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value unless the identifier is already present.
    pub fn insert_first(&mut self, id: impl Into<String>, value: f64) {
        self.values.entry(id.into()).or_insert(value);
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.values.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    /// Resolve a canonical key: primary first, then alternatives in order.
    pub fn lookup(&self, key: &SensorKey) -> Option<f64> {
        key.lookup(self)
    }

    /// First present value among freely formatted identifiers, tried in
    /// order. Used for indexed sensors (BMS units, time-of-use slots).
    pub fn first_of(&self, ids: &[String]) -> Option<f64> {
        ids.iter().find_map(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// A canonical sensor key: one primary identifier plus ordered fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorKey {
    pub primary: &'static str,
    pub alternatives: &'static [&'static str],
}

impl SensorKey {
    pub const fn new(primary: &'static str, alternatives: &'static [&'static str]) -> Self {
        Self {
            primary,
            alternatives,
        }
    }

    /// Resolve against a value map: primary first, then each alternative
    /// in declared order.
    pub fn lookup(&self, values: &SensorValues) -> Option<f64> {
        values.get(self.primary).or_else(|| {
            self.alternatives
                .iter()
                .find_map(|alt| values.get(alt))
        })
    }

    /// Whether any of the key's identifiers is present.
    pub fn present_in(&self, values: &SensorValues) -> bool {
        self.lookup(values).is_some()
    }
}

pub mod battery {
    use super::SensorKey;

    pub const SOC: SensorKey = SensorKey::new("battery_soc", &["battery"]);
    pub const VOLTAGE: SensorKey = SensorKey::new("battery_voltage", &[]);
    pub const CURRENT: SensorKey = SensorKey::new("battery_current", &[]);
    pub const POWER: SensorKey = SensorKey::new("battery_power", &[]);
    pub const TEMPERATURE: SensorKey = SensorKey::new("battery_temperature", &[]);
    pub const SOH: SensorKey = SensorKey::new("battery_soh", &[]);
    pub const DAILY_CHARGE: SensorKey =
        SensorKey::new("daily_battery_charge", &["battery_daily_charge", "today_battery_charge"]);
    pub const DAILY_DISCHARGE: SensorKey = SensorKey::new(
        "daily_battery_discharge",
        &["battery_daily_discharge", "today_battery_discharge"],
    );
    pub const TOTAL_CHARGE: SensorKey =
        SensorKey::new("total_battery_charge", &["battery_total_charge"]);
    pub const TOTAL_DISCHARGE: SensorKey =
        SensorKey::new("total_battery_discharge", &["battery_total_discharge"]);
}

pub mod grid {
    use super::SensorKey;

    pub const POWER: SensorKey = SensorKey::new(
        "total_grid_power",
        &["grid_power", "grid_active_power", "total_active_power"],
    );
    pub const VOLTAGE: SensorKey = SensorKey::new("grid_voltage", &[]);
    pub const CURRENT: SensorKey = SensorKey::new("grid_current", &[]);
    pub const FREQUENCY: SensorKey = SensorKey::new("grid_frequency", &["frequency"]);
    pub const POWER_FACTOR: SensorKey = SensorKey::new("grid_power_factor", &["power_factor"]);
    pub const L1_VOLTAGE: SensorKey = SensorKey::new("grid_l1_voltage", &["grid_voltage_l1"]);
    pub const L2_VOLTAGE: SensorKey = SensorKey::new("grid_l2_voltage", &["grid_voltage_l2"]);
    pub const L3_VOLTAGE: SensorKey = SensorKey::new("grid_l3_voltage", &["grid_voltage_l3"]);
    pub const L1_CURRENT: SensorKey = SensorKey::new("grid_l1_current", &["grid_current_l1"]);
    pub const L2_CURRENT: SensorKey = SensorKey::new("grid_l2_current", &["grid_current_l2"]);
    pub const L3_CURRENT: SensorKey = SensorKey::new("grid_l3_current", &["grid_current_l3"]);
    pub const L1_POWER: SensorKey = SensorKey::new("grid_l1_power", &["grid_power_l1"]);
    pub const L2_POWER: SensorKey = SensorKey::new("grid_l2_power", &["grid_power_l2"]);
    pub const L3_POWER: SensorKey = SensorKey::new("grid_l3_power", &["grid_power_l3"]);
    pub const DAILY_IMPORT: SensorKey = SensorKey::new(
        "daily_energy_import",
        &["daily_energy_bought", "daily_grid_import"],
    );
    pub const DAILY_EXPORT: SensorKey = SensorKey::new(
        "daily_energy_export",
        &["daily_energy_sold", "daily_grid_export"],
    );
    pub const TOTAL_IMPORT: SensorKey = SensorKey::new(
        "total_energy_import",
        &["total_energy_bought", "total_grid_import"],
    );
    pub const TOTAL_EXPORT: SensorKey = SensorKey::new(
        "total_energy_export",
        &["total_energy_sold", "total_grid_export"],
    );

    pub const CT_POWER: SensorKey =
        SensorKey::new("external_ct_power", &["external_total_ct_power", "smart_meter_power"]);
    pub const CT_L1_POWER: SensorKey =
        SensorKey::new("external_ct_l1_power", &["external_ct1_power"]);
    pub const CT_L2_POWER: SensorKey =
        SensorKey::new("external_ct_l2_power", &["external_ct2_power"]);
    pub const CT_L3_POWER: SensorKey =
        SensorKey::new("external_ct_l3_power", &["external_ct3_power"]);
    pub const CT_L1_CURRENT: SensorKey =
        SensorKey::new("external_ct_l1_current", &["external_ct1_current"]);
    pub const CT_L2_CURRENT: SensorKey =
        SensorKey::new("external_ct_l2_current", &["external_ct2_current"]);
    pub const CT_L3_CURRENT: SensorKey =
        SensorKey::new("external_ct_l3_current", &["external_ct3_current"]);
}

pub mod pv {
    use super::SensorKey;

    pub const TOTAL_POWER: SensorKey = SensorKey::new("total_pv_power", &["pv_power"]);
    pub const DAILY_PRODUCTION: SensorKey =
        SensorKey::new("daily_production", &["daily_pv_production", "daily_energy_production"]);
    pub const TOTAL_PRODUCTION: SensorKey =
        SensorKey::new("total_production", &["total_pv_production", "total_energy_production"]);
}

pub mod load {
    use super::SensorKey;

    pub const POWER: SensorKey = SensorKey::new(
        "total_load_power",
        &["load_power", "total_consumption_power", "house_load_power"],
    );
    pub const FREQUENCY: SensorKey = SensorKey::new("load_frequency", &[]);
    pub const DAILY_CONSUMPTION: SensorKey =
        SensorKey::new("daily_load_consumption", &["daily_consumption"]);
    pub const TOTAL_CONSUMPTION: SensorKey =
        SensorKey::new("total_load_consumption", &["total_consumption"]);
}

pub mod inverter {
    use super::SensorKey;

    pub const TEMPERATURE: SensorKey = SensorKey::new(
        "inverter_temperature",
        &["radiator_temperature", "ac_temperature", "temperature"],
    );
}

pub mod generator {
    use super::SensorKey;

    pub const POWER: SensorKey =
        SensorKey::new("total_generator_power", &["generator_power", "gen_power"]);
    pub const DAILY_ENERGY: SensorKey =
        SensorKey::new("daily_generator_production", &["daily_gen_energy"]);
    pub const TOTAL_ENERGY: SensorKey =
        SensorKey::new("total_generator_production", &["total_gen_energy"]);
}

pub mod ups {
    use super::SensorKey;

    pub const POWER: SensorKey = SensorKey::new(
        "total_ups_power",
        &["ups_power", "total_eps_power", "eps_power", "backup_power"],
    );
    pub const L1_POWER: SensorKey = SensorKey::new("ups_l1_power", &["eps_l1_power"]);
    pub const L2_POWER: SensorKey = SensorKey::new("ups_l2_power", &["eps_l2_power"]);
    pub const L3_POWER: SensorKey = SensorKey::new("ups_l3_power", &["eps_l3_power"]);
    pub const L1_VOLTAGE: SensorKey = SensorKey::new("ups_l1_voltage", &["eps_l1_voltage"]);
    pub const L2_VOLTAGE: SensorKey = SensorKey::new("ups_l2_voltage", &["eps_l2_voltage"]);
    pub const L3_VOLTAGE: SensorKey = SensorKey::new("ups_l3_voltage", &["eps_l3_voltage"]);
}

pub mod time_of_use {
    use super::SensorKey;

    pub const DAYS: SensorKey = SensorKey::new("time_of_use_days", &["work_days", "tou_days"]);
}
