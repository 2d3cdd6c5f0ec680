//! Status assembly
//!
//! Turns a populated register map, a device profile and a set of requested
//! subsystem groups into a [`SolarStatus`]. Extraction is defensive
//! throughout: an item is skipped when any of its registers is missing
//! from the map (transports may short-return) or when conversion fails;
//! one malformed sensor never aborts the read.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};

use crate::convert;
use crate::keys::{self, SensorKey, SensorValues};
use crate::profile::{
    CompositeOperator, InverterDefinition, ParsingRule, SensorItem, resolve_lookup,
};
use crate::status::{
    BASIC_GROUPS, BatteryStatus, BmsCellInfo, BmsStatus, DeviceAlarm, DeviceStatus,
    ExternalCtStatus, GeneratorStatus, GridPhase, GridStatus, InverterStatus, LoadPhase,
    LoadStatus, PvStatus, PvString, SolarStatus, SubsystemGroup, TimeOfUseMode, TimeOfUseSlot,
    TimeOfUseStatus, UpsMode, UpsPhase, UpsStatus,
};

/// Holding-register address to raw value, as assembled by the orchestrator.
pub type RegisterMap = HashMap<u16, u16>;

/// Collect the sensor items feeding the requested subsystems.
///
/// Items are taken from every upstream profile group a requested subsystem
/// maps to; duplicate normalized identifiers keep the first occurrence.
pub fn collect_group_items<'a>(
    profile: &'a InverterDefinition,
    groups: &[SubsystemGroup],
) -> Vec<&'a SensorItem> {
    let mut wanted: Vec<&str> = Vec::new();
    for group in groups {
        for name in group.profile_group_names() {
            if !wanted.contains(name) {
                wanted.push(name);
            }
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut items = Vec::new();
    for item in profile.items_in_groups(&wanted) {
        if item.normalized_id.is_empty() {
            continue;
        }
        if seen.insert(item.normalized_id.as_str()) {
            items.push(item);
        }
    }
    items
}

/// Gather an item's register values from the map, in declared order.
/// `None` when any address is missing.
fn registers_for(map: &RegisterMap, addresses: &[u16]) -> Option<Vec<u16>> {
    addresses
        .iter()
        .map(|address| map.get(address).copied())
        .collect()
}

/// Evaluate a composite item from its sub-sensor legs.
fn composite_value(map: &RegisterMap, item: &SensorItem) -> Option<f64> {
    let mut total: Option<f64> = None;
    for sub in &item.sensors {
        let registers = registers_for(map, &sub.registers)?;
        let raw = match registers.len() {
            1 => {
                if sub.signed {
                    f64::from(registers[0] as i16)
                } else {
                    f64::from(registers[0])
                }
            }
            _ => {
                let wide = u32::from(registers[0]) | (u32::from(registers[1]) << 16);
                if sub.signed {
                    f64::from(wide as i32)
                } else {
                    f64::from(wide)
                }
            }
        };
        let value = (raw - sub.offset) * sub.scale;
        total = Some(match (total, sub.operator) {
            (None, _) => value,
            (Some(acc), CompositeOperator::Add) => acc + value,
            (Some(acc), CompositeOperator::Subtract) => acc - value,
            (Some(acc), CompositeOperator::Multiply) => acc * value,
            (Some(acc), CompositeOperator::Divide) => {
                if value == 0.0 {
                    return None;
                }
                acc / value
            }
        });
    }
    total
}

/// Extract numeric values for the collected items.
///
/// Only numeric rules participate; conversion errors drop the item from
/// the result (optional-sensor semantics). Composite items aggregate their
/// sub-sensor legs instead of a register slice of their own.
pub fn extract_sensor_values(map: &RegisterMap, items: &[&SensorItem]) -> SensorValues {
    let mut values = SensorValues::new();
    for item in items {
        if item.normalized_id.is_empty() {
            continue;
        }

        if !item.sensors.is_empty() {
            if let Some(value) = composite_value(map, item) {
                values.insert_first(item.normalized_id.clone(), value);
            }
            continue;
        }

        if !item.rule.is_numeric() || item.registers.is_empty() {
            continue;
        }
        let Some(registers) = registers_for(map, &item.registers) else {
            continue;
        };
        match convert::convert_numeric(&registers, item) {
            Ok(value) => values.insert_first(item.normalized_id.clone(), value),
            Err(_) => continue,
        }
    }
    values
}

/// Build a status snapshot from a register map.
pub fn build_status(
    map: &RegisterMap,
    profile: &InverterDefinition,
    groups: &[SubsystemGroup],
) -> SolarStatus {
    let groups: Vec<SubsystemGroup> = if groups.is_empty() {
        BASIC_GROUPS.to_vec()
    } else {
        groups.to_vec()
    };

    let items = collect_group_items(profile, &groups);
    let values = extract_sensor_values(map, &items);
    let state_label = device_state_label(map, &items);

    let mut status = SolarStatus::empty();
    for group in &groups {
        match group {
            SubsystemGroup::Battery => status.battery = assemble_battery(&values),
            SubsystemGroup::Grid => status.grid = assemble_grid(&values),
            SubsystemGroup::Pv => status.pv = assemble_pv(&values),
            SubsystemGroup::Load => status.load = assemble_load(&values),
            SubsystemGroup::Inverter => {
                status.inverter = assemble_inverter(map, &items, &values, state_label.as_deref());
            }
            SubsystemGroup::Generator => status.generator = assemble_generator(&values),
            SubsystemGroup::Ups => status.ups = assemble_ups(&values, state_label.as_deref()),
            SubsystemGroup::Bms => status.bms = assemble_bms(&values),
            SubsystemGroup::TimeOfUse => status.time_of_use = assemble_time_of_use(&values),
            // settings, alerts and computed groups contribute sensor values
            // but have no record of their own
            SubsystemGroup::Settings | SubsystemGroup::Alerts | SubsystemGroup::Computed => {}
        }
    }
    status
}

fn round_watts(value: f64) -> i64 {
    value.round() as i64
}

fn derived_current(power: f64, voltage: f64) -> f64 {
    if voltage > 0.0 { power / voltage } else { 0.0 }
}

fn assemble_battery(values: &SensorValues) -> Option<BatteryStatus> {
    let soc = keys::battery::SOC.lookup(values)?;
    let voltage = keys::battery::VOLTAGE.lookup(values)?;
    let power = keys::battery::POWER.lookup(values)?;
    let current = keys::battery::CURRENT
        .lookup(values)
        .unwrap_or_else(|| derived_current(power, voltage));

    Some(BatteryStatus {
        soc: soc.round() as i64,
        voltage,
        current,
        power: round_watts(power),
        temperature: keys::battery::TEMPERATURE.lookup(values),
        soh: keys::battery::SOH.lookup(values),
        daily_charge_kwh: keys::battery::DAILY_CHARGE.lookup(values),
        daily_discharge_kwh: keys::battery::DAILY_DISCHARGE.lookup(values),
        total_charge_kwh: keys::battery::TOTAL_CHARGE.lookup(values),
        total_discharge_kwh: keys::battery::TOTAL_DISCHARGE.lookup(values),
    })
}

const GRID_PHASE_KEYS: [(SensorKey, SensorKey, SensorKey); 3] = [
    (
        keys::grid::L1_VOLTAGE,
        keys::grid::L1_CURRENT,
        keys::grid::L1_POWER,
    ),
    (
        keys::grid::L2_VOLTAGE,
        keys::grid::L2_CURRENT,
        keys::grid::L2_POWER,
    ),
    (
        keys::grid::L3_VOLTAGE,
        keys::grid::L3_CURRENT,
        keys::grid::L3_POWER,
    ),
];

fn assemble_grid(values: &SensorValues) -> Option<GridStatus> {
    let power = keys::grid::POWER.lookup(values)?;

    let mut phases = Vec::new();
    for (index, (voltage, current, phase_power)) in GRID_PHASE_KEYS.iter().enumerate() {
        let voltage = voltage.lookup(values);
        let current = current.lookup(values);
        let phase_power = phase_power.lookup(values);
        if voltage.is_some() || current.is_some() || phase_power.is_some() {
            phases.push(GridPhase {
                phase: index as u8 + 1,
                voltage,
                current,
                power: phase_power,
            });
        }
    }
    if phases.is_empty() {
        let voltage = keys::grid::VOLTAGE.lookup(values);
        let current = keys::grid::CURRENT.lookup(values);
        if voltage.is_some() || current.is_some() {
            phases.push(GridPhase {
                phase: 1,
                voltage,
                current,
                power: Some(power),
            });
        }
    }

    Some(GridStatus {
        power: round_watts(power),
        phases,
        frequency: keys::grid::FREQUENCY.lookup(values),
        power_factor: keys::grid::POWER_FACTOR.lookup(values),
        daily_import_kwh: keys::grid::DAILY_IMPORT.lookup(values),
        daily_export_kwh: keys::grid::DAILY_EXPORT.lookup(values),
        total_import_kwh: keys::grid::TOTAL_IMPORT.lookup(values),
        total_export_kwh: keys::grid::TOTAL_EXPORT.lookup(values),
        external_ct: assemble_external_ct(values),
    })
}

const CT_PHASE_KEYS: [(SensorKey, SensorKey); 3] = [
    (keys::grid::CT_L1_POWER, keys::grid::CT_L1_CURRENT),
    (keys::grid::CT_L2_POWER, keys::grid::CT_L2_CURRENT),
    (keys::grid::CT_L3_POWER, keys::grid::CT_L3_CURRENT),
];

fn assemble_external_ct(values: &SensorValues) -> Option<ExternalCtStatus> {
    let total = keys::grid::CT_POWER.lookup(values);

    let mut phases = Vec::new();
    for (index, (power, current)) in CT_PHASE_KEYS.iter().enumerate() {
        let power = power.lookup(values);
        let current = current.lookup(values);
        if power.is_some() || current.is_some() {
            phases.push(GridPhase {
                phase: index as u8 + 1,
                voltage: None,
                current,
                power,
            });
        }
    }

    if total.is_none() && phases.is_empty() {
        return None;
    }

    let power = total
        .unwrap_or_else(|| phases.iter().filter_map(|p| p.power).sum::<f64>());
    Some(ExternalCtStatus {
        power: round_watts(power),
        phases,
    })
}

fn assemble_pv(values: &SensorValues) -> Option<PvStatus> {
    let mut strings = Vec::new();
    for id in 1u8..=4 {
        let Some(power) = values.get(&format!("pv{}_power", id)) else {
            continue;
        };
        let voltage = values.get(&format!("pv{}_voltage", id)).unwrap_or(0.0);
        let current = values
            .get(&format!("pv{}_current", id))
            .unwrap_or_else(|| derived_current(power, voltage));
        strings.push(PvString {
            id,
            voltage,
            current,
            power: round_watts(power),
        });
    }

    let total = keys::pv::TOTAL_POWER.lookup(values);
    if strings.is_empty() && total.is_none() {
        return None;
    }
    let power =
        total.unwrap_or_else(|| strings.iter().map(|s| s.power as f64).sum::<f64>());

    Some(PvStatus {
        strings,
        power: round_watts(power),
        daily_production_kwh: keys::pv::DAILY_PRODUCTION.lookup(values),
        total_production_kwh: keys::pv::TOTAL_PRODUCTION.lookup(values),
    })
}

fn assemble_load(values: &SensorValues) -> Option<LoadStatus> {
    let power = keys::load::POWER.lookup(values)?;

    let mut phases = Vec::new();
    for phase in 1u8..=3 {
        let Some(phase_power) = values.get(&format!("load_l{}_power", phase)) else {
            continue;
        };
        phases.push(LoadPhase {
            phase,
            power: phase_power,
            voltage: values.get(&format!("load_l{}_voltage", phase)),
            current: values.get(&format!("load_l{}_current", phase)),
        });
    }

    Some(LoadStatus {
        power: round_watts(power),
        phases,
        frequency: keys::load::FREQUENCY.lookup(values),
        daily_consumption_kwh: keys::load::DAILY_CONSUMPTION.lookup(values),
        total_consumption_kwh: keys::load::TOTAL_CONSUMPTION.lookup(values),
    })
}

fn find_item<'a>(items: &[&'a SensorItem], ids: &[&str]) -> Option<&'a SensorItem> {
    ids.iter()
        .find_map(|id| items.iter().find(|item| item.normalized_id == *id))
        .copied()
}

/// Resolve the vendor device-state lookup to its label, if the profile has
/// one and its registers were read.
fn device_state_label(map: &RegisterMap, items: &[&SensorItem]) -> Option<String> {
    let item = find_item(
        items,
        &[
            "device_state",
            "running_status",
            "device_status",
            "inverter_status",
            "run_state",
            "state",
        ],
    )
    .filter(|item| !item.lookup.is_empty())?;
    let registers = registers_for(map, &item.registers)?;
    let raw = convert::lookup_raw(&registers, item).ok()?;
    resolve_lookup(&item.lookup, raw).map(str::to_string)
}

const STANDBY_LABELS: &[&str] = &["standby", "stand-by", "waiting"];
const RUNNING_LABELS: &[&str] = &[
    "running",
    "normal",
    "generating",
    "on-grid",
    "charging",
    "discharging",
    "charging check",
    "discharging check",
    "emergency power supply",
];
const FAULT_LABELS: &[&str] = &[
    "fault",
    "alarm",
    "error",
    "failure",
    "permanent fault",
    "recoverable fault",
];

fn device_status_from_label(label: &str) -> DeviceStatus {
    let label = label.to_lowercase();
    if STANDBY_LABELS.contains(&label.as_str()) {
        DeviceStatus::Standby
    } else if RUNNING_LABELS.contains(&label.as_str()) {
        DeviceStatus::Running
    } else if FAULT_LABELS.contains(&label.as_str()) {
        DeviceStatus::Fault
    } else {
        DeviceStatus::Unknown
    }
}

const UPS_BATTERY_LABELS: &[&str] =
    &["emergency power supply", "eps", "off-grid", "discharging"];
const UPS_STANDBY_LABELS: &[&str] = &[
    "on-grid",
    "normal",
    "running",
    "standby",
    "stand-by",
    "waiting",
    "charging",
    "charging check",
];

fn ups_mode_from_label(label: &str) -> Option<UpsMode> {
    let label = label.to_lowercase();
    if UPS_BATTERY_LABELS.contains(&label.as_str()) {
        Some(UpsMode::Battery)
    } else if UPS_STANDBY_LABELS.contains(&label.as_str()) {
        Some(UpsMode::Standby)
    } else if label == "bypass" {
        Some(UpsMode::Bypass)
    } else {
        None
    }
}

/// Decode bit-flag alarms from a bit-lookup item. The item's registers are
/// combined little-endian (first register is the least significant word)
/// into one value of up to 64 bits; one alarm is emitted per set bit that
/// has a matching bit lookup entry.
fn decode_bit_flags(map: &RegisterMap, item: &SensorItem) -> Vec<DeviceAlarm> {
    let Some(registers) = registers_for(map, &item.registers) else {
        return Vec::new();
    };
    let word = convert::combine_le64(&registers);

    let mut flags = Vec::new();
    for entry in &item.lookup {
        if let crate::profile::LookupKey::Bit(bit) = entry.key
            && bit < 64
            && (word >> bit) & 1 == 1
        {
            flags.push(DeviceAlarm {
                bit: bit as u8,
                message: entry.value.clone(),
            });
        }
    }
    flags
}

/// Parse the rule-8 output (`"YY/MM/DD HH:MM:SS"`) as a UTC instant.
fn parse_device_time(text: &str) -> Option<DateTime<Utc>> {
    let (date, time) = text.split_once(' ')?;
    let mut date_parts = date.split('/');
    let year: i32 = date_parts.next()?.parse().ok()?;
    let month: u32 = date_parts.next()?.parse().ok()?;
    let day: u32 = date_parts.next()?.parse().ok()?;
    let mut time_parts = time.split(':');
    let hour: u32 = time_parts.next()?.parse().ok()?;
    let minute: u32 = time_parts.next()?.parse().ok()?;
    let second: u32 = time_parts.next()?.parse().ok()?;

    NaiveDate::from_ymd_opt(2000 + year, month, day)?
        .and_hms_opt(hour, minute, second)
        .map(|naive| naive.and_utc())
}

fn assemble_inverter(
    map: &RegisterMap,
    items: &[&SensorItem],
    values: &SensorValues,
    state_label: Option<&str>,
) -> Option<InverterStatus> {
    let serial_number = find_item(
        items,
        &["serial_number", "device_serial_number", "serial"],
    )
    .or_else(|| {
        items
            .iter()
            .find(|item| item.rule == ParsingRule::Ascii)
            .copied()
    })
    .filter(|item| item.rule == ParsingRule::Ascii)
    .and_then(|item| registers_for(map, &item.registers))
    .and_then(|registers| convert::decode_string(&registers).ok());

    let model = find_item(items, &["device", "device_type", "model"])
        .filter(|item| !item.lookup.is_empty())
        .and_then(|item| {
            let registers = registers_for(map, &item.registers)?;
            let raw = convert::lookup_raw(&registers, item).ok()?;
            resolve_lookup(&item.lookup, raw).map(str::to_string)
        });

    let firmware_version = find_item(
        items,
        &[
            "firmware_version",
            "software_version",
            "firmware_main_version",
        ],
    )
    .or_else(|| {
        items
            .iter()
            .find(|item| item.rule == ParsingRule::Version)
            .copied()
    })
    .filter(|item| item.rule == ParsingRule::Version)
    .and_then(|item| {
        let registers = registers_for(map, &item.registers)?;
        convert::decode_version(&registers, item).ok()
    });

    let alarms = find_item(items, &["device_alarm", "alarm"])
        .map(|item| decode_bit_flags(map, item))
        .unwrap_or_default();
    let faults = find_item(items, &["device_fault", "fault"])
        .map(|item| decode_bit_flags(map, item))
        .unwrap_or_default();

    let device_time = find_item(
        items,
        &["device_time", "system_time", "inverter_time", "time"],
    )
    .filter(|item| item.rule == ParsingRule::DateTime)
    .and_then(|item| registers_for(map, &item.registers))
    .and_then(|registers| convert::decode_datetime(&registers))
    .and_then(|text| parse_device_time(&text));

    let temperature = keys::inverter::TEMPERATURE.lookup(values);

    // at least one identifying datum or one numeric value must be present
    if serial_number.is_none()
        && model.is_none()
        && firmware_version.is_none()
        && values.is_empty()
    {
        return None;
    }

    Some(InverterStatus {
        serial_number,
        model,
        firmware_version,
        status: state_label
            .map(device_status_from_label)
            .unwrap_or_default(),
        temperature,
        alarms,
        faults,
        device_time,
    })
}

fn assemble_generator(values: &SensorValues) -> Option<GeneratorStatus> {
    let power = keys::generator::POWER.lookup(values)?.abs();
    Some(GeneratorStatus {
        power: round_watts(power),
        is_running: power > 0.0,
        daily_production_kwh: keys::generator::DAILY_ENERGY.lookup(values),
        total_production_kwh: keys::generator::TOTAL_ENERGY.lookup(values),
    })
}

const UPS_PHASE_KEYS: [(SensorKey, SensorKey); 3] = [
    (keys::ups::L1_POWER, keys::ups::L1_VOLTAGE),
    (keys::ups::L2_POWER, keys::ups::L2_VOLTAGE),
    (keys::ups::L3_POWER, keys::ups::L3_VOLTAGE),
];

fn assemble_ups(values: &SensorValues, state_label: Option<&str>) -> Option<UpsStatus> {
    let power = keys::ups::POWER.lookup(values)?;

    let mut phases = Vec::new();
    for (index, (phase_power, voltage)) in UPS_PHASE_KEYS.iter().enumerate() {
        let Some(phase_power) = phase_power.lookup(values) else {
            continue;
        };
        phases.push(UpsPhase {
            phase: index as u8 + 1,
            power: phase_power,
            voltage: voltage.lookup(values),
        });
    }

    Some(UpsStatus {
        power: round_watts(power),
        phases,
        mode: state_label.and_then(ups_mode_from_label),
    })
}

fn bms_unit(values: &SensorValues, unit: &str) -> Option<BmsStatus> {
    let soc = values.get(&format!("{}_soc", unit))?;
    let voltage = values.get(&format!("{}_voltage", unit))?;
    let current = values.get(&format!("{}_current", unit)).unwrap_or(0.0);

    let min_cell = values.get(&format!("{}_min_cell_voltage", unit));
    let max_cell = values.get(&format!("{}_max_cell_voltage", unit));
    let cells = match (min_cell, max_cell) {
        (Some(min), Some(max)) => Some(BmsCellInfo {
            min_cell_voltage: min,
            max_cell_voltage: max,
            voltage_delta_mv: ((max - min) * 1000.0).max(0.0).round() as i64,
            cell_count: values
                .get(&format!("{}_cell_count", unit))
                .map(|v| v as i64)
                .unwrap_or(16),
        }),
        _ => None,
    };

    Some(BmsStatus {
        unit: unit.to_string(),
        soc,
        voltage,
        current,
        temperature: values.get(&format!("{}_temperature", unit)),
        cells,
    })
}

fn assemble_bms(values: &SensorValues) -> Vec<BmsStatus> {
    let mut units: Vec<BmsStatus> = ["battery_1", "battery_2"]
        .iter()
        .filter_map(|unit| bms_unit(values, unit))
        .collect();
    if units.is_empty()
        && let Some(unit) = bms_unit(values, "battery_bms")
    {
        units.push(unit);
    }
    units
}

fn slot_flag(values: &SensorValues, slot: u8) -> Option<f64> {
    values.first_of(&[
        format!("program_{}_charging", slot),
        format!("program_{}_grid_charge", slot),
        format!("program_{}_charge_enable", slot),
    ])
}

fn assemble_time_of_use(values: &SensorValues) -> Option<TimeOfUseStatus> {
    let mut slots = Vec::new();
    for slot in 1u8..=6 {
        let Some(start) = values.get(&format!("program_{}_time", slot)) else {
            continue;
        };
        let flag = slot_flag(values, slot);
        slots.push(TimeOfUseSlot {
            slot,
            start_minutes: start as i64,
            // raw end marker, zero means "until the next slot"
            end_minutes: values
                .get(&format!("program_{}_end_time", slot))
                .map(|v| v as i64),
            is_enabled: flag.map(|f| f > 0.0).unwrap_or(true),
            mode: flag.map(|f| {
                if f > 0.0 {
                    TimeOfUseMode::GridCharge
                } else {
                    TimeOfUseMode::SelfConsumption
                }
            }),
            target_soc: values.get(&format!("program_{}_soc", slot)),
            charge_power: values.get(&format!("program_{}_power", slot)),
            charge_voltage: values.get(&format!("program_{}_voltage", slot)),
        });
    }

    if slots.is_empty() {
        return None;
    }

    let days = keys::time_of_use::DAYS.lookup(values).map(|mask| {
        let mask = mask as i64 as u64;
        (0u8..7).filter(|day| (mask >> day) & 1 == 1).collect()
    });

    Some(TimeOfUseStatus { slots, days })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values_of(pairs: &[(&str, f64)]) -> SensorValues {
        let mut values = SensorValues::new();
        for (id, value) in pairs {
            values.insert_first(*id, *value);
        }
        values
    }

    #[test]
    fn battery_requires_soc_voltage_power() {
        assert!(assemble_battery(&values_of(&[("battery_soc", 95.0)])).is_none());

        let battery = assemble_battery(&values_of(&[
            ("battery_soc", 95.0),
            ("battery_voltage", 53.28),
            ("battery_power", 9.0),
        ]))
        .unwrap();
        assert_eq!(battery.soc, 95);
        assert_eq!(battery.power, 9);
        assert!((battery.current - 9.0 / 53.28).abs() < 1e-9);
    }

    #[test]
    fn battery_current_prefers_direct_sensor() {
        let battery = assemble_battery(&values_of(&[
            ("battery_soc", 95.0),
            ("battery_voltage", 53.28),
            ("battery_power", 9.0),
            ("battery_current", 0.2),
        ]))
        .unwrap();
        assert_eq!(battery.current, 0.2);
    }

    #[test]
    fn battery_current_zero_when_voltage_not_positive() {
        let battery = assemble_battery(&values_of(&[
            ("battery_soc", 10.0),
            ("battery_voltage", 0.0),
            ("battery_power", 100.0),
        ]))
        .unwrap();
        assert_eq!(battery.current, 0.0);
    }

    #[test]
    fn grid_single_phase_fallback() {
        let grid = assemble_grid(&values_of(&[
            ("total_grid_power", 1500.0),
            ("grid_voltage", 230.0),
        ]))
        .unwrap();
        assert_eq!(grid.phases.len(), 1);
        assert_eq!(grid.phases[0].voltage, Some(230.0));
        assert_eq!(grid.phases[0].power, Some(1500.0));
    }

    #[test]
    fn grid_three_phase() {
        let grid = assemble_grid(&values_of(&[
            ("total_grid_power", 900.0),
            ("grid_l1_power", 300.0),
            ("grid_l2_power", 300.0),
            ("grid_l3_voltage", 231.0),
        ]))
        .unwrap();
        assert_eq!(grid.phases.len(), 3);
        assert_eq!(grid.phases[2].phase, 3);
        assert_eq!(grid.phases[2].voltage, Some(231.0));
    }

    #[test]
    fn external_ct_total_from_phases() {
        let grid = assemble_grid(&values_of(&[
            ("total_grid_power", 0.0),
            ("external_ct_l1_power", 100.0),
            ("external_ct_l2_power", -40.0),
        ]))
        .unwrap();
        let ct = grid.external_ct.unwrap();
        assert_eq!(ct.power, 60);
        assert_eq!(ct.phases.len(), 2);
    }

    #[test]
    fn no_external_ct_without_sensors() {
        let grid = assemble_grid(&values_of(&[("total_grid_power", 10.0)])).unwrap();
        assert!(grid.external_ct.is_none());
    }

    #[test]
    fn pv_strings_and_total() {
        let pv = assemble_pv(&values_of(&[
            ("pv1_power", 2500.0),
            ("pv1_voltage", 380.0),
            ("pv2_power", 1500.0),
        ]))
        .unwrap();
        assert_eq!(pv.strings.len(), 2);
        assert_eq!(pv.power, 4000);
        assert!((pv.strings[0].current - 2500.0 / 380.0).abs() < 1e-9);
        // voltage defaults to zero, current derivation then yields zero
        assert_eq!(pv.strings[1].voltage, 0.0);
        assert_eq!(pv.strings[1].current, 0.0);
    }

    #[test]
    fn pv_direct_total_wins() {
        let pv = assemble_pv(&values_of(&[
            ("pv1_power", 2500.0),
            ("total_pv_power", 2600.0),
        ]))
        .unwrap();
        assert_eq!(pv.power, 2600);
    }

    #[test]
    fn generator_power_absolute() {
        let generator = assemble_generator(&values_of(&[("total_generator_power", -1800.0)]))
            .unwrap();
        assert_eq!(generator.power, 1800);
        assert!(generator.is_running);

        let idle = assemble_generator(&values_of(&[("total_generator_power", 0.0)])).unwrap();
        assert!(!idle.is_running);
    }

    #[test]
    fn ups_mode_mapping() {
        assert_eq!(ups_mode_from_label("Off-Grid"), Some(UpsMode::Battery));
        assert_eq!(ups_mode_from_label("charging"), Some(UpsMode::Standby));
        assert_eq!(ups_mode_from_label("BYPASS"), Some(UpsMode::Bypass));
        assert_eq!(ups_mode_from_label("something"), None);
    }

    #[test]
    fn device_status_mapping() {
        assert_eq!(device_status_from_label("Stand-by"), DeviceStatus::Standby);
        assert_eq!(
            device_status_from_label("emergency power supply"),
            DeviceStatus::Running
        );
        assert_eq!(
            device_status_from_label("Permanent Fault"),
            DeviceStatus::Fault
        );
        assert_eq!(device_status_from_label("???"), DeviceStatus::Unknown);
    }

    #[test]
    fn bms_units_and_fallback() {
        let units = assemble_bms(&values_of(&[
            ("battery_1_soc", 80.0),
            ("battery_1_voltage", 51.2),
            ("battery_2_soc", 79.0),
            ("battery_2_voltage", 51.3),
            ("battery_2_current", -2.5),
        ]));
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].current, 0.0);
        assert_eq!(units[1].current, -2.5);

        let fallback = assemble_bms(&values_of(&[
            ("battery_bms_soc", 66.0),
            ("battery_bms_voltage", 52.0),
        ]));
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].unit, "battery_bms");
    }

    #[test]
    fn bms_cell_info() {
        let units = assemble_bms(&values_of(&[
            ("battery_1_soc", 80.0),
            ("battery_1_voltage", 51.2),
            ("battery_1_min_cell_voltage", 3.198),
            ("battery_1_max_cell_voltage", 3.204),
        ]));
        let cells = units[0].cells.as_ref().unwrap();
        assert_eq!(cells.voltage_delta_mv, 6);
        assert_eq!(cells.cell_count, 16);
    }

    #[test]
    fn time_of_use_slots() {
        let tou = assemble_time_of_use(&values_of(&[
            ("program_1_time", 360.0),
            ("program_1_charging", 1.0),
            ("program_1_soc", 80.0),
            ("program_3_time", 1320.0),
            ("program_3_charging", 0.0),
            ("time_of_use_days", 0b0011111 as f64),
        ]))
        .unwrap();
        assert_eq!(tou.slots.len(), 2);
        assert_eq!(tou.slots[0].slot, 1);
        assert!(tou.slots[0].is_enabled);
        assert_eq!(tou.slots[0].mode, Some(TimeOfUseMode::GridCharge));
        assert_eq!(tou.slots[1].slot, 3);
        assert!(!tou.slots[1].is_enabled);
        assert_eq!(tou.slots[1].mode, Some(TimeOfUseMode::SelfConsumption));
        // weekday bitmask, Monday first
        assert_eq!(tou.days, Some(vec![0, 1, 2, 3, 4]));
    }

    #[test]
    fn time_of_use_enabled_without_flag() {
        let tou = assemble_time_of_use(&values_of(&[("program_2_time", 60.0)])).unwrap();
        assert!(tou.slots[0].is_enabled);
        assert_eq!(tou.slots[0].mode, None);
    }

    #[test]
    fn time_of_use_absent_without_slots() {
        assert!(assemble_time_of_use(&values_of(&[("time_of_use_days", 127.0)])).is_none());
    }

    #[test]
    fn device_time_parsing() {
        let instant = parse_device_time("24/12/14 15:30:45").unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-12-14T15:30:45+00:00");
        assert!(parse_device_time("nonsense").is_none());
    }
}
