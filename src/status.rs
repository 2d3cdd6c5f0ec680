//! Composite status model
//!
//! The immutable snapshot produced by one read: optional per-subsystem
//! records assembled from decoded sensor values. Serializes to snake_case
//! JSON with ISO-8601 UTC timestamps; absent subsystems are omitted.
//!
//! Sign conventions carried by the model: positive battery power is
//! discharging, positive grid power is importing; load, PV, generator and
//! UPS power are non-negative. Units are W, V, A, Hz, degrees Celsius,
//! percent and kWh throughout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subsystems a caller can request from one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemGroup {
    Battery,
    Grid,
    Pv,
    Load,
    Inverter,
    Generator,
    Ups,
    Bms,
    TimeOfUse,
    Settings,
    Alerts,
    Computed,
}

/// Default set used when a read request names no groups.
pub const BASIC_GROUPS: &[SubsystemGroup] = &[
    SubsystemGroup::Battery,
    SubsystemGroup::Grid,
    SubsystemGroup::Pv,
    SubsystemGroup::Load,
];

impl SubsystemGroup {
    /// Upstream profile group names feeding this subsystem.
    ///
    /// Profiles are authored against many vendor conventions; this mapping
    /// is the normative union of group names seen in the field.
    pub fn profile_group_names(&self) -> &'static [&'static str] {
        match self {
            SubsystemGroup::Battery => {
                &["Battery", "Battery Energy", "Battery Meter", "Meter", "meter"]
            }
            SubsystemGroup::Grid => &[
                "Grid",
                "grid",
                "AC",
                "Power Grid",
                "GridEPS",
                "Active Power",
                "Apparent Power",
                "Reactive Power",
                "Power Factor",
                "Voltage",
                "Current",
                "Frequency",
                "Meter",
                "meter",
            ],
            SubsystemGroup::Pv => &[
                "PV",
                "Solar",
                "DC",
                "InverterDC",
                "Production",
                "Meter",
                "meter",
            ],
            SubsystemGroup::Load => &[
                "Load",
                "load",
                "Consumption",
                "Electricity Consumption",
                "Output",
                "output",
                "Meter",
                "meter",
            ],
            SubsystemGroup::Inverter => &[
                "Info",
                "info",
                "Inverter",
                "Device",
                "Inverter Information",
                "InverterAC",
                "InverterStatus",
                "Control",
                "Status",
                "State",
            ],
            SubsystemGroup::Generator => &[
                "Generator",
                "Gen",
                "Generator/SmartLoad/Microinverter",
                "Meter",
                "meter",
            ],
            SubsystemGroup::Ups => {
                &["UPS", "Backup", "Output", "output", "EPS", "GridEPS"]
            }
            SubsystemGroup::Bms => &[
                "BMS",
                "Battery Management",
                "Battery Module",
                "Battery 1",
                "Battery 2",
                "Battery 3",
                "Battery 4",
                "Battery 5",
                "Battery 6",
                "Battery 7",
                "Battery 8",
            ],
            SubsystemGroup::TimeOfUse => {
                &["Time of Use", "Schedule", "TOU", "Timed", "Work Mode"]
            }
            SubsystemGroup::Settings => &[
                "Settings",
                "Parameters",
                "Configuration",
                "Work Mode",
                "Grid Parameters",
                "Passive mode settings",
            ],
            SubsystemGroup::Alerts => &["Alerts", "Alarm", "Fault", "faults", "State"],
            SubsystemGroup::Computed => {
                &["Computed", "Calculated", "Losses", "Other", "Energy"]
            }
        }
    }
}

impl std::fmt::Display for SubsystemGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SubsystemGroup::Battery => "battery",
            SubsystemGroup::Grid => "grid",
            SubsystemGroup::Pv => "pv",
            SubsystemGroup::Load => "load",
            SubsystemGroup::Inverter => "inverter",
            SubsystemGroup::Generator => "generator",
            SubsystemGroup::Ups => "ups",
            SubsystemGroup::Bms => "bms",
            SubsystemGroup::TimeOfUse => "time_of_use",
            SubsystemGroup::Settings => "settings",
            SubsystemGroup::Alerts => "alerts",
            SubsystemGroup::Computed => "computed",
        };
        write!(f, "{}", name)
    }
}

/// Battery state of one read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// State of charge, percent
    pub soc: i64,
    /// Terminal voltage, volts
    pub voltage: f64,
    /// Current, amps; derived from power/voltage when no current sensor
    pub current: f64,
    /// Power in watts; positive discharging, negative charging
    pub power: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub soh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub daily_charge_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub daily_discharge_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_charge_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_discharge_kwh: Option<f64>,
}

/// Per-phase grid measurements. Fields absent from the profile stay unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPhase {
    /// Phase number, 1..=3
    pub phase: u8,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub power: Option<f64>,
}

/// External CT / smart-meter measurements at the grid entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalCtStatus {
    /// Total power through the CT, watts
    pub power: i64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub phases: Vec<GridPhase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridStatus {
    /// Total power in watts; positive importing, negative exporting
    pub power: i64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub phases: Vec<GridPhase>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub power_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub daily_import_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub daily_export_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_import_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_export_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_ct: Option<ExternalCtStatus>,
}

/// One PV string (MPPT input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvString {
    /// String number, 1..=4
    pub id: u8,
    pub voltage: f64,
    pub current: f64,
    pub power: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvStatus {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub strings: Vec<PvString>,
    /// Total PV power, watts
    pub power: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub daily_production_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_production_kwh: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPhase {
    pub phase: u8,
    pub power: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadStatus {
    /// Total load power, watts, non-negative
    pub power: i64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub phases: Vec<LoadPhase>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub daily_consumption_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_consumption_kwh: Option<f64>,
}

/// Coarse device state derived from the vendor state lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Standby,
    Running,
    Fault,
    #[default]
    Unknown,
}

/// One decoded alarm or fault bit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAlarm {
    /// Bit position in the assembled alarm word
    pub bit: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterStatus {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub firmware_version: Option<String>,
    pub status: DeviceStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub alarms: Vec<DeviceAlarm>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub faults: Vec<DeviceAlarm>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub device_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorStatus {
    /// Generator power, watts, stored as absolute value
    pub power: i64,
    pub is_running: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub daily_production_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_production_kwh: Option<f64>,
}

/// Operating mode of the emergency/backup output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsMode {
    /// Supplying loads from the battery (off-grid)
    Battery,
    /// Grid present, output idle or passing through
    Standby,
    Bypass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsPhase {
    pub phase: u8,
    pub power: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub voltage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsStatus {
    /// Backup output power, watts, non-negative
    pub power: i64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub phases: Vec<UpsPhase>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mode: Option<UpsMode>,
}

/// Cell-level detail of one BMS unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmsCellInfo {
    pub min_cell_voltage: f64,
    pub max_cell_voltage: f64,
    /// Spread between extreme cells, millivolts, never negative
    pub voltage_delta_mv: i64,
    pub cell_count: i64,
}

/// One battery-management unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmsStatus {
    /// Upstream unit identifier, e.g. `battery_1`
    pub unit: String,
    pub soc: f64,
    pub voltage: f64,
    pub current: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cells: Option<BmsCellInfo>,
}

/// Charge/discharge policy for a schedule slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfUseMode {
    GridCharge,
    SelfConsumption,
}

/// One programmable schedule slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOfUseSlot {
    /// Slot number, 1..=6
    pub slot: u8,
    /// Start of the window, minutes after midnight
    pub start_minutes: i64,
    /// Raw end marker; `0` means "until the next slot", endpoint
    /// derivation is left to the application
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_minutes: Option<i64>,
    pub is_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mode: Option<TimeOfUseMode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_soc: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub charge_power: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub charge_voltage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOfUseStatus {
    pub slots: Vec<TimeOfUseSlot>,
    /// Active weekdays, 0 = Monday .. 6 = Sunday, decoded from the
    /// schedule bitmask
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub days: Option<Vec<u8>>,
}

/// Snapshot of the whole energy system, built per read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarStatus {
    /// Build instant, UTC
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub battery: Option<BatteryStatus>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub grid: Option<GridStatus>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pv: Option<PvStatus>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub load: Option<LoadStatus>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub inverter: Option<InverterStatus>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub generator: Option<GeneratorStatus>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ups: Option<UpsStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub bms: Vec<BmsStatus>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time_of_use: Option<TimeOfUseStatus>,
}

impl SolarStatus {
    /// An empty snapshot stamped now.
    pub fn empty() -> Self {
        Self {
            timestamp: Utc::now(),
            battery: None,
            grid: None,
            pv: None,
            load: None,
            inverter: None,
            generator: None,
            ups: None,
            bms: Vec::new(),
            time_of_use: None,
        }
    }

    /// Whether no subsystem produced a record.
    pub fn is_empty(&self) -> bool {
        self.battery.is_none()
            && self.grid.is_none()
            && self.pv.is_none()
            && self.load.is_none()
            && self.inverter.is_none()
            && self.generator.is_none()
            && self.ups.is_none()
            && self.bms.is_empty()
            && self.time_of_use.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_subsystems_are_omitted_from_json() {
        let mut status = SolarStatus::empty();
        status.battery = Some(BatteryStatus {
            soc: 95,
            voltage: 53.28,
            current: 0.169,
            power: 9,
            temperature: None,
            soh: None,
            daily_charge_kwh: None,
            daily_discharge_kwh: None,
            total_charge_kwh: None,
            total_discharge_kwh: None,
        });

        let json = serde_json::to_value(&status).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("timestamp"));
        assert!(object.contains_key("battery"));
        assert!(!object.contains_key("grid"));
        assert!(!object.contains_key("bms"));
        // optional battery fields are dropped too
        let battery = object["battery"].as_object().unwrap();
        assert!(!battery.contains_key("temperature"));
        assert_eq!(battery["soc"], 95);
    }

    #[test]
    fn timestamp_serializes_as_iso8601_utc() {
        let status = SolarStatus::empty();
        let json = serde_json::to_value(&status).unwrap();
        let text = json["timestamp"].as_str().unwrap();
        assert!(text.contains('T'));
        assert!(text.ends_with('Z') || text.contains("+00:00"));
    }

    #[test]
    fn json_round_trip() {
        let mut status = SolarStatus::empty();
        status.ups = Some(UpsStatus {
            power: 1200,
            phases: vec![UpsPhase {
                phase: 1,
                power: 1200.0,
                voltage: Some(230.0),
            }],
            mode: Some(UpsMode::Battery),
        });
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"mode\":\"battery\""));
        let back: SolarStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn group_mapping_is_stable() {
        assert!(
            SubsystemGroup::Battery
                .profile_group_names()
                .contains(&"Battery Energy")
        );
        assert!(SubsystemGroup::Grid.profile_group_names().contains(&"GridEPS"));
        assert!(SubsystemGroup::Bms.profile_group_names().contains(&"Battery 8"));
        assert!(
            SubsystemGroup::TimeOfUse
                .profile_group_names()
                .contains(&"Work Mode")
        );
        assert!(SubsystemGroup::Ups.profile_group_names().contains(&"EPS"));
        assert!(SubsystemGroup::Alerts.profile_group_names().contains(&"faults"));
    }

    #[test]
    fn group_display_names() {
        assert_eq!(SubsystemGroup::TimeOfUse.to_string(), "time_of_use");
        assert_eq!(SubsystemGroup::Pv.to_string(), "pv");
    }

    #[test]
    fn empty_status_reports_empty() {
        assert!(SolarStatus::empty().is_empty());
    }
}
