//! Device profile model
//!
//! In-memory representation of a vendor device definition: register layout,
//! parsing rules, lookups, ranges, composite sensors and decoder options.
//! Profiles are parsed once by [`loader`] and treated as immutable values
//! afterwards.

use serde::{Deserialize, Serialize};

pub mod loader;

pub use loader::{bundled_profiles, load_bundled, ProfileLoader};

/// Parsing rule catalogue for sensor items.
///
/// The numeric discriminants match the rule numbers used in profile
/// documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsingRule {
    /// Computed sensor without registers of its own
    Computed,
    /// Unsigned 16-bit (signed reinterpretation via item flags)
    U16,
    /// Signed 16-bit two's complement
    I16,
    /// Unsigned 32-bit, CDAB word order
    U32,
    /// Signed 32-bit, CDAB word order
    I32,
    /// ASCII string, two bytes per register
    Ascii,
    /// Raw bitmask, decoded through bit lookups
    Bits,
    /// Nibble-wise version string
    Version,
    /// Packed date and time
    DateTime,
    /// HHMM-encoded time of day
    Time,
    /// Raw registers, passed through untouched
    Raw,
}

impl ParsingRule {
    /// Map a profile rule number onto the catalogue. Unknown numbers are
    /// rejected by the loader before this is ever called with them.
    pub fn from_number(rule: u8) -> Option<Self> {
        match rule {
            0 => Some(ParsingRule::Computed),
            1 => Some(ParsingRule::U16),
            2 => Some(ParsingRule::I16),
            3 => Some(ParsingRule::U32),
            4 => Some(ParsingRule::I32),
            5 => Some(ParsingRule::Ascii),
            6 => Some(ParsingRule::Bits),
            7 => Some(ParsingRule::Version),
            8 => Some(ParsingRule::DateTime),
            9 => Some(ParsingRule::Time),
            10 => Some(ParsingRule::Raw),
            _ => None,
        }
    }

    /// The rule number as written in profile documents
    pub fn number(&self) -> u8 {
        match self {
            ParsingRule::Computed => 0,
            ParsingRule::U16 => 1,
            ParsingRule::I16 => 2,
            ParsingRule::U32 => 3,
            ParsingRule::I32 => 4,
            ParsingRule::Ascii => 5,
            ParsingRule::Bits => 6,
            ParsingRule::Version => 7,
            ParsingRule::DateTime => 8,
            ParsingRule::Time => 9,
            ParsingRule::Raw => 10,
        }
    }

    /// Whether the rule decodes to a plain numeric value
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ParsingRule::U16
                | ParsingRule::I16
                | ParsingRule::U32
                | ParsingRule::I32
                | ParsingRule::Time
        )
    }

    /// Minimum number of registers the rule needs
    pub fn min_registers(&self) -> usize {
        match self {
            ParsingRule::Computed => 0,
            ParsingRule::U16 | ParsingRule::I16 | ParsingRule::Time => 1,
            ParsingRule::U32 | ParsingRule::I32 => 2,
            ParsingRule::Ascii
            | ParsingRule::Bits
            | ParsingRule::Version
            | ParsingRule::Raw => 1,
            ParsingRule::DateTime => 3,
        }
    }
}

/// Entity platform a sensor item is exposed as.
///
/// Everything except `Sensor` and `BinarySensor` is a writable kind; the
/// monitoring core reads them all the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Sensor,
    BinarySensor,
    Number,
    Select,
    Switch,
    DateTime,
    Time,
    Button,
}

impl Platform {
    /// Whether the platform represents a writable device setting
    pub fn is_writable(&self) -> bool {
        !matches!(self, Platform::Sensor | Platform::BinarySensor)
    }
}

/// A single lookup table entry, matching a raw value to a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub key: LookupKey,
    pub value: String,
}

/// Discriminator for lookup entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKey {
    /// Matches one exact raw value
    Single(i64),
    /// Matches any raw value in the set
    Multiple(Vec<i64>),
    /// Matches when the given bit is set in the raw value
    Bit(u32),
    /// Matches after every other entry failed
    Default,
}

impl LookupEntry {
    /// Whether this entry matches the given raw value.
    ///
    /// Default entries never match here; callers consult them separately
    /// after all non-default entries failed. Bit positions 64 and above
    /// never match through this accessor.
    pub fn matches(&self, value: i64) -> bool {
        match &self.key {
            LookupKey::Single(k) => *k == value,
            LookupKey::Multiple(keys) => keys.contains(&value),
            LookupKey::Bit(p) if *p < 64 => (value as u64 >> p) & 1 == 1,
            LookupKey::Bit(_) => false,
            LookupKey::Default => false,
        }
    }
}

/// Resolve a raw value against a lookup table.
///
/// Non-default entries are tried in declared order; the `default` entry, if
/// present, is consulted only after all others fail.
pub fn resolve_lookup(entries: &[LookupEntry], value: i64) -> Option<&str> {
    for entry in entries {
        if entry.matches(value) {
            return Some(&entry.value);
        }
    }
    entries
        .iter()
        .find(|e| e.key == LookupKey::Default)
        .map(|e| e.value.as_str())
}

/// Arithmetic operator for composite sub-sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeOperator {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// One leg of a composite sensor aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSensor {
    pub registers: Vec<u16>,
    pub scale: f64,
    pub offset: f64,
    pub signed: bool,
    pub operator: CompositeOperator,
}

/// Delimiters for version string rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionDelimiters {
    /// Placed between nibbles of one register
    pub digit: String,
    /// Placed between registers
    pub register: String,
}

impl Default for VersionDelimiters {
    fn default() -> Self {
        Self {
            digit: ".".to_string(),
            register: "-".to_string(),
        }
    }
}

/// Raw-value range filter, applied before transformation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Substituted for out-of-range raw values; without it the value errors
    pub default: Option<f64>,
}

impl RawRange {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.default.is_none()
    }

    /// Whether a raw value sits inside the (half-open-optional) window
    pub fn contains(&self, value: f64) -> bool {
        if let Some(min) = self.min
            && value < min
        {
            return false;
        }
        if let Some(max) = self.max
            && value > max
        {
            return false;
        }
        true
    }
}

/// Post-transform validation window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ValidationRange {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        if let Some(min) = self.min
            && value < min
        {
            return false;
        }
        if let Some(max) = self.max
            && value > max
        {
            return false;
        }
        true
    }
}

/// A single sensor definition inside a parameter group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorItem {
    /// Human-readable sensor name as authored in the profile
    pub name: String,

    /// Lowercased name with spaces and hyphens folded to underscores;
    /// empty for device-level placeholders
    pub normalized_id: String,

    /// Holding-register addresses, in read order; empty for computed sensors
    pub registers: Vec<u16>,

    /// Parsing rule
    pub rule: ParsingRule,

    /// Entity platform
    pub platform: Platform,

    /// Device class hint (upstream passthrough)
    pub class: Option<String>,

    /// State class hint (upstream passthrough)
    pub state_class: Option<String>,

    /// Unit of measurement hint
    pub uom: Option<String>,

    /// Icon hint
    pub icon: Option<String>,

    /// Multiplier of the affine transform
    pub scale: f64,

    /// Subtrahend of the affine transform
    pub offset: f64,

    /// Reinterpret the raw value as signed
    pub signed: bool,

    /// Negate the transformed value
    pub inverse: bool,

    /// Sign-magnitude instead of two's complement for signed decoding
    pub magnitude: bool,

    /// Bitmask applied to the raw value
    pub mask: Option<u32>,

    /// Integer divisor applied after the affine transform
    pub divide: Option<u32>,

    /// Single-bit extraction position, 0..=31
    pub bit: Option<u8>,

    /// Raw-value range filter
    pub range: RawRange,

    /// Post-transform validation window
    pub validation: ValidationRange,

    /// Enum / bit-flag lookup table
    pub lookup: Vec<LookupEntry>,

    /// Select options (writable platforms, upstream passthrough)
    pub options: Vec<String>,

    /// Composite sub-sensors
    pub sensors: Vec<SubSensor>,

    /// Names of attribute sensors attached to this one
    pub attributes: Vec<String>,

    /// Marks the item as an attribute of its device
    pub attribute: bool,

    pub description: Option<String>,

    /// Per-item poll interval override in seconds
    pub update_interval: Option<u64>,

    /// Version rendering delimiters
    pub delimiters: VersionDelimiters,

    /// Render version nibbles as hex digits
    pub hex: bool,
}

impl SensorItem {
    /// A minimal read-only sensor with defaults for every tuning knob.
    pub fn new<S: Into<String>>(name: S, rule: ParsingRule, registers: Vec<u16>) -> Self {
        let name = name.into();
        let normalized_id = normalize_name(&name);
        Self {
            name,
            normalized_id,
            registers,
            rule,
            platform: Platform::default(),
            class: None,
            state_class: None,
            uom: None,
            icon: None,
            scale: 1.0,
            offset: 0.0,
            signed: false,
            inverse: false,
            magnitude: false,
            mask: None,
            divide: None,
            bit: None,
            range: RawRange::default(),
            validation: ValidationRange::default(),
            lookup: Vec::new(),
            options: Vec::new(),
            sensors: Vec::new(),
            attributes: Vec::new(),
            attribute: false,
            description: None,
            update_interval: None,
            delimiters: VersionDelimiters::default(),
            hex: true,
        }
    }

    /// Device-level placeholders carry an empty name and never produce values
    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty()
    }

    /// Computed sensors reference no registers of their own
    pub fn is_computed(&self) -> bool {
        self.registers.is_empty()
    }
}

/// A named group of sensor items sharing a poll cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGroup {
    pub group: String,
    pub update_interval: Option<u64>,
    pub items: Vec<SensorItem>,
}

/// Device identity block of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub manufacturer: String,
    /// One or more model patterns; `*` matches any run of characters
    pub models: Vec<String>,
}

/// Profile-wide defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefaults {
    /// Polling interval in seconds
    pub update_interval: u64,
    /// Decimal digits kept when rounding for presentation
    pub digits: u32,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            update_interval: 5,
            digits: 6,
        }
    }
}

/// Modbus function code selector for explicit request blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterFunction {
    #[default]
    Holding,
    Input,
}

/// Explicit read-request block. Parsed and kept for authoring fidelity; the
/// read path derives its own batches and always issues holding-register
/// reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBlock {
    pub start: u16,
    pub count: u16,
    pub function: RegisterFunction,
    pub name: Option<String>,
}

/// A complete device definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterDefinition {
    /// Profile identifier the definition was loaded under
    pub id: String,
    pub info: DeviceInfo,
    pub defaults: ProfileDefaults,
    pub requests: Vec<RequestBlock>,
    pub parameters: Vec<ParameterGroup>,
}

impl InverterDefinition {
    /// Iterate all sensor items across all parameter groups
    pub fn all_items(&self) -> impl Iterator<Item = &SensorItem> {
        self.parameters.iter().flat_map(|g| g.items.iter())
    }

    /// Items of the groups whose names appear in `group_names`
    /// (case-sensitive, upstream names are used verbatim).
    pub fn items_in_groups<'a, 'b>(
        &'a self,
        group_names: &'b [&'b str],
    ) -> impl Iterator<Item = &'a SensorItem> + use<'a, 'b> {
        self.parameters
            .iter()
            .filter(move |g| group_names.contains(&g.group.as_str()))
            .flat_map(|g| g.items.iter())
    }
}

/// Derive the canonical sensor identifier from a human-readable name.
///
/// Lowercases and folds spaces and hyphens to underscores, preserving
/// order; consecutive separators produce consecutive underscores.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}
