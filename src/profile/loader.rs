//! Profile loading and validation
//!
//! Parses device-definition YAML into the typed profile model. Vendor
//! documents use a handful of union shapes (scalar-or-list, decimal-or-hex,
//! shorthand delimiters, three lookup-key forms); each is accepted by an
//! explicit deserializer here and normalized on the way in, so the rest of
//! the crate never sees dynamic YAML.

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::{
    CompositeOperator, DeviceInfo, InverterDefinition, LookupEntry, LookupKey, ParameterGroup,
    ParsingRule, Platform, ProfileDefaults, RawRange, RegisterFunction, RequestBlock, SensorItem,
    SubSensor, ValidationRange, VersionDelimiters, normalize_name,
};
use crate::error::ProfileError;

/// Documents above this size are rejected before parsing
pub const MAX_DOCUMENT_SIZE: usize = 262_144;

/// Bundled device definitions shipped with the crate, keyed
/// `resources/<manufacturer>/<id>.yaml`.
static BUNDLED: &[(&str, &str, &str)] = &[
    (
        "deye",
        "deye_p3",
        include_str!("../../resources/deye/deye_p3.yaml"),
    ),
    (
        "deye",
        "deye_string",
        include_str!("../../resources/deye/deye_string.yaml"),
    ),
    (
        "sofar",
        "sofar_hyd3k",
        include_str!("../../resources/sofar/sofar_hyd3k.yaml"),
    ),
];

static BUNDLED_IDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut ids: Vec<&'static str> = BUNDLED.iter().map(|(_, id, _)| *id).collect();
    ids.sort_unstable();
    ids
});

/// Identifiers of all bundled profiles, in deterministic (sorted) order.
pub fn bundled_profiles() -> &'static [&'static str] {
    &BUNDLED_IDS
}

/// Load a bundled profile by identifier.
pub fn load_bundled(id: &str) -> Result<InverterDefinition, ProfileError> {
    let (_, _, yaml) = BUNDLED
        .iter()
        .find(|(_, bundled_id, _)| *bundled_id == id)
        .ok_or_else(|| {
            ProfileError::load_failed(id, "no bundled profile with this identifier")
        })?;
    ProfileLoader::parse(id, yaml)
}

/// Stateless profile loader.
pub struct ProfileLoader;

impl ProfileLoader {
    /// Parse a UTF-8 YAML document into a device definition.
    pub fn parse(id: &str, yaml: &str) -> Result<InverterDefinition, ProfileError> {
        if yaml.len() > MAX_DOCUMENT_SIZE {
            return Err(ProfileError::load_failed(
                id.to_string(),
                format!(
                    "document size {} exceeds the {} byte limit",
                    yaml.len(),
                    MAX_DOCUMENT_SIZE
                ),
            ));
        }

        let doc: ProfileDoc = serde_yaml::from_str(yaml).map_err(|err| {
            let line = err.location().map(|loc| loc.line());
            ProfileError::ParseError {
                id: id.to_string(),
                line,
                reason: err.to_string(),
            }
        })?;

        doc.into_definition(id)
    }

    /// Load a definition from a YAML file on disk.
    pub fn from_file<P: AsRef<Path>>(id: &str, path: P) -> Result<InverterDefinition, ProfileError> {
        let yaml = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            ProfileError::load_failed(id.to_string(), err.to_string())
        })?;
        Self::parse(id, &yaml)
    }

    /// Load `<dir>/<manufacturer>/<id>.yaml`, the bundled-resource layout.
    pub fn from_resource_dir<P: AsRef<Path>>(
        dir: P,
        manufacturer: &str,
        id: &str,
    ) -> Result<InverterDefinition, ProfileError> {
        let path = dir
            .as_ref()
            .join(manufacturer)
            .join(format!("{}.yaml", id));
        Self::from_file(id, path)
    }

    /// Serialize a definition back to the documented YAML shape.
    ///
    /// Fields at their defaults are omitted; a single model pattern is
    /// emitted as a scalar, several as a list.
    pub fn to_yaml(definition: &InverterDefinition) -> Result<String, ProfileError> {
        let doc = ProfileDoc::from_definition(definition);
        serde_yaml::to_string(&doc).map_err(|err| ProfileError::ParseError {
            id: definition.id.clone(),
            line: None,
            reason: err.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Raw document shapes

/// Scalar-or-list union. Several profile fields accept both forms; only the
/// first element of a list is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    fn first(&self) -> Option<T> {
        match self {
            OneOrMany::One(v) => Some(v.clone()),
            OneOrMany::Many(vs) => vs.first().cloned(),
        }
    }

    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(vs) => vs,
        }
    }
}

fn first_of(field: &Option<OneOrMany<f64>>) -> Option<f64> {
    field.as_ref().and_then(|f| f.first())
}

/// Decimal or hex integer literal, possibly quoted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum IntLiteral {
    Int(u64),
    Text(String),
}

impl IntLiteral {
    fn as_u32(&self, field: &str) -> Result<u32, String> {
        let value = match self {
            IntLiteral::Int(v) => *v,
            IntLiteral::Text(s) => {
                let s = s.trim();
                let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
                {
                    u64::from_str_radix(hex, 16)
                } else {
                    s.parse::<u64>()
                };
                parsed.map_err(|_| format!("{}: '{}' is not an integer literal", field, s))?
            }
        };
        u32::try_from(value).map_err(|_| format!("{}: {} does not fit in 32 bits", field, value))
    }
}

/// `delimiter:` shorthand (scalar digit delimiter) or full mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum DelimiterDoc {
    Shorthand(String),
    Full {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        digit: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        register: Option<String>,
    },
}

impl DelimiterDoc {
    fn into_delimiters(self) -> VersionDelimiters {
        let defaults = VersionDelimiters::default();
        match self {
            DelimiterDoc::Shorthand(digit) => VersionDelimiters {
                digit,
                register: defaults.register,
            },
            DelimiterDoc::Full { digit, register } => VersionDelimiters {
                digit: digit.unwrap_or(defaults.digit),
                register: register.unwrap_or(defaults.register),
            },
        }
    }
}

/// `lookup[].key` union: int, list of ints, or the literal `default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum LookupKeyDoc {
    Int(i64),
    List(Vec<i64>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LookupDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<LookupKeyDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bit: Option<u32>,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SubSensorDoc {
    registers: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    signed: bool,
    #[serde(default, skip_serializing_if = "is_default_operator")]
    operator: CompositeOperator,
}

fn is_default_operator(op: &CompositeOperator) -> bool {
    *op == CompositeOperator::Add
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct WindowDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<OneOrMany<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<OneOrMany<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<OneOrMany<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ItemDoc {
    #[serde(default)]
    name: String,
    rule: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    registers: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scale: Option<OneOrMany<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    signed: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    inverse: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    magnitude: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mask: Option<IntLiteral>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    divide: Option<IntLiteral>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bit: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<WindowDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    validation: Option<WindowDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    lookup: Vec<LookupDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    options: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sensors: Vec<SubSensorDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attribute: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    update_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delimiter: Option<DelimiterDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hex: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GroupDoc {
    group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    update_interval: Option<u64>,
    items: Vec<ItemDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct InfoDoc {
    manufacturer: String,
    model: OneOrMany<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
struct DefaultDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    update_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digits: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RequestDoc {
    start: i64,
    count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ProfileDoc {
    info: InfoDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<DefaultDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    requests: Vec<RequestDoc>,
    parameters: Vec<GroupDoc>,
}

// ---------------------------------------------------------------------------
// Normalization into the model

fn parse_error(id: &str, reason: String) -> ProfileError {
    ProfileError::ParseError {
        id: id.to_string(),
        line: None,
        reason,
    }
}

fn to_register_address(id: &str, context: &str, value: i64) -> Result<u16, ProfileError> {
    u16::try_from(value).map_err(|_| {
        parse_error(
            id,
            format!("{}: register address {} outside 0..65535", context, value),
        )
    })
}

impl ProfileDoc {
    fn into_definition(self, id: &str) -> Result<InverterDefinition, ProfileError> {
        let models = self.info.model.into_vec();
        if models.is_empty() {
            return Err(parse_error(id, "info.model must not be empty".to_string()));
        }
        if self.info.manufacturer.trim().is_empty() {
            return Err(parse_error(
                id,
                "info.manufacturer must not be empty".to_string(),
            ));
        }

        let defaults = {
            let doc = self.default.unwrap_or_default();
            let base = ProfileDefaults::default();
            ProfileDefaults {
                update_interval: doc.update_interval.unwrap_or(base.update_interval),
                digits: doc.digits.unwrap_or(base.digits),
            }
        };

        let mut requests = Vec::with_capacity(self.requests.len());
        for request in self.requests {
            let start = to_register_address(id, "requests", request.start)?;
            let count = u16::try_from(request.count).map_err(|_| {
                parse_error(id, format!("requests: count {} invalid", request.count))
            })?;
            let function = match request.function.as_deref() {
                None | Some("holding") => RegisterFunction::Holding,
                Some("input") => RegisterFunction::Input,
                Some(other) => {
                    return Err(parse_error(
                        id,
                        format!("requests: unknown function '{}'", other),
                    ));
                }
            };
            requests.push(RequestBlock {
                start,
                count,
                function,
                name: request.name,
            });
        }

        let mut parameters = Vec::with_capacity(self.parameters.len());
        for group in self.parameters {
            let mut items = Vec::with_capacity(group.items.len());
            for item in group.items {
                items.push(item.into_item(id, &group.group)?);
            }
            parameters.push(ParameterGroup {
                group: group.group,
                update_interval: group.update_interval,
                items,
            });
        }

        Ok(InverterDefinition {
            id: id.to_string(),
            info: DeviceInfo {
                manufacturer: self.info.manufacturer,
                models,
            },
            defaults,
            requests,
            parameters,
        })
    }

    fn from_definition(definition: &InverterDefinition) -> Self {
        let models = definition.info.models.clone();
        let model = if models.len() == 1 {
            OneOrMany::One(models.into_iter().next().unwrap())
        } else {
            OneOrMany::Many(models)
        };

        let base = ProfileDefaults::default();
        let default = if definition.defaults == base {
            None
        } else {
            Some(DefaultDoc {
                update_interval: (definition.defaults.update_interval != base.update_interval)
                    .then_some(definition.defaults.update_interval),
                digits: (definition.defaults.digits != base.digits)
                    .then_some(definition.defaults.digits),
            })
        };

        let requests = definition
            .requests
            .iter()
            .map(|r| RequestDoc {
                start: i64::from(r.start),
                count: i64::from(r.count),
                function: match r.function {
                    RegisterFunction::Holding => None,
                    RegisterFunction::Input => Some("input".to_string()),
                },
                name: r.name.clone(),
            })
            .collect();

        let parameters = definition
            .parameters
            .iter()
            .map(|group| GroupDoc {
                group: group.group.clone(),
                update_interval: group.update_interval,
                items: group.items.iter().map(ItemDoc::from_item).collect(),
            })
            .collect();

        ProfileDoc {
            info: InfoDoc {
                manufacturer: definition.info.manufacturer.clone(),
                model,
            },
            default,
            requests,
            parameters,
        }
    }
}

impl ItemDoc {
    fn into_item(self, id: &str, group: &str) -> Result<SensorItem, ProfileError> {
        let context = if self.name.is_empty() {
            format!("group '{}'", group)
        } else {
            format!("sensor '{}'", self.name)
        };

        let rule = ParsingRule::from_number(self.rule).ok_or_else(|| {
            parse_error(id, format!("{}: unknown parsing rule {}", context, self.rule))
        })?;

        let mut registers = Vec::with_capacity(self.registers.len());
        for address in self.registers {
            registers.push(to_register_address(id, &context, address)?);
        }

        let platform = match self.platform.as_deref() {
            None | Some("sensor") => Platform::Sensor,
            Some("binary_sensor") => Platform::BinarySensor,
            Some("number") => Platform::Number,
            Some("select") => Platform::Select,
            Some("switch") => Platform::Switch,
            Some("datetime") => Platform::DateTime,
            Some("time") => Platform::Time,
            Some("button") => Platform::Button,
            Some(other) => {
                return Err(parse_error(
                    id,
                    format!("{}: unknown platform '{}'", context, other),
                ));
            }
        };

        let mask = self
            .mask
            .map(|m| m.as_u32("mask"))
            .transpose()
            .map_err(|reason| parse_error(id, format!("{}: {}", context, reason)))?;
        let divide = self
            .divide
            .map(|d| d.as_u32("divide"))
            .transpose()
            .map_err(|reason| parse_error(id, format!("{}: {}", context, reason)))?;

        if let Some(bit) = self.bit
            && bit > 31
        {
            return Err(parse_error(
                id,
                format!("{}: bit position {} outside 0..=31", context, bit),
            ));
        }

        let mut lookup = Vec::with_capacity(self.lookup.len());
        for entry in self.lookup {
            let key = if let Some(bit) = entry.bit {
                LookupKey::Bit(bit)
            } else {
                match entry.key {
                    Some(LookupKeyDoc::Int(k)) => LookupKey::Single(k),
                    Some(LookupKeyDoc::List(ks)) => LookupKey::Multiple(ks),
                    Some(LookupKeyDoc::Text(s)) if s == "default" => LookupKey::Default,
                    Some(LookupKeyDoc::Text(s)) => {
                        return Err(parse_error(
                            id,
                            format!("{}: lookup key '{}' is not an integer or 'default'", context, s),
                        ));
                    }
                    None => {
                        return Err(parse_error(
                            id,
                            format!("{}: lookup entry needs a key or a bit", context),
                        ));
                    }
                }
            };
            lookup.push(LookupEntry {
                key,
                value: entry.value,
            });
        }

        let mut sensors = Vec::with_capacity(self.sensors.len());
        for sensor in self.sensors {
            let mut sub_registers = Vec::with_capacity(sensor.registers.len());
            for address in sensor.registers {
                sub_registers.push(to_register_address(id, &context, address)?);
            }
            sensors.push(SubSensor {
                registers: sub_registers,
                scale: sensor.scale.unwrap_or(1.0),
                offset: sensor.offset.unwrap_or(0.0),
                signed: sensor.signed,
                operator: sensor.operator,
            });
        }

        let range = self
            .range
            .map(|w| RawRange {
                min: first_of(&w.min),
                max: first_of(&w.max),
                default: first_of(&w.default),
            })
            .unwrap_or_default();
        let validation = self
            .validation
            .map(|w| ValidationRange {
                min: first_of(&w.min),
                max: first_of(&w.max),
            })
            .unwrap_or_default();

        // presence of the key alone flags an attribute, whatever its value
        let attribute = self.attribute.is_some();

        // `hex:` with a null value means true, absence means the default (true)
        let hex = match self.hex {
            None => true,
            Some(serde_yaml::Value::Bool(b)) => b,
            Some(_) => true,
        };

        let normalized_id = normalize_name(&self.name);

        Ok(SensorItem {
            name: self.name,
            normalized_id,
            registers,
            rule,
            platform,
            class: self.class,
            state_class: self.state_class,
            uom: self.uom,
            icon: self.icon,
            scale: self.scale.and_then(|s| s.first()).unwrap_or(1.0),
            offset: self.offset.unwrap_or(0.0),
            signed: self.signed,
            inverse: self.inverse,
            magnitude: self.magnitude,
            mask,
            divide,
            bit: self.bit,
            range,
            validation,
            lookup,
            options: self.options,
            sensors,
            attributes: self.attributes,
            attribute,
            description: self.description,
            update_interval: self.update_interval,
            delimiters: self
                .delimiter
                .map(DelimiterDoc::into_delimiters)
                .unwrap_or_default(),
            hex,
        })
    }

    fn from_item(item: &SensorItem) -> Self {
        let default_delimiters = VersionDelimiters::default();
        let delimiter = if item.delimiters == default_delimiters {
            None
        } else {
            Some(DelimiterDoc::Full {
                digit: Some(item.delimiters.digit.clone()),
                register: Some(item.delimiters.register.clone()),
            })
        };

        ItemDoc {
            name: item.name.clone(),
            rule: item.rule.number(),
            registers: item.registers.iter().map(|r| i64::from(*r)).collect(),
            platform: match item.platform {
                Platform::Sensor => None,
                Platform::BinarySensor => Some("binary_sensor".to_string()),
                Platform::Number => Some("number".to_string()),
                Platform::Select => Some("select".to_string()),
                Platform::Switch => Some("switch".to_string()),
                Platform::DateTime => Some("datetime".to_string()),
                Platform::Time => Some("time".to_string()),
                Platform::Button => Some("button".to_string()),
            },
            class: item.class.clone(),
            state_class: item.state_class.clone(),
            uom: item.uom.clone(),
            icon: item.icon.clone(),
            scale: (item.scale != 1.0).then_some(OneOrMany::One(item.scale)),
            offset: (item.offset != 0.0).then_some(item.offset),
            signed: item.signed,
            inverse: item.inverse,
            magnitude: item.magnitude,
            mask: item.mask.map(|m| IntLiteral::Int(u64::from(m))),
            divide: item.divide.map(|d| IntLiteral::Int(u64::from(d))),
            bit: item.bit,
            range: (!item.range.is_empty()).then(|| WindowDoc {
                min: item.range.min.map(OneOrMany::One),
                max: item.range.max.map(OneOrMany::One),
                default: item.range.default.map(OneOrMany::One),
            }),
            validation: (!item.validation.is_empty()).then(|| WindowDoc {
                min: item.validation.min.map(OneOrMany::One),
                max: item.validation.max.map(OneOrMany::One),
                default: None,
            }),
            lookup: item
                .lookup
                .iter()
                .map(|entry| match &entry.key {
                    LookupKey::Single(k) => LookupDoc {
                        key: Some(LookupKeyDoc::Int(*k)),
                        bit: None,
                        value: entry.value.clone(),
                    },
                    LookupKey::Multiple(ks) => LookupDoc {
                        key: Some(LookupKeyDoc::List(ks.clone())),
                        bit: None,
                        value: entry.value.clone(),
                    },
                    LookupKey::Bit(p) => LookupDoc {
                        key: None,
                        bit: Some(*p),
                        value: entry.value.clone(),
                    },
                    LookupKey::Default => LookupDoc {
                        key: Some(LookupKeyDoc::Text("default".to_string())),
                        bit: None,
                        value: entry.value.clone(),
                    },
                })
                .collect(),
            options: item.options.clone(),
            sensors: item
                .sensors
                .iter()
                .map(|s| SubSensorDoc {
                    registers: s.registers.iter().map(|r| i64::from(*r)).collect(),
                    scale: (s.scale != 1.0).then_some(s.scale),
                    offset: (s.offset != 0.0).then_some(s.offset),
                    signed: s.signed,
                    operator: s.operator,
                })
                .collect(),
            attributes: item.attributes.clone(),
            attribute: item.attribute.then(|| serde_yaml::Value::Bool(true)),
            description: item.description.clone(),
            update_interval: item.update_interval,
            delimiter,
            hex: (!item.hex).then(|| serde_yaml::Value::Bool(false)),
        }
    }
}

/// Collect the distinct register addresses referenced by a set of items.
pub fn referenced_addresses<'a, I>(items: I) -> Vec<u16>
where
    I: IntoIterator<Item = &'a SensorItem>,
{
    let mut seen: HashSet<u16> = HashSet::new();
    for item in items {
        seen.extend(item.registers.iter().copied());
        for sub in &item.sensors {
            seen.extend(sub.registers.iter().copied());
        }
    }
    let mut addresses: Vec<u16> = seen.into_iter().collect();
    addresses.sort_unstable();
    addresses
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
info:
  manufacturer: Deye
  model: SUN-12K-SG04LP3*
parameters:
  - group: Battery
    items:
      - name: Battery SOC
        rule: 1
        registers: [184]
"#;

    #[test]
    fn parses_minimal_profile() {
        let def = ProfileLoader::parse("deye_test", MINIMAL).unwrap();
        assert_eq!(def.id, "deye_test");
        assert_eq!(def.info.manufacturer, "Deye");
        assert_eq!(def.info.models, vec!["SUN-12K-SG04LP3*"]);
        assert_eq!(def.defaults.update_interval, 5);
        assert_eq!(def.defaults.digits, 6);
        let item = &def.parameters[0].items[0];
        assert_eq!(item.normalized_id, "battery_soc");
        assert_eq!(item.registers, vec![184]);
        assert_eq!(item.rule, ParsingRule::U16);
        assert_eq!(item.scale, 1.0);
        assert!(item.hex);
    }

    #[test]
    fn model_list_and_scalar_both_accepted() {
        let scalar = ProfileLoader::parse("p", MINIMAL).unwrap();
        assert_eq!(scalar.info.models.len(), 1);

        let listed = MINIMAL.replace(
            "model: SUN-12K-SG04LP3*",
            "model:\n    - SUN-12K-SG04LP3*\n    - SUN-10K-SG04LP3*",
        );
        let def = ProfileLoader::parse("p", &listed).unwrap();
        assert_eq!(def.info.models.len(), 2);
    }

    #[test]
    fn missing_manufacturer_is_parse_error() {
        let yaml = "info:\n  model: X\nparameters: []\n";
        let err = ProfileLoader::parse("p", yaml).unwrap_err();
        assert!(matches!(err, ProfileError::ParseError { .. }));
    }

    #[test]
    fn register_address_out_of_range_rejected() {
        let yaml = MINIMAL.replace("registers: [184]", "registers: [70000]");
        let err = ProfileLoader::parse("p", &yaml).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("70000"), "{}", msg);
    }

    #[test]
    fn bit_position_above_31_rejected() {
        let yaml = MINIMAL.replace("rule: 1", "rule: 1\n        bit: 32");
        let err = ProfileLoader::parse("p", &yaml).unwrap_err();
        assert!(err.to_string().contains("bit position 32"));
    }

    #[test]
    fn size_cap_enforced() {
        let mut yaml = String::from(MINIMAL);
        yaml.push('#');
        yaml.push_str(&"x".repeat(MAX_DOCUMENT_SIZE));
        let err = ProfileLoader::parse("p", &yaml).unwrap_err();
        assert!(matches!(err, ProfileError::LoadFailed { .. }));
    }

    #[test]
    fn mask_accepts_hex_and_decimal() {
        let yaml = MINIMAL.replace("rule: 1", "rule: 1\n        mask: 0x00FF");
        let def = ProfileLoader::parse("p", &yaml).unwrap();
        assert_eq!(def.parameters[0].items[0].mask, Some(0x00FF));

        let yaml = MINIMAL.replace("rule: 1", "rule: 1\n        mask: \"0x00FF\"");
        let def = ProfileLoader::parse("p", &yaml).unwrap();
        assert_eq!(def.parameters[0].items[0].mask, Some(0x00FF));

        let yaml = MINIMAL.replace("rule: 1", "rule: 1\n        mask: 255");
        let def = ProfileLoader::parse("p", &yaml).unwrap();
        assert_eq!(def.parameters[0].items[0].mask, Some(255));
    }

    #[test]
    fn scale_takes_first_of_list() {
        let yaml = MINIMAL.replace("rule: 1", "rule: 1\n        scale: [0.1, 1]");
        let def = ProfileLoader::parse("p", &yaml).unwrap();
        assert_eq!(def.parameters[0].items[0].scale, 0.1);
    }

    #[test]
    fn delimiter_shorthand_and_mapping() {
        let yaml = MINIMAL.replace("rule: 1", "rule: 7\n        delimiter: \"\"");
        let def = ProfileLoader::parse("p", &yaml).unwrap();
        let item = &def.parameters[0].items[0];
        assert_eq!(item.delimiters.digit, "");
        assert_eq!(item.delimiters.register, "-");

        let yaml = MINIMAL.replace(
            "rule: 1",
            "rule: 7\n        delimiter:\n          digit: \"_\"\n          register: \"/\"",
        );
        let def = ProfileLoader::parse("p", &yaml).unwrap();
        let item = &def.parameters[0].items[0];
        assert_eq!(item.delimiters.digit, "_");
        assert_eq!(item.delimiters.register, "/");
    }

    #[test]
    fn hex_null_means_true() {
        let yaml = MINIMAL.replace("rule: 1", "rule: 7\n        hex:");
        let def = ProfileLoader::parse("p", &yaml).unwrap();
        assert!(def.parameters[0].items[0].hex);

        let yaml = MINIMAL.replace("rule: 1", "rule: 7\n        hex: false");
        let def = ProfileLoader::parse("p", &yaml).unwrap();
        assert!(!def.parameters[0].items[0].hex);
    }

    #[test]
    fn attribute_presence_flags_attribute() {
        let yaml = MINIMAL.replace("rule: 1", "rule: 1\n        attribute: restart");
        let def = ProfileLoader::parse("p", &yaml).unwrap();
        assert!(def.parameters[0].items[0].attribute);

        let def = ProfileLoader::parse("p", MINIMAL).unwrap();
        assert!(!def.parameters[0].items[0].attribute);
    }

    #[test]
    fn lookup_key_shapes() {
        let yaml = MINIMAL.replace(
            "rule: 1",
            concat!(
                "rule: 1\n",
                "        lookup:\n",
                "          - key: 0\n",
                "            value: standby\n",
                "          - key: [1, 2]\n",
                "            value: running\n",
                "          - bit: 3\n",
                "            value: alarm\n",
                "          - key: default\n",
                "            value: unknown",
            ),
        );
        let def = ProfileLoader::parse("p", &yaml).unwrap();
        let lookup = &def.parameters[0].items[0].lookup;
        assert_eq!(lookup[0].key, LookupKey::Single(0));
        assert_eq!(lookup[1].key, LookupKey::Multiple(vec![1, 2]));
        assert_eq!(lookup[2].key, LookupKey::Bit(3));
        assert_eq!(lookup[3].key, LookupKey::Default);
    }

    #[test]
    fn yaml_round_trip_preserves_profile() {
        let yaml = MINIMAL.replace(
            "rule: 1",
            "rule: 2\n        scale: 0.01\n        signed: true\n        mask: 0x7FFF",
        );
        let parsed = ProfileLoader::parse("p", &yaml).unwrap();
        let rendered = ProfileLoader::to_yaml(&parsed).unwrap();
        let reparsed = ProfileLoader::parse("p", &rendered).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn bundled_enumeration_is_sorted_and_loadable() {
        let ids = bundled_profiles();
        assert!(!ids.is_empty());
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        assert_eq!(ids, sorted.as_slice());
        for id in ids {
            let def = load_bundled(id).unwrap();
            assert_eq!(&def.id, id);
        }
    }

    #[test]
    fn referenced_addresses_dedup_and_sort() {
        let mut item_a = SensorItem::new("A", ParsingRule::U32, vec![11, 10]);
        item_a.sensors.push(SubSensor {
            registers: vec![20],
            scale: 1.0,
            offset: 0.0,
            signed: false,
            operator: CompositeOperator::Add,
        });
        let item_b = SensorItem::new("B", ParsingRule::U16, vec![10]);
        assert_eq!(referenced_addresses([&item_a, &item_b]), vec![10, 11, 20]);
    }
}
