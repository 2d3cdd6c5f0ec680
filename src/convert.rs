//! Register-value conversion
//!
//! Pure functions from raw 16-bit register slices to typed values,
//! following the profile's parsing rule and tuning knobs. The numeric path
//! applies a strict order: decode, raw-range filter, mask, bit extraction,
//! affine transform, integer divide, validation.

use crate::error::SensorError;
use crate::profile::{ParsingRule, SensorItem};

/// Decode the raw integer value for a numeric rule, honouring the item's
/// `signed` and `magnitude` flags.
fn decode_raw(registers: &[u16], item: &SensorItem) -> Result<i64, SensorError> {
    let need = item.rule.min_registers();
    if registers.len() < need {
        return Err(SensorError::InsufficientRegisters {
            expected: need,
            got: registers.len(),
        });
    }

    let value = match item.rule {
        ParsingRule::U16 => {
            let raw = registers[0];
            if item.signed {
                if item.magnitude {
                    i64::from(sign_magnitude_16(raw))
                } else {
                    i64::from(raw as i16)
                }
            } else {
                i64::from(raw)
            }
        }
        ParsingRule::I16 => {
            let raw = registers[0];
            if item.magnitude {
                i64::from(sign_magnitude_16(raw))
            } else {
                i64::from(raw as i16)
            }
        }
        ParsingRule::U32 => {
            let raw = u32::from(registers[0]) | (u32::from(registers[1]) << 16);
            if item.signed {
                if item.magnitude {
                    i64::from(sign_magnitude_32(raw))
                } else {
                    i64::from(raw as i32)
                }
            } else {
                i64::from(raw)
            }
        }
        ParsingRule::I32 => {
            let raw = u32::from(registers[0]) | (u32::from(registers[1]) << 16);
            if item.magnitude {
                i64::from(sign_magnitude_32(raw))
            } else {
                i64::from(raw as i32)
            }
        }
        ParsingRule::Time => {
            let raw = i64::from(registers[0]);
            raw / 100 * 60 + raw % 100
        }
        other => {
            return Err(SensorError::UnsupportedRule {
                rule: other.number(),
            });
        }
    };
    Ok(value)
}

/// Sign-magnitude 16-bit: bit 15 is the sign, low 15 bits the magnitude.
fn sign_magnitude_16(raw: u16) -> i32 {
    let magnitude = i32::from(raw & 0x7FFF);
    if raw & 0x8000 != 0 { -magnitude } else { magnitude }
}

/// Sign-magnitude 32-bit: bit 31 is the sign, low 31 bits the magnitude.
fn sign_magnitude_32(raw: u32) -> i64 {
    let magnitude = i64::from(raw & 0x7FFF_FFFF);
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Convert a register slice into a numeric value.
///
/// Only the numeric rules (u16, i16, u32, i32, time) are accepted here;
/// string, version, datetime, bits and raw rules go through their dedicated
/// decoders.
pub fn convert_numeric(registers: &[u16], item: &SensorItem) -> Result<f64, SensorError> {
    let decoded = decode_raw(registers, item)?;
    let mut raw = decoded as f64;

    // raw-range filter runs before any manipulation
    if !item.range.is_empty() && !item.range.contains(raw) {
        match item.range.default {
            Some(substitute) => raw = substitute,
            None => {
                return Err(SensorError::RawValueOutOfRange {
                    value: raw,
                    min: item.range.min,
                    max: item.range.max,
                });
            }
        }
    }

    if let Some(mask) = item.mask {
        raw = f64::from((raw as i64 as u32) & mask);
    }

    if let Some(bit) = item.bit {
        raw = f64::from((raw as i64 as u32 >> bit) & 1);
    }

    let mut value = (raw - item.offset) * item.scale;
    if item.inverse {
        value = -value;
    }

    if let Some(divide) = item.divide
        && divide > 0
    {
        value = ((value.floor() as i64) / i64::from(divide)) as f64;
    }

    if !item.validation.is_empty() && !item.validation.contains(value) {
        return Err(SensorError::ValueOutOfRange {
            value,
            min: item.validation.min,
            max: item.validation.max,
        });
    }

    Ok(value)
}

/// Decode the raw integer for lookup resolution, without range filtering or
/// transformation.
pub fn lookup_raw(registers: &[u16], item: &SensorItem) -> Result<i64, SensorError> {
    match item.rule {
        ParsingRule::U16 | ParsingRule::I16 | ParsingRule::U32 | ParsingRule::I32 => {
            decode_raw(registers, item)
        }
        ParsingRule::Bits | ParsingRule::Raw => {
            if registers.is_empty() {
                return Err(SensorError::InsufficientRegisters {
                    expected: 1,
                    got: 0,
                });
            }
            Ok(i64::from(registers[0]))
        }
        other => Err(SensorError::UnsupportedRule {
            rule: other.number(),
        }),
    }
}

/// Assemble up to four registers into a 64-bit little-endian value, first
/// register least significant. Used for multi-register alarm and fault
/// bitmaps.
pub fn combine_le64(registers: &[u16]) -> u64 {
    registers
        .iter()
        .take(4)
        .enumerate()
        .fold(0u64, |acc, (i, reg)| acc | (u64::from(*reg) << (16 * i)))
}

/// Decode an ASCII string sensor (rule 5).
///
/// Each register carries two bytes, most significant first. Decoding stops
/// at the first zero byte. Control characters (C0, DEL, C1) are rejected;
/// decoded identifiers end up in output models and must stay printable.
pub fn decode_string(registers: &[u16]) -> Result<String, SensorError> {
    if registers.is_empty() {
        return Err(SensorError::InsufficientRegisters {
            expected: 1,
            got: 0,
        });
    }

    let mut bytes = Vec::with_capacity(registers.len() * 2);
    'outer: for reg in registers {
        for byte in [(reg >> 8) as u8, (reg & 0xFF) as u8] {
            if byte == 0 {
                break 'outer;
            }
            bytes.push(byte);
        }
    }

    let text = String::from_utf8(bytes).map_err(|_| SensorError::InvalidUtf8)?;
    for ch in text.chars() {
        let scalar = ch as u32;
        if scalar < 0x20 || scalar == 0x7F || (0x80..=0x9F).contains(&scalar) {
            return Err(SensorError::ControlCharacter { scalar });
        }
    }
    Ok(text)
}

/// Decode a version sensor (rule 7).
///
/// Every register splits into four nibbles, most significant first,
/// rendered as hex (uppercase) or decimal digits. Nibbles of one register
/// are joined with the digit delimiter, registers with the register
/// delimiter. When a digit delimiter is set, leading "0" parts are trimmed.
pub fn decode_version(registers: &[u16], item: &SensorItem) -> Result<String, SensorError> {
    if registers.is_empty() {
        return Err(SensorError::InsufficientRegisters {
            expected: 1,
            got: 0,
        });
    }

    let digit = item.delimiters.digit.as_str();
    let register = item.delimiters.register.as_str();

    let mut rendered = String::new();
    for (i, reg) in registers.iter().enumerate() {
        if i > 0 {
            rendered.push_str(register);
        }
        let nibbles = [
            (reg >> 12) & 0xF,
            (reg >> 8) & 0xF,
            (reg >> 4) & 0xF,
            reg & 0xF,
        ];
        for (j, nibble) in nibbles.iter().enumerate() {
            if j > 0 {
                rendered.push_str(digit);
            }
            if item.hex {
                rendered.push_str(&format!("{:X}", nibble));
            } else {
                rendered.push_str(&format!("{}", nibble));
            }
        }
    }

    if let Some(sep) = digit.chars().next() {
        let parts: Vec<&str> = rendered.split(sep).collect();
        let keep_from = parts
            .iter()
            .position(|p| *p != "0")
            .unwrap_or(parts.len().saturating_sub(1));
        rendered = parts[keep_from..].join(&sep.to_string());
    }

    Ok(rendered)
}

/// Decode a datetime sensor (rule 8) into `"YY/MM/DD HH:MM:SS"`.
///
/// The three-register form packs two components per register (high byte
/// first); the six-register form carries one component per register. No
/// calendar validation is performed. Other register counts yield `None`.
pub fn decode_datetime(registers: &[u16]) -> Option<String> {
    let (year, month, day, hour, minute, second) = match registers.len() {
        3 => (
            registers[0] >> 8,
            registers[0] & 0xFF,
            registers[1] >> 8,
            registers[1] & 0xFF,
            registers[2] >> 8,
            registers[2] & 0xFF,
        ),
        6 => (
            registers[0],
            registers[1],
            registers[2],
            registers[3],
            registers[4],
            registers[5],
        ),
        _ => return None,
    };
    Some(format!(
        "{:02}/{:02}/{:02} {:02}:{:02}:{:02}",
        year, month, day, hour, minute, second
    ))
}

/// Decode a time sensor (rule 9) into `"HH:MM"`. HHMM encoding, no bounds
/// checking.
pub fn decode_time_string(register: u16) -> String {
    format!("{:02}:{:02}", register / 100, register % 100)
}
