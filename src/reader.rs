//! Abstract register reader
//!
//! The single seam between the monitoring core and whatever transport
//! actually talks to the device (Modbus TCP, Solarman data-logger framing,
//! a serial line). The core issues one call per batched range and nothing
//! else.

use std::collections::HashMap;

use crate::error::{DriverError, Result};

/// Transport-side register access.
///
/// Implementations must serialize concurrent reads themselves; most field
/// data loggers cannot handle overlapped requests. Cancellation and
/// timeouts are transport concerns and surface as [`DriverError::Timeout`].
#[async_trait::async_trait]
pub trait RegisterReader: Send {
    /// Read `count` holding registers starting at `address`.
    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>>;
}

/// In-memory reader backed by a register map. Useful for tests and for
/// replaying captured register dumps.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    registers: HashMap<u16, u16>,
    /// When set, reads covering any address outside the map fail the way a
    /// short-returning device would.
    strict: bool,
}

impl MemoryReader {
    pub fn new(registers: HashMap<u16, u16>) -> Self {
        Self {
            registers,
            strict: false,
        }
    }

    /// Fail reads that touch unmapped addresses instead of returning zero.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn set(&mut self, address: u16, value: u16) {
        self.registers.insert(address, value);
    }
}

#[async_trait::async_trait]
impl RegisterReader for MemoryReader {
    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        let mut values = Vec::with_capacity(usize::from(count));
        for offset in 0..count {
            let current = address.checked_add(offset).ok_or_else(|| {
                DriverError::invalid_response("register address overflow in read")
            })?;
            match self.registers.get(&current) {
                Some(value) => values.push(*value),
                None if self.strict => {
                    return Err(DriverError::communication(format!(
                        "illegal data address {}",
                        current
                    )));
                }
                None => values.push(0),
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_reader_returns_mapped_values() {
        let mut reader = MemoryReader::default();
        reader.set(184, 95);
        reader.set(185, 12);
        let values = reader.read_holding_registers(184, 3).await.unwrap();
        assert_eq!(values, vec![95, 12, 0]);
    }

    #[tokio::test]
    async fn strict_reader_fails_on_unmapped_address() {
        let mut reader = MemoryReader::default().strict();
        reader.set(184, 95);
        let err = reader.read_holding_registers(184, 2).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
