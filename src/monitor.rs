//! Read orchestration
//!
//! Glues the pipeline together: resolve requested groups against the
//! profile, batch the referenced registers, drive the transport reader
//! once per range, decode, and hand the populated register map to the
//! status builder. One call, one snapshot.

use std::time::Instant;

use crate::batch::RegisterBatcher;
use crate::builder::{self, RegisterMap};
use crate::error::{DriverError, Result};
use crate::logging::{LogContext, StructuredLogger};
use crate::profile::loader::referenced_addresses;
use crate::profile::InverterDefinition;
use crate::reader::RegisterReader;
use crate::status::{BASIC_GROUPS, SolarStatus, SubsystemGroup};

/// Counters over the monitor's lifetime plus detail of the last read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadStats {
    /// Completed reads
    pub total_reads: u64,
    /// Reads that ended in a driver error
    pub failed_reads: u64,
    /// Wall-clock duration of the last completed read, milliseconds
    pub last_duration_ms: Option<u64>,
    /// Registers fetched by the last completed read
    pub last_register_count: usize,
    /// Ranges issued by the last completed read
    pub last_batch_count: usize,
}

/// Drives reads against one device through one transport.
///
/// The monitor holds no device state between reads; every snapshot is
/// rebuilt from scratch. Serializing access to the underlying transport is
/// the reader implementation's responsibility.
pub struct SolarMonitor {
    profile: InverterDefinition,
    reader: Box<dyn RegisterReader>,
    batcher: RegisterBatcher,
    stats: ReadStats,
    logger: StructuredLogger,
}

impl SolarMonitor {
    pub fn new(profile: InverterDefinition, reader: Box<dyn RegisterReader>) -> Self {
        let logger = StructuredLogger::new(
            LogContext::new("monitor").with_profile_id(profile.id.clone()),
        );
        Self {
            profile,
            reader,
            batcher: RegisterBatcher::default(),
            stats: ReadStats::default(),
            logger,
        }
    }

    /// Replace the default batcher, e.g. to shrink the merge gap for slow
    /// data loggers.
    pub fn with_batcher(mut self, batcher: RegisterBatcher) -> Self {
        self.batcher = batcher;
        self
    }

    pub fn profile(&self) -> &InverterDefinition {
        &self.profile
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    /// Perform one read and build a status snapshot.
    ///
    /// An empty `groups` slice selects the basic set (battery, grid, pv,
    /// load). Individual sensor failures are absorbed; only transport and
    /// profile-level problems surface as errors.
    pub async fn read_status(&mut self, groups: &[SubsystemGroup]) -> Result<SolarStatus> {
        let started = Instant::now();
        let groups: Vec<SubsystemGroup> = if groups.is_empty() {
            BASIC_GROUPS.to_vec()
        } else {
            groups.to_vec()
        };

        match self.read_status_inner(&groups).await {
            Ok((status, registers_read, batches)) => {
                self.stats.total_reads += 1;
                self.stats.last_duration_ms = Some(started.elapsed().as_millis() as u64);
                self.stats.last_register_count = registers_read;
                self.stats.last_batch_count = batches;
                self.logger.debug(&format!(
                    "read complete: {} registers in {} batches, {} ms",
                    registers_read,
                    batches,
                    self.stats.last_duration_ms.unwrap_or(0)
                ));
                Ok(status)
            }
            Err(err) => {
                self.stats.failed_reads += 1;
                self.logger.warn(&format!("read failed: {}", err));
                Err(err)
            }
        }
    }

    async fn read_status_inner(
        &mut self,
        groups: &[SubsystemGroup],
    ) -> Result<(SolarStatus, usize, usize)> {
        let items = builder::collect_group_items(&self.profile, groups);
        if items.is_empty() {
            let names: Vec<String> = groups.iter().map(SubsystemGroup::to_string).collect();
            return Err(DriverError::NoSensorsForGroups {
                groups: names.join(", "),
            });
        }

        let addresses = referenced_addresses(items.iter().copied());
        let ranges = self.batcher.batch(&addresses);
        self.logger.trace(&format!(
            "{} sensors over {} addresses in {} ranges",
            items.len(),
            addresses.len(),
            ranges.len()
        ));

        let mut map = RegisterMap::new();
        for range in &ranges {
            let values = self
                .reader
                .read_holding_registers(range.start_address, range.count)
                .await?;
            if values.len() != usize::from(range.count) {
                return Err(DriverError::invalid_response(format!(
                    "requested {} registers at {}, device answered {}",
                    range.count,
                    range.start_address,
                    values.len()
                )));
            }
            for (address, value) in range.addresses().zip(values) {
                map.insert(address, value);
            }
        }

        let status = builder::build_status(&map, &self.profile, groups);
        Ok((status, map.len(), ranges.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileLoader;
    use crate::reader::MemoryReader;
    use std::collections::HashMap;

    const PROFILE: &str = r#"
info:
  manufacturer: Deye
  model: SUN-12K-SG04LP3*
parameters:
  - group: Battery
    items:
      - name: Battery SOC
        rule: 1
        registers: [184]
      - name: Battery Voltage
        rule: 1
        scale: 0.01
        registers: [183]
      - name: Battery Power
        rule: 2
        registers: [190]
"#;

    fn monitor(registers: &[(u16, u16)]) -> SolarMonitor {
        let profile = ProfileLoader::parse("deye_test", PROFILE).unwrap();
        let reader = MemoryReader::new(HashMap::from_iter(registers.iter().copied()));
        SolarMonitor::new(profile, Box::new(reader))
    }

    #[tokio::test]
    async fn reads_battery_snapshot() {
        let mut monitor = monitor(&[(183, 5328), (184, 95), (190, 9)]);
        let status = monitor
            .read_status(&[SubsystemGroup::Battery])
            .await
            .unwrap();
        let battery = status.battery.unwrap();
        assert_eq!(battery.soc, 95);
        assert_eq!(battery.power, 9);
        assert!((battery.voltage - 53.28).abs() < 1e-9);

        let stats = monitor.stats();
        assert_eq!(stats.total_reads, 1);
        assert_eq!(stats.failed_reads, 0);
        assert_eq!(stats.last_batch_count, 1);
        assert_eq!(stats.last_register_count, 8);
    }

    #[tokio::test]
    async fn empty_groups_fall_back_to_basic_set() {
        let mut monitor = monitor(&[(183, 5328), (184, 95), (190, 9)]);
        let status = monitor.read_status(&[]).await.unwrap();
        assert!(status.battery.is_some());
    }

    #[tokio::test]
    async fn unmatched_groups_error() {
        let mut monitor = monitor(&[]);
        let err = monitor
            .read_status(&[SubsystemGroup::Generator])
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::NoSensorsForGroups { .. }));
        assert_eq!(monitor.stats().failed_reads, 1);
    }
}
