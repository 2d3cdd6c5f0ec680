//! # Helion - Multi-Vendor Solar Inverter Monitoring
//!
//! A data-driven translation layer turning vendor-specific Modbus
//! holding-register layouts into a uniform, strongly typed energy-system
//! snapshot. Register semantics live in external YAML device definitions;
//! the library validates and decodes them, batches register reads, and
//! assembles the results into a [`SolarStatus`].
//!
//! ## Features
//!
//! - **Profile-Driven**: YAML device definitions describe register
//!   layouts, parsing rules, lookups, ranges and composite sensors
//! - **Typed Output**: one snapshot model across vendors, with canonical
//!   sensor keys decoupling upstream naming
//! - **Minimal Reads**: contiguous register batching under the Modbus
//!   125-register ceiling with a configurable merge gap
//! - **Transport-Agnostic**: a single async reader trait is the only seam
//!   to the wire; any Modbus TCP or data-logger client plugs in
//! - **Device Matching**: case-insensitive exact and bounded wildcard
//!   matching of discovered devices to bundled or external profiles
//!
//! ## Architecture
//!
//! The crate follows a modular architecture with clear separation of
//! concerns:
//!
//! - `profile`: device-definition model, YAML loader, bundled resources
//! - `convert`: raw register slices to typed values
//! - `batch`: register addresses to contiguous read ranges
//! - `keys`: canonical sensor keys with ordered alternatives
//! - `status`: the composite snapshot model
//! - `builder`: per-subsystem status assembly
//! - `registry`: device fingerprint to profile matching
//! - `reader`: the abstract transport seam
//! - `monitor`: the batch-read-decode-assemble pipeline
//! - `logging`: structured logging helpers
//!
//! ## Example
//!
//! ```no_run
//! use helion::{ProfileLoader, SolarMonitor, SubsystemGroup};
//! use helion::reader::MemoryReader;
//!
//! # async fn example() -> helion::Result<()> {
//! let profile = helion::load_bundled("deye_p3")?;
//! let reader = MemoryReader::default();
//! let mut monitor = SolarMonitor::new(profile, Box::new(reader));
//! let status = monitor.read_status(&[SubsystemGroup::Battery]).await?;
//! println!("{}", serde_json::to_string_pretty(&status).unwrap());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod builder;
pub mod convert;
pub mod error;
pub mod keys;
pub mod logging;
pub mod monitor;
pub mod profile;
pub mod reader;
pub mod registry;
pub mod status;

// Re-export commonly used types
pub use batch::{RegisterBatcher, RegisterRange, MAX_REGISTERS_PER_REQUEST};
pub use builder::{RegisterMap, build_status};
pub use error::{DriverError, ProfileError, Result, SensorError};
pub use keys::{SensorKey, SensorValues};
pub use monitor::{ReadStats, SolarMonitor};
pub use profile::{
    InverterDefinition, ParsingRule, ProfileLoader, SensorItem, bundled_profiles, load_bundled,
};
pub use reader::RegisterReader;
pub use registry::{DeviceFingerprint, MatchResult, ProfileRef, ProfileRegistry};
pub use status::{SolarStatus, SubsystemGroup};
