//! Error types and handling for Helion
//!
//! Three error families, one per boundary: [`SensorError`] for the register
//! decoding path, [`ProfileError`] for profile loading and device matching,
//! and [`DriverError`] for the orchestrator/transport boundary.

use thiserror::Error;

/// Result type alias for driver-boundary operations
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors raised while decoding register values for a single sensor.
///
/// These are absorbed during status assembly (a malformed sensor is dropped
/// from the value map, it never aborts the read) and only surface through
/// the direct converter entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// Too few registers supplied for the parsing rule
    #[error("insufficient registers: expected {expected}, got {got}")]
    InsufficientRegisters { expected: usize, got: usize },

    /// Raw value outside the profile range window and no default configured
    #[error("raw value {value} out of range [{}, {}]", fmt_bound(.min), fmt_bound(.max))]
    RawValueOutOfRange {
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    /// Transformed value outside the validation window
    #[error("value {value} out of range [{}, {}]", fmt_bound(.min), fmt_bound(.max))]
    ValueOutOfRange {
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    /// Register bytes did not decode as UTF-8
    #[error("invalid UTF-8 in string registers")]
    InvalidUtf8,

    /// Decoded string contained a C0/C1 control character or DEL
    #[error("control character U+{scalar:04X} in string registers")]
    ControlCharacter { scalar: u32 },

    /// Numeric entry point asked to decode a non-numeric rule
    #[error("unsupported parsing rule {rule}")]
    UnsupportedRule { rule: u8 },
}

fn fmt_bound(bound: &Option<f64>) -> String {
    match bound {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

/// Errors raised while loading profiles or matching devices to them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    /// Profile document could not be read
    #[error("failed to load profile '{id}': {reason}")]
    LoadFailed { id: String, reason: String },

    /// Profile document failed validation or YAML parsing
    #[error("failed to parse profile '{id}'{}: {reason}", fmt_line(.line))]
    ParseError {
        id: String,
        line: Option<usize>,
        reason: String,
    },

    /// Manufacturer is known but no model pattern matched
    #[error("unsupported device '{device}'")]
    UnsupportedDevice {
        device: String,
        suggestion: Option<String>,
    },

    /// Neither manufacturer nor model is represented in the registry
    #[error("unknown device '{device}'")]
    UnknownDevice { device: String },

    /// Device identification could not be performed at all
    #[error("device identification failed: {reason}")]
    IdentificationFailed { reason: String },
}

fn fmt_line(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" at line {}", n),
        None => String::new(),
    }
}

/// Errors surfaced from the read orchestrator.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Transport could not establish a connection
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Transport operation timed out
    #[error("timeout: {message}")]
    Timeout { message: String },

    /// Transport-level communication failure
    #[error("communication error: {message}")]
    CommunicationError { message: String },

    /// Device answered with a malformed or short response
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// A sensor decoding error escaped through a direct entry point
    #[error("sensor error: {0}")]
    Sensor(#[from] SensorError),

    /// A profile loading or matching error
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),

    /// None of the requested subsystem groups matched any profile sensors
    #[error("no sensors found for groups [{groups}]")]
    NoSensorsForGroups { groups: String },
}

impl ProfileError {
    /// Create a new load error
    pub fn load_failed<S: Into<String>>(id: S, reason: S) -> Self {
        ProfileError::LoadFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a new parse error without line information
    pub fn parse<S: Into<String>>(id: S, reason: S) -> Self {
        ProfileError::ParseError {
            id: id.into(),
            line: None,
            reason: reason.into(),
        }
    }

    /// Create a new parse error pointing at a document line
    pub fn parse_at<S: Into<String>>(id: S, line: usize, reason: S) -> Self {
        ProfileError::ParseError {
            id: id.into(),
            line: Some(line),
            reason: reason.into(),
        }
    }
}

impl DriverError {
    /// Create a new connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        DriverError::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        DriverError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new communication error
    pub fn communication<S: Into<String>>(message: S) -> Self {
        DriverError::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid-response error
    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        DriverError::InvalidResponse {
            message: message.into(),
        }
    }

    /// Whether a retry of the whole read is worthwhile.
    ///
    /// Timeouts and communication errors are transient on field data
    /// loggers; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriverError::Timeout { .. } | DriverError::CommunicationError { .. }
        )
    }
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::communication(err.to_string())
    }
}
