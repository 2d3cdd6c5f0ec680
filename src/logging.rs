//! Structured logging for Helion
//!
//! Thin per-component loggers on top of the tracing ecosystem. The library
//! never installs a subscriber on its own; applications and tests opt in
//! through [`init_logging`]. Log output never alters behaviour.

use tracing::{Level, debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

use crate::error::{DriverError, Result};

/// Install a global subscriber filtered to the given level for this crate.
///
/// Honours `RUST_LOG` when set. Safe to call once per process; later calls
/// fail quietly so tests can share one subscriber.
pub fn init_logging(level: &str) -> Result<()> {
    let level = parse_log_level(level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("helion={}", level).into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .ok();
    Ok(())
}

/// Parse a log level string to a tracing Level
fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" => Ok(Level::WARN),
        "ERROR" => Ok(Level::ERROR),
        _ => Err(DriverError::invalid_response(format!(
            "invalid log level: {}",
            level_str
        ))),
    }
}

/// Context information for log messages
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Component name (e.g. "monitor", "loader", "registry")
    pub component: String,

    /// Profile identifier for multi-device setups
    pub profile_id: Option<String>,
}

impl LogContext {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            profile_id: None,
        }
    }

    pub fn with_profile_id(mut self, profile_id: String) -> Self {
        self.profile_id = Some(profile_id);
        self
    }
}

/// Structured logger with context
#[derive(Clone)]
pub struct StructuredLogger {
    context: LogContext,
}

impl StructuredLogger {
    pub fn new(context: LogContext) -> Self {
        Self { context }
    }

    pub fn info(&self, message: &str) {
        let fields = self.format_fields();
        info!(%fields, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        let fields = self.format_fields();
        warn!(%fields, "{}", message);
    }

    pub fn error(&self, message: &str) {
        let fields = self.format_fields();
        error!(%fields, "{}", message);
    }

    pub fn debug(&self, message: &str) {
        let fields = self.format_fields();
        debug!(%fields, "{}", message);
    }

    pub fn trace(&self, message: &str) {
        let fields = self.format_fields();
        trace!(%fields, "{}", message);
    }

    fn format_fields(&self) -> String {
        match &self.context.profile_id {
            Some(profile_id) => {
                format!("component={},profile={}", self.context.component, profile_id)
            }
            None => format!("component={}", self.context.component),
        }
    }
}

/// Create a logger for a specific component
pub fn get_logger(component: &str) -> StructuredLogger {
    StructuredLogger::new(LogContext::new(component))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("info").unwrap(), Level::INFO);
        assert!(parse_log_level("chatty").is_err());
    }

    #[test]
    fn test_log_context() {
        let context = LogContext::new("monitor").with_profile_id("deye_p3".to_string());
        assert_eq!(context.component, "monitor");
        assert_eq!(context.profile_id.as_deref(), Some("deye_p3"));
    }

    #[test]
    fn test_structured_logger_does_not_panic() {
        init_logging("info").unwrap();
        let logger = get_logger("test_component");
        logger.info("info message");
        logger.debug("debug message");
        logger.warn("warn message");
        logger.error("error message");
        logger.trace("trace message");
    }
}
