//! Serial port connector built on the `serialport` crate.
//!
//! The port is opened with a short read timeout so that the reader thread can
//! notice a stop request while the device is silent. Lines are framed by
//! [`LineReader`]; dropping the reader closes the port.

use crate::{
    config::SerialConfig,
    error::AppResult,
    instrument::{Connector, LineSource},
};

#[cfg(feature = "instrument_serial")]
use crate::{error::DaqError, instrument::LineReader};

/// Opens the configured serial port for each run.
#[derive(Clone, Debug)]
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    /// Creates a connector for the given port settings.
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }
}

#[cfg(feature = "instrument_serial")]
impl Connector for SerialConnector {
    fn connect(&self) -> AppResult<Box<dyn LineSource>> {
        let port = serialport::new(&self.config.port, self.config.baud_rate)
            .timeout(self.config.read_timeout())
            .open()
            .map_err(|e| DaqError::Connection {
                port: self.config.port.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            "Serial port '{}' opened at {} baud",
            self.config.port,
            self.config.baud_rate
        );

        let label = format!("{}@{}", self.config.port, self.config.baud_rate);
        Ok(Box::new(LineReader::new(port, label)))
    }

    fn port_name(&self) -> &str {
        &self.config.port
    }
}

#[cfg(not(feature = "instrument_serial"))]
impl Connector for SerialConnector {
    fn connect(&self) -> AppResult<Box<dyn LineSource>> {
        Err(crate::error::DaqError::SerialFeatureDisabled)
    }

    fn port_name(&self) -> &str {
        &self.config.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_port_is_connection_error() {
        let connector = SerialConnector::new(SerialConfig {
            port: "/dev/thermo-daq-no-such-port".to_string(),
            ..SerialConfig::default()
        });
        assert_eq!(connector.port_name(), "/dev/thermo-daq-no-such-port");

        let err = connector.connect().err().map(|e| e.to_string()).unwrap_or_default();
        assert!(
            err.contains("/dev/thermo-daq-no-such-port") || err.contains("Serial support"),
            "unexpected error: {err}"
        );
    }
}
