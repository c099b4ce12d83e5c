//! Scripted stand-in for the serial sensor.
//!
//! This connector provides a simulated device for tests and demos without
//! physical hardware. It provides:
//! - A fixed script of lines, errors and stalls replayed on every connect
//! - Controllable connection failure injection
//! - Counters for read attempts and released connections

use crate::{
    core::CancelToken,
    error::{AppResult, DaqError},
    instrument::{Connector, LineSource},
};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One scripted response of the mock device.
#[derive(Clone, Debug, PartialEq)]
pub enum MockRead {
    /// The device prints this line.
    Line(String),
    /// The read fails with this I/O error kind.
    Error(io::ErrorKind),
    /// The device goes silent until the run is cancelled.
    Stall,
}

impl MockRead {
    /// Shorthand for [`MockRead::Line`].
    pub fn line(text: impl Into<String>) -> Self {
        MockRead::Line(text.into())
    }

    /// A well-formed reading in the sensor's native format.
    pub fn reading(temperature: f64, humidity: f64) -> Self {
        MockRead::Line(format!(
            "Temperatura: {} C\tHumedad: {} %",
            temperature, humidity
        ))
    }
}

/// Connector that hands out [`MockLineSource`]s replaying a script.
///
/// Clones share the failure switch and the counters.
///
/// # Example
///
/// ```
/// use thermo_daq::instrument::{Connector, MockConnector, MockRead};
///
/// let connector = MockConnector::new(vec![MockRead::reading(23.5, 60.2)]);
/// connector.fail_next_connect();
/// assert!(connector.connect().is_err());
/// assert!(connector.connect().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct MockConnector {
    port: String,
    script: Arc<Vec<MockRead>>,
    fail_next: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
    connects: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl MockConnector {
    /// Creates a connector whose sources replay `script`. Once the script is
    /// exhausted the device reports end of stream.
    pub fn new(script: Vec<MockRead>) -> Self {
        Self {
            port: "MOCK0".to_string(),
            script: Arc::new(script),
            fail_next: Arc::new(AtomicBool::new(false)),
            reads: Arc::new(AtomicUsize::new(0)),
            connects: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes the next `connect` call fail as if the port were busy.
    pub fn fail_next_connect(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Total `read_line` calls across all sources.
    pub fn read_attempts(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Successful connects so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Sources dropped (connections closed) so far.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    fn connect(&self) -> AppResult<Box<dyn LineSource>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DaqError::Connection {
                port: self.port.clone(),
                reason: "Injected failure: port busy".to_string(),
            });
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockLineSource {
            script: self.script.iter().cloned().collect(),
            reads: Arc::clone(&self.reads),
            released: Arc::clone(&self.released),
        }))
    }

    fn port_name(&self) -> &str {
        &self.port
    }
}

/// A connection opened by [`MockConnector`].
pub struct MockLineSource {
    script: VecDeque<MockRead>,
    reads: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl LineSource for MockLineSource {
    fn read_line(&mut self, cancel: &CancelToken) -> AppResult<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(MockRead::Line(line)) => Ok(Some(line)),
            Some(MockRead::Error(kind)) => {
                Err(DaqError::Io(io::Error::new(kind, "injected read failure")))
            }
            Some(MockRead::Stall) => {
                while !cancel.wait_timeout(Duration::from_millis(50)) {}
                Ok(None)
            }
            None => Err(DaqError::DeviceDisconnected),
        }
    }

    fn describe(&self) -> String {
        "mock sensor".to_string()
    }
}

impl Drop for MockLineSource {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_replays_then_disconnects() {
        let connector = MockConnector::new(vec![
            MockRead::reading(20.0, 50.0),
            MockRead::Error(io::ErrorKind::BrokenPipe),
        ]);
        let cancel = CancelToken::new();
        let mut source = connector.connect().unwrap();

        assert_eq!(
            source.read_line(&cancel).unwrap().as_deref(),
            Some("Temperatura: 20 C\tHumedad: 50 %")
        );
        assert!(matches!(source.read_line(&cancel), Err(DaqError::Io(_))));
        assert!(matches!(
            source.read_line(&cancel),
            Err(DaqError::DeviceDisconnected)
        ));
        assert_eq!(connector.read_attempts(), 3);

        drop(source);
        assert_eq!(connector.released(), 1);
    }

    #[test]
    fn test_each_connect_replays_from_start() {
        let connector = MockConnector::new(vec![MockRead::line("hello")]);
        let cancel = CancelToken::new();
        for _ in 0..2 {
            let mut source = connector.connect().unwrap();
            assert_eq!(source.read_line(&cancel).unwrap().as_deref(), Some("hello"));
        }
        assert_eq!(connector.connects(), 2);
        assert_eq!(connector.released(), 2);
    }

    #[test]
    fn test_injected_connect_failure_is_one_shot() {
        let connector = MockConnector::new(vec![]);
        connector.fail_next_connect();
        assert!(matches!(
            connector.connect().err(),
            Some(DaqError::Connection { .. })
        ));
        assert!(connector.connect().is_ok());
    }

    #[test]
    fn test_stall_returns_when_cancelled() {
        let connector = MockConnector::new(vec![MockRead::Stall]);
        let mut source = connector.connect().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(source.read_line(&cancel).unwrap(), None);
    }
}
