//! Device connections.
//!
//! The acquisition reader only needs two things from a device: a way to open
//! it and a way to pull the next text line out of it. [`Connector`] and
//! [`LineSource`] are the seams for that; the serial implementation lives in
//! [`serial`] and a scripted stand-in for tests in [`mock`].

pub mod line_reader;
pub mod mock;
pub mod serial;

use crate::{core::CancelToken, error::AppResult};

pub use line_reader::LineReader;
pub use mock::{MockConnector, MockRead};
pub use serial::SerialConnector;

/// An open, line-oriented device connection.
///
/// Dropping the source closes the connection.
pub trait LineSource: Send {
    /// Blocks until one complete line is available and returns it without
    /// the line terminator.
    ///
    /// Returns `Ok(None)` if `cancel` fires while waiting. End of stream is
    /// reported as [`crate::error::DaqError::DeviceDisconnected`].
    fn read_line(&mut self, cancel: &CancelToken) -> AppResult<Option<String>>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Opens a fresh [`LineSource`] for each acquisition run.
pub trait Connector: Send + Sync {
    /// Opens the device. Failures map to
    /// [`crate::error::DaqError::Connection`].
    fn connect(&self) -> AppResult<Box<dyn LineSource>>;

    /// Name of the port, for status and error messages.
    fn port_name(&self) -> &str;
}
