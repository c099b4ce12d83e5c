//! Custom error types for the application.
//!
//! This module defines the primary error type, `DaqError`, for the whole crate.
//! Using the `thiserror` crate, it provides one place to describe everything that
//! can go wrong between the sample-count entry box and the last flushed CSV row.
//!
//! ## Error Hierarchy
//!
//! - **Input validation** (`InvalidSampleCount`, `InvalidFileName`): reported
//!   synchronously by the controller; no run is started.
//! - **Connection** (`Connection`, `SerialFeatureDisabled`): the serial port
//!   could not be opened; no run is started and nothing is retried.
//! - **Run management** (`RunInProgress`, `WorkerPanicked`): overlapping starts
//!   are rejected, a panicking reader thread is surfaced at join time.
//! - **Mid-run failures** (`DeviceDisconnected`, `Io`, `Csv`): abort the run.
//!   The reader releases the port and reports the error as an aborted run.
//! - **Storage / configuration** (`Storage`, `Config`, `Configuration`).
//!
//! Malformed device lines are *not* errors: the parser returns a tagged
//! result and the reader only emits a diagnostic for them.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

/// Every failure the acquisition pipeline can report.
#[derive(Error, Debug)]
pub enum DaqError {
    /// Figment could not load or deserialize the configuration sources.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration parsed but holds values that make no sense.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// The sample count entry is not a positive integer.
    #[error("Invalid sample count '{0}': expected a positive integer")]
    InvalidSampleCount(String),

    /// The output file name entry is unusable.
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// The serial port could not be opened.
    #[error("Could not open serial port '{port}': {reason}")]
    Connection {
        /// Port name from the configuration.
        port: String,
        /// Driver-level description of the failure.
        reason: String,
    },

    /// Serial support was compiled out.
    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,

    /// A start was requested while the previous run is still reading.
    #[error("An acquisition run is already in progress")]
    RunInProgress,

    /// The device closed the stream before the run finished.
    #[error("Serial device closed the connection")]
    DeviceDisconnected,

    /// The output file could not be created.
    #[error("Could not create output file {path:?}: {source}")]
    Storage {
        /// Resolved output path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// Generic I/O failure during a run.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV encoder failed to write a record.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The reader thread panicked instead of returning.
    #[error("Acquisition thread panicked")]
    WorkerPanicked,
}

impl From<figment::Error> for DaqError {
    fn from(err: figment::Error) -> Self {
        DaqError::Config(Box::new(err))
    }
}

impl DaqError {
    /// True for errors caused by what the user typed, as opposed to hardware or disk.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DaqError::InvalidSampleCount(_) | DaqError::InvalidFileName(_)
        )
    }
}
