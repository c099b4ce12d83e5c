//! Acquisition runs: the background reader and the controller that starts,
//! stops and joins it.
//!
//! ## Architecture
//!
//! - **UI thread**: calls [`AcquisitionController`] to validate input and start
//!   or cancel runs, and drains [`AcquisitionEvent`]s every frame. Never blocks
//!   on the device.
//! - **Reader thread** (one per run): owns the serial connection and the CSV
//!   file, appends to the shared [`crate::data::SampleStore`], and reports
//!   progress over an `mpsc` channel.
//! - **Cancellation**: a [`crate::core::CancelToken`] checked between reads and
//!   while waiting for the next read.

pub mod controller;
pub mod reader;

use crate::core::Sample;
use chrono::{DateTime, Local};
use std::path::PathBuf;

pub use controller::{AcquisitionController, RunRequest};
pub use reader::{AcquisitionReader, RunPlan};

/// How a run came to an end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// All requested reads were performed.
    Completed,
    /// A stop was requested before the last read.
    Cancelled,
    /// An unrecoverable error stopped the run.
    Aborted,
}

/// Counters for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// CSV file of the run
    pub path: PathBuf,
    /// Requested number of reads
    pub sample_count: usize,
    /// Lines actually read from the device
    pub lines_read: usize,
    /// Lines that produced a sample
    pub accepted: usize,
    /// Lines discarded as malformed or unrecognized
    pub rejected: usize,
    /// Final state of the run. `Completed` until the run ends
    pub outcome: RunOutcome,
    /// Wall-clock start of the run
    pub started_at: DateTime<Local>,
}

impl RunSummary {
    pub(crate) fn new(path: PathBuf, sample_count: usize) -> Self {
        Self {
            path,
            sample_count,
            lines_read: 0,
            accepted: 0,
            rejected: 0,
            outcome: RunOutcome::Completed,
            started_at: Local::now(),
        }
    }
}

/// Progress notifications sent from the reader thread to the UI.
#[derive(Clone, Debug, PartialEq)]
pub enum AcquisitionEvent {
    /// The reader thread is running and about to issue the first read.
    Started {
        /// CSV file of the run
        path: PathBuf,
        /// Requested number of reads
        sample_count: usize,
    },
    /// A line was parsed, stored and written.
    SampleAccepted {
        /// 1-based read attempt that produced the sample
        index: usize,
        /// The stored sample
        sample: Sample,
    },
    /// A line was discarded.
    LineRejected {
        /// 1-based read attempt
        index: usize,
        /// The raw (trimmed) line
        line: String,
        /// Why it was discarded
        reason: String,
    },
    /// The run ended normally or was cancelled. Always the last event of a run
    /// unless `Aborted` is sent instead.
    Finished(RunSummary),
    /// The run stopped on an unrecoverable error.
    Aborted {
        /// Counters up to the failure
        summary: RunSummary,
        /// Rendered error
        error: String,
    },
}

impl AcquisitionEvent {
    /// True for `Finished` and `Aborted`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AcquisitionEvent::Finished(_) | AcquisitionEvent::Aborted { .. }
        )
    }
}
