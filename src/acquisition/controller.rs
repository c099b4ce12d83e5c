//! Starts, stops and joins acquisition runs.
//!
//! The controller lives on the UI thread. It validates what the user typed,
//! refuses to start a second run while one is still reading, opens the device
//! and the output file synchronously (so those errors reach the user right
//! away), and hands both to a reader thread.

use crate::{
    acquisition::{AcquisitionEvent, AcquisitionReader, RunPlan, RunSummary},
    config::Settings,
    core::CancelToken,
    data::{normalize_csv_filename, CsvSampleWriter, SampleStore},
    error::{AppResult, DaqError},
    instrument::{Connector, SerialConnector},
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Validated user input for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunRequest {
    /// Number of read attempts, at least 1
    pub sample_count: usize,
    /// File name with the ".csv" suffix
    pub file_name: String,
}

impl RunRequest {
    /// Validates the two text entries of the form.
    pub fn parse(sample_count: &str, file_name: &str) -> AppResult<Self> {
        let raw = sample_count.trim();
        let sample_count = raw
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| DaqError::InvalidSampleCount(raw.to_string()))?;
        let file_name = normalize_csv_filename(file_name)?;
        Ok(Self {
            sample_count,
            file_name,
        })
    }
}

struct RunHandle {
    cancel: CancelToken,
    path: PathBuf,
    // Set once the terminal event has been drained; the thread is returning.
    ended: bool,
    thread: JoinHandle<AppResult<RunSummary>>,
}

impl RunHandle {
    fn is_active(&self) -> bool {
        !self.ended && !self.thread.is_finished()
    }

    fn join(self) -> AppResult<RunSummary> {
        self.thread.join().map_err(|_| DaqError::WorkerPanicked)?
    }
}

/// Owns the run lifecycle and the shared sample store.
pub struct AcquisitionController {
    connector: Arc<dyn Connector>,
    output_dir: PathBuf,
    interval: Duration,
    store: SampleStore,
    events_tx: Sender<AcquisitionEvent>,
    events_rx: Receiver<AcquisitionEvent>,
    run: Option<RunHandle>,
}

impl AcquisitionController {
    /// Creates a controller reading from `connector`.
    pub fn new(connector: Arc<dyn Connector>, output_dir: impl Into<PathBuf>, interval: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            connector,
            output_dir: output_dir.into(),
            interval,
            store: SampleStore::new(),
            events_tx,
            events_rx,
            run: None,
        }
    }

    /// Creates a controller for the serial port described in `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(SerialConnector::new(settings.serial.clone())),
            settings.storage.output_dir.clone(),
            settings.acquisition.sample_interval(),
        )
    }

    /// Handle to the samples of the current (or last) run.
    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// Port the connector opens.
    pub fn port_name(&self) -> &str {
        self.connector.port_name()
    }

    /// Where a run writing `file_name` will put its CSV file.
    pub fn resolve_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// True while a run is in progress.
    ///
    /// Turns false as soon as the run's terminal event has been drained, so a
    /// start issued after seeing that event is never rejected.
    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(RunHandle::is_active)
    }

    /// CSV path of the run in progress, if any.
    pub fn current_path(&self) -> Option<&Path> {
        self.run
            .as_ref()
            .filter(|_| self.is_running())
            .map(|run| run.path.as_path())
    }

    /// Starts a run. Returns the resolved CSV path.
    ///
    /// Fails without side effects on the device if a run is already in
    /// progress. On connection or file errors the store has been cleared but
    /// no thread is started.
    pub fn start(&mut self, request: &RunRequest) -> AppResult<PathBuf> {
        if self.is_running() {
            warn!("Start requested while a run is in progress");
            return Err(DaqError::RunInProgress);
        }
        self.reap();
        // Anything left in the channel belongs to the joined run.
        let stale = self.events_rx.try_iter().count();
        if stale > 0 {
            debug!("Discarded {} events of the previous run", stale);
        }

        self.store.clear();

        let source = self.connector.connect()?;
        let path = self.resolve_path(&request.file_name);
        let writer = CsvSampleWriter::create(&path)?;

        let cancel = CancelToken::new();
        let reader = AcquisitionReader::new(
            source,
            writer,
            self.store.clone(),
            self.events_tx.clone(),
            cancel.clone(),
            RunPlan {
                sample_count: request.sample_count,
                interval: self.interval,
            },
        );

        let thread = thread::Builder::new()
            .name("acquisition-reader".to_string())
            .spawn(move || reader.run())?;

        info!(
            "Started acquisition of {} samples on {} -> '{}'",
            request.sample_count,
            self.connector.port_name(),
            path.display()
        );
        self.run = Some(RunHandle {
            cancel,
            path: path.clone(),
            ended: false,
            thread,
        });
        Ok(path)
    }

    /// Asks the running reader to stop after its current read or wait.
    pub fn cancel(&self) {
        if let Some(run) = &self.run {
            run.cancel.cancel();
        }
    }

    /// All events received since the last call, in arrival order.
    pub fn drain_events(&mut self) -> Vec<AcquisitionEvent> {
        let events: Vec<AcquisitionEvent> = self.events_rx.try_iter().collect();
        if let Some(run) = &mut self.run {
            if events.iter().any(AcquisitionEvent::is_terminal) {
                run.ended = true;
            }
        }
        events
    }

    /// Cancels any run in progress and waits for its thread.
    ///
    /// Returns the joined run's result, if there was a run to join.
    pub fn shutdown(&mut self) -> Option<AppResult<RunSummary>> {
        let run = self.run.take()?;
        run.cancel.cancel();
        let result = run.join();
        if let Err(e) = &result {
            warn!("Acquisition thread ended with error: {}", e);
        }
        Some(result)
    }

    // Joins a finished reader so its resources are released before the next run.
    fn reap(&mut self) {
        if let Some(run) = self.run.take() {
            if let Err(e) = run.join() {
                warn!("Previous acquisition ended with error: {}", e);
            }
        }
    }
}

impl Drop for AcquisitionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
