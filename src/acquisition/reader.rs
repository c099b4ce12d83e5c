//! The per-run reader loop.
//!
//! Exactly `sample_count` read attempts are made. Every attempt counts,
//! whether the line parses or not; only a stop request or an unrecoverable
//! error ends the loop early. Between two reads the loop waits for the
//! configured interval.

use crate::{
    acquisition::{AcquisitionEvent, RunOutcome, RunSummary},
    core::{CancelToken, Sample},
    data::{CsvSampleWriter, SampleStore},
    error::AppResult,
    instrument::LineSource,
    measurement::{parse_line, ParsedLine},
};
use std::fs::File;
use std::io::Write;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Size and pacing of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunPlan {
    /// Number of read attempts
    pub sample_count: usize,
    /// Wait between two consecutive reads
    pub interval: Duration,
}

/// Everything one run owns. Consumed by [`AcquisitionReader::run`].
pub struct AcquisitionReader<W: Write = File> {
    source: Box<dyn LineSource>,
    writer: CsvSampleWriter<W>,
    store: SampleStore,
    events: Sender<AcquisitionEvent>,
    cancel: CancelToken,
    plan: RunPlan,
}

impl<W: Write> AcquisitionReader<W> {
    /// Bundles an open connection and output file into a runnable reader.
    pub fn new(
        source: Box<dyn LineSource>,
        writer: CsvSampleWriter<W>,
        store: SampleStore,
        events: Sender<AcquisitionEvent>,
        cancel: CancelToken,
        plan: RunPlan,
    ) -> Self {
        Self {
            source,
            writer,
            store,
            events,
            cancel,
            plan,
        }
    }

    /// Runs the loop to completion on the calling thread.
    ///
    /// The connection and the file are closed before the terminal event is
    /// sent, on every exit path.
    pub fn run(mut self) -> AppResult<RunSummary> {
        let mut summary = RunSummary::new(self.writer.path().to_path_buf(), self.plan.sample_count);
        info!(
            "Acquisition started: {} reads from {} every {:?} into '{}'",
            self.plan.sample_count,
            self.source.describe(),
            self.plan.interval,
            summary.path.display()
        );
        self.emit(AcquisitionEvent::Started {
            path: summary.path.clone(),
            sample_count: self.plan.sample_count,
        });

        let result = self.read_loop(&mut summary);

        let device = self.source.describe();
        drop(self.source);
        drop(self.writer);
        tracing::debug!("Connection to {} closed", device);

        match result {
            Ok(outcome) => {
                summary.outcome = outcome;
                info!(
                    "Acquisition {:?}: {} lines read, {} accepted, {} rejected",
                    outcome, summary.lines_read, summary.accepted, summary.rejected
                );
                let _ = self.events.send(AcquisitionEvent::Finished(summary.clone()));
                Ok(summary)
            }
            Err(e) => {
                summary.outcome = RunOutcome::Aborted;
                error!(
                    "Acquisition aborted after {} of {} reads: {}",
                    summary.lines_read, summary.sample_count, e
                );
                let _ = self.events.send(AcquisitionEvent::Aborted {
                    summary,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn read_loop(&mut self, summary: &mut RunSummary) -> AppResult<RunOutcome> {
        let start = Instant::now();

        for index in 1..=self.plan.sample_count {
            if self.cancel.is_cancelled() {
                return Ok(RunOutcome::Cancelled);
            }
            let Some(line) = self.source.read_line(&self.cancel)? else {
                return Ok(RunOutcome::Cancelled);
            };
            summary.lines_read += 1;

            self.handle_line(index, &line, start.elapsed(), summary)?;

            if index < self.plan.sample_count && self.cancel.wait_timeout(self.plan.interval) {
                return Ok(RunOutcome::Cancelled);
            }
        }

        Ok(RunOutcome::Completed)
    }

    fn handle_line(
        &mut self,
        index: usize,
        line: &str,
        elapsed: Duration,
        summary: &mut RunSummary,
    ) -> AppResult<()> {
        let reason = match parse_line(line) {
            ParsedLine::Reading {
                temperature,
                humidity,
            } => {
                let sample = Sample::new(elapsed, temperature, humidity);
                // File first: a failed write aborts the run and must not leave
                // the store one sample ahead of the file.
                self.writer.write_sample(&sample)?;
                self.store.push(sample);
                summary.accepted += 1;
                info!("{}", sample.log_line(index));
                self.emit(AcquisitionEvent::SampleAccepted { index, sample });
                return Ok(());
            }
            ParsedLine::Malformed(reason) => {
                warn!("Error processing data: {:?} -> {}", line, reason);
                reason
            }
            ParsedLine::Unrecognized => {
                warn!("Incorrect data format: {:?}", line);
                "missing temperature or humidity marker".to_string()
            }
        };

        summary.rejected += 1;
        self.emit(AcquisitionEvent::LineRejected {
            index,
            line: line.to_string(),
            reason,
        });
        Ok(())
    }

    fn emit(&self, event: AcquisitionEvent) {
        // The UI may already be gone during shutdown; the run still completes.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::storage::read_samples;
    use crate::error::DaqError;
    use crate::instrument::{Connector, MockConnector, MockRead};
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use tempfile::tempdir;
    use tracing_test::traced_test;

    struct Harness {
        connector: MockConnector,
        store: SampleStore,
        events: mpsc::Receiver<AcquisitionEvent>,
        reader: AcquisitionReader,
        _dir: tempfile::TempDir,
        path: std::path::PathBuf,
    }

    fn harness(script: Vec<MockRead>, sample_count: usize) -> Harness {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let connector = MockConnector::new(script);
        let store = SampleStore::new();
        let (tx, rx) = mpsc::channel();
        let reader = AcquisitionReader::new(
            connector.connect().unwrap(),
            CsvSampleWriter::create(&path).unwrap(),
            store.clone(),
            tx,
            CancelToken::new(),
            RunPlan {
                sample_count,
                interval: Duration::from_millis(1),
            },
        );
        Harness {
            connector,
            store,
            events: rx,
            reader,
            _dir: dir,
            path,
        }
    }

    #[test]
    fn test_every_line_counts_toward_bound() {
        let h = harness(
            vec![
                MockRead::reading(21.0, 40.0),
                MockRead::line("garbage"),
                MockRead::line("Temperatura: x C\tHumedad: 1 %"),
                MockRead::reading(22.0, 41.0),
                MockRead::reading(99.0, 99.0),
            ],
            4,
        );
        let summary = h.reader.run().unwrap();

        assert_eq!(h.connector.read_attempts(), 4);
        assert_eq!(summary.lines_read, 4);
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(h.connector.released(), 1);

        let stored = h.store.snapshot();
        assert_eq!(stored.temperatures, vec![21.0, 22.0]);
        assert_eq!(read_samples(&h.path).unwrap(), stored.samples());
    }

    #[test]
    fn test_event_sequence() {
        let h = harness(vec![MockRead::line("boot"), MockRead::reading(20.5, 45.0)], 2);
        h.reader.run().unwrap();

        let events: Vec<_> = h.events.try_iter().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], AcquisitionEvent::Started { sample_count: 2, .. }));
        assert!(matches!(
            &events[1],
            AcquisitionEvent::LineRejected { index: 1, line, .. } if line == "boot"
        ));
        match &events[2] {
            AcquisitionEvent::SampleAccepted { index, sample } => {
                assert_eq!(*index, 2);
                assert_eq!(sample.temperature, 20.5);
                assert!(sample.log_line(*index).starts_with("Muestra 2: Tiempo="));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(events[3].is_terminal());
    }

    #[test]
    fn test_disconnect_aborts_run_and_keeps_written_rows() {
        let h = harness(vec![MockRead::reading(20.0, 50.0)], 3);
        let result = h.reader.run();

        assert!(matches!(result, Err(DaqError::DeviceDisconnected)));
        assert_eq!(h.connector.released(), 1);
        assert_eq!(read_samples(&h.path).unwrap().len(), 1);

        let last = h.events.try_iter().last().unwrap();
        match last {
            AcquisitionEvent::Aborted { summary, error } => {
                assert_eq!(summary.lines_read, 1);
                assert_eq!(summary.outcome, RunOutcome::Aborted);
                assert!(error.contains("closed the connection"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    /// Sink that accepts a fixed number of writes, then fails every write.
    struct FillingSink {
        data: Arc<Mutex<Vec<u8>>>,
        writes_left: Arc<AtomicUsize>,
    }

    impl FillingSink {
        fn new(writes: usize) -> Self {
            Self {
                data: Arc::new(Mutex::new(Vec::new())),
                writes_left: Arc::new(AtomicUsize::new(writes)),
            }
        }
    }

    impl Write for FillingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.writes_left.load(Ordering::SeqCst) == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.writes_left.fetch_sub(1, Ordering::SeqCst);
            self.data.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_aborts_with_store_matching_file() {
        let connector = MockConnector::new(vec![
            MockRead::reading(20.0, 50.0),
            MockRead::reading(20.1, 50.1),
            MockRead::reading(20.2, 50.2),
            MockRead::reading(20.3, 50.3),
        ]);
        // Header and two rows fit, the third row does not.
        let sink = FillingSink::new(3);
        let data = Arc::clone(&sink.data);
        let store = SampleStore::new();
        let (tx, rx) = mpsc::channel();
        let reader = AcquisitionReader::new(
            connector.connect().unwrap(),
            CsvSampleWriter::from_writer("full.csv", sink).unwrap(),
            store.clone(),
            tx,
            CancelToken::new(),
            RunPlan {
                sample_count: 4,
                interval: Duration::ZERO,
            },
        );

        let result = reader.run();
        assert!(matches!(result, Err(DaqError::Io(_))));
        assert_eq!(connector.read_attempts(), 3);
        assert_eq!(connector.released(), 1);

        let written = String::from_utf8(data.lock().unwrap().clone()).unwrap();
        let rows = written.lines().count() - 1;
        assert_eq!(rows, 2);
        assert_eq!(store.len(), rows);

        match rx.try_iter().last() {
            Some(AcquisitionEvent::Aborted { summary, error }) => {
                assert_eq!(summary.outcome, RunOutcome::Aborted);
                assert_eq!(summary.accepted, 2);
                assert!(error.contains("disk full"), "error was {}", error);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_cancel_during_stall() {
        let h = harness(vec![MockRead::reading(20.0, 50.0), MockRead::Stall], 5);
        let cancel = h.reader.cancel.clone();
        let handle = std::thread::spawn(move || h.reader.run());
        std::thread::sleep(Duration::from_millis(50));
        cancel.cancel();

        let summary = handle.join().unwrap().unwrap();
        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert_eq!(summary.accepted, 1);
        assert_eq!(h.connector.released(), 1);
    }

    #[test]
    #[traced_test]
    fn test_rejected_lines_emit_diagnostics() {
        let h = harness(
            vec![
                MockRead::line("Temperatura: abc C\tHumedad: 60 %"),
                MockRead::line("hello"),
            ],
            2,
        );
        let summary = h.reader.run().unwrap();
        assert_eq!(summary.accepted, 0);
        assert!(h.store.is_empty());
        assert_eq!(read_samples(&h.path).unwrap().len(), 0);
        assert!(logs_contain("Error processing data"));
        assert!(logs_contain("Incorrect data format"));
    }
}
