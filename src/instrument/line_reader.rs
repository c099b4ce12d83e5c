//! Newline framing on top of any blocking reader with a read timeout.
//!
//! Serial ports opened with a timeout return `TimedOut` when the device is
//! quiet. A timed-out read is not a failure here: bytes received so far stay
//! in the pending buffer, the cancel token is checked, and reading resumes.

use crate::{
    core::CancelToken,
    error::{AppResult, DaqError},
    instrument::LineSource,
};
use std::io::{BufRead, BufReader, ErrorKind, Read};

/// Frames `\n`-terminated text lines out of a byte stream.
pub struct LineReader<R: Read> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    label: String,
}

impl<R: Read> LineReader<R> {
    /// Wraps `inner`; `label` names the device in logs.
    pub fn new(inner: R, label: impl Into<String>) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::new(),
            label: label.into(),
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        line
    }
}

impl<R: Read + Send> LineSource for LineReader<R> {
    fn read_line(&mut self, cancel: &CancelToken) -> AppResult<Option<String>> {
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            match self.reader.read_until(b'\n', &mut self.pending) {
                Ok(0) if self.pending.is_empty() => return Err(DaqError::DeviceDisconnected),
                // A trailing line without terminator right before end of stream.
                Ok(_) => return Ok(Some(self.take_line())),
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(DaqError::Io(e)),
            }
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
