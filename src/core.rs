//! Core data types shared by the reader, the store and the GUI.
//!
//! # Data Flow
//!
//! ```text
//! LineSource --[line]--> parser --[Sample]--> SampleStore / CsvSampleWriter
//!                                        \--> AcquisitionEvent --> GUI
//! ```
//!
//! # Thread Safety
//!
//! `Sample` is `Copy` and never mutated after creation. `CancelToken` is shared
//! between the GUI thread and the reader thread and doubles as an
//! interruptible sleep.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// One (time, temperature, humidity) triple derived from a single valid device line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Seconds since the start of the run, rounded to two decimals
    pub elapsed_seconds: f64,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
}

impl Sample {
    /// Builds a sample, rounding the elapsed time to hundredths of a second.
    pub fn new(elapsed: Duration, temperature: f64, humidity: f64) -> Self {
        Self {
            elapsed_seconds: round_centis(elapsed.as_secs_f64()),
            temperature,
            humidity,
        }
    }

    /// Text shown in the GUI log for the read attempt `index` (1-based).
    pub fn log_line(&self, index: usize) -> String {
        format!(
            "Muestra {}: Tiempo={}s, Temperatura={}°C, Humedad={}%",
            index, self.elapsed_seconds, self.temperature, self.humidity
        )
    }
}

fn round_centis(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

/// Shared stop signal for one acquisition run.
///
/// Cloning yields another handle to the same flag. Besides the flag itself,
/// [`CancelToken::wait_timeout`] lets the reader sleep between reads while
/// still waking up immediately when a stop is requested.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    /// Creates a token in the "not cancelled" state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes every waiter.
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    /// Returns true once [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for `timeout` unless cancelled first. Returns true if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut cancelled = lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            cancelled = cvar
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *cancelled
    }
}
