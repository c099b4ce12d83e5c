//! Sample storage: the in-memory store that drives plotting and the CSV file
//! that persists each run.

pub mod storage;
pub mod store;

pub use storage::{normalize_csv_filename, CsvSampleWriter, CSV_HEADER};
pub use store::{SampleSeries, SampleStore};
