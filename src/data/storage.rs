//! CSV persistence for acquisition runs.
//!
//! One file per run, truncated on creation, semicolon-delimited, with a fixed
//! header. Every accepted sample is written and flushed immediately so that a
//! run interrupted half-way still leaves a readable file behind.
use crate::{
    core::Sample,
    error::{AppResult, DaqError},
};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column names written as the first row of every file.
pub const CSV_HEADER: [&str; 3] = ["Tiempo (s)", "Temperatura (°C)", "Humedad (%)"];

/// Field delimiter of the output file.
pub const CSV_DELIMITER: u8 = b';';

const CSV_EXTENSION: &str = ".csv";

/// Trims the user entry and appends ".csv" unless it already ends with it.
///
/// The suffix check is case-sensitive: "data.CSV" becomes "data.CSV.csv".
pub fn normalize_csv_filename(input: &str) -> AppResult<String> {
    let name = input.trim();
    if name.is_empty() {
        return Err(DaqError::InvalidFileName(
            "file name cannot be empty".to_string(),
        ));
    }
    if name == CSV_EXTENSION {
        return Err(DaqError::InvalidFileName(format!(
            "'{}' has no base name",
            name
        )));
    }
    if name.ends_with(CSV_EXTENSION) {
        Ok(name.to_string())
    } else {
        Ok(format!("{name}{CSV_EXTENSION}"))
    }
}

/// Writes the samples of one run to disk.
///
/// Generic over the sink so runs can be pointed at something other than a
/// file; [`CsvSampleWriter::create`] is the file-backed constructor.
pub struct CsvSampleWriter<W: Write = File> {
    path: PathBuf,
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvSampleWriter<File> {
    /// Creates (or truncates) `path`, creating missing parent directories,
    /// and writes the header row.
    pub fn create(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let storage_err = |source| DaqError::Storage {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(storage_err)?;
            }
        }

        let file = File::create(&path).map_err(storage_err)?;
        let writer = Self::from_writer(path, file)?;
        tracing::info!("CSV writer initialized at '{}'", writer.path.display());
        Ok(writer)
    }
}

impl<W: Write> CsvSampleWriter<W> {
    /// Wraps an already open sink and writes the header row. `path` is only
    /// used to label the run.
    pub fn from_writer(path: impl Into<PathBuf>, sink: W) -> AppResult<Self> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(CSV_DELIMITER)
            .from_writer(sink);
        writer.write_record(CSV_HEADER)?;
        writer.flush()?;
        Ok(Self {
            path: path.into(),
            writer,
            rows: 0,
        })
    }

    /// Appends one row and flushes it to the sink.
    pub fn write_sample(&mut self, sample: &Sample) -> AppResult<()> {
        self.writer.write_record(&[
            format!("{:.2}", sample.elapsed_seconds),
            sample.temperature.to_string(),
            sample.humidity.to_string(),
        ])?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows written so far (header excluded).
    pub fn rows_written(&self) -> usize {
        self.rows
    }
}

/// Reads back a file produced by [`CsvSampleWriter`].
pub fn read_samples(path: &Path) -> AppResult<Vec<Sample>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(CSV_DELIMITER)
        .from_path(path)?;

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |i: usize| -> AppResult<f64> {
            record
                .get(i)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .ok_or_else(|| {
                    DaqError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("bad value in column {} of {:?}", i, record),
                    ))
                })
        };
        samples.push(Sample {
            elapsed_seconds: field(0)?,
            temperature: field(1)?,
            humidity: field(2)?,
        });
    }
    Ok(samples)
}
