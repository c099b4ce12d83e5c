//! Core library for the thermo_daq application.
//!
//! Reads temperature and humidity lines from a serial sensor on a background
//! thread, appends every valid reading to a CSV file and an in-memory store,
//! and plots the stored series on request. It is used by the GUI binary and
//! by the integration tests, which drive it through the mock instrument.

pub mod acquisition;
pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod gui;
pub mod instrument;
pub mod measurement;
