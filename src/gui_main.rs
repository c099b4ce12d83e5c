//! Native egui/eframe GUI for thermo_daq.
//!
//! Loads the layered configuration, sets up tracing and opens the logger
//! window on the configured serial port.
//!
//! ```bash
//! THERMO_DAQ_SERIAL__PORT=/dev/ttyUSB0 cargo run --bin thermo_daq_gui
//! ```

use anyhow::{anyhow, Context};
use thermo_daq::{acquisition::AcquisitionController, config::Settings, gui::LoggerApp};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.application.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting {} on {} at {} baud",
        settings.application.name, settings.serial.port, settings.serial.baud_rate
    );

    let controller = AcquisitionController::from_settings(&settings);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(settings.application.name.clone())
            .with_inner_size([1200.0, 600.0])
            .with_min_inner_size([800.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        &settings.application.name,
        native_options,
        Box::new(move |cc| Ok(Box::new(LoggerApp::new(cc, controller)))),
    )
    .map_err(|e| anyhow!("GUI terminated with error: {e}"))
}
