//! The eframe/egui implementation for the GUI.
//!
//! ## Architecture
//!
//! The GUI is a single `LoggerApp` struct implementing `eframe::App`:
//!
//! - **Panels:**
//!   - `SidePanel` (Left): the run form (file name, number of samples), the
//!     Iniciar / Graficar / Detener / Cerrar buttons, the status line, the
//!     counters and the run log.
//!   - `CentralPanel`: the temperature and humidity charts, stacked.
//!
//! - **Data Flow:**
//!   - Buttons call into [`AcquisitionController`]; nothing here touches the
//!     serial port.
//!   - Every frame `process_events` drains the controller's event channel and
//!     updates the counters, the log and the notices.
//!   - Charts change only when Graficar is pressed.
//!
//! - **Notices:** modal-style windows for input errors, connection errors,
//!   completion and aborted runs. One notice at a time; the newest wins.

pub mod charts;
mod log_panel;

use self::charts::{Charts, PlotOutcome};
use self::log_panel::{EntryKind, LogEntry, LogView};
use crate::{
    acquisition::{AcquisitionController, AcquisitionEvent, RunOutcome, RunRequest},
    error::DaqError,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const FORM_KEY: &str = "thermo_daq_form";
const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

/// Severity of a [`Notice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational
    Info,
    /// Something failed
    Error,
}

/// A message the user has to acknowledge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Window title
    pub title: String,
    /// Body text
    pub message: String,
}

impl Notice {
    fn info(title: &str, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.to_string(),
            message: message.into(),
        }
    }

    fn error(title: &str, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// Where the current (or last) run stands, as far as the UI knows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Aborted,
}

/// Form entries, persisted between sessions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    /// Output file name as typed
    pub file_name: String,
    /// Number of samples as typed
    pub sample_count: String,
}

/// Main application window.
pub struct LoggerApp {
    controller: AcquisitionController,
    /// Run form entries
    pub form: FormState,
    /// Status line under the buttons
    pub status_line: String,
    /// State of the current (or last) run
    pub state: RunState,
    /// Reads requested for the current run
    pub requested: usize,
    /// Reads performed so far
    pub lines_read: usize,
    /// Samples stored so far
    pub accepted: usize,
    /// Pending notice window
    pub notice: Option<Notice>,
    /// Chart contents as of the last Graficar
    pub charts: Charts,
    log: Vec<LogEntry>,
    log_view: LogView,
}

impl LoggerApp {
    /// Creates the app, restoring the last form entries when persistence is available.
    pub fn new(cc: &eframe::CreationContext<'_>, controller: AcquisitionController) -> Self {
        let mut app = Self::with_controller(controller);
        if let Some(storage) = cc.storage {
            if let Some(form) = eframe::get_value::<FormState>(storage, FORM_KEY) {
                app.form = form;
            }
        }
        app
    }

    /// Creates the app without an eframe context.
    pub fn with_controller(controller: AcquisitionController) -> Self {
        Self {
            controller,
            form: FormState::default(),
            status_line: String::new(),
            state: RunState::Idle,
            requested: 0,
            lines_read: 0,
            accepted: 0,
            notice: None,
            charts: Charts::default(),
            log: Vec::new(),
            log_view: LogView::default(),
        }
    }

    /// Accepted-sample lines of the current run, in order.
    pub fn sample_log(&self) -> impl Iterator<Item = &str> {
        self.log
            .iter()
            .filter(|entry| entry.kind == EntryKind::Sample)
            .map(|entry| entry.message.as_str())
    }

    /// True while the reader thread is alive.
    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Handler of the Iniciar button.
    pub fn start_acquisition(&mut self) {
        // Settle whatever the previous run still had in flight.
        self.process_events();

        let request = match RunRequest::parse(&self.form.sample_count, &self.form.file_name) {
            Ok(request) => request,
            Err(e) => {
                debug!("Rejected run form: {}", e);
                self.notice = Some(if e.is_input_error() {
                    input_notice(&e)
                } else {
                    Notice::error("Error", e.to_string())
                });
                return;
            }
        };

        match self.controller.start(&request) {
            Ok(path) => {
                info!("Writing samples to '{}'", path.display());
                self.form.file_name = request.file_name;
                self.state = RunState::Running;
                self.requested = request.sample_count;
                self.lines_read = 0;
                self.accepted = 0;
                self.log.clear();
                self.status_line = "Iniciando toma de datos...".to_string();
            }
            Err(DaqError::RunInProgress) => {
                self.notice = Some(Notice::info(
                    "Adquisición en curso",
                    "Ya hay una toma de muestras en curso. Espere a que termine o deténgala.",
                ));
            }
            Err(e @ (DaqError::Connection { .. } | DaqError::SerialFeatureDisabled)) => {
                error!("{}", e);
                self.notice = Some(Notice::error(
                    "Error de conexión",
                    format!(
                        "No se pudo abrir el puerto {}. Error: {}",
                        self.controller.port_name(),
                        e
                    ),
                ));
            }
            Err(e) => {
                error!("Could not start acquisition: {}", e);
                self.notice = Some(Notice::error("Error", e.to_string()));
            }
        }
    }

    /// Handler of the Graficar button.
    pub fn plot_data(&mut self) -> PlotOutcome {
        let outcome = self.charts.refresh(self.controller.store());
        match outcome {
            PlotOutcome::Plotted(n) => debug!("Plotted {} samples", n),
            PlotOutcome::Empty => {
                self.notice = Some(Notice::info("Información", "No hay datos para graficar."));
            }
        }
        outcome
    }

    /// Handler of the Detener button.
    pub fn stop_acquisition(&mut self) {
        if self.controller.is_running() {
            info!("Stop requested");
            self.controller.cancel();
        }
    }

    /// Applies every event the reader sent since the last frame.
    pub fn process_events(&mut self) {
        for event in self.controller.drain_events() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: AcquisitionEvent) {
        match event {
            AcquisitionEvent::Started { sample_count, .. } => {
                self.state = RunState::Running;
                self.requested = sample_count;
            }
            AcquisitionEvent::SampleAccepted { index, sample } => {
                self.lines_read = index;
                self.accepted += 1;
                self.log
                    .push(LogEntry::new(EntryKind::Sample, sample.log_line(index)));
            }
            AcquisitionEvent::LineRejected {
                index,
                line,
                reason,
            } => {
                self.lines_read = index;
                self.log.push(LogEntry::new(
                    EntryKind::Rejected,
                    format!("Lectura {}: {:?} ({})", index, line, reason),
                ));
            }
            AcquisitionEvent::Finished(summary) => {
                self.lines_read = summary.lines_read;
                self.accepted = summary.accepted;
                match summary.outcome {
                    RunOutcome::Completed => {
                        self.state = RunState::Completed;
                        self.status_line = "La toma de muestras ha finalizado.".to_string();
                        self.notice = Some(Notice::info(
                            "Finalizado",
                            format!("El archivo {} se creó con éxito.", summary.path.display()),
                        ));
                    }
                    RunOutcome::Cancelled => {
                        self.state = RunState::Cancelled;
                        self.status_line = "Toma de muestras detenida.".to_string();
                    }
                    // Aborted runs report through `AcquisitionEvent::Aborted`.
                    RunOutcome::Aborted => {
                        self.state = RunState::Aborted;
                        self.status_line = "La toma de muestras se interrumpió.".to_string();
                    }
                }
            }
            AcquisitionEvent::Aborted { summary, error } => {
                self.state = RunState::Aborted;
                self.lines_read = summary.lines_read;
                self.accepted = summary.accepted;
                self.status_line = "La toma de muestras se interrumpió.".to_string();
                self.notice = Some(Notice::error(
                    "Toma de muestras abortada",
                    format!(
                        "{}\nSe guardaron {} muestras en {}.",
                        error,
                        summary.accepted,
                        summary.path.display()
                    ),
                ));
            }
        }
    }

    fn controls_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("controls_panel")
            .resizable(true)
            .default_width(420.0)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                egui::Grid::new("run_form")
                    .num_columns(2)
                    .spacing([8.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("Nombre del archivo (.csv):");
                        ui.add(
                            egui::TextEdit::singleline(&mut self.form.file_name)
                                .hint_text("datos.csv"),
                        );
                        ui.end_row();

                        ui.label("Número de muestras:");
                        ui.add(
                            egui::TextEdit::singleline(&mut self.form.sample_count)
                                .hint_text("10"),
                        );
                        ui.end_row();
                    });

                ui.add_space(6.0);
                let running = self.controller.is_running();
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(!running, egui::Button::new("Iniciar"))
                        .clicked()
                    {
                        self.start_acquisition();
                    }
                    if ui.button("Graficar").clicked() {
                        self.plot_data();
                    }
                    if ui
                        .add_enabled(running, egui::Button::new("Detener"))
                        .clicked()
                    {
                        self.stop_acquisition();
                    }
                    if ui.button("Cerrar").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.separator();
                ui.label(&self.status_line);
                ui.label(format!("Muestras tomadas: {}", self.accepted));
                if self.requested > 0 {
                    ui.label(format!("Lecturas: {}/{}", self.lines_read, self.requested));
                }
                ui.separator();

                log_panel::render(ui, &self.log, &mut self.log_view);
            });
    }

    fn notice_window(&mut self, ctx: &egui::Context) {
        let mut dismissed = false;
        if let Some(notice) = &self.notice {
            egui::Window::new(notice.title.as_str())
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    match notice.level {
                        NoticeLevel::Info => ui.label(notice.message.as_str()),
                        NoticeLevel::Error => {
                            ui.colored_label(egui::Color32::LIGHT_RED, notice.message.as_str())
                        }
                    };
                    ui.vertical_centered(|ui| {
                        if ui.button("OK").clicked() {
                            dismissed = true;
                        }
                    });
                });
        }
        if dismissed {
            self.notice = None;
        }
    }
}

impl eframe::App for LoggerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_events();

        self.controls_panel(ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            self.charts.ui(ui);
        });
        self.notice_window(ctx);

        if ctx.input(|i| i.viewport().close_requested()) {
            if let Some(Err(e)) = self.controller.shutdown() {
                error!("Acquisition ended with error during shutdown: {}", e);
            }
            return;
        }

        if self.controller.is_running() || self.state == RunState::Running {
            ctx.request_repaint_after(REPAINT_INTERVAL);
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, FORM_KEY, &self.form);
    }
}

fn input_notice(error: &DaqError) -> Notice {
    let message = match error {
        DaqError::InvalidFileName(_) => "Por favor ingrese un nombre de archivo válido.",
        _ => "Por favor ingrese un número válido de muestras.",
    };
    Notice::error("Error de entrada", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{MockConnector, MockRead};
    use std::sync::Arc;
    use std::time::Instant;
    use tempfile::{tempdir, TempDir};

    fn app(script: Vec<MockRead>) -> (LoggerApp, MockConnector, TempDir) {
        let dir = tempdir().unwrap();
        let connector = MockConnector::new(script);
        let controller =
            AcquisitionController::new(Arc::new(connector.clone()), dir.path(), Duration::ZERO);
        (LoggerApp::with_controller(controller), connector, dir)
    }

    fn wait_for_end(app: &mut LoggerApp) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            app.process_events();
            if app.state != RunState::Running && !app.is_running() {
                return;
            }
            assert!(Instant::now() < deadline, "run did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_invalid_count_shows_input_error() {
        let (mut app, connector, _dir) = app(vec![]);
        app.form.file_name = "datos".into();
        app.form.sample_count = "diez".into();
        app.start_acquisition();

        let notice = app.notice.clone().unwrap();
        assert_eq!(notice.title, "Error de entrada");
        assert_eq!(notice.message, "Por favor ingrese un número válido de muestras.");
        assert_eq!(connector.connects(), 0);
        assert_eq!(app.state, RunState::Idle);
    }

    #[test]
    fn test_connection_error_names_port() {
        let (mut app, connector, _dir) = app(vec![]);
        connector.fail_next_connect();
        app.form.file_name = "datos".into();
        app.form.sample_count = "3".into();
        app.start_acquisition();

        let notice = app.notice.clone().unwrap();
        assert_eq!(notice.title, "Error de conexión");
        assert!(notice.message.starts_with("No se pudo abrir el puerto MOCK0. Error:"));
        assert!(!app.is_running());
    }

    #[test]
    fn test_plot_without_data_shows_notice() {
        let (mut app, _connector, _dir) = app(vec![]);
        assert_eq!(app.plot_data(), PlotOutcome::Empty);
        assert_eq!(
            app.notice.as_ref().map(|n| n.message.as_str()),
            Some("No hay datos para graficar.")
        );
    }

    #[test]
    fn test_completed_run_updates_view() {
        let (mut app, _connector, dir) = app(vec![
            MockRead::reading(23.5, 60.2),
            MockRead::line("??"),
            MockRead::reading(23.7, 60.0),
        ]);
        app.form.file_name = "datos".into();
        app.form.sample_count = "3".into();
        app.start_acquisition();
        assert_eq!(app.form.file_name, "datos.csv");
        wait_for_end(&mut app);

        assert_eq!(app.state, RunState::Completed);
        assert_eq!(app.accepted, 2);
        assert_eq!(app.lines_read, 3);
        assert_eq!(app.status_line, "La toma de muestras ha finalizado.");
        let notice = app.notice.clone().unwrap();
        assert_eq!(notice.title, "Finalizado");
        assert!(notice
            .message
            .contains(&dir.path().join("datos.csv").display().to_string()));

        let log: Vec<_> = app.sample_log().collect();
        assert_eq!(log.len(), 2);
        assert!(log[0].starts_with("Muestra 1: Tiempo="));
        assert!(log[1].starts_with("Muestra 3: Tiempo="));

        assert_eq!(app.plot_data(), PlotOutcome::Plotted(2));
        assert_eq!(app.charts.plotted().humidities, vec![60.2, 60.0]);
    }

    #[test]
    fn test_stop_marks_run_cancelled() {
        let (mut app, connector, _dir) = app(vec![MockRead::reading(20.0, 50.0), MockRead::Stall]);
        app.form.file_name = "stop.csv".into();
        app.form.sample_count = "5".into();
        app.start_acquisition();
        assert!(app.notice.is_none());

        let deadline = Instant::now() + Duration::from_secs(5);
        while app.accepted == 0 {
            app.process_events();
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(5));
        }
        app.stop_acquisition();
        wait_for_end(&mut app);

        assert_eq!(app.state, RunState::Cancelled);
        assert_eq!(app.status_line, "Toma de muestras detenida.");
        assert_eq!(connector.released(), 1);
    }

    #[test]
    fn test_disconnect_shows_abort_notice() {
        let (mut app, _connector, _dir) = app(vec![MockRead::reading(20.0, 50.0)]);
        app.form.file_name = "corte.csv".into();
        app.form.sample_count = "4".into();
        app.start_acquisition();
        wait_for_end(&mut app);

        assert_eq!(app.state, RunState::Aborted);
        let notice = app.notice.clone().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.title, "Toma de muestras abortada");
        assert!(notice.message.contains("Se guardaron 1 muestras"));
    }
}
