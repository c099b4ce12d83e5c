//! Renders the run log in the GUI.
//!
//! The panel lists the samples accepted during the current run, one line per
//! sample, optionally interleaved with the lines the sensor sent that could
//! not be parsed. Rendering goes through `ScrollArea::show_rows` so only the
//! visible rows are laid out.

use chrono::{DateTime, Local};
use egui::{Color32, ScrollArea, Ui};

/// Kind of a run log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// A sample was stored.
    Sample,
    /// A line from the sensor was discarded.
    Rejected,
}

/// One row of the run log.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub kind: EntryKind,
    pub message: String,
}

impl LogEntry {
    /// Creates an entry stamped with the current local time.
    pub fn new(kind: EntryKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            message: message.into(),
        }
    }

    fn color(&self) -> Color32 {
        match self.kind {
            EntryKind::Sample => Color32::from_gray(210),
            EntryKind::Rejected => Color32::from_rgb(230, 160, 60),
        }
    }
}

/// Display toggles owned by the app.
#[derive(Clone, Copy, Debug)]
#[allow(missing_docs)]
pub struct LogView {
    pub scroll_to_bottom: bool,
    pub show_rejected: bool,
}

impl Default for LogView {
    fn default() -> Self {
        Self {
            scroll_to_bottom: true,
            show_rejected: false,
        }
    }
}

/// Renders the log panel.
pub fn render(ui: &mut Ui, entries: &[LogEntry], view: &mut LogView) {
    ui.horizontal(|ui| {
        ui.label("Datos leídos:");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.toggle_value(&mut view.scroll_to_bottom, "Seguir");
            ui.toggle_value(&mut view.show_rejected, "Mostrar descartes");
        });
    });

    ui.separator();

    let visible: Vec<&LogEntry> = entries
        .iter()
        .filter(|entry| view.show_rejected || entry.kind == EntryKind::Sample)
        .collect();

    let row_height = ui.text_style_height(&egui::TextStyle::Monospace);
    ScrollArea::vertical()
        .auto_shrink([false; 2])
        .stick_to_bottom(view.scroll_to_bottom)
        .show_rows(ui, row_height, visible.len(), |ui, row_range| {
            for entry in &visible[row_range] {
                ui.horizontal(|ui| {
                    ui.colored_label(
                        Color32::from_gray(150),
                        entry.timestamp.format("%H:%M:%S").to_string(),
                    );
                    ui.colored_label(entry.color(), egui::RichText::new(&entry.message).monospace());
                });
            }
        });
}
