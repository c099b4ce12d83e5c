//! The two time-series charts.
//!
//! Charts are redrawn on request only: [`Charts::refresh`] copies the store
//! and the plots keep showing that copy until the next refresh, however many
//! samples arrive in between.

use crate::data::{SampleSeries, SampleStore};
use egui::{Color32, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoints};

/// Result of a plot request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlotOutcome {
    /// Charts now show this many samples.
    Plotted(usize),
    /// The store held nothing; charts were left as they were.
    Empty,
}

struct ChartSpec {
    id: &'static str,
    title: &'static str,
    y_label: &'static str,
    legend: &'static str,
    color: Color32,
}

const TEMPERATURE_CHART: ChartSpec = ChartSpec {
    id: "temperature_plot",
    title: "Temperatura vs Tiempo",
    y_label: "Temperatura (°C)",
    legend: "Temperatura (°C)",
    color: Color32::RED,
};

const HUMIDITY_CHART: ChartSpec = ChartSpec {
    id: "humidity_plot",
    title: "Humedad vs Tiempo",
    y_label: "Humedad (%)",
    legend: "Humedad (%)",
    color: Color32::BLUE,
};

const X_LABEL: &str = "Tiempo (s)";

/// Snapshot-backed temperature and humidity charts.
#[derive(Default)]
pub struct Charts {
    series: SampleSeries,
}

impl Charts {
    /// Replaces the plotted data with the current store contents.
    pub fn refresh(&mut self, store: &SampleStore) -> PlotOutcome {
        let snapshot = store.snapshot();
        if snapshot.is_empty() {
            return PlotOutcome::Empty;
        }
        self.series = snapshot;
        PlotOutcome::Plotted(self.series.len())
    }

    /// Samples currently plotted.
    pub fn plotted(&self) -> &SampleSeries {
        &self.series
    }

    /// Draws both charts stacked vertically, splitting the available height.
    pub fn ui(&self, ui: &mut Ui) {
        let spacing = ui.spacing().item_spacing.y;
        let heading = ui.text_style_height(&egui::TextStyle::Heading);
        let height = ((ui.available_height() - 2.0 * (heading + 2.0 * spacing)) / 2.0).max(120.0);

        draw_chart(ui, &TEMPERATURE_CHART, self.series.temperature_points(), height);
        ui.add_space(spacing);
        draw_chart(ui, &HUMIDITY_CHART, self.series.humidity_points(), height);
    }
}

fn draw_chart(ui: &mut Ui, spec: &ChartSpec, points: Vec<[f64; 2]>, height: f32) {
    ui.heading(spec.title);
    Plot::new(spec.id)
        .height(height)
        .legend(Legend::default())
        .show_grid(true)
        .x_axis_label(X_LABEL)
        .y_axis_label(spec.y_label)
        .show(ui, |plot_ui| {
            if !points.is_empty() {
                plot_ui.line(
                    Line::new(PlotPoints::from(points))
                        .name(spec.legend)
                        .color(spec.color),
                );
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Sample;

    #[test]
    fn test_empty_store_is_not_plotted() {
        let mut charts = Charts::default();
        assert_eq!(charts.refresh(&SampleStore::new()), PlotOutcome::Empty);
        assert!(charts.plotted().is_empty());
    }

    #[test]
    fn test_refresh_is_a_snapshot() {
        let store = SampleStore::new();
        let mut charts = Charts::default();
        store.push(Sample {
            elapsed_seconds: 0.0,
            temperature: 23.5,
            humidity: 60.2,
        });
        assert_eq!(charts.refresh(&store), PlotOutcome::Plotted(1));

        store.push(Sample {
            elapsed_seconds: 2.0,
            temperature: 23.7,
            humidity: 60.0,
        });
        assert_eq!(charts.plotted().len(), 1);

        // An empty store later on keeps the previous chart.
        store.clear();
        assert_eq!(charts.refresh(&store), PlotOutcome::Empty);
        assert_eq!(charts.plotted().temperatures, vec![23.5]);
    }
}
