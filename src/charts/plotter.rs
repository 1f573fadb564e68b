//! Chart Plotter Module
//! Renders the shaped aggregate tables with egui_plot: failures per year,
//! failures by state, acquirer counts, and the per-year HHI series.

use egui::{Color32, RichText};
use egui_plot::{Bar, BarChart, Line, MarkerShape, Plot, PlotPoints, Points};

pub const YEAR_COLOR: Color32 = Color32::from_rgb(52, 152, 219); // Blue
pub const STATE_COLOR: Color32 = Color32::from_rgb(46, 204, 113); // Green
pub const ACQUIRER_COLOR: Color32 = Color32::from_rgb(155, 89, 182); // Purple
pub const HHI_COLOR: Color32 = Color32::from_rgb(231, 76, 60); // Red

/// How many acquirers the bar chart shows; the aggregate table itself is
/// not truncated.
const MAX_ACQUIRER_BARS: usize = 20;

const CHART_HEIGHT: f32 = 280.0;

/// Renders aggregate series as interactive egui_plot charts.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Centered placeholder shown when an aggregate has no data.
    pub fn draw_no_data(ui: &mut egui::Ui, message: &str) {
        ui.add_space(CHART_HEIGHT / 2.0 - 10.0);
        ui.vertical_centered(|ui| {
            ui.label(RichText::new(message).size(14.0).color(Color32::GRAY));
        });
        ui.add_space(CHART_HEIGHT / 2.0 - 10.0);
    }

    /// Vertical bar chart of failures per year.
    pub fn draw_year_chart(ui: &mut egui::Ui, per_year: &[(i32, usize)]) {
        let bars: Vec<Bar> = per_year
            .iter()
            .map(|&(year, count)| {
                Bar::new(year as f64, count as f64)
                    .width(0.7)
                    .name(format!("{year}"))
            })
            .collect();

        Plot::new("failures_per_year")
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .x_axis_label("Year")
            .y_axis_label("Failures")
            .x_axis_formatter(|mark, _range| format!("{}", mark.value.round() as i64))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).color(YEAR_COLOR).name("Failures"));
            });
    }

    /// Vertical bar chart of failures by state, ascending by state code.
    pub fn draw_state_chart(ui: &mut egui::Ui, per_state: &[(String, usize)]) {
        let labels: Vec<String> = per_state.iter().map(|(s, _)| s.clone()).collect();
        let bars: Vec<Bar> = per_state
            .iter()
            .enumerate()
            .map(|(i, (state, count))| {
                Bar::new(i as f64, *count as f64).width(0.7).name(state)
            })
            .collect();

        Plot::new("failures_by_state")
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .x_axis_label("State")
            .y_axis_label("Failures")
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round() as usize;
                if (mark.value - idx as f64).abs() < 1e-6 && idx < labels.len() {
                    labels[idx].clone()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).color(STATE_COLOR).name("Failures"));
            });
    }

    /// Horizontal bar chart of the top acquirers, largest on top.
    pub fn draw_acquirer_chart(ui: &mut egui::Ui, per_acquirer: &[(String, usize)]) {
        let shown = &per_acquirer[..per_acquirer.len().min(MAX_ACQUIRER_BARS)];
        let labels: Vec<String> = shown.iter().map(|(a, _)| a.clone()).collect();
        let n = shown.len();

        // Row 0 at the bottom, so reverse to put the largest acquirer on top.
        let bars: Vec<Bar> = shown
            .iter()
            .enumerate()
            .map(|(i, (acquirer, count))| {
                Bar::new((n - 1 - i) as f64, *count as f64)
                    .width(0.7)
                    .name(acquirer)
            })
            .collect();

        Plot::new("acquirer_counts")
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .x_axis_label("Resolutions")
            .y_axis_formatter(move |mark, _range| {
                let idx = mark.value.round() as usize;
                if (mark.value - idx as f64).abs() < 1e-6 && idx < n {
                    labels[n - 1 - idx].clone()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(
                    BarChart::new(bars)
                        .horizontal()
                        .color(ACQUIRER_COLOR)
                        .name("Resolutions"),
                );
            });

        if per_acquirer.len() > MAX_ACQUIRER_BARS {
            ui.label(
                RichText::new(format!(
                    "Showing top {} of {} acquirers",
                    MAX_ACQUIRER_BARS,
                    per_acquirer.len()
                ))
                .size(11.0)
                .color(Color32::GRAY),
            );
        }
    }

    /// Line chart with markers of the per-year HHI series.
    pub fn draw_hhi_chart(ui: &mut egui::Ui, hhi_by_year: &[(i32, f64)]) {
        let points: Vec<[f64; 2]> = hhi_by_year
            .iter()
            .map(|&(year, hhi)| [year as f64, hhi])
            .collect();

        Plot::new("hhi_by_year")
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .include_y(0.0)
            .include_y(1.05)
            .x_axis_label("Year")
            .y_axis_label("HHI")
            .x_axis_formatter(|mark, _range| format!("{}", mark.value.round() as i64))
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::from(points.clone()))
                        .color(HHI_COLOR)
                        .width(2.0)
                        .name("HHI"),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .shape(MarkerShape::Circle)
                        .radius(4.0)
                        .color(HHI_COLOR)
                        .name("HHI"),
                );
            });
    }
}
