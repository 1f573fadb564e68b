//! Chart Viewer Widget
//! Central scrollable panel: KPI metrics row plus the four aggregate chart
//! cards. Each card degrades to its own "no data" message, so one missing
//! column never blanks the rest of the view.

use crate::charts::ChartPlotter;
use crate::data::ColumnPresence;
use crate::stats::AggregateResult;
use egui::{Color32, RichText, ScrollArea};

const CARD_SPACING: f32 = 15.0;

/// Central display area for metrics and charts.
#[derive(Default)]
pub struct ChartViewer {
    result: Option<AggregateResult>,
    presence: ColumnPresence,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.result = None;
        self.presence = ColumnPresence::default();
    }

    pub fn set_result(&mut self, result: AggregateResult, presence: ColumnPresence) {
        self.result = Some(result);
        self.presence = presence;
    }

    pub fn result(&self) -> Option<&AggregateResult> {
        self.result.as_ref()
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        let Some(result) = self.result.clone() else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("Load a CSV to begin").size(20.0).color(Color32::GRAY));
            });
            return;
        };
        let presence = self.presence;

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                Self::draw_metrics_row(ui, &result);
                ui.add_space(CARD_SPACING);

                Self::draw_card(ui, "Failures per Year", |ui| {
                    if presence.closing_date && !result.per_year.is_empty() {
                        ChartPlotter::draw_year_chart(ui, &result.per_year);
                    } else {
                        ChartPlotter::draw_no_data(ui, "No valid dates to plot.");
                    }
                });

                Self::draw_card(ui, "Geographic Hotspots (USA)", |ui| {
                    if !presence.state {
                        ChartPlotter::draw_no_data(ui, "State column not found.");
                    } else if result.per_state.is_empty() {
                        ChartPlotter::draw_no_data(ui, "No state data to display.");
                    } else {
                        ChartPlotter::draw_state_chart(ui, &result.per_state);
                    }
                });

                Self::draw_card(ui, "Consolidation: Who Absorbed Failures?", |ui| {
                    if !presence.acquiring_institution {
                        ChartPlotter::draw_no_data(ui, "Acquiring institution column not found.");
                    } else if result.per_acquirer.is_empty() {
                        ChartPlotter::draw_no_data(ui, "No acquisition data to display.");
                    } else {
                        ChartPlotter::draw_acquirer_chart(ui, &result.per_acquirer);
                        if let Some((top_50, top_80)) = result.pareto {
                            ui.add_space(4.0);
                            ui.label(
                                RichText::new(format!(
                                    "Top {top_50} acquirers \u{2248} 50% of resolutions; \
                                     Top {top_80} \u{2248} 80%."
                                ))
                                .size(12.0)
                                .color(Color32::GRAY),
                            );
                        }
                    }
                });

                Self::draw_card(ui, "Consolidation Over Time (HHI)", |ui| {
                    if !presence.closing_date || !presence.acquiring_institution {
                        ChartPlotter::draw_no_data(
                            ui,
                            "Need valid dates and acquiring institutions to compute HHI.",
                        );
                    } else if result.hhi_by_year.is_empty() {
                        ChartPlotter::draw_no_data(ui, "No yearly acquisition data available.");
                    } else {
                        ChartPlotter::draw_hhi_chart(ui, &result.hhi_by_year);
                    }
                });

                ui.add_space(CARD_SPACING);
            });
    }

    /// KPI row: total failures, peak year, top state.
    fn draw_metrics_row(ui: &mut egui::Ui, result: &AggregateResult) {
        let peak_year = result
            .peak_year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "\u{2014}".to_string());
        let top_state = result
            .top_state
            .clone()
            .unwrap_or_else(|| "\u{2014}".to_string());

        ui.columns(3, |cols| {
            Self::draw_metric(&mut cols[0], "Total Failures", &thousands(result.total_count));
            Self::draw_metric(&mut cols[1], "Peak Year", &peak_year);
            Self::draw_metric(&mut cols[2], "Top State", &top_state);
        });
    }

    fn draw_metric(ui: &mut egui::Ui, label: &str, value: &str) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(8.0)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(RichText::new(label).size(12.0).color(Color32::GRAY));
                    ui.label(RichText::new(value).size(26.0).strong());
                });
            });
    }

    fn draw_card(ui: &mut egui::Ui, title: &str, body: impl FnOnce(&mut egui::Ui)) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(1.0, Color32::from_gray(60)))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.label(RichText::new(title).size(16.0).strong());
                ui.add_space(8.0);
                body(ui);
            });
        ui.add_space(CARD_SPACING);
    }
}

/// Format a count with thousands separators.
fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
