//! Control Panel Widget
//! Left side panel: data source selection, year-range and state filters,
//! export, and progress reporting.

use crate::stats::FilterCriteria;
use egui::{Color32, ComboBox, RichText, ScrollArea};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Current filter selections.
#[derive(Default, Clone)]
pub struct FilterSettings {
    pub csv_path: Option<PathBuf>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub states: BTreeSet<String>,
}

impl FilterSettings {
    /// Shape the selections into the aggregator's criteria. Both year ends
    /// must be set for a year filter; an empty state set allows all states.
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            year_range: match (self.start_year, self.end_year) {
                (Some(min), Some(max)) => Some((min, max)),
                _ => None,
            },
            states: self.states.clone(),
        }
    }
}

/// Left side control panel.
pub struct ControlPanel {
    pub settings: FilterSettings,
    /// Years present in the loaded data, ascending.
    pub years: Vec<i32>,
    /// States present in the loaded data, ascending.
    pub states: Vec<String>,
    pub progress: f32,
    pub status: String,
    pub export_enabled: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: FilterSettings::default(),
            years: Vec::new(),
            states: Vec::new(),
            progress: 0.0,
            status: "Ready".to_string(),
            export_enabled: false,
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the filter option domains after a CSV load and reset the
    /// selections to the full range.
    pub fn update_data_options(&mut self, years: Vec<i32>, states: Vec<String>) {
        self.settings.start_year = years.first().copied();
        self.settings.end_year = years.last().copied();
        self.settings.states.clear();
        self.years = years;
        self.states = states;
    }

    pub fn reset_filters(&mut self) {
        self.settings.start_year = self.years.first().copied();
        self.settings.end_year = self.years.last().copied();
        self.settings.states.clear();
    }

    /// Draw the control panel.
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("\u{1F3E6} Failed Banks Analysis")
                    .size(20.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Interactive exploration of FDIC failed bank data")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source Section =====
        ui.label(RichText::new("\u{1F4C1} Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let path_text = self
                        .settings
                        .csv_path
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "No file loaded".to_string());

                    ui.label(RichText::new(&path_text).size(12.0).color(
                        if self.settings.csv_path.is_some() {
                            Color32::WHITE
                        } else {
                            Color32::GRAY
                        },
                    ));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("\u{1F4C2} Browse").clicked() {
                            action = ControlPanelAction::BrowseCsv;
                        }
                    });
                });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Filters Section =====
        ui.label(RichText::new("\u{1F50D} Filters").size(14.0).strong());
        ui.add_space(8.0);

        let label_width = 80.0;
        let combo_width = 110.0;

        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("Start Year:"));
            ComboBox::from_id_salt("start_year")
                .width(combo_width)
                .selected_text(
                    self.settings
                        .start_year
                        .map(|y| y.to_string())
                        .unwrap_or_else(|| "\u{2014}".to_string()),
                )
                .show_ui(ui, |ui| {
                    for &year in &self.years {
                        if ui
                            .selectable_label(self.settings.start_year == Some(year), year.to_string())
                            .clicked()
                        {
                            self.settings.start_year = Some(year);
                            // Keep the range well-formed.
                            if let Some(end) = self.settings.end_year {
                                if end < year {
                                    self.settings.end_year = Some(year);
                                }
                            }
                            action = ControlPanelAction::FiltersChanged;
                        }
                    }
                });
        });

        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("End Year:"));
            ComboBox::from_id_salt("end_year")
                .width(combo_width)
                .selected_text(
                    self.settings
                        .end_year
                        .map(|y| y.to_string())
                        .unwrap_or_else(|| "\u{2014}".to_string()),
                )
                .show_ui(ui, |ui| {
                    for &year in &self.years {
                        if ui
                            .selectable_label(self.settings.end_year == Some(year), year.to_string())
                            .clicked()
                        {
                            self.settings.end_year = Some(year);
                            if let Some(start) = self.settings.start_year {
                                if start > year {
                                    self.settings.start_year = Some(year);
                                }
                            }
                            action = ControlPanelAction::FiltersChanged;
                        }
                    }
                });
        });

        ui.add_space(10.0);

        ui.label(format!("States ({} selected):", self.settings.states.len()));
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(5.0)
            .show(ui, |ui| {
                ScrollArea::vertical()
                    .id_salt("state_select")
                    .max_height(150.0)
                    .show(ui, |ui| {
                        for state in &self.states {
                            let mut selected = self.settings.states.contains(state);
                            if ui.checkbox(&mut selected, state).changed() {
                                if selected {
                                    self.settings.states.insert(state.clone());
                                } else {
                                    self.settings.states.remove(state);
                                }
                                action = ControlPanelAction::FiltersChanged;
                            }
                        }
                    });
            });
        ui.label(
            RichText::new("No selection = all states")
                .size(10.0)
                .color(Color32::GRAY),
        );

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.small_button("Reset Filters").clicked() {
                self.reset_filters();
                action = ControlPanelAction::FiltersChanged;
            }
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Actions =====
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.export_enabled, |ui| {
                let button = egui::Button::new(RichText::new("\u{1F4BE} Export Results").size(14.0))
                    .min_size(egui::vec2(160.0, 30.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::ExportJson;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Progress Section =====
        ui.label(RichText::new("\u{1F4CA} Status").size(14.0).strong());
        ui.add_space(5.0);

        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(self.progress > 0.0 && self.progress < 100.0),
        );

        ui.add_space(5.0);

        let status_color = if self.status.contains("Error") || self.status.contains("Could not") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Loaded") || self.status.contains("exported") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseCsv,
    FiltersChanged,
    ExportJson,
}
