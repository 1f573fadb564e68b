//! Failed Banks Main Application
//! Main window wiring: background CSV load, aggregate recomputation through
//! the memoization cache, and JSON export of the current results.

use crate::data::{self, CsvLoader, LoaderError, NormalizedTable};
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use crate::stats::{AggregateCache, AggregateResult, Aggregator, FilterCriteria};
use anyhow::Context as _;
use egui::SidePanel;
use log::{info, warn};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread;

/// Default input looked up in the working directory at startup.
const DEFAULT_CSV: &str = "failed_banks.csv";

/// CSV loading result from the background thread.
enum LoadResult {
    Progress(String),
    Complete {
        df: DataFrame,
        table: NormalizedTable,
        path: PathBuf,
    },
    NotFound(String),
    Error(String),
}

/// Aggregate computation result from the background thread.
enum CalcResult {
    Complete {
        fingerprint: u64,
        criteria: FilterCriteria,
        result: AggregateResult,
    },
}

/// Snapshot written by the results export.
#[derive(Serialize)]
struct ExportPayload<'a> {
    criteria: &'a FilterCriteria,
    result: &'a AggregateResult,
}

/// Main application window.
pub struct FailedBanksApp {
    loader: CsvLoader,
    table: Option<Arc<NormalizedTable>>,
    cache: AggregateCache,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,

    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,

    calc_rx: Option<Receiver<CalcResult>>,
    is_calculating: bool,
    /// Filters changed while a computation was in flight.
    recompute_pending: bool,
}

impl FailedBanksApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let mut app = Self {
            loader: CsvLoader::new(),
            table: None,
            cache: AggregateCache::new(),
            control_panel: ControlPanel::new(),
            chart_viewer: ChartViewer::new(),
            load_rx: None,
            is_loading: false,
            calc_rx: None,
            is_calculating: false,
            recompute_pending: false,
        };
        // Try the default file on startup; a missing default is a prompt to
        // upload, not an error.
        app.spawn_load(PathBuf::from(DEFAULT_CSV));
        app
    }

    fn handle_browse_csv(&mut self) {
        if self.is_loading {
            return;
        }
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            self.spawn_load(path);
        }
    }

    /// Read and normalize a CSV on a background thread.
    fn spawn_load(&mut self, path: PathBuf) {
        self.is_loading = true;
        self.control_panel.set_progress(0.0, "Loading CSV file...");

        let (tx, rx) = channel();
        self.load_rx = Some(rx);

        thread::spawn(move || {
            let _ = tx.send(LoadResult::Progress("Reading CSV file...".to_string()));
            let path_str = path.to_string_lossy().to_string();

            let df = match CsvLoader::read_csv(&path_str) {
                Ok(df) => df,
                Err(LoaderError::NotFound(name)) => {
                    let _ = tx.send(LoadResult::NotFound(name));
                    return;
                }
                Err(e) => {
                    let _ = tx.send(LoadResult::Error(e.to_string()));
                    return;
                }
            };

            let _ = tx.send(LoadResult::Progress("Normalizing records...".to_string()));
            match data::normalize(&df, &path_str) {
                Ok(table) => {
                    let _ = tx.send(LoadResult::Complete { df, table, path });
                }
                Err(e) => {
                    let _ = tx.send(LoadResult::Error(e.to_string()));
                }
            }
        });
    }

    fn check_load_results(&mut self) {
        let rx = self.load_rx.take();
        if let Some(rx) = rx {
            let mut should_keep_receiver = true;

            while let Ok(result) = rx.try_recv() {
                match result {
                    LoadResult::Progress(status) => {
                        self.control_panel.set_progress(10.0, &status);
                    }
                    LoadResult::Complete { df, table, path } => {
                        info!(
                            "loaded {} rows, {} columns from {}",
                            table.records.len(),
                            table.columns.len(),
                            path.display()
                        );
                        self.loader.set_dataframe(df, path.clone());
                        self.control_panel.settings.csv_path = Some(path);
                        self.control_panel.update_data_options(
                            table.available_years(),
                            table.available_states(),
                        );
                        self.control_panel.set_progress(
                            100.0,
                            &format!(
                                "Loaded {} rows, {} columns",
                                self.loader.get_row_count(),
                                table.columns.len()
                            ),
                        );
                        self.chart_viewer.clear();
                        self.table = Some(Arc::new(table));
                        self.is_loading = false;
                        should_keep_receiver = false;
                        self.start_compute();
                    }
                    LoadResult::NotFound(name) => {
                        warn!("input file not found: {name}");
                        self.control_panel.set_progress(
                            0.0,
                            &format!("Could not find '{name}'. Use Browse to supply a CSV."),
                        );
                        self.is_loading = false;
                        should_keep_receiver = false;
                    }
                    LoadResult::Error(error) => {
                        warn!("CSV load failed: {error}");
                        self.control_panel
                            .set_progress(0.0, &format!("Error: {error}"));
                        self.is_loading = false;
                        should_keep_receiver = false;
                    }
                }
            }

            if should_keep_receiver {
                self.load_rx = Some(rx);
            }
        }
    }

    /// Recompute aggregates for the current filters. Memoized results are
    /// shown immediately; misses go to a background thread.
    fn start_compute(&mut self) {
        let Some(table) = self.table.clone() else {
            return;
        };
        let criteria = self.control_panel.settings.criteria();

        if let Some(hit) = self.cache.get(table.fingerprint, &criteria) {
            self.chart_viewer.set_result(hit.clone(), table.presence);
            self.control_panel.export_enabled = true;
            return;
        }

        if self.is_calculating {
            self.recompute_pending = true;
            return;
        }

        let (tx, rx) = channel();
        self.calc_rx = Some(rx);
        self.is_calculating = true;
        self.control_panel
            .set_progress(50.0, "Computing aggregates...");

        thread::spawn(move || {
            let result = Aggregator::compute_all(table.as_ref(), &criteria);
            let _ = tx.send(CalcResult::Complete {
                fingerprint: table.fingerprint,
                criteria,
                result,
            });
        });
    }

    fn check_calculation_results(&mut self) {
        let rx = self.calc_rx.take();
        if let Some(rx) = rx {
            let mut should_keep_receiver = true;

            while let Ok(result) = rx.try_recv() {
                let CalcResult::Complete {
                    fingerprint,
                    criteria,
                    result,
                } = result;
                self.is_calculating = false;
                should_keep_receiver = false;

                // Results for a source replaced mid-compute are stale.
                let Some(table) = self.table.clone() else {
                    continue;
                };
                if table.fingerprint != fingerprint {
                    continue;
                }

                info!(
                    "aggregates computed: {} rows match the current filters",
                    result.total_count
                );
                self.cache.insert(fingerprint, criteria.clone(), result.clone());
                if criteria == self.control_panel.settings.criteria() {
                    self.chart_viewer.set_result(result, table.presence);
                    self.control_panel.export_enabled = true;
                    self.control_panel.set_progress(100.0, "Charts updated");
                }
            }

            if should_keep_receiver {
                self.calc_rx = Some(rx);
            } else if self.recompute_pending {
                self.recompute_pending = false;
                self.start_compute();
            }
        }
    }

    fn handle_export_json(&mut self) {
        let Some(result) = self.chart_viewer.result() else {
            self.control_panel.set_progress(0.0, "No results to export");
            return;
        };

        let default_name = self
            .loader
            .get_file_path()
            .and_then(|p| p.file_stem())
            .map(|stem| format!("{}_report.json", stem.to_string_lossy()))
            .unwrap_or_else(|| "failed_banks_report.json".to_string());

        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name(default_name)
            .save_file()
        else {
            return;
        };

        let criteria = self.control_panel.settings.criteria();
        match Self::write_export(&path, &criteria, result) {
            Ok(()) => {
                info!("results exported to {}", path.display());
                self.control_panel
                    .set_progress(100.0, "Results exported");
            }
            Err(e) => {
                warn!("export failed: {e:#}");
                self.control_panel
                    .set_progress(0.0, &format!("Error: export failed: {e}"));
            }
        }
    }

    fn write_export(
        path: &PathBuf,
        criteria: &FilterCriteria,
        result: &AggregateResult,
    ) -> anyhow::Result<()> {
        let payload = ExportPayload { criteria, result };
        let json = serde_json::to_string_pretty(&payload).context("serializing results")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

impl eframe::App for FailedBanksApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_load_results();
        self.check_calculation_results();

        if self.is_loading || self.is_calculating {
            ctx.request_repaint();
        }

        SidePanel::left("control_panel")
            .min_width(280.0)
            .max_width(330.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::BrowseCsv => self.handle_browse_csv(),
                        ControlPanelAction::FiltersChanged => self.start_compute(),
                        ControlPanelAction::ExportJson => self.handle_export_json(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ui);
        });
    }
}
