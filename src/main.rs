//! Failed Banks Analysis - Interactive FDIC failed bank data dashboard
//!
//! Loads a failed-bank CSV, filters it by year range and state set, and
//! displays aggregate statistics and charts.

mod charts;
mod data;
mod gui;
mod stats;

use eframe::egui;
use gui::FailedBanksApp;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 850.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("Failed Banks Analysis (2000\u{2013}Present)"),
        ..Default::default()
    };

    eframe::run_native(
        "Failed Banks Analysis",
        options,
        Box::new(|cc| Ok(Box::new(FailedBanksApp::new(cc)))),
    )
}
