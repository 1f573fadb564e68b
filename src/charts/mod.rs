//! Charts module - aggregate series rendering

mod plotter;

pub use plotter::ChartPlotter;
