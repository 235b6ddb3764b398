//! Chart and summary report output.

pub mod chart;
pub mod generator;

pub use chart::render_charts;
pub use generator::*;
