//! Terminal plotting.

pub mod ascii;

pub use ascii::render_box_chart;
