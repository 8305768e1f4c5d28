//! Custom canvas widgets.

pub mod graph_plot;
