//! egui rendering: panels around the edges, one page per navigation section.

pub mod panels;
pub mod plot;
pub mod sections;
